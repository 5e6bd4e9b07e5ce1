//! The generic parsed node tree. Immutable once produced.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use crate::error::{DocumentRef, RenderError, RenderResult};
use crate::expression::{CompiledExpr, ExprError};

/// Byte offset plus 1-based line and column of a node's opening tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct SourcePos {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl SourcePos {
    pub const fn new(offset: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    /// `:name="expr"`, resolved every frame.
    Bind,
    /// `{expr}`, an object whose entries are applied as literals every frame.
    Spread,
    /// A bare attribute name with no value.
    BooleanTrue,
    Literal,
}

/// One attribute of a node. Bind and spread attributes lazily compile and cache their expression.
#[derive(Debug, Clone)]
pub struct NodeAttribute {
    pub name: String,
    pub kind: AttributeKind,
    pub value: String,
    compiled: OnceLock<Result<Arc<CompiledExpr>, ExprError>>,
}

impl NodeAttribute {
    pub fn new(name: impl Into<String>, kind: AttributeKind, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            value: value.into(),
            compiled: OnceLock::new(),
        }
    }

    pub fn literal(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::Literal, value)
    }

    pub fn bind(name: impl Into<String>, expr: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::Bind, expr)
    }

    pub fn spread(expr: impl Into<String>) -> Self {
        Self::new("", AttributeKind::Spread, expr)
    }

    pub fn flag(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::BooleanTrue, "")
    }

    /// Whether interpreting this attribute needs an evaluation context.
    pub fn is_contextual(&self) -> bool {
        matches!(self.kind, AttributeKind::Bind | AttributeKind::Spread)
    }

    /// The compiled expression. Compiled on first use; later calls reuse the cached result.
    pub fn compiled(&self) -> Result<&CompiledExpr, ExprError> {
        match self
            .compiled
            .get_or_init(|| CompiledExpr::compile(&self.value).map(Arc::new))
        {
            Ok(expr) => Ok(expr.as_ref()),
            Err(e) => Err(e.clone()),
        }
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled.get().is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Empty,
    Text,
    Children,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub tag: String,
    pub kind: NodeKind,
    pub attributes: Vec<Arc<NodeAttribute>>,
    pub children: Vec<Arc<Node>>,
    pub text: Option<String>,
    pub pos: SourcePos,
}

impl Node {
    pub fn new(tag: impl Into<String>, pos: SourcePos) -> Self {
        Self {
            tag: tag.into(),
            kind: NodeKind::Empty,
            attributes: Vec::new(),
            children: Vec::new(),
            text: None,
            pos,
        }
    }

    pub fn with_attribute(mut self, attr: NodeAttribute) -> Self {
        self.attributes.push(Arc::new(attr));
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(Arc::new(child));
        self.kind = NodeKind::Children;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        if self.kind == NodeKind::Empty {
            self.kind = NodeKind::Text;
        }
        self
    }

    pub fn has_contextual_attributes(&self) -> bool {
        self.attributes.iter().any(|a| a.is_contextual())
    }
}

/// A loaded template: the node forest plus where it came from.
#[derive(Debug, Clone)]
pub struct Document {
    pub working_dir: PathBuf,
    pub file_name: String,
    pub nodes: Vec<Arc<Node>>,
}

impl Document {
    /// Wrap a parsed node forest. Top-level bind or spread attributes are rejected.
    pub fn new(
        working_dir: impl Into<PathBuf>,
        file_name: impl Into<String>,
        nodes: Vec<Node>,
    ) -> RenderResult<Self> {
        let doc = Self {
            working_dir: working_dir.into(),
            file_name: file_name.into(),
            nodes: nodes.into_iter().map(Arc::new).collect(),
        };
        for node in &doc.nodes {
            if node.has_contextual_attributes() {
                return Err(RenderError::binding(
                    "top level elements cannot have contextual attributes (binds or spreads)",
                )
                .with_element(node)
                .with_document(&doc.handle()));
            }
        }
        Ok(doc)
    }

    pub fn handle(&self) -> DocumentRef {
        DocumentRef {
            working_dir: self.working_dir.clone(),
            file_name: self.file_name.clone(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.working_dir.join(&self.file_name)
    }

    pub fn resolve_relative(&self, rel: &str) -> PathBuf {
        let p = Path::new(rel);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.working_dir.join(p)
        }
    }
}

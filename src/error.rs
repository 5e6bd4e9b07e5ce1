use std::fmt;
use std::path::PathBuf;

use crate::document::{Node, SourcePos};

pub type RenderResult<T> = Result<T, RenderError>;

/// Coarse classification of a [`RenderError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unknown or ambiguous tag, or an element that could not be instantiated.
    Binding,
    /// Bind on a non-bindable field, failed cast, ambiguous property, missing loop variable.
    Attribute,
    /// Malformed or failing bind expression.
    Expression,
    /// Script compile failure, runtime exception or resource-limit breach.
    Script,
    /// Template, font or animation problems discovered while preparing or drawing a frame.
    Render,
    /// Fetching or decoding an external resource failed.
    Resource,
    /// The markup could not be tokenized into a node tree.
    Markup,
    /// Invalid engine configuration.
    Config,
    /// The render was cancelled before completion.
    Cancelled,
}

impl ErrorKind {
    fn label(self) -> &'static str {
        match self {
            Self::Binding => "binding error",
            Self::Attribute => "attribute error",
            Self::Expression => "expression error",
            Self::Script => "script error",
            Self::Render => "render error",
            Self::Resource => "resource error",
            Self::Markup => "markup error",
            Self::Config => "config error",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Identifies the loaded document an error belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub working_dir: PathBuf,
    pub file_name: String,
}

/// One element position in the error context chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementTrace {
    pub tag: String,
    pub pos: SourcePos,
}

impl ElementTrace {
    pub fn of(node: &Node) -> Self {
        Self {
            tag: node.tag.clone(),
            pos: node.pos,
        }
    }
}

impl fmt::Display for ElementTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tag: {}. Pos: {}. Line: {}. Col: {}.",
            self.tag, self.pos.offset, self.pos.line, self.pos.column
        )
    }
}

/// The single context-carrying error type of the engine.
///
/// Errors are created at the failure site and gain element positions as they unwind through the
/// render tree. The owning document is attached once at the session boundary.
#[derive(thiserror::Error, Debug)]
pub struct RenderError {
    kind: ErrorKind,
    message: String,
    document: Option<DocumentRef>,
    elements: Vec<ElementTrace>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl RenderError {
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            document: None,
            elements: Vec::new(),
            source: None,
        }
    }

    pub fn binding(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Binding, msg)
    }

    pub fn attribute(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Attribute, msg)
    }

    pub fn expression(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Expression, msg)
    }

    pub fn script(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Script, msg)
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Render, msg)
    }

    pub fn resource(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Resource, msg)
    }

    pub fn markup(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Markup, msg)
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, msg)
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "render cancelled")
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn document(&self) -> Option<&DocumentRef> {
        self.document.as_ref()
    }

    /// Element positions, innermost first.
    pub fn elements(&self) -> &[ElementTrace] {
        &self.elements
    }

    /// Append `node` to the context chain unless it is already the outermost entry.
    pub fn with_element(mut self, node: &Node) -> Self {
        let trace = ElementTrace::of(node);
        if self.elements.last() != Some(&trace) {
            self.elements.push(trace);
        }
        self
    }

    pub fn with_elements<'a>(mut self, nodes: impl IntoIterator<Item = &'a Node>) -> Self {
        for node in nodes {
            self = self.with_element(node);
        }
        self
    }

    /// Attach the owning document. The first attached document wins.
    pub fn with_document(mut self, document: &DocumentRef) -> Self {
        if self.document.is_none() {
            self.document = Some(document.clone());
        }
        self
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.label(), self.message)?;
        if let Some(doc) = &self.document {
            write!(
                f,
                "\nImage: {}",
                doc.working_dir.join(&doc.file_name).display()
            )?;
        }
        if !self.elements.is_empty() {
            f.write_str("\nContext:")?;
            for el in &self.elements {
                write!(f, "\n\t{el}")?;
            }
        }
        if let Some(src) = &self.source {
            write!(f, "\nCaused by: {src}")?;
        }
        Ok(())
    }
}

impl From<std::io::Error> for RenderError {
    fn from(e: std::io::Error) -> Self {
        Self::resource(e.to_string()).with_source(e)
    }
}

impl From<anyhow::Error> for RenderError {
    fn from(e: anyhow::Error) -> Self {
        Self::render(format!("{e:#}"))
    }
}

impl From<image::ImageError> for RenderError {
    fn from(e: image::ImageError) -> Self {
        Self::resource(e.to_string()).with_source(e)
    }
}

impl From<serde_json::Error> for RenderError {
    fn from(e: serde_json::Error) -> Self {
        Self::config(e.to_string()).with_source(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Node;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            RenderError::binding("x")
                .to_string()
                .starts_with("binding error:")
        );
        assert!(
            RenderError::attribute("x")
                .to_string()
                .starts_with("attribute error:")
        );
        assert!(
            RenderError::script("x")
                .to_string()
                .starts_with("script error:")
        );
        assert!(RenderError::cancelled().to_string().starts_with("cancelled"));
    }

    #[test]
    fn display_includes_document_and_element_chain() {
        let inner = Node::new("rectangle", SourcePos::new(40, 3, 5));
        let outer = Node::new("template", SourcePos::new(0, 1, 1));
        let err = RenderError::render("boom")
            .with_element(&inner)
            .with_element(&outer)
            .with_document(&DocumentRef {
                working_dir: PathBuf::from("/tmp/cards"),
                file_name: "card.html".to_owned(),
            });

        let text = err.to_string();
        assert!(text.contains("render error: boom"));
        assert!(text.contains("card.html"));
        assert!(text.contains("Tag: rectangle. Pos: 40. Line: 3. Col: 5."));
        assert!(text.contains("Tag: template. Pos: 0. Line: 1. Col: 1."));
        assert_eq!(err.elements()[0].tag, "rectangle");
    }

    #[test]
    fn repeated_element_is_recorded_once() {
        let node = Node::new("text", SourcePos::default());
        let err = RenderError::render("x")
            .with_element(&node)
            .with_element(&node);
        assert_eq!(err.elements().len(), 1);
    }

    #[test]
    fn io_error_preserves_source() {
        let base = std::io::Error::other("disk gone");
        let err = RenderError::from(base);
        assert_eq!(err.kind(), ErrorKind::Resource);
        assert!(std::error::Error::source(&err).is_some());
    }
}

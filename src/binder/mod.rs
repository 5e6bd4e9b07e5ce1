//! Turns the static node tree into typed, capability-bound elements.

pub(crate) mod attributes;
pub mod cast;
pub mod field;
pub mod registry;

use std::sync::Arc;

use crate::config::{EngineConfig, ErrorPolicy, PolicyAction};
use crate::document::{Node, NodeAttribute};
use crate::elements::ElementBody;
use crate::error::{RenderError, RenderResult};

pub use cast::{CastError, Castable};
pub use field::{Dynamic, Field, FieldSlot, Fixed};
pub use registry::{Capabilities, ChildMode, ElementDescriptor, FieldDescriptor, Registry};

use attributes::Applied;

/// Whether child nodes of deferred-children elements are bound too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindMode {
    Deep,
    /// Leaves the children of `deferred_children` elements (the template) unbound.
    Shallow,
}

/// Everything an element factory and the binder may consult.
#[derive(Debug, Clone, Copy)]
pub struct BindContext<'a> {
    pub config: &'a EngineConfig,
    pub policy: ErrorPolicy,
    pub registry: &'a Registry,
}

impl<'a> BindContext<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self {
            config,
            policy: config.policy,
            registry: Registry::builtin(),
        }
    }

    pub fn with_registry(mut self, registry: &'a Registry) -> Self {
        self.registry = registry;
        self
    }

    /// Raise `err`, or log it and carry on, depending on `action`.
    pub(crate) fn gate(&self, action: PolicyAction, err: RenderError) -> RenderResult<()> {
        if action.raises() {
            Err(err)
        } else {
            tracing::warn!(error = %err, "skipping per error policy");
            Ok(())
        }
    }
}

/// An instantiated element. Created once per session and shared read-only across frames.
#[derive(Debug, Clone)]
pub struct BoundElement {
    pub node: Arc<Node>,
    pub descriptor: &'static ElementDescriptor,
    pub body: ElementBody,
    pub spreads: Vec<Arc<NodeAttribute>>,
    /// Attributes no field accepted. Reported when the first frame renders the element.
    pub unmatched: Vec<Arc<NodeAttribute>>,
    pub children: Arc<[BoundElement]>,
    pub text: Option<String>,
}

impl BoundElement {
    pub fn tag(&self) -> &str {
        &self.node.tag
    }

    pub fn kind(&self) -> crate::elements::ElementKind {
        self.descriptor.kind
    }

    /// Depth-first iteration over this element and its bound descendants.
    pub fn walk(&self) -> Vec<&BoundElement> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(el) = stack.pop() {
            out.push(el);
            stack.extend(el.children.iter().rev());
        }
        out
    }
}

pub struct Binder<'a> {
    ctx: BindContext<'a>,
}

impl<'a> Binder<'a> {
    pub fn new(ctx: BindContext<'a>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &BindContext<'a> {
        &self.ctx
    }

    pub fn bind_all(&self, nodes: &[Arc<Node>], mode: BindMode) -> RenderResult<Vec<BoundElement>> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            if let Some(el) = self.bind(node, mode)? {
                out.push(el);
            }
        }
        Ok(out)
    }

    /// Bind one node. `Ok(None)` means the node was skipped under a lenient policy.
    pub fn bind(&self, node: &Arc<Node>, mode: BindMode) -> RenderResult<Option<BoundElement>> {
        let ctx = &self.ctx;
        let descriptor = match ctx.registry.lookup(&node.tag) {
            [one] => *one,
            [] => {
                let err = RenderError::binding(format!("unknown element <{}>", node.tag))
                    .with_element(node);
                ctx.gate(ctx.policy.element_not_found, err)?;
                return Ok(None);
            }
            many => {
                let err = RenderError::binding(format!(
                    "tag <{}> matches {} elements",
                    node.tag,
                    many.len()
                ))
                .with_element(node);
                ctx.gate(ctx.policy.element_ambiguous, err)?;
                return Ok(None);
            }
        };

        let mut body = match (descriptor.factory)(ctx) {
            Ok(body) => body,
            Err(e) => {
                let err = RenderError::binding(format!("cannot instantiate <{}>", node.tag))
                    .with_source(e)
                    .with_element(node);
                ctx.gate(ctx.policy.invalid_instance, err)?;
                return Ok(None);
            }
        };

        let mut spreads = Vec::new();
        let mut unmatched = Vec::new();
        for attr in &node.attributes {
            match attributes::apply_attribute(ctx, node, descriptor, &mut body, attr)? {
                Applied::Spread => spreads.push(Arc::clone(attr)),
                Applied::Unmatched => unmatched.push(Arc::clone(attr)),
                Applied::Assigned | Applied::Skipped => {}
            }
        }

        let mut children = Vec::new();
        let mut text = None;
        match descriptor.children {
            ChildMode::ChildList => {
                let deferred =
                    mode == BindMode::Shallow && descriptor.capabilities.deferred_children;
                if !deferred {
                    for child in &node.children {
                        let bound = self.bind(child, mode).map_err(|e| e.with_element(node))?;
                        children.extend(bound);
                    }
                }
                text = node.text.clone();
            }
            ChildMode::TextValue => {
                text = node.text.clone();
                if !node.children.is_empty() {
                    self.reject_children(node)?;
                }
            }
            ChildMode::None => {
                if !node.children.is_empty() {
                    self.reject_children(node)?;
                }
            }
        }

        Ok(Some(BoundElement {
            node: Arc::clone(node),
            descriptor,
            body,
            spreads,
            unmatched,
            children: children.into(),
            text,
        }))
    }

    fn reject_children(&self, node: &Node) -> RenderResult<()> {
        let err = RenderError::binding(format!("<{}> does not accept child elements", node.tag))
            .with_element(node);
        self.ctx.gate(self.ctx.policy.element_invalid_child, err)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/binder/binder.rs"]
mod tests;

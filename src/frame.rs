//! One frame's render pass over the session's bound element tree.

use std::collections::HashMap;
use std::sync::Arc;

use crate::binder::BoundElement;
use crate::binder::attributes;
use crate::elements::{ElementBody, Positional};
use crate::error::{ErrorKind, RenderError, RenderResult};
use crate::expression::Environment;
use crate::orchestrator::CancelToken;
use crate::resources::{FontFace, ResourceResolver};
use crate::scope::{LayoutBox, ScopeFrame, ScopeStack};
use crate::script::HostEnv;
use crate::session::RenderSession;
use crate::surface::{RasterImage, Surface};
use crate::value::Variables;

/// The mutable state of one frame: its surface, its scope stack and its decoded images.
///
/// Everything reachable through `session` is shared with the other frames and never mutated.
pub struct RenderFrame<'a> {
    ordinal: u32,
    session: &'a RenderSession,
    surface: &'a mut dyn Surface,
    scope: ScopeStack,
    cancel: &'a CancelToken,
    images: HashMap<String, RasterImage>,
}

impl<'a> RenderFrame<'a> {
    pub fn new(
        session: &'a RenderSession,
        ordinal: u32,
        surface: &'a mut dyn Surface,
        globals: Variables,
        cancel: &'a CancelToken,
    ) -> Self {
        let root = session.root_layout();
        Self {
            ordinal,
            session,
            surface,
            scope: ScopeStack::new(root, globals, session.frame_constants(ordinal)),
            cancel,
            images: HashMap::new(),
        }
    }

    /// Run the setup script, then draw the template.
    #[tracing::instrument(skip_all, fields(frame = self.ordinal))]
    pub fn run(mut self) -> RenderResult<()> {
        let session = self.session;
        let out = self.setup().and_then(|()| self.render(session.template()));
        out.map_err(|e| e.with_document(session.document()))
    }

    fn setup(&mut self) -> RenderResult<()> {
        let Some(runner) = self.session.runner() else {
            return Ok(());
        };
        let env = HostEnv {
            layout: *self.scope.root_layout(),
            variables: self.scope.visible(),
        };
        let result = runner.execute(&self.scope.published(), &env)?;
        self.scope.publish(result);
        Ok(())
    }

    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    pub fn session(&self) -> &'a RenderSession {
        self.session
    }

    pub fn scope(&self) -> &ScopeStack {
        &self.scope
    }

    pub fn env(&self) -> &dyn Environment {
        &self.scope
    }

    /// The innermost box.
    pub fn layout(&self) -> LayoutBox {
        *self.scope.layout()
    }

    pub fn surface(&mut self) -> &mut dyn Surface {
        &mut *self.surface
    }

    pub fn check_cancelled(&self) -> RenderResult<()> {
        if self.cancel.is_cancelled() {
            Err(RenderError::cancelled())
        } else {
            Ok(())
        }
    }

    /// Animation progress in `[0, 1]`: 0 on the first frame, 1 on the last, 0 for a still.
    pub fn progress(&self) -> f64 {
        let total = self.session.metrics().total_frames;
        if total <= 1 {
            return 0.0;
        }
        f64::from(self.ordinal - 1) / f64::from(total - 1)
    }

    /// Render one element. Errors carry the element chain as they unwind.
    pub fn render(&mut self, el: &BoundElement) -> RenderResult<()> {
        self.check_cancelled()?;
        if self.ordinal == 1 {
            for attr in &el.unmatched {
                tracing::debug!(tag = %el.tag(), attribute = %attr.name, "attribute matches no property");
            }
        }
        let expanded = attributes::expand_spreads(el, &self.scope)?;
        let el = expanded.as_ref().unwrap_or(el);

        let out = match &el.body {
            ElementBody::Template(b) => b.render(el, self),
            ElementBody::If(b) => b.render(el, self),
            ElementBody::ForEach(b) => b.render(el, self),
            ElementBody::Range(b) => b.render(el, self),
            ElementBody::Clear(b) => b.render(el, self),
            ElementBody::Rectangle(b) => b.render(el, self),
            ElementBody::Text(b) => b.render(el, self),
            ElementBody::Image(b) => b.render(el, self),
            ElementBody::BezierAnimation(b) => b.render(el, self),
            ElementBody::Point(_)
            | ElementBody::Resources(_)
            | ElementBody::FontFamily(_)
            | ElementBody::RemoteResource(_)
            | ElementBody::Script(_) => Ok(()),
        };
        out.map_err(|e| {
            if e.kind() == ErrorKind::Cancelled {
                e
            } else {
                e.with_element(&el.node)
            }
        })
    }

    pub fn render_children(&mut self, el: &BoundElement) -> RenderResult<()> {
        for child in el.children.iter() {
            self.render(child)?;
        }
        Ok(())
    }

    /// Run `f` with `scope` pushed; the stack depth is restored however `f` exits.
    pub fn with_scope<T>(
        &mut self,
        scope: ScopeFrame,
        f: impl FnOnce(&mut Self) -> RenderResult<T>,
    ) -> RenderResult<T> {
        let depth = self.scope.depth();
        self.scope.push(scope);
        let out = f(self);
        self.scope.truncate(depth);
        out
    }

    /// Resolve a positional element's box and run `f` inside it.
    pub fn positioned(
        &mut self,
        el: &BoundElement,
        positional: &Positional,
        f: impl FnOnce(&mut Self, &LayoutBox) -> RenderResult<()>,
    ) -> RenderResult<()> {
        let resolved = positional.resolve(self.scope.layout(), &self.scope)?;
        let layout = resolved.layout;
        let scope = ScopeFrame::new(Some(el.tag()), layout)
            .with_font(resolved.font_family, resolved.font_style);
        self.with_scope(scope, |frame| f(frame, &layout))
    }

    /// The font for text at the current position.
    ///
    /// The innermost `font-family` wins, then the template's, then the configured default.
    /// With no family named anywhere the first loaded font is used.
    pub fn font(&self) -> RenderResult<Arc<FontFace>> {
        let fonts = self.session.fonts();
        let named = self
            .scope
            .font_family()
            .or(self.session.metrics().font_family.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty());
        match named {
            Some(name) => fonts.get(name).cloned().ok_or_else(|| {
                RenderError::render(format!("font family '{name}' is not loaded"))
            }),
            None => fonts
                .first()
                .cloned()
                .ok_or_else(|| RenderError::render("no font families are loaded")),
        }
    }

    /// A decoded image by remote-resource key or by path.
    ///
    /// Paths are fetched through the session's resolver once per frame.
    pub fn image(&mut self, src: &str) -> RenderResult<RasterImage> {
        if let Some(img) = self.session.remote_image(src) {
            return Ok(img.clone());
        }
        if let Some(img) = self.images.get(src) {
            return Ok(img.clone());
        }
        let fetched = self.session.resolver().fetch(src)?;
        let img = RasterImage::decode(&fetched.bytes).map_err(|e| {
            RenderError::resource(format!("cannot decode image '{src}'")).with_source(e)
        })?;
        tracing::debug!(src, width = img.width(), height = img.height(), "decoded image");
        self.images.insert(src.to_owned(), img.clone());
        Ok(img)
    }
}

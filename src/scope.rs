//! Lexical variable and layout scopes.
//!
//! Frame 0 always holds the caller's global variables and frame 1 the per-frame constants (the
//! setup script's result is merged there). Every directive iteration and every positional
//! element pushes one more frame for the duration of its subtree.

use std::collections::BTreeMap;

use kurbo::{Rect, Size};
use smallvec::SmallVec;

use crate::elements::FontStyle;
use crate::expression::Environment;
use crate::units::SizeUnit;
use crate::value::{Value, Variables};

/// Which dimension of the current box a size resolves against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
    /// Percentages of the current font size.
    Font,
    /// The smaller of width and height.
    Min,
}

/// An element's box in canvas coordinates, plus the canvas size and inherited font size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutBox {
    pub rect: Rect,
    pub root: Size,
    pub font_size: f64,
}

impl LayoutBox {
    pub fn root(width: f64, height: f64, font_size: f64) -> Self {
        Self {
            rect: Rect::new(0.0, 0.0, width, height),
            root: Size::new(width, height),
            font_size,
        }
    }

    pub fn width(&self) -> f64 {
        self.rect.width()
    }

    pub fn height(&self) -> f64 {
        self.rect.height()
    }

    /// A nested box offset by (`x`, `y`) from this box's origin. Missing sizes take the
    /// remaining extent of this box.
    pub fn child(
        &self,
        x: f64,
        y: f64,
        width: Option<f64>,
        height: Option<f64>,
        font_size: Option<f64>,
    ) -> Self {
        let w = width.unwrap_or(self.width() - x).max(0.0);
        let h = height.unwrap_or(self.height() - y).max(0.0);
        let x0 = self.rect.x0 + x;
        let y0 = self.rect.y0 + y;
        Self {
            rect: Rect::new(x0, y0, x0 + w, y0 + h),
            root: self.root,
            font_size: font_size.unwrap_or(self.font_size),
        }
    }

    pub fn resolve(&self, unit: SizeUnit, axis: Axis) -> f64 {
        let reference = match axis {
            Axis::Horizontal => self.width(),
            Axis::Vertical => self.height(),
            Axis::Font => self.font_size,
            Axis::Min => self.width().min(self.height()),
        };
        unit.pixels(reference, self.font_size)
    }
}

#[derive(Debug, Clone)]
pub struct ScopeFrame {
    /// Tag of the element that introduced the frame, if any.
    pub owner: Option<String>,
    pub layout: LayoutBox,
    pub vars: Variables,
    /// Font settings inherited by descendants.
    pub font_family: Option<String>,
    pub font_style: Option<FontStyle>,
}

impl ScopeFrame {
    pub fn new(owner: Option<&str>, layout: LayoutBox) -> Self {
        Self {
            owner: owner.map(str::to_owned),
            layout,
            vars: BTreeMap::new(),
            font_family: None,
            font_style: None,
        }
    }

    pub fn with_font(mut self, family: Option<String>, style: Option<FontStyle>) -> Self {
        self.font_family = family;
        self.font_style = style;
        self
    }

    pub fn with_var(mut self, name: impl Into<String>, value: Value) -> Self {
        self.vars.insert(name.into(), value);
        self
    }

    pub fn with_vars(mut self, vars: Variables) -> Self {
        self.vars.extend(vars);
        self
    }
}

pub(crate) const GLOBALS: usize = 0;
pub(crate) const CONSTANTS: usize = 1;

/// The stack of scope frames visible to one render pass.
#[derive(Debug, Clone)]
pub struct ScopeStack {
    frames: SmallVec<[ScopeFrame; 8]>,
}

impl ScopeStack {
    /// A stack holding the globals frame and the frame constants frame.
    pub fn new(layout: LayoutBox, globals: Variables, constants: Variables) -> Self {
        let mut frames = SmallVec::new();
        frames.push(ScopeFrame::new(None, layout).with_vars(globals));
        frames.push(ScopeFrame::new(None, layout).with_vars(constants));
        Self { frames }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn push(&mut self, frame: ScopeFrame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<ScopeFrame> {
        // The two base frames are never popped.
        if self.frames.len() <= 2 {
            return None;
        }
        self.frames.pop()
    }

    /// Run `f` with `frame` pushed. The stack is restored to its prior depth on every exit.
    pub fn scoped<T>(&mut self, frame: ScopeFrame, f: impl FnOnce(&mut Self) -> T) -> T {
        let depth = self.frames.len();
        self.frames.push(frame);
        let out = f(self);
        self.frames.truncate(depth.max(2));
        out
    }

    /// Innermost binding of `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.frames.iter().rev().find_map(|f| f.vars.get(name))
    }

    pub fn layout(&self) -> &LayoutBox {
        // Never empty: the constructor pushes the two base frames.
        &self.frames[self.frames.len() - 1].layout
    }

    pub fn root_layout(&self) -> &LayoutBox {
        &self.frames[GLOBALS].layout
    }

    /// Restore the stack to `depth`, never dropping the base frames.
    pub fn truncate(&mut self, depth: usize) {
        self.frames.truncate(depth.max(2));
    }

    /// Innermost font family set by an enclosing element.
    pub fn font_family(&self) -> Option<&str> {
        self.frames.iter().rev().find_map(|f| f.font_family.as_deref())
    }

    pub fn font_style(&self) -> FontStyle {
        self.frames
            .iter()
            .rev()
            .find_map(|f| f.font_style)
            .unwrap_or_default()
    }

    /// Merge `vars` into the frame constants frame, overwriting existing names.
    pub fn publish(&mut self, vars: Variables) {
        self.frames[CONSTANTS].vars.extend(vars);
    }

    /// The globals frame merged with the constants frame. This is what scripts receive as `args`.
    pub fn published(&self) -> Variables {
        let mut out = self.frames[GLOBALS].vars.clone();
        out.extend(
            self.frames[CONSTANTS]
                .vars
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        out
    }

    /// Every visible name with its innermost value.
    pub fn visible(&self) -> Variables {
        let mut out = Variables::new();
        for f in &self.frames {
            out.extend(f.vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        out
    }

    pub fn owners(&self) -> impl Iterator<Item = &str> {
        self.frames.iter().rev().filter_map(|f| f.owner.as_deref())
    }
}

impl Environment for ScopeStack {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack() -> ScopeStack {
        let mut globals = Variables::new();
        globals.insert("name".to_owned(), Value::from("global"));
        globals.insert("only_global".to_owned(), Value::Number(1.0));
        let mut constants = Variables::new();
        constants.insert("frame".to_owned(), Value::Number(1.0));
        ScopeStack::new(LayoutBox::root(200.0, 100.0, 16.0), globals, constants)
    }

    #[test]
    fn lookup_shadows_innermost_first() {
        let mut s = stack();
        s.scoped(
            ScopeFrame::new(Some("for-each"), *s.layout()).with_var("name", "inner".into()),
            |s| {
                assert_eq!(s.get("name"), Some(&Value::from("inner")));
                assert_eq!(s.get("only_global"), Some(&Value::Number(1.0)));
                assert_eq!(s.owners().collect::<Vec<_>>(), vec!["for-each"]);
            },
        );
        assert_eq!(s.get("name"), Some(&Value::from("global")));
        assert_eq!(s.lookup("missing"), None);
    }

    #[test]
    fn scoped_restores_depth_after_failure() {
        let mut s = stack();
        let r: Result<(), &str> = s.scoped(ScopeFrame::new(None, *s.layout()), |s| {
            s.push(ScopeFrame::new(None, *s.layout()));
            Err("boom")
        });
        assert!(r.is_err());
        assert_eq!(s.depth(), 2);
        assert!(s.pop().is_none());
    }

    #[test]
    fn publish_merges_into_constants() {
        let mut s = stack();
        let mut vars = Variables::new();
        vars.insert("name".to_owned(), Value::from("setup"));
        s.publish(vars);
        assert_eq!(s.get("name"), Some(&Value::from("setup")));
        assert_eq!(s.published().get("frame"), Some(&Value::Number(1.0)));
    }

    #[test]
    fn child_boxes_and_units() {
        let root = LayoutBox::root(200.0, 100.0, 16.0);
        let child = root.child(20.0, 10.0, None, Some(50.0), Some(8.0));
        assert_eq!(child.rect, Rect::new(20.0, 10.0, 200.0, 60.0));
        let inner = child.child(10.0, 0.0, Some(40.0), None, None);
        assert_eq!(inner.rect.x0, 30.0);
        assert_eq!(inner.font_size, 8.0);
        assert_eq!(child.resolve(SizeUnit::Percent(50.0), Axis::Horizontal), 90.0);
        assert_eq!(child.resolve(SizeUnit::Percent(50.0), Axis::Vertical), 25.0);
        assert_eq!(child.resolve(SizeUnit::Em(2.0), Axis::Horizontal), 16.0);
        assert_eq!(root.child(250.0, 0.0, None, None, None).width(), 0.0);
    }
}

use std::collections::HashMap;

use crate::color::Color;
use crate::error::{RenderError, RenderResult};
use crate::resources::FontFace;

/// A laid out glyph in canvas-independent layout coordinates.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PlacedGlyph {
    pub(crate) id: u32,
    pub(crate) x: f32,
    pub(crate) y: f32,
}

#[derive(Debug)]
pub(crate) struct PlacedLine {
    /// Horizontal space taken by the line, without trailing whitespace handling.
    pub(crate) advance: f32,
    pub(crate) baseline: f32,
    pub(crate) glyphs: Vec<PlacedGlyph>,
    pub(crate) font_size: f32,
}

#[derive(Debug)]
pub(crate) struct PlacedText {
    pub(crate) lines: Vec<PlacedLine>,
    pub(crate) height: f32,
}

/// Parley contexts plus the families registered from font faces so far.
pub(crate) struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<Color>,
    families: HashMap<String, String>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    pub(crate) fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            families: HashMap::new(),
        }
    }

    fn family_for(&mut self, face: &FontFace) -> RenderResult<String> {
        if let Some(name) = self.families.get(face.digest()) {
            return Ok(name.clone());
        }

        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(face.bytes().to_vec()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            RenderError::resource(format!("font '{}' contains no font families", face.name()))
        })?;
        let family_name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| RenderError::resource("registered font family has no name"))?
            .to_string();

        self.families
            .insert(face.digest().to_owned(), family_name.clone());
        Ok(family_name)
    }

    /// Shape `text` and break it at `max_width` when given.
    pub(crate) fn layout(
        &mut self,
        text: &str,
        face: &FontFace,
        size_px: f32,
        color: Color,
        max_width: Option<f32>,
    ) -> RenderResult<PlacedText> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(RenderError::render(format!(
                "font size must be finite and > 0, got {size_px}"
            )));
        }
        let family_name = self.family_for(face)?;

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(color));

        let mut layout: parley::Layout<Color> = builder.build(text);
        layout.break_all_lines(max_width);
        layout.align(
            max_width,
            parley::Alignment::Start,
            parley::AlignmentOptions::default(),
        );

        let mut lines = Vec::new();
        for line in layout.lines() {
            let metrics = line.metrics();
            let mut placed = PlacedLine {
                advance: metrics.advance,
                baseline: metrics.baseline,
                glyphs: Vec::new(),
                font_size: size_px,
            };
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                placed.font_size = run.run().font_size();
                placed.glyphs.extend(run.glyphs().map(|g| PlacedGlyph {
                    id: g.id.into(),
                    x: g.x,
                    y: g.y,
                }));
            }
            lines.push(placed);
        }

        Ok(PlacedText {
            lines,
            height: layout.height(),
        })
    }
}

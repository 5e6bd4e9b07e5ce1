use image::RgbaImage;
use kurbo::{Point, Rect};
use vello_cpu::kurbo::Shape;

use super::raster::unpremul_rgba8;
use super::text::TextLayoutEngine;
use super::{ImageFit, RasterImage, Surface, TextRun};
use crate::color::Color;
use crate::elements::FontStyle;
use crate::error::{RenderError, RenderResult};

/// Horizontal shear applied to synthesized italics.
const ITALIC_SKEW: f64 = -0.2;

/// A `vello_cpu` render context sized to the canvas.
pub struct CpuSurface {
    width: u16,
    height: u16,
    ctx: vello_cpu::RenderContext,
    text: TextLayoutEngine,
}

impl std::fmt::Debug for CpuSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuSurface")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl CpuSurface {
    pub fn new(width: u32, height: u32) -> RenderResult<Self> {
        let width_u16: u16 = width
            .try_into()
            .map_err(|_| RenderError::render("canvas width exceeds u16"))?;
        let height_u16: u16 = height
            .try_into()
            .map_err(|_| RenderError::render("canvas height exceeds u16"))?;
        if width_u16 == 0 || height_u16 == 0 {
            return Err(RenderError::render("canvas must be at least 1x1"));
        }
        Ok(Self {
            width: width_u16,
            height: height_u16,
            ctx: vello_cpu::RenderContext::new(width_u16, height_u16),
            text: TextLayoutEngine::new(),
        })
    }

    /// Start a new frame. Font registrations are kept.
    pub fn reset(&mut self) {
        self.ctx.reset();
    }

    fn set_color(&mut self, color: Color) {
        self.ctx
            .set_paint(vello_cpu::peniko::Color::from_rgba8(color.r, color.g, color.b, color.a));
    }
}

fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

fn rounded_path(rect: Rect, radius: f64) -> vello_cpu::kurbo::BezPath {
    let r = radius.min(rect.width() / 2.0).min(rect.height() / 2.0).max(0.0);
    let mut path = vello_cpu::kurbo::BezPath::new();
    path.extend(vello_cpu::kurbo::RoundedRect::from_rect(rect_to_cpu(rect), r).path_elements(0.1));
    path
}

impl Surface for CpuSurface {
    fn width(&self) -> u32 {
        u32::from(self.width)
    }

    fn height(&self) -> u32 {
        u32::from(self.height)
    }

    fn clear(&mut self, color: Color) {
        self.ctx.reset();
        if color.is_transparent() {
            return;
        }
        self.ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.set_color(color);
        self.ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(self.width),
            f64::from(self.height),
        ));
    }

    fn fill_rect(&mut self, rect: Rect, radius: f64, color: Color) {
        if color.is_transparent() || rect.width() <= 0.0 || rect.height() <= 0.0 {
            return;
        }
        self.ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.set_color(color);
        if radius > 0.0 {
            self.ctx.fill_path(&rounded_path(rect, radius));
        } else {
            self.ctx.fill_rect(&rect_to_cpu(rect));
        }
    }

    fn stroke_rect(&mut self, rect: Rect, radius: f64, width: f64, color: Color) {
        if color.is_transparent() || width <= 0.0 {
            return;
        }
        // Keep the stroke inside the box.
        let inset = rect.inset(-width / 2.0);
        if inset.width() <= 0.0 || inset.height() <= 0.0 {
            return;
        }
        self.ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.set_color(color);
        self.ctx.set_stroke(vello_cpu::kurbo::Stroke::new(width));
        self.ctx
            .stroke_path(&rounded_path(inset, (radius - width / 2.0).max(0.0)));
    }

    fn stroke_polyline(&mut self, points: &[Point], width: f64, color: Color) {
        let [first, rest @ ..] = points else {
            return;
        };
        if rest.is_empty() || color.is_transparent() || width <= 0.0 {
            return;
        }
        let mut path = vello_cpu::kurbo::BezPath::new();
        path.move_to((first.x, first.y));
        for p in rest {
            path.line_to((p.x, p.y));
        }
        self.ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.set_color(color);
        self.ctx.set_stroke(vello_cpu::kurbo::Stroke::new(width));
        self.ctx.stroke_path(&path);
    }

    fn draw_image(&mut self, image: &RasterImage, dest: Rect, fit: ImageFit) -> RenderResult<()> {
        let Some(p) = fit.place(f64::from(image.width()), f64::from(image.height()), dest) else {
            return Ok(());
        };
        let transform = vello_cpu::kurbo::Affine::translate((p.translate.0, p.translate.1))
            * vello_cpu::kurbo::Affine::scale_non_uniform(p.scale.0, p.scale.1);
        self.ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_transform(transform);
        self.ctx.set_paint(image.paint());
        self.ctx.fill_rect(&rect_to_cpu(p.source));
        Ok(())
    }

    fn draw_text(&mut self, run: &TextRun<'_>) -> RenderResult<()> {
        if run.text.is_empty() || run.color.is_transparent() {
            return Ok(());
        }
        let bounds = run.bounds;
        let max_width = (bounds.width() > 0.0).then_some(bounds.width() as f32);
        let placed = self
            .text
            .layout(run.text, run.font, run.size as f32, run.color, max_width)?;

        let font = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(run.font.bytes().to_vec()),
            0,
        );
        let dy = (bounds.height() - f64::from(placed.height)) * run.v_align.factor();
        self.set_color(run.color);

        for line in &placed.lines {
            let dx = (bounds.width() - f64::from(line.advance)) * run.h_align.factor();
            let origin = vello_cpu::kurbo::Affine::translate((bounds.x0 + dx, bounds.y0 + dy));
            let transform = match run.style {
                FontStyle::Normal => origin,
                FontStyle::Italic => {
                    let baseline = f64::from(line.baseline);
                    origin
                        * vello_cpu::kurbo::Affine::translate((0.0, baseline))
                        * vello_cpu::kurbo::Affine::skew(ITALIC_SKEW, 0.0)
                        * vello_cpu::kurbo::Affine::translate((0.0, -baseline))
                }
            };
            self.ctx.set_transform(transform);
            let glyphs = line.glyphs.iter().map(|g| vello_cpu::Glyph {
                id: g.id,
                x: g.x,
                y: g.y,
            });
            self.ctx
                .glyph_run(&font)
                .font_size(line.font_size)
                .fill_glyphs(glyphs);
        }
        Ok(())
    }

    fn snapshot(&mut self) -> RenderResult<RgbaImage> {
        let mut pixmap = vello_cpu::Pixmap::new(self.width, self.height);
        self.ctx.flush();
        self.ctx.render_to_pixmap(&mut pixmap);

        let data = pixmap.data_as_u8_slice();
        let mut out = Vec::with_capacity(data.len());
        for px in data.chunks_exact(4) {
            out.extend_from_slice(&unpremul_rgba8([px[0], px[1], px[2], px[3]]));
        }
        RgbaImage::from_raw(u32::from(self.width), u32::from(self.height), out)
            .ok_or_else(|| RenderError::render("pixmap size does not match canvas"))
    }
}

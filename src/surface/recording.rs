use image::RgbaImage;
use kurbo::{Point, Rect};

use super::{HAlign, ImageFit, RasterImage, Surface, TextRun, VAlign};
use crate::color::Color;
use crate::elements::FontStyle;
use crate::error::RenderResult;

/// One call made against a [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Clear(Color),
    FillRect {
        rect: Rect,
        radius: f64,
        color: Color,
    },
    StrokeRect {
        rect: Rect,
        radius: f64,
        width: f64,
        color: Color,
    },
    Polyline {
        points: Vec<Point>,
        width: f64,
        color: Color,
    },
    Image {
        size: (u32, u32),
        dest: Rect,
        fit: ImageFit,
    },
    Text {
        text: String,
        font: String,
        size: f64,
        color: Color,
        style: FontStyle,
        bounds: Rect,
        h_align: HAlign,
        v_align: VAlign,
    },
}

/// A surface that records draw calls instead of rasterizing.
///
/// `snapshot` returns a canvas filled with the color of the last clear.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    width: u32,
    height: u32,
    ops: Vec<DrawOp>,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
        }
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn take_ops(&mut self) -> Vec<DrawOp> {
        std::mem::take(&mut self.ops)
    }

    /// Recorded text, in draw order.
    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Surface for RecordingSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn clear(&mut self, color: Color) {
        self.ops.push(DrawOp::Clear(color));
    }

    fn fill_rect(&mut self, rect: Rect, radius: f64, color: Color) {
        self.ops.push(DrawOp::FillRect {
            rect,
            radius,
            color,
        });
    }

    fn stroke_rect(&mut self, rect: Rect, radius: f64, width: f64, color: Color) {
        self.ops.push(DrawOp::StrokeRect {
            rect,
            radius,
            width,
            color,
        });
    }

    fn stroke_polyline(&mut self, points: &[Point], width: f64, color: Color) {
        self.ops.push(DrawOp::Polyline {
            points: points.to_vec(),
            width,
            color,
        });
    }

    fn draw_image(&mut self, image: &RasterImage, dest: Rect, fit: ImageFit) -> RenderResult<()> {
        self.ops.push(DrawOp::Image {
            size: (image.width(), image.height()),
            dest,
            fit,
        });
        Ok(())
    }

    fn draw_text(&mut self, run: &TextRun<'_>) -> RenderResult<()> {
        self.ops.push(DrawOp::Text {
            text: run.text.to_owned(),
            font: run.font.name().to_owned(),
            size: run.size,
            color: run.color,
            style: run.style,
            bounds: run.bounds,
            h_align: run.h_align,
            v_align: run.v_align,
        });
        Ok(())
    }

    fn snapshot(&mut self) -> RenderResult<RgbaImage> {
        let fill = self
            .ops
            .iter()
            .rev()
            .find_map(|op| match op {
                DrawOp::Clear(c) => Some(*c),
                _ => None,
            })
            .unwrap_or(Color::TRANSPARENT);
        Ok(RgbaImage::from_pixel(
            self.width,
            self.height,
            image::Rgba([fill.r, fill.g, fill.b, fill.a]),
        ))
    }
}

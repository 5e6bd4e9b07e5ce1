//! Drawing targets for frames.
//!
//! [`CpuSurface`] rasterizes with `vello_cpu` and lays text out with `parley`. [`RecordingSurface`]
//! keeps a list of the calls made against it and is what the unit tests render into.

mod cpu;
mod raster;
mod recording;
mod text;

use image::RgbaImage;
use kurbo::{Point, Rect};

use crate::binder::cast::keyword_enum;
use crate::color::Color;
use crate::elements::FontStyle;
use crate::error::RenderResult;
use crate::resources::FontFace;

pub use cpu::CpuSurface;
pub use raster::RasterImage;
pub use recording::{DrawOp, RecordingSurface};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HAlign {
    #[default]
    Left,
    Center,
    Right,
}

keyword_enum!(HAlign, "horizontal alignment", {
    "left" => HAlign::Left,
    "start" => HAlign::Left,
    "center" => HAlign::Center,
    "middle" => HAlign::Center,
    "right" => HAlign::Right,
    "end" => HAlign::Right,
});

impl HAlign {
    pub(crate) fn factor(self) -> f64 {
        match self {
            Self::Left => 0.0,
            Self::Center => 0.5,
            Self::Right => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VAlign {
    #[default]
    Top,
    Middle,
    Bottom,
}

keyword_enum!(VAlign, "vertical alignment", {
    "top" => VAlign::Top,
    "start" => VAlign::Top,
    "middle" => VAlign::Middle,
    "center" => VAlign::Middle,
    "bottom" => VAlign::Bottom,
    "end" => VAlign::Bottom,
});

impl VAlign {
    pub(crate) fn factor(self) -> f64 {
        match self {
            Self::Top => 0.0,
            Self::Middle => 0.5,
            Self::Bottom => 1.0,
        }
    }
}

/// How an image is placed into its box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFit {
    /// Scaled to the box on both axes.
    #[default]
    Stretch,
    /// Scaled uniformly to fit inside the box, centered.
    Contain,
    /// Scaled uniformly to fill the box, centered and cropped.
    Cover,
    /// Natural size, centered and cropped.
    Center,
}

keyword_enum!(ImageFit, "image position", {
    "stretch" => ImageFit::Stretch,
    "fill" => ImageFit::Stretch,
    "contain" => ImageFit::Contain,
    "fit" => ImageFit::Contain,
    "cover" => ImageFit::Cover,
    "center" => ImageFit::Center,
    "none" => ImageFit::Center,
});

/// Where an image lands: `scale` then `translate` maps source pixels to canvas pixels, and
/// `source` is the part of the image that falls inside the destination box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub translate: (f64, f64),
    pub scale: (f64, f64),
    pub source: Rect,
}

impl ImageFit {
    pub fn place(self, image_w: f64, image_h: f64, dest: Rect) -> Option<Placement> {
        if image_w <= 0.0 || image_h <= 0.0 || dest.width() <= 0.0 || dest.height() <= 0.0 {
            return None;
        }
        let (sx, sy) = match self {
            Self::Stretch => (dest.width() / image_w, dest.height() / image_h),
            Self::Contain => {
                let s = (dest.width() / image_w).min(dest.height() / image_h);
                (s, s)
            }
            Self::Cover => {
                let s = (dest.width() / image_w).max(dest.height() / image_h);
                (s, s)
            }
            Self::Center => (1.0, 1.0),
        };
        let tx = dest.x0 + (dest.width() - image_w * sx) / 2.0;
        let ty = dest.y0 + (dest.height() - image_h * sy) / 2.0;

        let visible = Rect::new(
            (dest.x0 - tx) / sx,
            (dest.y0 - ty) / sy,
            (dest.x1 - tx) / sx,
            (dest.y1 - ty) / sy,
        )
        .intersect(Rect::new(0.0, 0.0, image_w, image_h));
        if visible.width() <= 0.0 || visible.height() <= 0.0 {
            return None;
        }
        Some(Placement {
            translate: (tx, ty),
            scale: (sx, sy),
            source: visible,
        })
    }
}

/// One block of text to lay out inside `bounds`.
#[derive(Debug, Clone, Copy)]
pub struct TextRun<'a> {
    pub text: &'a str,
    pub font: &'a FontFace,
    pub size: f64,
    pub color: Color,
    pub style: FontStyle,
    pub bounds: Rect,
    pub h_align: HAlign,
    pub v_align: VAlign,
}

/// A drawing target for one frame.
pub trait Surface {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Replace every pixel with `color`.
    fn clear(&mut self, color: Color);

    fn fill_rect(&mut self, rect: Rect, radius: f64, color: Color);

    fn stroke_rect(&mut self, rect: Rect, radius: f64, width: f64, color: Color);

    /// Stroke straight segments through `points`. Fewer than two points draw nothing.
    fn stroke_polyline(&mut self, points: &[Point], width: f64, color: Color);

    fn draw_image(&mut self, image: &RasterImage, dest: Rect, fit: ImageFit) -> RenderResult<()>;

    fn draw_text(&mut self, run: &TextRun<'_>) -> RenderResult<()>;

    /// The pixels drawn so far, as straight RGBA.
    fn snapshot(&mut self) -> RenderResult<RgbaImage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stretch_maps_whole_image() {
        let p = ImageFit::Stretch
            .place(100.0, 50.0, Rect::new(10.0, 10.0, 210.0, 60.0))
            .unwrap();
        assert_eq!(p.scale, (2.0, 1.0));
        assert_eq!(p.translate, (10.0, 10.0));
        assert_eq!(p.source, Rect::new(0.0, 0.0, 100.0, 50.0));
    }

    #[test]
    fn contain_letterboxes() {
        let p = ImageFit::Contain
            .place(100.0, 100.0, Rect::new(0.0, 0.0, 200.0, 100.0))
            .unwrap();
        assert_eq!(p.scale, (1.0, 1.0));
        assert_eq!(p.translate, (50.0, 0.0));
    }

    #[test]
    fn cover_crops_the_overflow() {
        let p = ImageFit::Cover
            .place(100.0, 100.0, Rect::new(0.0, 0.0, 200.0, 100.0))
            .unwrap();
        assert_eq!(p.scale, (2.0, 2.0));
        assert_eq!(p.translate, (0.0, -50.0));
        assert_eq!(p.source, Rect::new(0.0, 25.0, 100.0, 75.0));
    }

    #[test]
    fn empty_boxes_place_nothing() {
        assert!(ImageFit::Center.place(10.0, 10.0, Rect::ZERO).is_none());
        assert!(ImageFit::Center.place(0.0, 10.0, Rect::new(0.0, 0.0, 5.0, 5.0)).is_none());
    }

    #[test]
    fn alignment_keywords() {
        use crate::binder::cast::cast;
        use crate::value::Value;
        assert_eq!(cast::<HAlign>(&Value::from("Center")).unwrap(), HAlign::Center);
        assert_eq!(cast::<VAlign>(&Value::from("bottom")).unwrap(), VAlign::Bottom);
        assert!(cast::<ImageFit>(&Value::from("tile")).is_err());
    }
}

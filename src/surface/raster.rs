use std::sync::Arc;

use image::RgbaImage;

use crate::error::{RenderError, RenderResult};

/// A decoded image, held premultiplied and ready to paint.
#[derive(Clone)]
pub struct RasterImage {
    width: u32,
    height: u32,
    pixmap: Arc<vello_cpu::Pixmap>,
}

impl std::fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl RasterImage {
    /// Decode PNG, JPEG, GIF (first frame), WebP or BMP bytes.
    pub fn decode(bytes: &[u8]) -> RenderResult<Self> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| RenderError::resource("cannot decode image").with_source(e))?;
        Self::from_rgba(&img.to_rgba8())
    }

    pub fn from_rgba(img: &RgbaImage) -> RenderResult<Self> {
        let (width, height) = img.dimensions();
        let w: u16 = width
            .try_into()
            .map_err(|_| RenderError::resource("image width exceeds u16"))?;
        let h: u16 = height
            .try_into()
            .map_err(|_| RenderError::resource("image height exceeds u16"))?;

        let mut may_have_opacities = false;
        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for px in img.pixels() {
            let [r, g, b, a] = px.0;
            may_have_opacities |= a != 255;
            let [r, g, b, a] = premul_rgba8(r, g, b, a);
            pixels.push(vello_cpu::peniko::color::PremulRgba8 { r, g, b, a });
        }

        Ok(Self {
            width,
            height,
            pixmap: Arc::new(vello_cpu::Pixmap::from_parts_with_opacity(
                pixels,
                w,
                h,
                may_have_opacities,
            )),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub(crate) fn paint(&self) -> vello_cpu::Image {
        vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::clone(&self.pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        }
    }
}

pub(crate) fn premul_rgba8(r: u8, g: u8, b: u8, a: u8) -> [u8; 4] {
    let af = (a as u16) + 1;
    let premul = |c: u8| -> u8 { (((c as u16) * af) >> 8) as u8 };
    [premul(r), premul(g), premul(b), a]
}

pub(crate) fn unpremul_rgba8(px: [u8; 4]) -> [u8; 4] {
    let a = px[3];
    if a == 0 {
        return [0, 0, 0, 0];
    }
    if a == 255 {
        return px;
    }
    let un = |c: u8| -> u8 { ((c as u32 * 255 + a as u32 / 2) / a as u32).min(255) as u8 };
    [un(px[0]), un(px[1]), un(px[2]), a]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_pixels_survive_premultiplication() {
        assert_eq!(premul_rgba8(10, 20, 30, 255), [10, 20, 30, 255]);
        assert_eq!(unpremul_rgba8([10, 20, 30, 255]), [10, 20, 30, 255]);
        assert_eq!(unpremul_rgba8([5, 5, 5, 0]), [0, 0, 0, 0]);
    }

    #[test]
    fn half_alpha_round_trips_closely() {
        let p = premul_rgba8(200, 100, 0, 128);
        let back = unpremul_rgba8(p);
        assert!((back[0] as i32 - 200).abs() <= 2);
        assert!((back[1] as i32 - 100).abs() <= 2);
        assert_eq!(back[3], 128);
    }

    #[test]
    fn decodes_png_bytes() {
        let img = RgbaImage::from_pixel(3, 2, image::Rgba([1, 2, 3, 255]));
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        let r = RasterImage::decode(buf.get_ref()).unwrap();
        assert_eq!((r.width(), r.height()), (3, 2));
        assert!(RasterImage::decode(b"not an image").is_err());
    }
}

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, ImageFormat, RgbaImage};

use crate::error::{RenderError, RenderResult};

/// The result of a render.
#[derive(Debug, Clone)]
pub enum Rendered {
    Still(RgbaImage),
    Animated {
        /// Frames in ordinal order.
        frames: Vec<RgbaImage>,
        delay_ms: u32,
        /// GIF repeat count; `0` loops forever.
        repeat: u16,
        /// Set when the render was cancelled; `frames` then holds the completed prefix.
        cancelled: bool,
    },
}

impl Rendered {
    pub fn is_animated(&self) -> bool {
        matches!(self, Self::Animated { .. })
    }

    pub fn frame_count(&self) -> usize {
        match self {
            Self::Still(_) => 1,
            Self::Animated { frames, .. } => frames.len(),
        }
    }

    /// The still image, or the first animation frame.
    pub fn first_frame(&self) -> Option<&RgbaImage> {
        match self {
            Self::Still(img) => Some(img),
            Self::Animated { frames, .. } => frames.first(),
        }
    }

    /// Encode as an animated GIF. A still becomes a one-frame GIF.
    pub fn encode_gif<W: Write>(&self, out: W) -> RenderResult<()> {
        let (frames, delay_ms, repeat): (&[RgbaImage], u32, u16) = match self {
            Self::Still(img) => (std::slice::from_ref(img), 0, 0),
            Self::Animated {
                frames,
                delay_ms,
                repeat,
                ..
            } => (frames, *delay_ms, *repeat),
        };
        if frames.is_empty() {
            return Err(RenderError::render("animation has no frames to encode"));
        }

        let mut encoder = GifEncoder::new(out);
        encoder.set_repeat(match repeat {
            0 => Repeat::Infinite,
            n => Repeat::Finite(n),
        })?;
        let delay = Delay::from_numer_denom_ms(delay_ms, 1);
        for img in frames {
            encoder.encode_frame(Frame::from_parts(img.clone(), 0, 0, delay))?;
        }
        Ok(())
    }

    /// Write to `path`: GIF for a `.gif` extension, PNG otherwise. Animations require `.gif`.
    pub fn write_to(&self, path: impl AsRef<Path>) -> RenderResult<()> {
        let path = path.as_ref();
        let gif = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("gif"));
        if gif {
            let file = File::create(path).map_err(|e| {
                RenderError::resource(format!("cannot create '{}'", path.display())).with_source(e)
            })?;
            let mut out = BufWriter::new(file);
            self.encode_gif(&mut out)?;
            out.flush()?;
            return Ok(());
        }
        match self {
            Self::Still(img) => {
                img.save_with_format(path, ImageFormat::Png)?;
                Ok(())
            }
            Self::Animated { .. } => Err(RenderError::render(format!(
                "animated output must be written as .gif, not '{}'",
                path.display()
            ))),
        }
    }
}

/// Persists frames as `{ordinal}.png` under one directory.
#[derive(Debug, Clone)]
pub struct FrameStore {
    dir: PathBuf,
}

impl FrameStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, ordinal: u32) -> PathBuf {
        self.dir.join(format!("{ordinal}.png"))
    }

    pub fn save(&self, ordinal: u32, img: &RgbaImage) -> RenderResult<PathBuf> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            RenderError::resource(format!("cannot create '{}'", self.dir.display())).with_source(e)
        })?;
        let path = self.path_for(ordinal);
        img.save_with_format(&path, ImageFormat::Png)?;
        tracing::trace!(frame = ordinal, path = %path.display(), "frame saved");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(v: u8) -> RgbaImage {
        RgbaImage::from_pixel(4, 3, image::Rgba([v, v, v, 255]))
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("framewright_{name}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn gif_keeps_every_frame() {
        let anim = Rendered::Animated {
            frames: vec![solid(0), solid(128), solid(255)],
            delay_ms: 100,
            repeat: 0,
            cancelled: false,
        };
        let mut bytes = Vec::new();
        anim.encode_gif(&mut bytes).unwrap();

        use image::AnimationDecoder as _;
        let decoder = image::codecs::gif::GifDecoder::new(std::io::Cursor::new(bytes)).unwrap();
        let frames = decoder.into_frames().collect_frames().unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[1].delay().numer_denom_ms(), (100, 1));
        assert_eq!(frames[2].buffer().get_pixel(0, 0).0[0], 255);
    }

    #[test]
    fn animations_refuse_png() {
        let anim = Rendered::Animated {
            frames: vec![solid(0)],
            delay_ms: 10,
            repeat: 1,
            cancelled: false,
        };
        let dir = temp_dir("refuse_png");
        assert!(anim.write_to(dir.join("out.png")).is_err());
    }

    #[test]
    fn store_names_frames_by_ordinal() {
        let dir = temp_dir("frame_store");
        let store = FrameStore::new(&dir);
        let path = store.save(7, &solid(9)).unwrap();
        assert_eq!(path, dir.join("7.png"));
        let back = image::open(&path).unwrap().to_rgba8();
        assert_eq!(back.get_pixel(0, 0).0, [9, 9, 9, 255]);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}

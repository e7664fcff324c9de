//! Image orientation collaborator.
//!
//! The device's camera is mounted sideways, so every completed photo is
//! rotated by a fixed angle before it is shown or forwarded.  Decoding and
//! re-encoding is CPU-bound; callers go through [`spawn_orient`] or
//! [`orient_blocking`] so the work runs on tokio's blocking pool.

use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, ImageFormat, ImageOutputFormat};
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::config::{PhotoConfig, Rotation};

#[derive(Debug, Clone, Error)]
pub enum OrientError {
    #[error("could not decode photo: {0}")]
    Decode(String),

    #[error("could not re-encode photo: {0}")]
    Encode(String),

    #[error("unsupported photo format: {0}")]
    UnsupportedFormat(String),

    #[error("orientation task failed: {0}")]
    Join(String),
}

/// Turns a completed photo into its display orientation.
pub trait ImageOrienter: Send + Sync {
    fn orient(&self, photo: &[u8]) -> Result<Vec<u8>, OrientError>;
}

/// Start `orienter` on the blocking pool without waiting for it.
pub fn spawn_orient(
    orienter: Arc<dyn ImageOrienter>,
    photo: Vec<u8>,
) -> JoinHandle<Result<Vec<u8>, OrientError>> {
    tokio::task::spawn_blocking(move || orienter.orient(&photo))
}

/// Run `orienter` on the blocking pool and wait for the result.
pub async fn orient_blocking(
    orienter: Arc<dyn ImageOrienter>,
    photo: Vec<u8>,
) -> Result<Vec<u8>, OrientError> {
    spawn_orient(orienter, photo)
        .await
        .map_err(|e| OrientError::Join(e.to_string()))?
}

// ---------------------------------------------------------------------------
// RotatingOrienter
// ---------------------------------------------------------------------------

/// Rotates clockwise by a fixed [`Rotation`], keeping the input's format.
///
/// JPEG input is re-encoded at `jpeg_quality`; PNG stays lossless.
#[derive(Debug, Clone, Copy)]
pub struct RotatingOrienter {
    rotation: Rotation,
    jpeg_quality: u8,
}

impl RotatingOrienter {
    pub fn new(rotation: Rotation, jpeg_quality: u8) -> Self {
        Self {
            rotation,
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    pub fn from_config(config: &PhotoConfig) -> Self {
        Self::new(config.rotation, config.jpeg_quality)
    }

    fn rotate(&self, img: DynamicImage) -> DynamicImage {
        match self.rotation {
            Rotation::None => img,
            Rotation::Rotate90 => img.rotate90(),
            Rotation::Rotate180 => img.rotate180(),
            Rotation::Rotate270 => img.rotate270(),
        }
    }
}

impl ImageOrienter for RotatingOrienter {
    fn orient(&self, photo: &[u8]) -> Result<Vec<u8>, OrientError> {
        if self.rotation == Rotation::None {
            return Ok(photo.to_vec());
        }

        let format =
            image::guess_format(photo).map_err(|e| OrientError::Decode(e.to_string()))?;
        let output = match format {
            ImageFormat::Jpeg => ImageOutputFormat::Jpeg(self.jpeg_quality),
            ImageFormat::Png => ImageOutputFormat::Png,
            other => return Err(OrientError::UnsupportedFormat(format!("{other:?}"))),
        };

        let img = image::load_from_memory_with_format(photo, format)
            .map_err(|e| OrientError::Decode(e.to_string()))?;
        let rotated = self.rotate(img);

        let mut out = Cursor::new(Vec::with_capacity(photo.len()));
        rotated
            .write_to(&mut out, output)
            .map_err(|e| OrientError::Encode(e.to_string()))?;
        Ok(out.into_inner())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};

    fn encode(width: u32, height: u32, format: ImageOutputFormat) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 0]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img).write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    #[test]
    fn quarter_turn_swaps_dimensions_png() {
        let png = encode(4, 2, ImageOutputFormat::Png);
        let out = RotatingOrienter::new(Rotation::Rotate270, 90).orient(&png).unwrap();

        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Png);
        let img = image::load_from_memory(&out).unwrap();
        assert_eq!(img.dimensions(), (2, 4));
    }

    #[test]
    fn rotate270_moves_top_left_to_bottom_left() {
        let png = encode(4, 2, ImageOutputFormat::Png);
        let out = RotatingOrienter::new(Rotation::Rotate270, 90).orient(&png).unwrap();
        let img = image::load_from_memory(&out).unwrap().to_rgb8();
        // 270° clockwise: the source top row becomes the left column,
        // read bottom-up.
        assert_eq!(img.get_pixel(0, 3), &Rgb([0, 0, 0]));
        assert_eq!(img.get_pixel(0, 0), &Rgb([3, 0, 0]));
    }

    #[test]
    fn half_turn_keeps_dimensions() {
        let png = encode(4, 2, ImageOutputFormat::Png);
        let out = RotatingOrienter::new(Rotation::Rotate180, 90).orient(&png).unwrap();
        assert_eq!(image::load_from_memory(&out).unwrap().dimensions(), (4, 2));
    }

    #[test]
    fn jpeg_stays_jpeg() {
        let jpeg = encode(16, 8, ImageOutputFormat::Jpeg(90));
        let out = RotatingOrienter::new(Rotation::Rotate90, 80).orient(&jpeg).unwrap();
        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Jpeg);
        assert_eq!(image::load_from_memory(&out).unwrap().dimensions(), (8, 16));
    }

    #[test]
    fn no_rotation_is_passthrough() {
        let bytes = b"not even an image".to_vec();
        let out = RotatingOrienter::new(Rotation::None, 90).orient(&bytes).unwrap();
        assert_eq!(out, bytes);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = RotatingOrienter::new(Rotation::Rotate270, 90)
            .orient(b"garbage")
            .unwrap_err();
        assert!(matches!(err, OrientError::Decode(_)));
    }

    #[test]
    fn truncated_jpeg_is_a_decode_error() {
        let jpeg = encode(16, 8, ImageOutputFormat::Jpeg(90));
        let err = RotatingOrienter::new(Rotation::Rotate270, 90)
            .orient(&jpeg[..20])
            .unwrap_err();
        assert!(matches!(err, OrientError::Decode(_)));
    }

    #[tokio::test]
    async fn orient_blocking_runs_on_pool() {
        let png = encode(3, 1, ImageOutputFormat::Png);
        let orienter: Arc<dyn ImageOrienter> =
            Arc::new(RotatingOrienter::new(Rotation::Rotate90, 90));
        let out = orient_blocking(orienter, png).await.unwrap();
        assert_eq!(image::load_from_memory(&out).unwrap().dimensions(), (1, 3));
    }

    struct PanickingOrienter;

    impl ImageOrienter for PanickingOrienter {
        fn orient(&self, _photo: &[u8]) -> Result<Vec<u8>, OrientError> {
            panic!("decoder crashed");
        }
    }

    #[tokio::test]
    async fn panicking_orienter_is_a_join_error() {
        let err = orient_blocking(Arc::new(PanickingOrienter), vec![1, 2, 3])
            .await
            .unwrap_err();
        assert!(matches!(err, OrientError::Join(_)));
    }
}

//! Source image preparation for edit providers.
//!
//! Providers take a PNG source and a PNG mask of the same size. The mask is
//! fully transparent, which lets the provider edit the whole image. Both are
//! built in memory and dropped when the call that needed them returns.
//!
//! Decoding and encoding are CPU-bound; async callers should go through
//! `spawn_blocking`.

use crate::errors::TransformError;
use image::{DynamicImage, GenericImageView, ImageOutputFormat, RgbaImage};
use std::io::Cursor;
use tracing::debug;

/// PNG-encoded source and mask for one edit call
#[derive(Debug)]
pub struct EditInputs {
    pub image_png: Vec<u8>,
    pub mask_png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Decode `source` (any supported format) and build the PNG source and mask
pub fn prepare_edit_inputs(source: &[u8]) -> Result<EditInputs, TransformError> {
    let img = image::load_from_memory(source)
        .map_err(|e| TransformError::InvalidImage(format!("Failed to decode image: {}", e)))?;

    let (width, height) = img.dimensions();
    debug!(width, height, "Preparing image for edit");

    let image_png = encode_png(DynamicImage::ImageRgba8(img.to_rgba8()))?;
    let mask_png = encode_png(DynamicImage::ImageRgba8(RgbaImage::new(width, height)))?;

    Ok(EditInputs {
        image_png,
        mask_png,
        width,
        height,
    })
}

fn encode_png(img: DynamicImage) -> Result<Vec<u8>, TransformError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
        .map_err(|e| TransformError::InvalidImage(format!("Failed to encode PNG: {}", e)))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};

    fn sample_jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Jpeg(90))
            .unwrap();
        buf
    }

    #[test]
    fn test_transcodes_to_png_with_matching_mask() {
        let inputs = prepare_edit_inputs(&sample_jpeg(8, 6)).unwrap();
        assert_eq!((inputs.width, inputs.height), (8, 6));

        assert_eq!(
            image::guess_format(&inputs.image_png).unwrap(),
            ImageFormat::Png
        );

        let mask = image::load_from_memory(&inputs.mask_png).unwrap().to_rgba8();
        assert_eq!(mask.dimensions(), (8, 6));
        assert!(mask.pixels().all(|p| *p == Rgba([0, 0, 0, 0])));
    }

    #[test]
    fn test_rejects_non_image_bytes() {
        let err = prepare_edit_inputs(b"definitely not an image").unwrap_err();
        assert!(matches!(err, TransformError::InvalidImage(_)));
    }
}

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use onnxruntime::ndarray::{Array, Array4};

use crate::AestheticError;

/// Input resolution of the CLIP ViT-B/32 image tower.
pub(crate) const CLIP_IMAGE_SIZE: u32 = 224;
const CLIP_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];
const CLIP_STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_11];

/// Decodes an uploaded byte buffer (JPEG/PNG/WebP).
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, AestheticError> {
    if bytes.is_empty() {
        return Err(AestheticError::Encoding("empty image payload".into()));
    }
    let image =
        image::load_from_memory(bytes).map_err(|e| AestheticError::Encoding(e.to_string()))?;
    ensure_non_empty(&image)?;
    Ok(image)
}

pub(crate) fn ensure_non_empty(image: &DynamicImage) -> Result<(), AestheticError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(AestheticError::Encoding(format!(
            "image has zero size ({width}x{height})"
        )));
    }
    Ok(())
}

/// Center crop to a square, resize to 224 (bicubic), normalize with the CLIP
/// statistics and lay out as NCHW `[1, 3, 224, 224]`.
///
/// Cropping first keeps the resize buffer at 224x224 whatever the aspect ratio.
pub(crate) fn clip_pixel_values(image: &DynamicImage) -> Result<Array4<f32>, AestheticError> {
    ensure_non_empty(image)?;
    let (width, height) = image.dimensions();
    let size = CLIP_IMAGE_SIZE;

    let side = width.min(height);
    let square = image.crop_imm((width - side) / 2, (height - side) / 2, side, side);
    let resized = square
        .resize_exact(size, size, FilterType::CatmullRom)
        .to_rgb8();

    let plane = (size * size) as usize;
    let mut data = vec![0f32; 3 * plane];

    for y in 0..size {
        for x in 0..size {
            let pixel = resized.get_pixel(x, y);
            let offset = (y * size + x) as usize;
            for c in 0..3 {
                let value = f32::from(pixel[c]) / 255.0;
                data[c * plane + offset] = (value - CLIP_MEAN[c]) / CLIP_STD[c];
            }
        }
    }

    Array::from_shape_vec((1, 3, size as usize, size as usize), data)
        .map_err(|e| AestheticError::Encoding(e.to_string()))
}

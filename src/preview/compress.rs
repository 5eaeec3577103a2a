use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};

use crate::pipeline::error::{PipelineError, Result};

/// Compress an RGBA frame to JPEG at the given quality (1-100).
///
/// JPEG has no alpha channel; transparent pixels come out black.
pub fn compress_jpeg(frame: &RgbaImage, quality: u8) -> Result<Vec<u8>> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err(PipelineError::Image("cannot encode an empty frame".to_string()));
    }
    let rgb = DynamicImage::ImageRgba8(frame.clone()).to_rgb8();

    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
    rgb.write_with_encoder(encoder)
        .map_err(|e| PipelineError::Image(e.to_string()))?;
    Ok(buf)
}

/// Compress and downscale a frame for preview thumbnails.
///
/// Uses `fast_image_resize` for SIMD-accelerated resizing, then encodes to JPEG.
pub fn compress_thumbnail(
    frame: &RgbaImage,
    thumb_width: u32,
    thumb_height: u32,
) -> Result<Vec<u8>> {
    use fast_image_resize as fr;
    use fr::images::Image;

    if thumb_width == 0 || thumb_height == 0 {
        return Err(PipelineError::Image(format!(
            "invalid thumbnail size {thumb_width}x{thumb_height}"
        )));
    }

    let src_image = Image::from_vec_u8(
        frame.width(),
        frame.height(),
        frame.as_raw().clone(),
        fr::PixelType::U8x4,
    )
    .map_err(|e| PipelineError::Image(e.to_string()))?;
    let mut dst_image = Image::new(thumb_width, thumb_height, fr::PixelType::U8x4);

    let mut resizer = fr::Resizer::new();
    resizer
        .resize(&src_image, &mut dst_image, None)
        .map_err(|e| PipelineError::Image(e.to_string()))?;

    let resized = RgbaImage::from_raw(thumb_width, thumb_height, dst_image.into_vec())
        .ok_or_else(|| PipelineError::Image("resized buffer has wrong length".to_string()))?;
    compress_jpeg(&resized, 70)
}

/// JPEG-encode a frame and wrap it in base64 for transport to a UI.
pub fn encode_base64_jpeg(frame: &RgbaImage, quality: u8) -> Result<String> {
    compress_jpeg(frame, quality).map(|jpeg| STANDARD.encode(jpeg))
}

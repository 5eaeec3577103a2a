//! Software drawing surface with canvas-style composite operations.
//!
//! Pixels are stored as premultiplied RGBA in `[0, 1]`. Blend modes are only
//! changed through `Surface::with_blend`, which restores the previous mode
//! when the returned scope is dropped.

use std::ops::{Deref, DerefMut};

use fast_image_resize::images::Image;
use fast_image_resize::{PixelType, Resizer};
use image::{GrayImage, Rgba, RgbaImage};

use crate::pipeline::error::{PipelineError, Result};

/// Composite operation applied when drawing onto a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    /// Draw over existing content.
    #[default]
    SourceOver,
    /// Keep the source only where the destination is opaque.
    SourceIn,
    /// Draw behind existing content.
    DestinationOver,
}

impl BlendMode {
    fn apply(self, src: [f32; 4], dst: [f32; 4]) -> [f32; 4] {
        let src_alpha = src[3];
        let dst_alpha = dst[3];
        std::array::from_fn(|i| match self {
            Self::SourceOver => src[i] + dst[i] * (1.0 - src_alpha),
            Self::SourceIn => src[i] * dst_alpha,
            Self::DestinationOver => src[i] * (1.0 - dst_alpha) + dst[i],
        })
    }
}

/// RGBA drawing target.
#[derive(Debug, Clone)]
pub struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<[f32; 4]>,
    blend: BlendMode,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0.0; 4]; pixel_count(width, height)],
            blend: BlendMode::SourceOver,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend
    }

    /// Reallocate to new dimensions. Contents are cleared.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels = vec![[0.0; 4]; pixel_count(width, height)];
    }

    /// Reset every pixel to transparent black.
    pub fn clear(&mut self) {
        self.pixels.fill([0.0; 4]);
    }

    /// Return to plain source-over drawing.
    pub fn reset_blend(&mut self) {
        self.blend = BlendMode::SourceOver;
    }

    /// Enter `mode` until the returned scope is dropped.
    pub fn with_blend(&mut self, mode: BlendMode) -> BlendScope<'_> {
        let previous = self.blend;
        self.blend = mode;
        BlendScope {
            surface: self,
            previous,
        }
    }

    /// Draw an RGBA image stretched to the full surface.
    pub fn draw_image(&mut self, image: &RgbaImage) -> Result<()> {
        let data = fit_to(
            image.as_raw(),
            image.width(),
            image.height(),
            PixelType::U8x4,
            self.width,
            self.height,
        )?;
        let mode = self.blend;
        for (dst, px) in self.pixels.iter_mut().zip(data.chunks_exact(4)) {
            let alpha = unit(px[3]);
            let src = [
                unit(px[0]) * alpha,
                unit(px[1]) * alpha,
                unit(px[2]) * alpha,
                alpha,
            ];
            *dst = mode.apply(src, *dst);
        }
        Ok(())
    }

    /// Draw a single-channel mask stretched to the full surface, as white
    /// with the mask value as alpha.
    pub fn draw_mask(&mut self, mask: &GrayImage) -> Result<()> {
        let data = fit_to(
            mask.as_raw(),
            mask.width(),
            mask.height(),
            PixelType::U8,
            self.width,
            self.height,
        )?;
        let mode = self.blend;
        for (dst, value) in self.pixels.iter_mut().zip(data.iter()) {
            let alpha = unit(*value);
            *dst = mode.apply([alpha; 4], *dst);
        }
        Ok(())
    }

    /// Straight-alpha pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let index = y as usize * self.width as usize + x as usize;
        self.pixels.get(index).map(|px| unpremultiply(*px))
    }

    /// Export the surface as a straight-alpha image.
    pub fn to_rgba_image(&self) -> RgbaImage {
        let mut out = RgbaImage::new(self.width, self.height);
        for (dst, px) in out.pixels_mut().zip(self.pixels.iter()) {
            *dst = unpremultiply(*px);
        }
        out
    }
}

/// A blend mode held for the lifetime of the scope.
pub struct BlendScope<'a> {
    surface: &'a mut Surface,
    previous: BlendMode,
}

impl Deref for BlendScope<'_> {
    type Target = Surface;

    fn deref(&self) -> &Surface {
        self.surface
    }
}

impl DerefMut for BlendScope<'_> {
    fn deref_mut(&mut self) -> &mut Surface {
        self.surface
    }
}

impl Drop for BlendScope<'_> {
    fn drop(&mut self) {
        self.surface.blend = self.previous;
    }
}

fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

fn unit(value: u8) -> f32 {
    f32::from(value) / 255.0
}

fn to_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn unpremultiply(px: [f32; 4]) -> Rgba<u8> {
    let alpha = px[3];
    if alpha <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }
    Rgba([
        to_byte(px[0] / alpha),
        to_byte(px[1] / alpha),
        to_byte(px[2] / alpha),
        to_byte(alpha),
    ])
}

/// Resample raw pixel data to `dst_width` x `dst_height`. Data that already
/// has the target size is passed through untouched.
fn fit_to(
    data: &[u8],
    width: u32,
    height: u32,
    pixel_type: PixelType,
    dst_width: u32,
    dst_height: u32,
) -> Result<Vec<u8>> {
    if width == dst_width && height == dst_height {
        return Ok(data.to_vec());
    }
    if width == 0 || height == 0 || dst_width == 0 || dst_height == 0 {
        return Err(PipelineError::Image(format!(
            "cannot resample {width}x{height} to {dst_width}x{dst_height}"
        )));
    }

    let src = Image::from_vec_u8(width, height, data.to_vec(), pixel_type)
        .map_err(|e| PipelineError::Image(e.to_string()))?;
    let mut dst = Image::new(dst_width, dst_height, pixel_type);
    let mut resizer = Resizer::new();
    resizer
        .resize(&src, &mut dst, None)
        .map_err(|e| PipelineError::Image(e.to_string()))?;
    Ok(dst.into_vec())
}

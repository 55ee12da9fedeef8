//! Owned pixel-array type in the caller's channel convention.
//!
//! Color images follow the BGR byte order common in computer-vision
//! tooling. Grayscale (1 channel) and BGRA (4 channels) inputs are also
//! accepted, matching the modes the upscaler understands.

use crate::error::{Error, Result};

/// Channel interpretation of an [`Image`], derived from its channel count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMode {
    Gray,
    Bgr,
    Bgra,
}

/// Interleaved 8-bit pixel array with explicit dimensions.
///
/// The buffer is row-major HWC; length is always `width * height * channels`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u32,
}

impl Image {
    /// Validate and wrap a pixel buffer.
    ///
    /// Fails with [`Error::InvalidImage`] on zero-sized dimensions, an
    /// unsupported channel count (anything but 1, 3, or 4), or a buffer
    /// whose length does not match `width * height * channels`.
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::invalid_image(format!(
                "zero-sized dimensions: {width}x{height}"
            )));
        }
        if !matches!(channels, 1 | 3 | 4) {
            return Err(Error::invalid_image(format!(
                "unsupported channel count {channels} (expected 1, 3, or 4)"
            )));
        }
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(Error::invalid_image(format!(
                "buffer length mismatch: expected {expected} ({width}x{height}x{channels}), got {}",
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
            channels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    pub fn mode(&self) -> ImageMode {
        match self.channels {
            1 => ImageMode::Gray,
            4 => ImageMode::Bgra,
            _ => ImageMode::Bgr,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Bilinear resize to `out_w` x `out_h`, preserving the channel count.
    pub fn resize_bilinear(&self, out_w: u32, out_h: u32) -> Result<Image> {
        if out_w == 0 || out_h == 0 {
            return Err(Error::invalid_image(format!(
                "zero-sized resize target: {out_w}x{out_h}"
            )));
        }

        let (iw, ih, c) = (
            self.width as usize,
            self.height as usize,
            self.channels as usize,
        );
        let (ow, oh) = (out_w as usize, out_h as usize);

        let sx = iw as f32 / ow as f32;
        let sy = ih as f32 / oh as f32;

        let mut out = vec![0u8; ow * oh * c];
        for oy in 0..oh {
            // Half-pixel-center mapping, clamped at the borders.
            let fy = ((oy as f32 + 0.5) * sy - 0.5).max(0.0);
            let y0 = (fy as usize).min(ih - 1);
            let y1 = (y0 + 1).min(ih - 1);
            let wy = fy - y0 as f32;

            for ox in 0..ow {
                let fx = ((ox as f32 + 0.5) * sx - 0.5).max(0.0);
                let x0 = (fx as usize).min(iw - 1);
                let x1 = (x0 + 1).min(iw - 1);
                let wx = fx - x0 as f32;

                let base00 = (y0 * iw + x0) * c;
                let base01 = (y0 * iw + x1) * c;
                let base10 = (y1 * iw + x0) * c;
                let base11 = (y1 * iw + x1) * c;
                let dst = (oy * ow + ox) * c;

                for ch in 0..c {
                    let top = self.data[base00 + ch] as f32 * (1.0 - wx)
                        + self.data[base01 + ch] as f32 * wx;
                    let bottom = self.data[base10 + ch] as f32 * (1.0 - wx)
                        + self.data[base11 + ch] as f32 * wx;
                    out[dst + ch] = (top * (1.0 - wy) + bottom * wy).round() as u8;
                }
            }
        }

        Image::new(out, out_w, out_h, self.channels)
    }
}

/// Swap the first and third channel of an interleaved 3-channel buffer.
/// BGR -> RGB and RGB -> BGR are the same operation.
pub(crate) fn swap_rb(data: &[u8]) -> Vec<u8> {
    let mut out = data.to_vec();
    for px in out.chunks_exact_mut(3) {
        px.swap(0, 2);
    }
    out
}

/// Replicate a single-channel buffer into interleaved RGB.
pub(crate) fn gray_to_rgb(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 3);
    for &v in data {
        out.extend_from_slice(&[v, v, v]);
    }
    out
}

/// Collapse interleaved RGB to grayscale with BT.601 luma weights.
pub(crate) fn rgb_to_gray(data: &[u8]) -> Vec<u8> {
    data.chunks_exact(3)
        .map(|px| {
            let luma = 0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32;
            luma.round().clamp(0.0, 255.0) as u8
        })
        .collect()
}

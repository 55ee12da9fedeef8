//! SeemoRe upscaler facade: resolves a model variant, loads its
//! checkpoint, and runs single-shot super-resolution on pixel arrays.
//!
//! The network expects NCHW float32 RGB in the 0-1 range and produces
//! the same layout at `scale` times the spatial resolution.

use ndarray::{s, Array4};
use ort::{session::Session, value::Tensor};
use tracing::{debug, info};

use crate::backend::{self, Device};
use crate::cache::CheckpointCache;
use crate::error::{Error, Result};
use crate::image::{self, Image, ImageMode};
use crate::registry::{self, ModelEntry, SizeClass};

/// Context rows/columns added around each tile before inference, to
/// suppress seam artifacts at tile borders.
const TILE_PAD: usize = 12;

/// Per-call knobs. The zero values of [`Default`] select full-frame
/// inference at the model's native scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpscaleOptions {
    /// Tile edge length in input pixels; 0 disables tiling. Tiling
    /// bounds peak memory for large inputs at the cost of extra passes.
    pub tile_size: u32,
    /// Desired overall scale factor; 0.0 means the model's native
    /// scale. Other values bilinearly resize the network output to
    /// `input_dim * target_scale`.
    pub target_scale: f32,
}

impl Default for UpscaleOptions {
    fn default() -> Self {
        Self {
            tile_size: 0,
            target_scale: 0.0,
        }
    }
}

/// Facade over one loaded SeemoRe variant on one compute device.
///
/// `upscale` takes `&mut self`: a loaded model is a single mutable
/// resource, and concurrent calls against it are unsupported. Callers
/// needing parallel throughput create independent instances.
#[derive(Debug)]
pub struct SeemoReUpscaler {
    session: Session,
    entry: ModelEntry,
    device: Device,
    input_name: String,
    output_name: String,
}

impl SeemoReUpscaler {
    /// Load `model_name` on `device`, using the default checkpoint cache
    /// location (see [`CheckpointCache::default_dir`]).
    pub fn new(model_name: &str, device: Device) -> Result<Self> {
        let cache = CheckpointCache::new(CheckpointCache::default_dir());
        Self::with_cache(model_name, device, &cache)
    }

    /// Load `model_name` on `device` with an injected cache location.
    ///
    /// The registry lookup happens first, so an unknown name fails
    /// before any filesystem or network access.
    pub fn with_cache(model_name: &str, device: Device, cache: &CheckpointCache) -> Result<Self> {
        let entry = registry::lookup(model_name)?;
        let checkpoint = cache.ensure(&entry)?;
        let session = backend::build_session(&checkpoint, device)?;

        let input_name = session.inputs()[0].name().to_string();
        let output_name = session.outputs()[0].name().to_string();

        info!(
            model = %entry.name,
            scale = entry.scale,
            size_class = %entry.size_class,
            device = %device,
            "Loaded SeemoRe model"
        );

        Ok(Self {
            session,
            entry,
            device,
            input_name,
            output_name,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.entry.name
    }

    /// Native upscale factor of the loaded variant.
    pub fn scale(&self) -> u32 {
        self.entry.scale
    }

    pub fn size_class(&self) -> SizeClass {
        self.entry.size_class
    }

    pub fn device(&self) -> Device {
        self.device
    }

    /// Upscale with default options: full-frame inference at the
    /// model's native scale.
    pub fn upscale(&mut self, input: &Image) -> Result<Image> {
        self.upscale_with(input, &UpscaleOptions::default())
    }

    /// Upscale `input` by the loaded model's scale factor.
    ///
    /// Accepts grayscale, BGR, and BGRA images; the output carries the
    /// input's channel order. For BGRA the alpha plane bypasses the
    /// network and is resized bilinearly.
    pub fn upscale_with(&mut self, input: &Image, opts: &UpscaleOptions) -> Result<Image> {
        let (w, h) = (input.width(), input.height());
        let scale = self.entry.scale as usize;
        let mode = input.mode();

        let (rgb, alpha_plane) = split_planes(input)?;
        let nchw = rgb_to_nchw(&rgb, w, h);

        debug!(
            model = %self.entry.name,
            width = w,
            height = h,
            tile_size = opts.tile_size,
            "Running forward pass"
        );

        let output = if opts.tile_size > 0 {
            run_tiled(
                &mut self.session,
                &nchw,
                opts.tile_size as usize,
                scale,
                &self.input_name,
                &self.output_name,
            )?
        } else {
            let out = run_single(&mut self.session, &nchw, &self.input_name, &self.output_name)?;
            let expected = [1, 3, h as usize * scale, w as usize * scale];
            if out.shape() != expected {
                return Err(Error::inference_msg(format!(
                    "model produced shape {:?}, expected {:?}",
                    out.shape(),
                    expected
                )));
            }
            out
        };

        let out_w = w * self.entry.scale;
        let out_h = h * self.entry.scale;
        let rgb_out = nchw_to_rgb(&output, out_h as usize, out_w as usize);

        let result = match mode {
            ImageMode::Gray => Image::new(image::rgb_to_gray(&rgb_out), out_w, out_h, 1)?,
            ImageMode::Bgr => Image::new(image::swap_rb(&rgb_out), out_w, out_h, 3)?,
            ImageMode::Bgra => {
                let alpha = alpha_plane.expect("BGRA input carries an alpha plane");
                let alpha_up = alpha.resize_bilinear(out_w, out_h)?;
                let bgr = image::swap_rb(&rgb_out);
                Image::new(interleave_alpha(&bgr, alpha_up.data()), out_w, out_h, 4)?
            }
        };

        if opts.target_scale > 0.0 && (opts.target_scale - self.entry.scale as f32).abs() > f32::EPSILON
        {
            let tw = ((w as f32) * opts.target_scale).round().max(1.0) as u32;
            let th = ((h as f32) * opts.target_scale).round().max(1.0) as u32;
            return result.resize_bilinear(tw, th);
        }

        Ok(result)
    }
}

/// Split an image into an interleaved RGB buffer plus, for BGRA input,
/// the detached alpha plane.
fn split_planes(input: &Image) -> Result<(Vec<u8>, Option<Image>)> {
    match input.mode() {
        ImageMode::Gray => Ok((image::gray_to_rgb(input.data()), None)),
        ImageMode::Bgr => Ok((image::swap_rb(input.data()), None)),
        ImageMode::Bgra => {
            let pixels = input.width() as usize * input.height() as usize;
            let mut bgr = Vec::with_capacity(pixels * 3);
            let mut alpha = Vec::with_capacity(pixels);
            for px in input.data().chunks_exact(4) {
                bgr.extend_from_slice(&px[..3]);
                alpha.push(px[3]);
            }
            let alpha = Image::new(alpha, input.width(), input.height(), 1)?;
            Ok((image::swap_rb(&bgr), Some(alpha)))
        }
    }
}

fn interleave_alpha(bgr: &[u8], alpha: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(alpha.len() * 4);
    for (px, &a) in bgr.chunks_exact(3).zip(alpha) {
        out.extend_from_slice(px);
        out.push(a);
    }
    out
}

/// Convert interleaved HWC RGB bytes to NCHW `[1,3,H,W]` float32 in the
/// 0-1 range the network expects.
fn rgb_to_nchw(data: &[u8], width: u32, height: u32) -> Array4<f32> {
    let h = height as usize;
    let w = width as usize;
    let hw = h * w;

    let mut nchw = Array4::<f32>::zeros((1, 3, h, w));
    let slice = nchw
        .as_slice_mut()
        .expect("freshly allocated array is C-contiguous");
    for i in 0..hw {
        let src = i * 3;
        slice[i] = data[src] as f32 / 255.0;
        slice[hw + i] = data[src + 1] as f32 / 255.0;
        slice[2 * hw + i] = data[src + 2] as f32 / 255.0;
    }
    nchw
}

/// Convert NCHW `[1,3,H,W]` float32 (0-1 range) back to interleaved RGB
/// bytes, clamping to the displayable range and rounding.
fn nchw_to_rgb(arr: &Array4<f32>, out_h: usize, out_w: usize) -> Vec<u8> {
    let owned_contig;
    let slice = if let Some(s) = arr.as_slice() {
        s
    } else {
        owned_contig = arr.as_standard_layout().into_owned();
        owned_contig
            .as_slice()
            .expect("standard-layout array is contiguous")
    };
    let hw = out_h * out_w;

    let mut rgb = vec![0u8; hw * 3];
    for i in 0..hw {
        rgb[i * 3] = (slice[i].clamp(0.0, 1.0) * 255.0).round() as u8;
        rgb[i * 3 + 1] = (slice[hw + i].clamp(0.0, 1.0) * 255.0).round() as u8;
        rgb[i * 3 + 2] = (slice[2 * hw + i].clamp(0.0, 1.0) * 255.0).round() as u8;
    }
    rgb
}

fn run_single(
    session: &mut Session,
    input: &Array4<f32>,
    input_name: &str,
    output_name: &str,
) -> Result<Array4<f32>> {
    let tensor = Tensor::from_array(input.clone()).map_err(Error::inference)?;
    let outputs = session
        .run(ort::inputs![input_name => &tensor])
        .map_err(Error::inference)?;
    let view = outputs[output_name]
        .try_extract_array::<f32>()
        .map_err(Error::inference)?;
    view.to_owned()
        .into_dimensionality::<ndarray::Ix4>()
        .map_err(|e| Error::inference_msg(format!("output is not a rank-4 tensor: {e}")))
}

/// Boundaries of one tile along one axis: `(start, end, padded_start,
/// padded_end)`, all clamped to `[0, limit]`.
fn tile_bounds(idx: usize, tile_size: usize, limit: usize) -> (usize, usize, usize, usize) {
    let start = idx * tile_size;
    let end = (start + tile_size).min(limit);
    let start_pad = start.saturating_sub(TILE_PAD);
    let end_pad = (end + TILE_PAD).min(limit);
    (start, end, start_pad, end_pad)
}

fn run_tiled(
    session: &mut Session,
    input: &Array4<f32>,
    tile_size: usize,
    scale: usize,
    input_name: &str,
    output_name: &str,
) -> Result<Array4<f32>> {
    let h = input.shape()[2];
    let w = input.shape()[3];
    let mut output = Array4::<f32>::zeros((1, 3, h * scale, w * scale));

    let tiles_y = h.div_ceil(tile_size);
    let tiles_x = w.div_ceil(tile_size);

    debug!(tile_size, tiles_y, tiles_x, "Starting tiled inference");

    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let (y0, y1, y0p, y1p) = tile_bounds(ty, tile_size, h);
            let (x0, x1, x0p, x1p) = tile_bounds(tx, tile_size, w);

            let tile = input
                .slice(s![.., .., y0p..y1p, x0p..x1p])
                .to_owned()
                .into_dimensionality::<ndarray::Ix4>()
                .map_err(|e| Error::inference_msg(format!("tile slice is not rank-4: {e}")))?;

            let tile_out = run_single(session, &tile, input_name, output_name)?;

            let expected = [1, 3, (y1p - y0p) * scale, (x1p - x0p) * scale];
            if tile_out.shape() != expected {
                return Err(Error::inference_msg(format!(
                    "tile output shape {:?} does not match expected {:?}",
                    tile_out.shape(),
                    expected
                )));
            }

            // Copy only the unpadded region into the stitched output.
            let cy0 = (y0 - y0p) * scale;
            let cx0 = (x0 - x0p) * scale;
            let th = (y1 - y0) * scale;
            let tw = (x1 - x0) * scale;

            output
                .slice_mut(s![.., .., y0 * scale..y1 * scale, x0 * scale..x1 * scale])
                .assign(&tile_out.slice(s![.., .., cy0..cy0 + th, cx0..cx0 + tw]));
        }
    }

    Ok(output)
}

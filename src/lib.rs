//! Packaging and convenience layer over the pretrained SeemoRe image
//! super-resolution model.
//!
//! [`SeemoReUpscaler`] resolves one of six pretrained variants by name,
//! downloads and caches its ONNX checkpoint, and runs inference on a
//! pixel array:
//!
//! ```no_run
//! use seemore::{Device, Image, SeemoReUpscaler};
//!
//! # fn main() -> seemore::Result<()> {
//! let mut upscaler = SeemoReUpscaler::new("seemore_b_x4", Device::Cpu)?;
//! let input = Image::new(vec![0u8; 640 * 480 * 3], 640, 480, 3)?;
//! let output = upscaler.upscale(&input)?;
//! assert_eq!(output.width(), 2560);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod cache;
pub mod error;
pub mod image;
pub mod registry;
pub mod upscaler;

pub use backend::Device;
pub use cache::CheckpointCache;
pub use error::{Error, Result};
pub use image::{Image, ImageMode};
pub use registry::{ModelCatalog, ModelEntry, SizeClass, MODEL_NAMES};
pub use upscaler::{SeemoReUpscaler, UpscaleOptions};

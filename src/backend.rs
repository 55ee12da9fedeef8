//! Compute device selection and `ort::Session` construction.
//!
//! Provides the [`Device`] enum and [`build_session`] helper that creates
//! an inference session with the matching execution provider.

use std::path::Path;

use ort::{
    execution_providers::{CUDAExecutionProvider, ExecutionProvider},
    session::{builder::GraphOptimizationLevel, Session},
};
use tracing::debug;

use crate::error::{Error, Result};

/// Compute target for inference.
///
/// Default is `Cpu`. `Cuda` requires the CUDA execution provider to be
/// available on the running machine; a missing provider fails with
/// [`Error::DeviceUnavailable`] instead of silently falling back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Device {
    #[default]
    Cpu,
    Cuda(i32),
}

impl Device {
    /// Parse a device string: `"cpu"`, `"cuda"`, or `"cuda:N"`
    /// (case-insensitive).
    pub fn parse(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" => Ok(Self::Cuda(0)),
            _ => {
                if let Some(id) = lower.strip_prefix("cuda:") {
                    let id: i32 = id
                        .parse()
                        .map_err(|_| Error::device(format!("bad CUDA device id in {s:?}")))?;
                    if id < 0 {
                        return Err(Error::device(format!("negative CUDA device id in {s:?}")));
                    }
                    return Ok(Self::Cuda(id));
                }
                Err(Error::device(format!(
                    "unsupported device {s:?} (expected \"cpu\", \"cuda\", or \"cuda:N\")"
                )))
            }
        }
    }
}

impl std::str::FromStr for Device {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda(id) => write!(f, "cuda:{id}"),
        }
    }
}

/// Build an `ort::Session` for the checkpoint at `model_path` on `device`.
///
/// For `Device::Cuda` the CUDA EP is registered with `error_on_failure`
/// after an upfront availability check. For `Device::Cpu` no EP is
/// registered. ONNX Runtime sessions carry no training state; the
/// returned session is inference-only.
pub fn build_session(model_path: &Path, device: Device) -> Result<Session> {
    let builder = Session::builder()
        .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
        .map_err(Error::inference)?;

    debug!(model = %model_path.display(), device = %device, "Building inference session");

    let builder = match device {
        Device::Cpu => builder,
        Device::Cuda(id) => {
            let cuda = CUDAExecutionProvider::default().with_device_id(id);
            if !cuda.is_available().unwrap_or(false) {
                return Err(Error::device(format!(
                    "CUDA execution provider is not available for device cuda:{id}"
                )));
            }
            builder
                .with_execution_providers([cuda.build().error_on_failure()])
                .map_err(Error::inference)?
        }
    };

    builder.commit_from_file(model_path).map_err(|e| {
        Error::checkpoint(
            model_path.display().to_string(),
            format!("cannot load ONNX checkpoint: {e}"),
        )
    })
}

//! Error types for the upscaler facade.

use thiserror::Error;

/// Result type alias for upscaler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Upscaler error taxonomy.
///
/// Every operation either fully succeeds or fails with one of these
/// variants; nothing is retried or degraded internally.
#[derive(Debug, Error)]
pub enum Error {
    /// Model name is not one of the recognized identifiers.
    /// Raised before any filesystem or network access.
    #[error("unknown model {name:?}, available models: {available}")]
    UnknownModel { name: String, available: String },

    /// Checkpoint artifact could not be fetched, verified, or read.
    #[error("checkpoint unavailable for {model}: {reason}")]
    CheckpointUnavailable { model: String, reason: String },

    /// Requested compute device does not exist on this machine.
    #[error("device unavailable: {reason}")]
    DeviceUnavailable { reason: String },

    /// Input pixel array is malformed (zero-sized, wrong length,
    /// unsupported channel count).
    #[error("invalid image: {reason}")]
    InvalidImage { reason: String },

    /// Forward pass failed at runtime.
    #[error("inference failed: {reason}")]
    Inference {
        reason: String,
        #[source]
        source: Option<ort::Error>,
    },
}

impl Error {
    pub(crate) fn checkpoint(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::CheckpointUnavailable {
            model: model.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn device(reason: impl Into<String>) -> Self {
        Error::DeviceUnavailable {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_image(reason: impl Into<String>) -> Self {
        Error::InvalidImage {
            reason: reason.into(),
        }
    }

    pub(crate) fn inference(source: ort::Error) -> Self {
        Error::Inference {
            reason: source.to_string(),
            source: Some(source),
        }
    }

    pub(crate) fn inference_msg(reason: impl Into<String>) -> Self {
        Error::Inference {
            reason: reason.into(),
            source: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_display() {
        let err = Error::checkpoint("seemore_b_x4", "HTTP 404");
        assert_eq!(
            err.to_string(),
            "checkpoint unavailable for seemore_b_x4: HTTP 404"
        );
    }

    #[test]
    fn test_invalid_image_display() {
        let err = Error::invalid_image("zero-sized input");
        assert_eq!(err.to_string(), "invalid image: zero-sized input");
    }

    #[test]
    fn test_device_display() {
        let err = Error::device("CUDA execution provider is not available");
        assert!(err.to_string().starts_with("device unavailable:"));
    }

    #[test]
    fn test_inference_msg_has_no_source() {
        let err = Error::inference_msg("output shape mismatch");
        assert!(std::error::Error::source(&err).is_none());
    }
}

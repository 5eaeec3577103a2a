use thiserror::Error;

use crate::pipeline::orchestrator::PipelineState;

/// Frame pipeline errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("face tracker initialisation failed with code {0}")]
    TrackerInit(i32),

    #[error("face tracker failed: {0}")]
    Tracker(String),

    #[error("segmentation failed: {0}")]
    Segmentation(String),

    #[error("capture device failed: {0}")]
    Capture(String),

    #[error("render loop failed: {0}")]
    Render(String),

    #[error("asset load failed for '{uri}': {reason}")]
    AssetLoad { uri: String, reason: String },

    #[error("image processing failed: {0}")]
    Image(String),

    #[error("invalid pipeline transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: PipelineState,
        to: PipelineState,
    },

    #[error("invalid settings: {0}")]
    Settings(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, PipelineError>;

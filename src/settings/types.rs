use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::collab::types::{SegmentationOptions, TrackerConfig};
use crate::pipeline::camera_sync::DEFAULT_MIN_VIDEO_DIM_FOV_DEG;
use crate::pipeline::error::{PipelineError, Result};

/// Options passed through to the segmentation collaborator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SegmentationSettings {
    /// 0 = general model, 1 = landscape model.
    pub model_selection: u8,
    pub mirror_output: bool,
}

impl Default for SegmentationSettings {
    fn default() -> Self {
        Self {
            model_selection: 1,
            mirror_output: true,
        }
    }
}

/// Pipeline configuration. Every field is optional in the JSON file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineSettings {
    pub max_faces_detected: usize,
    pub resize_debounce_ms: u64,
    pub follow_z_rotation: bool,
    /// Tracker neural network identifier.
    pub network: String,
    /// Model attached when the pipeline starts.
    pub default_model: String,
    pub show_debug_indicators: bool,
    pub segmentation: SegmentationSettings,
    pub camera_min_video_dim_fov_deg: f32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_faces_detected: 1,
            resize_debounce_ms: 200,
            follow_z_rotation: true,
            network: "NN_4EXPR".to_string(),
            default_model: "hat".to_string(),
            show_debug_indicators: true,
            segmentation: SegmentationSettings::default(),
            camera_min_video_dim_fov_deg: DEFAULT_MIN_VIDEO_DIM_FOV_DEG,
        }
    }
}

impl PipelineSettings {
    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    pub fn tracker_config(&self, target_surface: &str) -> TrackerConfig {
        TrackerConfig {
            target_surface: target_surface.to_string(),
            network: self.network.clone(),
            max_faces_detected: self.max_faces_detected,
            follow_z_rotation: self.follow_z_rotation,
        }
    }

    pub fn segmentation_options(&self) -> SegmentationOptions {
        SegmentationOptions {
            model_selection: self.segmentation.model_selection,
            mirror_output: self.segmentation.mirror_output,
        }
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_faces_detected == 0 {
            return Err(PipelineError::Settings(
                "max_faces_detected must be at least 1".to_string(),
            ));
        }
        if self.resize_debounce_ms == 0 {
            return Err(PipelineError::Settings(
                "resize_debounce_ms must be positive".to_string(),
            ));
        }
        let fov = self.camera_min_video_dim_fov_deg;
        if fov.is_nan() || fov <= 0.0 || fov >= 180.0 {
            return Err(PipelineError::Settings(format!(
                "camera_min_video_dim_fov_deg out of range: {fov}"
            )));
        }
        if self.network.is_empty() {
            return Err(PipelineError::Settings("network must not be empty".to_string()));
        }
        Ok(())
    }
}

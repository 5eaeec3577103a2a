use std::fmt;
use std::sync::Arc;

use glam::Vec3;
use image::{GrayImage, RgbaImage};

/// A camera frame shared between the capture device, segmenter and compositor.
pub type CameraFrame = Arc<RgbaImage>;

/// Per-pixel foreground confidence (0 = background, 255 = person).
pub type SegmentationMask = Arc<GrayImage>;

/// Configuration handed to the face tracker on `init`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Identifier of the surface the tracker draws the video into.
    pub target_surface: String,
    /// Neural network specification to load (e.g. `NN_4EXPR`).
    pub network: String,
    pub max_faces_detected: usize,
    pub follow_z_rotation: bool,
}

/// Calibration reported by the tracker once it is ready.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerSpec {
    /// Native width of the video the tracker processes.
    pub video_width: u32,
    /// Native height of the video the tracker processes.
    pub video_height: u32,
}

/// Options forwarded to the segmentation collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SegmentationOptions {
    pub model_selection: u8,
    pub mirror_output: bool,
}

/// Output of one segmentation pass: the frame it ran on and its mask.
#[derive(Debug, Clone)]
pub struct SegmentationResults {
    pub source: CameraFrame,
    pub mask: SegmentationMask,
}

/// Projection state of the 3D renderer's camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderCamera {
    /// Vertical field of view in degrees.
    pub fov_deg: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
}

impl Default for RenderCamera {
    fn default() -> Self {
        Self {
            fov_deg: 75.0,
            aspect: 1.0,
            near: 0.1,
            far: 1000.0,
            position: Vec3::new(0.0, 0.0, 5.0),
        }
    }
}

/// Handle to a scene sub-tree produced by the renderer's asset loader.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetHandle {
    pub id: u64,
    pub uri: String,
}

/// Host window events the pipeline listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowEventKind {
    Resize,
    OrientationChange,
}

impl WindowEventKind {
    pub const ALL: [WindowEventKind; 2] = [Self::Resize, Self::OrientationChange];

    /// DOM event name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resize => "resize",
            Self::OrientationChange => "orientationchange",
        }
    }
}

impl fmt::Display for WindowEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registration returned by `WindowHost::add_listener`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

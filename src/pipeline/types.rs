use glam::{EulerRot, Quat, Vec3};
use serde::Serialize;

/// Current extents of the host viewport, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Canonical layout rectangle shared by the video, 3D and composite layers.
///
/// Always a square no larger than either viewport dimension, horizontally
/// centred and pinned to the top edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sizing {
    pub width: u32,
    pub height: u32,
    pub top: u32,
    pub left: u32,
}

impl Sizing {
    /// Whether the rectangle covers no pixels (viewport not laid out yet).
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            return 1.0;
        }
        self.width as f32 / self.height as f32
    }
}

/// Expression channels reported by the tracker, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpressionChannel {
    MouthOpen,
    MouthSmile,
    EyebrowFrown,
    EyebrowRaise,
}

impl ExpressionChannel {
    pub const ALL: [ExpressionChannel; 4] = [
        Self::MouthOpen,
        Self::MouthSmile,
        Self::EyebrowFrown,
        Self::EyebrowRaise,
    ];
}

/// One face's detection record for a single tracker frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionState {
    pub face_index: usize,
    pub is_detected: bool,
    /// Euler angles in radians (pitch, yaw, roll), applied in ZYX order.
    pub rotation: Vec3,
    pub translation: Vec3,
    pub expressions: [f32; 4],
}

impl DetectionState {
    /// Orientation as a quaternion. Roll is dropped unless `follow_z_rotation`.
    pub fn orientation(&self, follow_z_rotation: bool) -> Quat {
        let roll = if follow_z_rotation { self.rotation.z } else { 0.0 };
        Quat::from_euler(EulerRot::ZYX, roll, self.rotation.y, self.rotation.x)
    }
}

/// Payload of a tracker callback: a bare record or an ordered sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackPayload {
    Single(DetectionState),
    Many(Vec<DetectionState>),
}

impl TrackPayload {
    /// Normalise to an ordered sequence; a bare record becomes a one-element list.
    pub fn into_states(self) -> Vec<DetectionState> {
        match self {
            Self::Single(state) => vec![state],
            Self::Many(states) => states,
        }
    }
}

/// Local transform of a scene node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_translation_rotation(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
            scale: Vec3::ONE,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

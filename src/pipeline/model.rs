//! Static model placement table.
//!
//! The selectable models form a closed enum. Names that do not resolve to a
//! variant get the fallback placement instead of an error.

use std::f32::consts::PI;
use std::fmt;

use glam::{Quat, Vec3};

const DEFAULT_MODEL_SCALE: f32 = 0.55;
const FALLBACK_OFFSET: Vec3 = Vec3::ZERO;

/// A model that can be attached to a face anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    Hat,
    Glasses,
}

impl ModelKind {
    pub const ALL: [ModelKind; 2] = [Self::Hat, Self::Glasses];

    /// Identifier used by the UI and for the asset file name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Hat => "hat",
            Self::Glasses => "glass",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn spec(self) -> ModelSpec {
        match self {
            Self::Hat => ModelSpec {
                name: self.name(),
                anchor_offset: Vec3::new(0.0, 0.7, 0.6),
                mirrored: true,
                scale: DEFAULT_MODEL_SCALE,
            },
            Self::Glasses => ModelSpec {
                name: self.name(),
                anchor_offset: Vec3::new(-0.1, 0.4, 0.6),
                mirrored: false,
                scale: DEFAULT_MODEL_SCALE,
            },
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Placement configuration of a built-in model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelSpec {
    pub name: &'static str,
    pub anchor_offset: Vec3,
    /// Whether the asset needs a 180° yaw correction before attaching.
    pub mirrored: bool,
    pub scale: f32,
}

/// Result of resolving a user-supplied model name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSelection {
    Known(ModelKind),
    Unknown(String),
}

impl ModelSelection {
    pub fn resolve(name: &str) -> Self {
        match ModelKind::from_name(name) {
            Some(kind) => Self::Known(kind),
            None => Self::Unknown(name.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Known(kind) => kind.name(),
            Self::Unknown(name) => name,
        }
    }

    /// Asset identifier, `/models/<name>.glb`.
    pub fn asset_uri(&self) -> String {
        format!("/models/{}.glb", self.name())
    }

    /// Local transform of the model relative to its anchor.
    pub fn placement(&self) -> ModelPlacement {
        match self {
            Self::Known(kind) => ModelPlacement::from_spec(&kind.spec()),
            Self::Unknown(_) => ModelPlacement {
                offset: FALLBACK_OFFSET,
                rotation: Quat::IDENTITY,
                scale: DEFAULT_MODEL_SCALE,
            },
        }
    }
}

/// Resolved local placement of an attached model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPlacement {
    pub offset: Vec3,
    pub rotation: Quat,
    pub scale: f32,
}

impl ModelPlacement {
    pub fn from_spec(spec: &ModelSpec) -> Self {
        let rotation = if spec.mirrored {
            Quat::from_rotation_y(PI)
        } else {
            Quat::IDENTITY
        };
        Self {
            offset: spec.anchor_offset,
            rotation,
            scale: spec.scale,
        }
    }
}

/// Names offered to the UI, in display order.
pub fn available_models() -> Vec<&'static str> {
    ModelKind::ALL.iter().map(|kind| kind.name()).collect()
}

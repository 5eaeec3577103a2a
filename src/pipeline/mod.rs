// Per-frame fusion pipeline: sizing, tracking state, compositing, lifecycle.

pub mod anchor;
pub mod camera_sync;
pub mod compositor;
pub mod context;
pub mod error;
pub mod event;
pub mod expression;
pub mod model;
pub mod orchestrator;
pub mod raster;
pub mod sizing;
pub mod types;

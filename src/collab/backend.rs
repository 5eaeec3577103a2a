use image::RgbaImage;

use crate::collab::types::{
    AssetHandle, CameraFrame, ListenerId, RenderCamera, SegmentationOptions, TrackerConfig,
    WindowEventKind,
};
use crate::pipeline::anchor::AnchorRegistry;
use crate::pipeline::error::Result;
use crate::pipeline::event::EventSink;
use crate::pipeline::types::{Sizing, Viewport};

/// Face detection / landmark / expression collaborator.
///
/// The tracker runs on its own schedule. After `init` it must emit exactly
/// one `PipelineEvent::TrackerReady`, then one `PipelineEvent::Track` per
/// processed frame.
pub trait FaceTracker: Send {
    /// Begin loading the network and the camera feed.
    fn init(&mut self, config: TrackerConfig, sink: EventSink) -> Result<()>;

    /// Notify the tracker that its target surface changed size.
    fn resize(&mut self);

    /// Draw the most recent video frame onto the target surface.
    fn render_video(&mut self);

    /// Stop tracking and release the camera.
    fn destroy(&mut self);
}

/// Person segmentation collaborator.
pub trait Segmenter: Send {
    fn set_options(&mut self, options: SegmentationOptions);

    /// Register the result sink. Called once per pipeline lifetime.
    fn on_results(&mut self, sink: EventSink);

    /// Submit a frame. Results arrive later as `PipelineEvent::Segmentation`.
    fn send(&mut self, frame: &CameraFrame) -> Result<()>;
}

/// Camera handle feeding the segmenter.
///
/// `stop` must release the device; a device left running keeps the camera lit.
pub trait CaptureDevice: Send {
    /// Start delivering frames through `EventSink::emit_frame` at the
    /// device's own rate. Each frame's receipt must resolve before the next
    /// frame is captured.
    fn start(&mut self, sink: EventSink) -> Result<()>;

    fn stop(&mut self);

    fn is_active(&self) -> bool;
}

/// Looped replacement background.
pub trait BackgroundSource: Send {
    /// Current background frame, or `None` while it is still loading.
    fn next_frame(&mut self) -> Option<RgbaImage>;
}

/// 3D scene-graph / render engine collaborator.
pub trait SceneRenderer: Send {
    /// Start issuing `PipelineEvent::RenderTick` once per display refresh.
    fn start_loop(&mut self, sink: EventSink) -> Result<()>;

    fn stop_loop(&mut self);

    fn camera(&self) -> RenderCamera;

    fn set_camera(&mut self, camera: RenderCamera);

    fn resize_canvas(&mut self, sizing: Sizing);

    /// Load an asset such as `/models/hat.glb` and return its scene sub-tree.
    fn load_asset(&mut self, uri: &str) -> Result<AssetHandle>;

    /// Draw the current frame from the anchor nodes.
    fn draw(&mut self, anchors: &AnchorRegistry);
}

/// Host window: viewport extents and event listener registration.
pub trait WindowHost: Send {
    fn viewport(&self) -> Viewport;

    fn add_listener(&mut self, kind: WindowEventKind, sink: EventSink) -> ListenerId;

    fn remove_listener(&mut self, id: ListenerId);
}

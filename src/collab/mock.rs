//! Recording collaborators for testing the pipeline without a browser.
//!
//! All mocks share one `RigState` behind a mutex; tests keep a `Rig` to
//! inspect call counts, the ordered call log and captured arguments after the
//! mocks have been moved into the orchestrator.

use std::collections::HashMap;
use std::sync::Arc;

use image::{GrayImage, Luma, RgbaImage};
use parking_lot::Mutex;

use crate::collab::backend::{
    BackgroundSource, CaptureDevice, FaceTracker, SceneRenderer, Segmenter, WindowHost,
};
use crate::collab::types::{
    AssetHandle, CameraFrame, ListenerId, RenderCamera, SegmentationOptions, SegmentationResults,
    TrackerConfig, WindowEventKind,
};
use crate::pipeline::anchor::AnchorRegistry;
use crate::pipeline::error::{PipelineError, Result};
use crate::pipeline::event::{EventSink, PipelineEvent};
use crate::pipeline::orchestrator::Collaborators;
use crate::pipeline::types::{Sizing, Viewport};

#[derive(Default)]
struct RigState {
    calls: HashMap<&'static str, usize>,
    log: Vec<&'static str>,
    viewport: Viewport,
    listeners: HashMap<ListenerId, WindowEventKind>,
    next_listener: u64,
    camera: RenderCamera,
    canvas: Option<Sizing>,
    tracker_config: Option<TrackerConfig>,
    tracker_fails: bool,
    tracker_ready_code: Option<i32>,
    segmentation_options: Option<SegmentationOptions>,
    segmentation_sink: Option<EventSink>,
    capture_active: bool,
    loop_running: bool,
    loaded_assets: Vec<String>,
    fail_asset_loads: bool,
    background: Option<RgbaImage>,
    last_draw: Option<AnchorRegistry>,
}

impl RigState {
    fn record(&mut self, call: &'static str) {
        *self.calls.entry(call).or_default() += 1;
        self.log.push(call);
    }
}

/// Shared view onto the mocks' recorded state.
#[derive(Clone)]
pub struct Rig {
    state: Arc<Mutex<RigState>>,
}

impl Rig {
    pub fn new() -> Self {
        let state = RigState {
            viewport: Viewport::new(800, 600),
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Build a full collaborator set wired to this rig.
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            tracker: Box::new(MockTracker::new(self)),
            segmenter: Box::new(MockSegmenter::new(self)),
            capture: Box::new(MockCapture::new(self)),
            background: Some(Box::new(MockBackground::new(self))),
            renderer: Box::new(MockRenderer::new(self)),
            window: Box::new(MockWindow::new(self)),
        }
    }

    pub fn count(&self, call: &str) -> usize {
        self.state.lock().calls.get(call).copied().unwrap_or(0)
    }

    /// Ordered log of every recorded call.
    pub fn log(&self) -> Vec<&'static str> {
        self.state.lock().log.clone()
    }

    pub fn clear_log(&self) {
        self.state.lock().log.clear();
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        self.state.lock().viewport = viewport;
    }

    pub fn set_background(&self, frame: Option<RgbaImage>) {
        self.state.lock().background = frame;
    }

    pub fn set_fail_asset_loads(&self, fail: bool) {
        self.state.lock().fail_asset_loads = fail;
    }

    pub fn set_tracker_fails(&self, fail: bool) {
        self.state.lock().tracker_fails = fail;
    }

    /// Have the tracker report ready with `code` as soon as it is initialised.
    pub fn set_tracker_ready(&self, code: i32) {
        self.state.lock().tracker_ready_code = Some(code);
    }

    pub fn listener_count(&self) -> usize {
        self.state.lock().listeners.len()
    }

    pub fn listener_kinds(&self) -> Vec<WindowEventKind> {
        let mut kinds: Vec<_> = self.state.lock().listeners.values().copied().collect();
        kinds.sort_by_key(|kind| kind.as_str());
        kinds
    }

    pub fn capture_active(&self) -> bool {
        self.state.lock().capture_active
    }

    pub fn loop_running(&self) -> bool {
        self.state.lock().loop_running
    }

    pub fn camera(&self) -> RenderCamera {
        self.state.lock().camera
    }

    pub fn canvas(&self) -> Option<Sizing> {
        self.state.lock().canvas
    }

    pub fn tracker_config(&self) -> Option<TrackerConfig> {
        self.state.lock().tracker_config.clone()
    }

    pub fn segmentation_options(&self) -> Option<SegmentationOptions> {
        self.state.lock().segmentation_options
    }

    pub fn loaded_assets(&self) -> Vec<String> {
        self.state.lock().loaded_assets.clone()
    }

    pub fn last_draw(&self) -> Option<AnchorRegistry> {
        self.state.lock().last_draw.clone()
    }
}

impl Default for Rig {
    fn default() -> Self {
        Self::new()
    }
}

pub struct MockTracker {
    state: Arc<Mutex<RigState>>,
}

impl MockTracker {
    pub fn new(rig: &Rig) -> Self {
        Self {
            state: Arc::clone(&rig.state),
        }
    }
}

impl FaceTracker for MockTracker {
    fn init(&mut self, config: TrackerConfig, sink: EventSink) -> Result<()> {
        let mut state = self.state.lock();
        state.record("tracker.init");
        if state.tracker_fails {
            return Err(PipelineError::Tracker("no camera".to_string()));
        }
        state.tracker_config = Some(config);
        if let Some(error_code) = state.tracker_ready_code {
            sink.emit(PipelineEvent::TrackerReady {
                error_code,
                spec: None,
            });
        }
        Ok(())
    }

    fn resize(&mut self) {
        self.state.lock().record("tracker.resize");
    }

    fn render_video(&mut self) {
        self.state.lock().record("tracker.render_video");
    }

    fn destroy(&mut self) {
        self.state.lock().record("tracker.destroy");
    }
}

/// Segmenter that answers every frame with a fully opaque mask.
pub struct MockSegmenter {
    state: Arc<Mutex<RigState>>,
}

impl MockSegmenter {
    pub fn new(rig: &Rig) -> Self {
        Self {
            state: Arc::clone(&rig.state),
        }
    }
}

impl Segmenter for MockSegmenter {
    fn set_options(&mut self, options: SegmentationOptions) {
        let mut state = self.state.lock();
        state.record("segmenter.set_options");
        state.segmentation_options = Some(options);
    }

    fn on_results(&mut self, sink: EventSink) {
        let mut state = self.state.lock();
        state.record("segmenter.on_results");
        state.segmentation_sink = Some(sink);
    }

    fn send(&mut self, frame: &CameraFrame) -> Result<()> {
        let mut state = self.state.lock();
        state.record("segmenter.send");
        if let Some(sink) = &state.segmentation_sink {
            let mask = GrayImage::from_pixel(frame.width(), frame.height(), Luma([255]));
            sink.emit(PipelineEvent::Segmentation(SegmentationResults {
                source: Arc::clone(frame),
                mask: Arc::new(mask),
            }));
        }
        Ok(())
    }
}

pub struct MockCapture {
    state: Arc<Mutex<RigState>>,
}

impl MockCapture {
    pub fn new(rig: &Rig) -> Self {
        Self {
            state: Arc::clone(&rig.state),
        }
    }
}

impl CaptureDevice for MockCapture {
    fn start(&mut self, _sink: EventSink) -> Result<()> {
        let mut state = self.state.lock();
        state.record("capture.start");
        state.capture_active = true;
        Ok(())
    }

    fn stop(&mut self) {
        let mut state = self.state.lock();
        state.record("capture.stop");
        state.capture_active = false;
    }

    fn is_active(&self) -> bool {
        self.state.lock().capture_active
    }
}

pub struct MockBackground {
    state: Arc<Mutex<RigState>>,
}

impl MockBackground {
    pub fn new(rig: &Rig) -> Self {
        Self {
            state: Arc::clone(&rig.state),
        }
    }
}

impl BackgroundSource for MockBackground {
    fn next_frame(&mut self) -> Option<RgbaImage> {
        self.state.lock().background.clone()
    }
}

pub struct MockRenderer {
    state: Arc<Mutex<RigState>>,
}

impl MockRenderer {
    pub fn new(rig: &Rig) -> Self {
        Self {
            state: Arc::clone(&rig.state),
        }
    }
}

impl SceneRenderer for MockRenderer {
    fn start_loop(&mut self, _sink: EventSink) -> Result<()> {
        let mut state = self.state.lock();
        state.record("renderer.start_loop");
        state.loop_running = true;
        Ok(())
    }

    fn stop_loop(&mut self) {
        let mut state = self.state.lock();
        state.record("renderer.stop_loop");
        state.loop_running = false;
    }

    fn camera(&self) -> RenderCamera {
        self.state.lock().camera
    }

    fn set_camera(&mut self, camera: RenderCamera) {
        let mut state = self.state.lock();
        state.record("renderer.set_camera");
        state.camera = camera;
    }

    fn resize_canvas(&mut self, sizing: Sizing) {
        let mut state = self.state.lock();
        state.record("renderer.resize_canvas");
        state.canvas = Some(sizing);
    }

    fn load_asset(&mut self, uri: &str) -> Result<AssetHandle> {
        let mut state = self.state.lock();
        state.record("renderer.load_asset");
        if state.fail_asset_loads {
            return Err(PipelineError::AssetLoad {
                uri: uri.to_string(),
                reason: "not found".to_string(),
            });
        }
        state.loaded_assets.push(uri.to_string());
        Ok(AssetHandle {
            id: state.loaded_assets.len() as u64,
            uri: uri.to_string(),
        })
    }

    fn draw(&mut self, anchors: &AnchorRegistry) {
        let mut state = self.state.lock();
        state.record("renderer.draw");
        state.last_draw = Some(anchors.clone());
    }
}

pub struct MockWindow {
    state: Arc<Mutex<RigState>>,
}

impl MockWindow {
    pub fn new(rig: &Rig) -> Self {
        Self {
            state: Arc::clone(&rig.state),
        }
    }
}

impl WindowHost for MockWindow {
    fn viewport(&self) -> Viewport {
        self.state.lock().viewport
    }

    fn add_listener(&mut self, kind: WindowEventKind, _sink: EventSink) -> ListenerId {
        let mut state = self.state.lock();
        state.record("window.add_listener");
        state.next_listener += 1;
        let id = ListenerId(state.next_listener);
        state.listeners.insert(id, kind);
        id
    }

    fn remove_listener(&mut self, id: ListenerId) {
        let mut state = self.state.lock();
        state.record("window.remove_listener");
        state.listeners.remove(&id);
    }
}

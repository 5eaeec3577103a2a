//! Simulated collaborators for running the pipeline without a browser.
//!
//! Each producer runs as a tokio task on its own clock, like the real
//! tracker, camera and render loop would. Used by the `facefilter` binary.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use glam::Vec3;
use image::{imageops, GrayImage, Luma, Rgba, RgbaImage};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::collab::backend::{
    BackgroundSource, CaptureDevice, FaceTracker, SceneRenderer, Segmenter, WindowHost,
};
use crate::collab::types::{
    AssetHandle, CameraFrame, ListenerId, RenderCamera, SegmentationOptions, SegmentationResults,
    TrackerConfig, TrackerSpec, WindowEventKind,
};
use crate::pipeline::anchor::AnchorRegistry;
use crate::pipeline::error::{PipelineError, Result};
use crate::pipeline::event::{EventSink, PipelineEvent};
use crate::pipeline::orchestrator::Collaborators;
use crate::pipeline::types::{DetectionState, Sizing, TrackPayload, Viewport};

const VIDEO_WIDTH: u32 = 640;
const VIDEO_HEIGHT: u32 = 480;
const TRACK_INTERVAL: Duration = Duration::from_millis(33);
const CAPTURE_INTERVAL: Duration = Duration::from_millis(40);
const RENDER_INTERVAL: Duration = Duration::from_millis(16);
const TRACKER_WARMUP: Duration = Duration::from_millis(50);

/// Frames per simulated detection cycle; the face is lost for the last
/// `LOST_FRAMES` of every cycle.
const DETECTION_CYCLE: u64 = 150;
const LOST_FRAMES: u64 = 20;

fn abort(task: &mut Option<JoinHandle<()>>) -> bool {
    match task.take() {
        Some(handle) => {
            handle.abort();
            true
        }
        None => false,
    }
}

/// Build a full simulated collaborator set for a viewport.
pub fn dummy_collaborators(viewport: Viewport) -> (Collaborators, DrawLog) {
    let renderer = DummyRenderer::new();
    let log = renderer.draw_log();
    let collaborators = Collaborators {
        tracker: Box::new(DummyTracker::new()),
        segmenter: Box::new(DummySegmenter::new()),
        capture: Box::new(DummyCapture::new()),
        background: Some(Box::new(DummyBackground::new(VIDEO_WIDTH, VIDEO_HEIGHT))),
        renderer: Box::new(renderer),
        window: Box::new(DummyWindow::new(viewport)),
    };
    (collaborators, log)
}

/// Simulated head movement and expressions for frame `n`.
fn simulated_detection(n: u64) -> DetectionState {
    let t = n as f32 * TRACK_INTERVAL.as_secs_f32();
    let is_detected = n % DETECTION_CYCLE < DETECTION_CYCLE - LOST_FRAMES;
    DetectionState {
        face_index: 0,
        is_detected,
        rotation: Vec3::new(0.1 * (t * 0.7).sin(), 0.35 * (t * 0.5).sin(), 0.15 * t.sin()),
        translation: Vec3::new(0.05 * (t * 0.9).sin(), 0.02 * t.cos(), -2.5),
        expressions: [
            0.5 + 0.5 * (t * 2.0).sin(),
            0.5 + 0.5 * (t * 1.3).cos(),
            0.2 * (t * 0.4).sin().max(0.0),
            0.2 * (t * 0.6).cos().max(0.0),
        ],
    }
}

/// Face tracker that reports ready after a short warm-up and then emits
/// one simulated detection per frame.
pub struct DummyTracker {
    task: Option<JoinHandle<()>>,
}

impl DummyTracker {
    pub fn new() -> Self {
        Self { task: None }
    }
}

impl Default for DummyTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl FaceTracker for DummyTracker {
    fn init(&mut self, config: TrackerConfig, sink: EventSink) -> Result<()> {
        if self.task.is_some() {
            return Err(PipelineError::Tracker("already initialised".to_string()));
        }
        tracing::debug!(
            "dummy tracker loading {} for {}",
            config.network,
            config.target_surface
        );
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(TRACKER_WARMUP).await;
            let ready = PipelineEvent::TrackerReady {
                error_code: 0,
                spec: Some(TrackerSpec {
                    video_width: VIDEO_WIDTH,
                    video_height: VIDEO_HEIGHT,
                }),
            };
            if !sink.emit(ready) {
                return;
            }

            let mut interval = tokio::time::interval(TRACK_INTERVAL);
            let mut frame = 0u64;
            loop {
                interval.tick().await;
                let payload = TrackPayload::Single(simulated_detection(frame));
                if !sink.emit(PipelineEvent::Track(payload)) {
                    break;
                }
                frame += 1;
            }
        }));
        Ok(())
    }

    fn resize(&mut self) {
        tracing::debug!("dummy tracker resized");
    }

    fn render_video(&mut self) {}

    fn destroy(&mut self) {
        if abort(&mut self.task) {
            tracing::debug!("dummy tracker destroyed");
        }
    }
}

/// Camera producing a moving test pattern.
pub struct DummyCapture {
    task: Option<JoinHandle<()>>,
}

impl DummyCapture {
    pub fn new() -> Self {
        Self { task: None }
    }

    /// Test pattern frame `n`: diagonal bands drifting right.
    pub fn test_frame(n: u64) -> RgbaImage {
        let shift = (n * 4) as u32;
        RgbaImage::from_fn(VIDEO_WIDTH, VIDEO_HEIGHT, |x, y| {
            let band = ((x + y + shift) / 32) % 2;
            let level = if band == 0 { 180 } else { 90 };
            Rgba([level, (y * 255 / VIDEO_HEIGHT) as u8, 120, 255])
        })
    }
}

impl Default for DummyCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureDevice for DummyCapture {
    fn start(&mut self, sink: EventSink) -> Result<()> {
        if self.task.is_some() {
            return Err(PipelineError::Capture("already started".to_string()));
        }
        self.task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(CAPTURE_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut frame = 0u64;
            loop {
                interval.tick().await;
                let image: CameraFrame = Arc::new(Self::test_frame(frame));
                let Some(receipt) = sink.emit_frame(image) else {
                    break;
                };
                // Next frame only once this one has been composited.
                receipt.wait().await;
                frame += 1;
            }
        }));
        Ok(())
    }

    fn stop(&mut self) {
        abort(&mut self.task);
    }

    fn is_active(&self) -> bool {
        self.task.is_some()
    }
}

/// Segmenter returning a soft-edged ellipse centred in the frame.
///
/// With `mirror_output` set the returned source frame is flipped
/// horizontally, as a selfie view would be.
pub struct DummySegmenter {
    options: SegmentationOptions,
    sink: Option<EventSink>,
}

impl DummySegmenter {
    pub fn new() -> Self {
        Self {
            options: SegmentationOptions::default(),
            sink: None,
        }
    }

    /// Person mask for a `width` x `height` frame.
    pub fn ellipse_mask(width: u32, height: u32) -> GrayImage {
        let cx = width as f32 / 2.0;
        let cy = height as f32 * 0.55;
        let rx = width as f32 * 0.3;
        let ry = height as f32 * 0.45;
        GrayImage::from_fn(width, height, |x, y| {
            let dx = (x as f32 + 0.5 - cx) / rx;
            let dy = (y as f32 + 0.5 - cy) / ry;
            let d = (dx * dx + dy * dy).sqrt();
            // Opaque inside, fading to transparent over the outer 10%.
            let alpha = ((1.0 - d) * 10.0).clamp(0.0, 1.0);
            Luma([(alpha * 255.0).round() as u8])
        })
    }
}

impl Default for DummySegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Segmenter for DummySegmenter {
    fn set_options(&mut self, options: SegmentationOptions) {
        tracing::debug!(
            "dummy segmenter using model {} (mirror {})",
            options.model_selection,
            options.mirror_output
        );
        self.options = options;
    }

    fn on_results(&mut self, sink: EventSink) {
        self.sink = Some(sink);
    }

    fn send(&mut self, frame: &CameraFrame) -> Result<()> {
        let Some(sink) = &self.sink else {
            return Err(PipelineError::Segmentation(
                "no result callback registered".to_string(),
            ));
        };
        let source = if self.options.mirror_output {
            Arc::new(imageops::flip_horizontal(frame.as_ref()))
        } else {
            Arc::clone(frame)
        };
        let mask = Self::ellipse_mask(frame.width(), frame.height());
        sink.emit(PipelineEvent::Segmentation(SegmentationResults {
            source,
            mask: Arc::new(mask),
        }));
        Ok(())
    }
}

/// Looping background: a hue gradient that scrolls each frame.
pub struct DummyBackground {
    width: u32,
    height: u32,
    frame: u64,
}

impl DummyBackground {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame: 0,
        }
    }
}

impl BackgroundSource for DummyBackground {
    fn next_frame(&mut self) -> Option<RgbaImage> {
        let offset = (self.frame % 256) as u32;
        self.frame += 1;
        let width = self.width.max(1);
        Some(RgbaImage::from_fn(self.width, self.height, |x, _| {
            let v = ((x * 255 / width + offset) % 256) as u8;
            Rgba([20, v, 255 - v, 255])
        }))
    }
}

/// What the dummy renderer has drawn so far.
#[derive(Debug, Clone, Default)]
pub struct DrawStats {
    pub frames: u64,
    pub visible_frames: u64,
    pub canvas: Option<Sizing>,
}

/// Shared handle onto a `DummyRenderer`'s draw statistics.
#[derive(Clone, Default)]
pub struct DrawLog(Arc<Mutex<DrawStats>>);

impl DrawLog {
    pub fn snapshot(&self) -> DrawStats {
        self.0.lock().clone()
    }
}

/// Render loop ticking at roughly 60 Hz that records what it draws.
pub struct DummyRenderer {
    task: Option<JoinHandle<()>>,
    camera: RenderCamera,
    next_asset: u64,
    log: DrawLog,
}

impl DummyRenderer {
    pub fn new() -> Self {
        Self {
            task: None,
            camera: RenderCamera::default(),
            next_asset: 0,
            log: DrawLog::default(),
        }
    }

    pub fn draw_log(&self) -> DrawLog {
        self.log.clone()
    }
}

impl Default for DummyRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneRenderer for DummyRenderer {
    fn start_loop(&mut self, sink: EventSink) -> Result<()> {
        if self.task.is_some() {
            return Err(PipelineError::Render("loop already running".to_string()));
        }
        self.task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(RENDER_INTERVAL);
            loop {
                interval.tick().await;
                if !sink.emit(PipelineEvent::RenderTick) {
                    break;
                }
            }
        }));
        Ok(())
    }

    fn stop_loop(&mut self) {
        abort(&mut self.task);
    }

    fn camera(&self) -> RenderCamera {
        self.camera
    }

    fn set_camera(&mut self, camera: RenderCamera) {
        self.camera = camera;
    }

    fn resize_canvas(&mut self, sizing: Sizing) {
        self.log.0.lock().canvas = Some(sizing);
    }

    fn load_asset(&mut self, uri: &str) -> Result<AssetHandle> {
        if !uri.ends_with(".glb") {
            return Err(PipelineError::AssetLoad {
                uri: uri.to_string(),
                reason: "unsupported asset format".to_string(),
            });
        }
        self.next_asset += 1;
        Ok(AssetHandle {
            id: self.next_asset,
            uri: uri.to_string(),
        })
    }

    fn draw(&mut self, anchors: &AnchorRegistry) {
        let mut stats = self.log.0.lock();
        stats.frames += 1;
        if anchors.iter().any(|anchor| anchor.visible) {
            stats.visible_frames += 1;
        }
    }
}

/// Window with a fixed viewport that never fires events on its own.
pub struct DummyWindow {
    viewport: Viewport,
    listeners: HashMap<ListenerId, WindowEventKind>,
    next_id: u64,
}

impl DummyWindow {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            listeners: HashMap::new(),
            next_id: 0,
        }
    }
}

impl WindowHost for DummyWindow {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn add_listener(&mut self, kind: WindowEventKind, _sink: EventSink) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.insert(id, kind);
        id
    }

    fn remove_listener(&mut self, id: ListenerId) {
        if self.listeners.remove(&id).is_none() {
            tracing::warn!("removing unknown window listener {id:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::event::channel;

    #[test]
    fn simulated_face_is_lost_once_per_cycle() {
        let lost = (0..DETECTION_CYCLE)
            .filter(|n| !simulated_detection(*n).is_detected)
            .count() as u64;
        assert_eq!(lost, LOST_FRAMES);
        assert!(simulated_detection(0).is_detected);
    }

    #[test]
    fn ellipse_mask_is_opaque_in_centre_and_clear_in_corners() {
        let mask = DummySegmenter::ellipse_mask(VIDEO_WIDTH, VIDEO_HEIGHT);
        assert_eq!(mask.get_pixel(VIDEO_WIDTH / 2, VIDEO_HEIGHT / 2)[0], 255);
        assert_eq!(mask.get_pixel(0, 0)[0], 0);
        assert_eq!(mask.get_pixel(VIDEO_WIDTH - 1, VIDEO_HEIGHT - 1)[0], 0);
    }

    #[test]
    fn segmenter_without_callback_errors() {
        let mut segmenter = DummySegmenter::new();
        let frame = Arc::new(DummyCapture::test_frame(0));
        assert!(segmenter.send(&frame).is_err());
    }

    #[test]
    fn segmenter_emits_mask_matching_frame() {
        let (sink, mut stream) = channel();
        let mut segmenter = DummySegmenter::new();
        segmenter.on_results(sink);
        let frame = Arc::new(RgbaImage::new(32, 24));
        segmenter.send(&frame).unwrap();

        let Some(PipelineEvent::Segmentation(results)) = stream.try_recv() else {
            panic!("expected segmentation results");
        };
        assert_eq!(results.mask.dimensions(), (32, 24));
    }

    #[test]
    fn segmenter_mirrors_source_when_asked() {
        let (sink, mut stream) = channel();
        let mut segmenter = DummySegmenter::new();
        segmenter.set_options(SegmentationOptions {
            model_selection: 1,
            mirror_output: true,
        });
        segmenter.on_results(sink);
        let frame = Arc::new(RgbaImage::from_fn(8, 2, |x, _| Rgba([x as u8, 0, 0, 255])));
        segmenter.send(&frame).unwrap();

        let Some(PipelineEvent::Segmentation(results)) = stream.try_recv() else {
            panic!("expected segmentation results");
        };
        assert_eq!(results.source.get_pixel(0, 0)[0], 7);
        assert_eq!(results.source.get_pixel(7, 1)[0], 0);
    }

    #[test]
    fn background_scrolls_between_frames() {
        let mut background = DummyBackground::new(16, 4);
        let first = background.next_frame().unwrap();
        let second = background.next_frame().unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn window_tracks_listener_registrations() {
        let (sink, _stream) = channel();
        let mut window = DummyWindow::new(Viewport::new(800, 600));
        let a = window.add_listener(WindowEventKind::Resize, sink.clone());
        let b = window.add_listener(WindowEventKind::OrientationChange, sink);
        assert_ne!(a, b);
        window.remove_listener(a);
        window.remove_listener(b);
        assert!(window.listeners.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn tracker_reports_ready_then_tracks() {
        let (sink, mut stream) = channel();
        let mut tracker = DummyTracker::new();
        let config = crate::settings::types::PipelineSettings::default().tracker_config("test");
        tracker.init(config, sink).unwrap();

        let ready = stream.recv().await.unwrap();
        assert!(matches!(
            ready,
            PipelineEvent::TrackerReady { error_code: 0, .. }
        ));
        let track = stream.recv().await.unwrap();
        assert!(matches!(track, PipelineEvent::Track(TrackPayload::Single(_))));

        tracker.destroy();
        tracker.destroy();
    }

    #[tokio::test(start_paused = true)]
    async fn capture_stops_delivering_after_stop() {
        let (sink, mut stream) = channel();
        let mut capture = DummyCapture::new();
        capture.start(sink).unwrap();
        assert!(capture.is_active());
        assert!(matches!(
            stream.recv().await,
            Some(PipelineEvent::CameraFrame(_))
        ));

        capture.stop();
        assert!(!capture.is_active());
        tokio::time::sleep(Duration::from_millis(200)).await;
        while stream.try_recv().is_some() {}
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(stream.try_recv().is_none());
    }

    #[test]
    fn renderer_rejects_non_glb_assets() {
        let mut renderer = DummyRenderer::new();
        assert!(renderer.load_asset("/models/hat.glb").is_ok());
        assert!(renderer.load_asset("/models/hat.obj").is_err());
    }
}

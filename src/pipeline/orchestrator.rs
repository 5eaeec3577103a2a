//! Pipeline lifecycle and event dispatch.
//!
//! The orchestrator is the single consumer of the event channel. Producers
//! (tracker, capture device, segmenter, render loop, window listeners and the
//! resize timer) never call into the other components directly.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::RgbaImage;

use crate::collab::backend::{
    BackgroundSource, CaptureDevice, FaceTracker, SceneRenderer, Segmenter, WindowHost,
};
use crate::collab::types::{ListenerId, SegmentationResults, TrackerSpec, WindowEventKind};
use crate::diagnostics::stats::{DiagnosticSnapshot, PipelineStats};
use crate::pipeline::compositor::{CompositeOutcome, SegmentationCompositor};
use crate::pipeline::context::PipelineContext;
use crate::pipeline::error::{PipelineError, Result};
use crate::pipeline::event::{CapturedFrame, EventSink, EventStream, FrameDone, PipelineEvent};
use crate::pipeline::model::{available_models, ModelSelection};
use crate::pipeline::sizing::compute_sizing;
use crate::pipeline::types::{Sizing, TrackPayload};
use crate::preview::compress::{compress_thumbnail, encode_base64_jpeg};
use crate::settings::types::PipelineSettings;

/// Surface identifier handed to the tracker.
pub const TRACKER_SURFACE_ID: &str = "facefilter-canvas";

/// Lifecycle of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Uninitialized,
    /// Waiting for the tracker's ready callback.
    Initializing,
    Ready,
    Running,
    TearingDown,
    Stopped,
    /// Initialisation failed. Terminal for the session; never retried.
    Failed,
}

impl PipelineState {
    pub fn can_transition(self, to: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, to),
            (Uninitialized, Initializing)
                | (Uninitialized, Stopped)
                | (Initializing, Ready)
                | (Initializing, Failed)
                | (Ready, Running)
                | (Ready, Failed)
                | (Initializing | Ready | Running | Failed, TearingDown)
                | (TearingDown, Stopped)
        )
    }

    /// Whether the event loop has nothing left to do.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }
}

/// The external collaborators a pipeline drives.
pub struct Collaborators {
    pub tracker: Box<dyn FaceTracker>,
    pub segmenter: Box<dyn Segmenter>,
    pub capture: Box<dyn CaptureDevice>,
    pub background: Option<Box<dyn BackgroundSource>>,
    pub renderer: Box<dyn SceneRenderer>,
    pub window: Box<dyn WindowHost>,
}

/// Owns the pipeline lifecycle and routes producer events to the components.
pub struct FrameOrchestrator {
    settings: PipelineSettings,
    state: PipelineState,
    sink: EventSink,
    tracker: Box<dyn FaceTracker>,
    segmenter: Box<dyn Segmenter>,
    renderer: Box<dyn SceneRenderer>,
    window: Box<dyn WindowHost>,
    compositor: SegmentationCompositor,
    context: Option<PipelineContext>,
    selection: ModelSelection,
    listeners: Vec<ListenerId>,
    /// Held until the frame's segmentation result has been composited.
    frame_in_flight: Option<FrameDone>,
    stats: PipelineStats,
    failure: Option<PipelineError>,
}

impl FrameOrchestrator {
    pub fn new(settings: PipelineSettings, collaborators: Collaborators, sink: EventSink) -> Self {
        let Collaborators {
            tracker,
            segmenter,
            capture,
            background,
            renderer,
            window,
        } = collaborators;
        let compositor =
            SegmentationCompositor::new(capture, background, compute_sizing(window.viewport()));
        let selection = ModelSelection::resolve(&settings.default_model);

        Self {
            settings,
            state: PipelineState::Uninitialized,
            sink,
            tracker,
            segmenter,
            renderer,
            window,
            compositor,
            context: None,
            selection,
            listeners: Vec::new(),
            frame_in_flight: None,
            stats: PipelineStats::new(),
            failure: None,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// The error that put the pipeline into `Failed` after `start` returned.
    /// Errors from `start` itself go straight to its caller.
    pub fn failure(&self) -> Option<&PipelineError> {
        self.failure.as_ref()
    }

    pub fn take_failure(&mut self) -> Option<PipelineError> {
        self.failure.take()
    }

    pub fn context(&self) -> Option<&PipelineContext> {
        self.context.as_ref()
    }

    pub fn compositor(&self) -> &SegmentationCompositor {
        &self.compositor
    }

    pub fn selection(&self) -> &ModelSelection {
        &self.selection
    }

    /// Model names the UI can offer.
    pub fn available_models(&self) -> Vec<&'static str> {
        available_models()
    }

    /// Layout rectangle for the UI; `None` outside a pipeline run.
    pub fn current_sizing(&self) -> Option<Sizing> {
        self.context.as_ref().map(PipelineContext::current_sizing)
    }

    pub fn diagnostics(&self) -> DiagnosticSnapshot {
        self.stats.snapshot()
    }

    /// Current composited output as a base64 JPEG.
    pub fn composite_snapshot(&self, quality: u8) -> Result<String> {
        encode_base64_jpeg(&self.composite_image()?, quality)
    }

    /// Downscaled composite for previews, as a base64 JPEG.
    pub fn composite_thumbnail(&self, width: u32, height: u32) -> Result<String> {
        let jpeg = compress_thumbnail(&self.composite_image()?, width, height)?;
        Ok(STANDARD.encode(jpeg))
    }

    fn composite_image(&self) -> Result<RgbaImage> {
        let output = self.compositor.output();
        if output.is_empty() {
            return Err(PipelineError::Image(
                "composite output is not laid out".to_string(),
            ));
        }
        Ok(output.to_rgba_image())
    }

    fn transition(&mut self, to: PipelineState) -> Result<()> {
        if !self.state.can_transition(to) {
            return Err(PipelineError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        tracing::debug!("pipeline {:?} -> {:?}", self.state, to);
        self.state = to;
        Ok(())
    }

    fn enter_failed(&mut self, error: &PipelineError) {
        tracing::error!("pipeline initialisation failed: {error}");
        if let Err(e) = self.transition(PipelineState::Failed) {
            tracing::warn!("{e}");
        }
    }

    fn fail(&mut self, error: PipelineError) {
        self.enter_failed(&error);
        self.failure = Some(error);
    }

    /// Lay out the layers, register window listeners, attach the selected
    /// model and initialise the tracker. The pipeline stays `Initializing`
    /// until the tracker reports ready.
    pub fn start(&mut self) -> Result<()> {
        self.transition(PipelineState::Initializing)?;

        let context =
            PipelineContext::new(&self.settings, self.window.viewport(), self.sink.clone());
        let sizing = context.current_sizing();
        self.context = Some(context);
        self.publish_sizing(sizing);

        for kind in WindowEventKind::ALL {
            let id = self.window.add_listener(kind, self.sink.clone());
            self.listeners.push(id);
        }

        let selection = self.selection.clone();
        if let Err(e) = self.attach_model(selection) {
            tracing::warn!("{e}");
        }

        let config = self.settings.tracker_config(TRACKER_SURFACE_ID);
        if let Err(e) = self.tracker.init(config, self.sink.clone()) {
            self.enter_failed(&e);
            return Err(e);
        }
        tracing::info!(
            "face tracker initialising with network {}",
            self.settings.network
        );
        Ok(())
    }

    /// React to one event from any producer.
    pub fn handle_event(&mut self, event: PipelineEvent) {
        match event {
            PipelineEvent::TrackerReady { error_code, spec } => {
                self.on_tracker_ready(error_code, spec)
            }
            PipelineEvent::Track(payload) => self.on_track(payload),
            PipelineEvent::CameraFrame(frame) => self.on_camera_frame(frame),
            PipelineEvent::Segmentation(results) => self.on_segmentation(&results),
            PipelineEvent::RenderTick => self.on_render_tick(),
            PipelineEvent::Window(kind) => {
                if let Some(context) = self.context.as_mut() {
                    tracing::debug!("window {kind}, scheduling resize");
                    context.sizing.schedule_resize();
                }
            }
            PipelineEvent::ResizeElapsed { generation } => self.on_resize_elapsed(generation),
            PipelineEvent::SelectModel(name) => {
                if let Err(e) = self.select_model(&name) {
                    tracing::warn!("{e}");
                }
            }
            PipelineEvent::Shutdown => self.shutdown(),
        }
    }

    /// Consume events until the pipeline stops or fails.
    pub async fn run(&mut self, stream: &mut EventStream) {
        while !self.state.is_terminal() {
            let Some(event) = stream.recv().await else {
                break;
            };
            self.handle_event(event);
        }
    }

    fn on_tracker_ready(&mut self, error_code: i32, spec: Option<TrackerSpec>) {
        if self.state != PipelineState::Initializing {
            tracing::warn!("ignoring tracker ready callback in state {:?}", self.state);
            return;
        }
        if error_code != 0 {
            self.fail(PipelineError::TrackerInit(error_code));
            return;
        }
        if let Some(context) = self.context.as_mut() {
            context.tracker_spec = spec;
        }
        if let Err(e) = self.transition(PipelineState::Ready) {
            tracing::warn!("{e}");
            return;
        }
        tracing::info!("face tracker ready");

        match self.start_producers() {
            Ok(()) => {
                if let Err(e) = self.transition(PipelineState::Running) {
                    tracing::warn!("{e}");
                }
            }
            Err(e) => self.fail(e),
        }
    }

    fn start_producers(&mut self) -> Result<()> {
        self.segmenter
            .set_options(self.settings.segmentation_options());
        self.segmenter.on_results(self.sink.clone());
        self.compositor.start(self.sink.clone())?;
        self.renderer.start_loop(self.sink.clone())?;
        Ok(())
    }

    fn on_track(&mut self, payload: TrackPayload) {
        if self.state != PipelineState::Running {
            tracing::debug!("dropping tracking callback in state {:?}", self.state);
            return;
        }
        let Some(context) = self.context.as_mut() else {
            return;
        };
        for (slot, state) in payload.into_states().iter().enumerate() {
            context.apply_detection(slot, state);
        }
        self.tracker.render_video();
        self.stats.record_track();
    }

    /// Forward a captured frame to the segmenter. The capture device is held
    /// until the matching result has been composited; a dropped frame
    /// releases it at once.
    fn on_camera_frame(&mut self, frame: CapturedFrame) {
        if self.state != PipelineState::Running {
            return;
        }
        let (image, done) = frame.into_parts();
        match self.segmenter.send(&image) {
            Ok(()) => {
                if let Some(previous) = self.frame_in_flight.replace(done) {
                    previous.complete();
                }
            }
            Err(e) => {
                tracing::debug!("skipping camera frame: {e}");
                self.stats.record_skip();
            }
        }
    }

    fn on_segmentation(&mut self, results: &SegmentationResults) {
        if self.state == PipelineState::Running {
            self.composite(results);
        }
        if let Some(done) = self.frame_in_flight.take() {
            done.complete();
        }
    }

    fn composite(&mut self, results: &SegmentationResults) {
        match self.compositor.composite(results) {
            Ok(CompositeOutcome::Composited { .. }) => self.stats.record_segmentation(),
            Ok(CompositeOutcome::Skipped) => {
                tracing::debug!("composite output not laid out, skipping frame");
                self.stats.record_skip();
            }
            Err(e) => {
                tracing::debug!("skipping segmentation frame: {e}");
                self.stats.record_skip();
            }
        }
    }

    /// Camera sync runs before anchors are updated and drawn.
    fn on_render_tick(&mut self) {
        if self.state != PipelineState::Running {
            return;
        }
        let Some(context) = self.context.as_mut() else {
            return;
        };

        let mut camera = self.renderer.camera();
        if context.sync_camera(&mut camera) {
            self.renderer.set_camera(camera);
        }
        context.tick_anchors();
        self.renderer.draw(&context.anchors);
        self.stats.record_render_tick();
    }

    fn on_resize_elapsed(&mut self, generation: u64) {
        let viewport = self.window.viewport();
        let Some(sizing) = self
            .context
            .as_mut()
            .and_then(|context| context.sizing.on_elapsed(generation, viewport))
        else {
            return;
        };
        tracing::debug!("republishing sizing {}x{}", sizing.width, sizing.height);
        self.publish_sizing(sizing);
        // Only after every layer has the new sizing.
        self.tracker.resize();
    }

    fn publish_sizing(&mut self, sizing: Sizing) {
        self.renderer.resize_canvas(sizing);
        self.compositor.resize_output(sizing);
    }

    /// Swap the model attached to every anchor. Unknown names use the
    /// fallback placement. Before `start` this only records the choice.
    pub fn select_model(&mut self, name: &str) -> Result<()> {
        let selection = ModelSelection::resolve(name);
        if let ModelSelection::Unknown(name) = &selection {
            tracing::warn!("unknown model '{name}', using fallback placement");
        }
        if self.context.is_none() {
            self.selection = selection;
            return Ok(());
        }
        self.attach_model(selection)
    }

    fn attach_model(&mut self, selection: ModelSelection) -> Result<()> {
        let Some(context) = self.context.as_mut() else {
            return Ok(());
        };
        let asset = self.renderer.load_asset(&selection.asset_uri())?;
        for anchor in context.anchors.iter_mut() {
            anchor.attach_model(selection.clone(), asset.clone());
        }
        tracing::info!("attached model {}", selection.name());
        self.selection = selection;
        Ok(())
    }

    /// Stop the tracker, release the capture device, deregister window
    /// listeners and stop the render loop. Idempotent.
    pub fn shutdown(&mut self) {
        match self.state {
            PipelineState::Stopped | PipelineState::TearingDown => return,
            PipelineState::Uninitialized => {
                self.state = PipelineState::Stopped;
                return;
            }
            _ => {}
        }
        let failed = self.state == PipelineState::Failed;
        if let Err(e) = self.transition(PipelineState::TearingDown) {
            tracing::warn!("{e}");
            return;
        }

        self.tracker.destroy();
        self.compositor.stop();
        for id in self.listeners.drain(..) {
            self.window.remove_listener(id);
        }
        self.renderer.stop_loop();
        self.frame_in_flight = None;
        self.context = None;

        if let Err(e) = self.transition(PipelineState::Stopped) {
            tracing::warn!("{e}");
        }
        if failed {
            tracing::info!("pipeline resources released after failed start");
        } else {
            tracing::info!("pipeline stopped");
        }
    }
}

impl Drop for FrameOrchestrator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

use crate::collab::types::{RenderCamera, TrackerSpec};
use crate::pipeline::anchor::{AnchorRegistry, DetectionChange, FaceAnchorNode};
use crate::pipeline::camera_sync::CameraSync;
use crate::pipeline::event::EventSink;
use crate::pipeline::expression::ExpressionStore;
use crate::pipeline::sizing::SizingController;
use crate::pipeline::types::{DetectionState, Sizing, Viewport};
use crate::settings::types::PipelineSettings;

/// State shared by the pipeline components for one pipeline lifetime.
///
/// Created when the orchestrator starts and dropped at teardown. Dropping it
/// cancels any pending resize timer.
pub struct PipelineContext {
    pub sizing: SizingController,
    pub expressions: ExpressionStore,
    pub anchors: AnchorRegistry,
    pub camera_sync: CameraSync,
    /// Calibration from the tracker's ready callback, once it has fired.
    pub tracker_spec: Option<TrackerSpec>,
    follow_z_rotation: bool,
}

impl PipelineContext {
    /// Allocate one expression record and one anchor node per face slot.
    pub fn new(settings: &PipelineSettings, viewport: Viewport, sink: EventSink) -> Self {
        let slots = settings.max_faces_detected;
        let mut anchors = AnchorRegistry::new(slots);
        for face_index in 0..slots {
            anchors.register(FaceAnchorNode::new(
                face_index,
                settings.show_debug_indicators,
            ));
        }

        Self {
            sizing: SizingController::new(viewport, settings.resize_debounce(), sink),
            expressions: ExpressionStore::new(slots),
            anchors,
            camera_sync: CameraSync::new(settings.camera_min_video_dim_fov_deg),
            tracker_spec: None,
            follow_z_rotation: settings.follow_z_rotation,
        }
    }

    pub fn current_sizing(&self) -> Sizing {
        self.sizing.current()
    }

    /// Copy one detection record into the store and its anchor.
    ///
    /// Expressions are stored even while the face is lost; the pose is only
    /// written while it is detected.
    pub fn apply_detection(&mut self, slot: usize, state: &DetectionState) {
        self.expressions.update(slot, state.expressions);

        let Some(anchor) = self.anchors.get_mut(slot) else {
            tracing::debug!("detection for unregistered face slot {slot}");
            return;
        };
        match anchor.apply_pose(state, self.follow_z_rotation) {
            Some(DetectionChange::Detected) => tracing::info!("face {slot} detected"),
            Some(DetectionChange::Lost) => tracing::info!("face {slot} lost"),
            None => {}
        }
    }

    /// Fit the render camera to the tracker's video. `false` until the
    /// tracker has reported its calibration.
    pub fn sync_camera(&self, camera: &mut RenderCamera) -> bool {
        self.camera_sync
            .sync(self.sizing.current(), self.tracker_spec.as_ref(), camera)
    }

    /// Per-render-tick indicator update.
    pub fn tick_anchors(&mut self) {
        self.anchors.tick(&self.expressions);
    }
}

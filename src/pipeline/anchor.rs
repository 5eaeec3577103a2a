use std::f32::consts::FRAC_PI_2;

use glam::{Quat, Vec3};

use crate::collab::types::AssetHandle;
use crate::pipeline::expression::{ExpressionRecord, ExpressionStore};
use crate::pipeline::model::ModelSelection;
use crate::pipeline::types::{DetectionState, ExpressionChannel, Transform};

/// Smallest scale an expression-driven indicator may take.
pub const MIN_INDICATOR_SCALE: f32 = 0.001;

const INDICATOR_OFFSET: Vec3 = Vec3::new(0.0, -0.2, 0.2);

/// Scale derived from an expression channel, floored so the geometry never
/// collapses to zero or turns inside out.
pub fn indicator_scale(value: f32) -> f32 {
    value.max(MIN_INDICATOR_SCALE)
}

/// Debug geometry whose X/Z scale follows one expression channel.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugIndicator {
    pub channel: ExpressionChannel,
    pub transform: Transform,
}

impl DebugIndicator {
    pub fn new(channel: ExpressionChannel) -> Self {
        Self {
            channel,
            transform: Transform::from_translation_rotation(
                INDICATOR_OFFSET,
                Quat::from_rotation_x(FRAC_PI_2),
            ),
        }
    }

    pub fn apply(&mut self, record: &ExpressionRecord) {
        let s = indicator_scale(record.channel(self.channel));
        self.transform.scale = Vec3::new(s, 1.0, s);
    }
}

/// The model currently hanging off an anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachedModel {
    pub selection: ModelSelection,
    pub asset: AssetHandle,
    pub transform: Transform,
}

/// Detection state flip reported by `FaceAnchorNode::apply_pose`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionChange {
    Detected,
    Lost,
}

/// Scene node following one tracked face.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceAnchorNode {
    pub face_index: usize,
    pub transform: Transform,
    pub visible: bool,
    pub model: Option<AttachedModel>,
    pub indicators: Vec<DebugIndicator>,
}

impl FaceAnchorNode {
    pub fn new(face_index: usize, show_debug_indicators: bool) -> Self {
        let indicators = if show_debug_indicators {
            vec![
                DebugIndicator::new(ExpressionChannel::MouthOpen),
                DebugIndicator::new(ExpressionChannel::MouthSmile),
            ]
        } else {
            Vec::new()
        };
        Self {
            face_index,
            transform: Transform::IDENTITY,
            visible: false,
            model: None,
            indicators,
        }
    }

    /// Drive the node from a raw detection record. No smoothing is applied.
    ///
    /// The pose is only written while the face is detected; the node is
    /// hidden otherwise. Returns the detection flip, if any.
    pub fn apply_pose(
        &mut self,
        state: &DetectionState,
        follow_z_rotation: bool,
    ) -> Option<DetectionChange> {
        let change = match (self.visible, state.is_detected) {
            (false, true) => Some(DetectionChange::Detected),
            (true, false) => Some(DetectionChange::Lost),
            _ => None,
        };
        self.visible = state.is_detected;
        if state.is_detected {
            self.transform.translation = state.translation;
            self.transform.rotation = state.orientation(follow_z_rotation);
        }
        change
    }

    /// Attach (or swap in) a model. The anchor node itself is kept.
    pub fn attach_model(&mut self, selection: ModelSelection, asset: AssetHandle) {
        let placement = selection.placement();
        self.model = Some(AttachedModel {
            selection,
            asset,
            transform: Transform {
                translation: placement.offset,
                rotation: placement.rotation,
                scale: Vec3::splat(placement.scale),
            },
        });
    }

    pub fn apply_expressions(&mut self, record: &ExpressionRecord) {
        for indicator in &mut self.indicators {
            indicator.apply(record);
        }
    }

    pub fn indicator(&self, channel: ExpressionChannel) -> Option<&DebugIndicator> {
        self.indicators.iter().find(|i| i.channel == channel)
    }
}

/// Slot-indexed registry of anchor nodes.
#[derive(Debug, Clone, Default)]
pub struct AnchorRegistry {
    slots: Vec<Option<FaceAnchorNode>>,
}

impl AnchorRegistry {
    pub fn new(slot_count: usize) -> Self {
        Self {
            slots: vec![None; slot_count],
        }
    }

    /// Record a node under its face index, replacing any previous one.
    /// Returns `false` if the index is outside the configured slots.
    pub fn register(&mut self, node: FaceAnchorNode) -> bool {
        let index = node.face_index;
        match self.slots.get_mut(index) {
            Some(slot) => {
                *slot = Some(node);
                true
            }
            None => {
                tracing::warn!("cannot register anchor for face slot {index}");
                false
            }
        }
    }

    pub fn get(&self, face_index: usize) -> Option<&FaceAnchorNode> {
        self.slots.get(face_index).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, face_index: usize) -> Option<&mut FaceAnchorNode> {
        self.slots.get_mut(face_index).and_then(Option::as_mut)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FaceAnchorNode> {
        self.slots.iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut FaceAnchorNode> {
        self.slots.iter_mut().flatten()
    }

    /// Per-render-tick update: rescale every indicator from the store.
    pub fn tick(&mut self, expressions: &ExpressionStore) {
        for anchor in self.iter_mut() {
            if let Some(record) = expressions.read(anchor.face_index) {
                anchor.apply_expressions(record);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detected(translation: Vec3) -> DetectionState {
        DetectionState {
            face_index: 0,
            is_detected: true,
            rotation: Vec3::new(0.0, 0.5, 0.0),
            translation,
            expressions: [0.0; 4],
        }
    }

    fn asset(uri: &str) -> AssetHandle {
        AssetHandle {
            id: 1,
            uri: uri.to_string(),
        }
    }

    #[test]
    fn indicator_scale_is_floored_for_zero_and_negative_input() {
        assert_eq!(indicator_scale(0.0), MIN_INDICATOR_SCALE);
        assert_eq!(indicator_scale(-1.0), MIN_INDICATOR_SCALE);
        assert_eq!(indicator_scale(f32::NEG_INFINITY), MIN_INDICATOR_SCALE);
        assert_eq!(indicator_scale(0.0005), MIN_INDICATOR_SCALE);
        assert_eq!(indicator_scale(0.8), 0.8);
        assert_eq!(indicator_scale(2.5), 2.5);
    }

    #[test]
    fn indicator_scale_never_reaches_zero() {
        let mut v = -2.0_f32;
        while v <= 2.0 {
            let s = indicator_scale(v);
            assert!(s > 0.0);
            assert_eq!(s, v.max(0.001));
            v += 0.0625;
        }
        assert!(indicator_scale(f32::NAN) > 0.0);
    }

    #[test]
    fn indicators_scale_x_and_z_only() {
        let mut node = FaceAnchorNode::new(0, true);
        node.apply_expressions(&ExpressionRecord {
            mouth_open: 0.8,
            mouth_smile: -0.3,
            ..Default::default()
        });
        let open = node.indicator(ExpressionChannel::MouthOpen).unwrap();
        assert_eq!(open.transform.scale, Vec3::new(0.8, 1.0, 0.8));
        let smile = node.indicator(ExpressionChannel::MouthSmile).unwrap();
        assert_eq!(smile.transform.scale, Vec3::new(0.001, 1.0, 0.001));
    }

    #[test]
    fn indicators_can_be_disabled() {
        let node = FaceAnchorNode::new(0, false);
        assert!(node.indicators.is_empty());
        assert!(node.indicator(ExpressionChannel::MouthOpen).is_none());
    }

    #[test]
    fn pose_is_applied_verbatim() {
        let mut node = FaceAnchorNode::new(0, true);
        let state = detected(Vec3::new(0.1, -0.2, -3.0));
        node.apply_pose(&state, true);
        assert_eq!(node.transform.translation, Vec3::new(0.1, -0.2, -3.0));
        assert_eq!(node.transform.rotation, state.orientation(true));
        assert!(node.visible);
    }

    #[test]
    fn apply_pose_reports_detection_flips_once() {
        let mut node = FaceAnchorNode::new(0, true);
        let state = detected(Vec3::ZERO);
        assert_eq!(node.apply_pose(&state, true), Some(DetectionChange::Detected));
        assert_eq!(node.apply_pose(&state, true), None);

        let lost = DetectionState {
            is_detected: false,
            translation: Vec3::splat(9.0),
            ..state
        };
        assert_eq!(node.apply_pose(&lost, true), Some(DetectionChange::Lost));
        assert!(!node.visible);
        // Pose is frozen while the face is lost.
        assert_eq!(node.transform.translation, Vec3::ZERO);
        assert_eq!(node.apply_pose(&lost, true), None);
    }

    #[test]
    fn attach_model_sets_offset_and_rotation() {
        let mut node = FaceAnchorNode::new(0, true);
        node.attach_model(ModelSelection::resolve("glass"), asset("/models/glass.glb"));
        let model = node.model.as_ref().unwrap();
        assert_eq!(model.transform.translation, Vec3::new(-0.1, 0.4, 0.6));
        assert_eq!(model.transform.rotation, Quat::IDENTITY);
        assert_eq!(model.transform.scale, Vec3::splat(0.55));
    }

    #[test]
    fn swapping_model_keeps_anchor_pose() {
        let mut node = FaceAnchorNode::new(0, true);
        node.apply_pose(&detected(Vec3::new(1.0, 2.0, 3.0)), true);
        node.attach_model(ModelSelection::resolve("hat"), asset("/models/hat.glb"));
        node.attach_model(ModelSelection::resolve("glass"), asset("/models/glass.glb"));

        assert_eq!(node.transform.translation, Vec3::new(1.0, 2.0, 3.0));
        let model = node.model.as_ref().unwrap();
        assert_eq!(model.selection, ModelSelection::resolve("glass"));
        assert_eq!(model.asset.uri, "/models/glass.glb");
    }

    #[test]
    fn unknown_model_attaches_with_fallback_placement() {
        let mut node = FaceAnchorNode::new(0, true);
        node.attach_model(ModelSelection::resolve("crown"), asset("/models/crown.glb"));
        let model = node.model.as_ref().unwrap();
        assert_eq!(model.transform.translation, Vec3::ZERO);
        assert_eq!(model.transform.rotation, Quat::IDENTITY);
    }

    #[test]
    fn registry_replaces_on_reregistration() {
        let mut registry = AnchorRegistry::new(1);
        assert!(registry.get(0).is_none());

        assert!(registry.register(FaceAnchorNode::new(0, true)));
        assert_eq!(registry.get(0).unwrap().indicators.len(), 2);

        assert!(registry.register(FaceAnchorNode::new(0, false)));
        assert!(registry.get(0).unwrap().indicators.is_empty());
        assert_eq!(registry.iter().count(), 1);
    }

    #[test]
    fn registry_rejects_out_of_range_slots() {
        let mut registry = AnchorRegistry::new(1);
        assert!(!registry.register(FaceAnchorNode::new(3, true)));
        assert_eq!(registry.iter().count(), 0);
    }

    #[test]
    fn tick_reads_expression_store() {
        let mut registry = AnchorRegistry::new(1);
        registry.register(FaceAnchorNode::new(0, true));
        let mut store = ExpressionStore::new(1);
        store.update(0, [0.8, 0.5, 0.1, 0.0]);

        registry.tick(&store);

        let anchor = registry.get(0).unwrap();
        let open = anchor.indicator(ExpressionChannel::MouthOpen).unwrap();
        let smile = anchor.indicator(ExpressionChannel::MouthSmile).unwrap();
        assert_eq!(open.transform.scale.x, 0.8);
        assert_eq!(smile.transform.scale.x, 0.5);
    }
}

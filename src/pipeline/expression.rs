use serde::Serialize;

use crate::pipeline::types::ExpressionChannel;

/// Latest expression values for one face slot, in the tracker's native range.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionRecord {
    pub mouth_open: f32,
    pub mouth_smile: f32,
    pub eyebrow_frown: f32,
    pub eyebrow_raise: f32,
}

impl ExpressionRecord {
    pub fn channel(&self, channel: ExpressionChannel) -> f32 {
        match channel {
            ExpressionChannel::MouthOpen => self.mouth_open,
            ExpressionChannel::MouthSmile => self.mouth_smile,
            ExpressionChannel::EyebrowFrown => self.eyebrow_frown,
            ExpressionChannel::EyebrowRaise => self.eyebrow_raise,
        }
    }
}

/// Fixed-size slot-indexed expression storage.
///
/// Written once per tracking callback, read once per render tick. Values
/// are stored verbatim; clamping is left to the consumer.
#[derive(Debug, Clone)]
pub struct ExpressionStore {
    records: Vec<ExpressionRecord>,
}

impl ExpressionStore {
    /// Allocate `face_slot_count` zeroed records.
    pub fn new(face_slot_count: usize) -> Self {
        Self {
            records: vec![ExpressionRecord::default(); face_slot_count],
        }
    }

    pub fn slot_count(&self) -> usize {
        self.records.len()
    }

    /// Overwrite the four channels of a slot. Out-of-range slots are ignored.
    pub fn update(&mut self, face_index: usize, values: [f32; 4]) {
        let Some(record) = self.records.get_mut(face_index) else {
            tracing::debug!("expression update for unknown face slot {face_index}");
            return;
        };
        let [mouth_open, mouth_smile, eyebrow_frown, eyebrow_raise] = values;
        *record = ExpressionRecord {
            mouth_open,
            mouth_smile,
            eyebrow_frown,
            eyebrow_raise,
        };
    }

    pub fn read(&self, face_index: usize) -> Option<&ExpressionRecord> {
        self.records.get(face_index)
    }
}

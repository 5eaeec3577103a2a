use serde::Serialize;
use std::time::Instant;

/// Counts producer activity over one pipeline run.
pub struct PipelineStats {
    track_count: u64,
    segmentation_count: u64,
    skip_count: u64,
    render_tick_count: u64,
    start_time: Instant,
    last_track_time: Option<Instant>,
}

/// Serialisable snapshot of pipeline statistics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticSnapshot {
    pub track_count: u64,
    pub track_rate: f64,
    pub segmentation_count: u64,
    pub segmentation_rate: f64,
    pub render_tick_count: u64,
    pub render_fps: f64,
    pub skip_count: u64,
    pub skip_rate: f64,
    /// Milliseconds since the last tracking callback, if any.
    pub track_age_ms: Option<f64>,
}

impl PipelineStats {
    /// Create new stats with zeroed counters.
    pub fn new() -> Self {
        Self {
            track_count: 0,
            segmentation_count: 0,
            skip_count: 0,
            render_tick_count: 0,
            start_time: Instant::now(),
            last_track_time: None,
        }
    }

    pub fn record_track(&mut self) {
        self.track_count += 1;
        self.last_track_time = Some(Instant::now());
    }

    /// A segmentation result that reached the output surface.
    pub fn record_segmentation(&mut self) {
        self.segmentation_count += 1;
    }

    /// A camera or segmentation frame dropped for this tick.
    pub fn record_skip(&mut self) {
        self.skip_count += 1;
    }

    pub fn record_render_tick(&mut self) {
        self.render_tick_count += 1;
    }

    pub fn track_count(&self) -> u64 {
        self.track_count
    }

    pub fn segmentation_count(&self) -> u64 {
        self.segmentation_count
    }

    pub fn skip_count(&self) -> u64 {
        self.skip_count
    }

    pub fn render_tick_count(&self) -> u64 {
        self.render_tick_count
    }

    fn rate(&self, count: u64) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < 0.001 {
            return 0.0;
        }
        count as f64 / elapsed
    }

    /// Skipped frames as a percentage (0.0 - 100.0) of all segmentation work.
    pub fn skip_rate(&self) -> f64 {
        let total = self.segmentation_count + self.skip_count;
        if total == 0 {
            return 0.0;
        }
        (self.skip_count as f64 / total as f64) * 100.0
    }

    /// Take a serialisable snapshot.
    pub fn snapshot(&self) -> DiagnosticSnapshot {
        DiagnosticSnapshot {
            track_count: self.track_count,
            track_rate: self.rate(self.track_count),
            segmentation_count: self.segmentation_count,
            segmentation_rate: self.rate(self.segmentation_count),
            render_tick_count: self.render_tick_count,
            render_fps: self.rate(self.render_tick_count),
            skip_count: self.skip_count,
            skip_rate: self.skip_rate(),
            track_age_ms: self
                .last_track_time
                .map(|t| t.elapsed().as_secs_f64() * 1000.0),
        }
    }
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}

use std::time::Duration;

use tokio::task::JoinHandle;

use crate::pipeline::event::{EventSink, PipelineEvent};
use crate::pipeline::types::{Sizing, Viewport};

/// Compute the canonical layout rectangle for a viewport.
///
/// The result is the largest centred square that fits: `width == height ==
/// min(w, h)`, `top == 0`, `left == (w - width) / 2`.
pub fn compute_sizing(viewport: Viewport) -> Sizing {
    let side = viewport.width.min(viewport.height);
    Sizing {
        width: side,
        height: side,
        top: 0,
        left: (viewport.width - side) / 2,
    }
}

/// Owns the current `Sizing` and debounces viewport change events.
///
/// Every `schedule_resize` aborts the pending timer and starts a new one, so
/// a burst of events produces a single `PipelineEvent::ResizeElapsed`,
/// `debounce` after the last event. Each timer carries a generation number;
/// a firing whose generation is stale is ignored even if it raced the abort.
pub struct SizingController {
    current: Sizing,
    debounce: Duration,
    sink: EventSink,
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl SizingController {
    pub fn new(viewport: Viewport, debounce: Duration, sink: EventSink) -> Self {
        Self {
            current: compute_sizing(viewport),
            debounce,
            sink,
            generation: 0,
            pending: None,
        }
    }

    /// The last published sizing.
    pub fn current(&self) -> Sizing {
        self.current
    }

    /// Whether a debounce window is open.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Restart the debounce timer. Must be called inside a tokio runtime.
    pub fn schedule_resize(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        self.generation = self.generation.wrapping_add(1);

        let generation = self.generation;
        let delay = self.debounce;
        let sink = self.sink.clone();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            sink.emit(PipelineEvent::ResizeElapsed { generation });
        }));
    }

    /// Handle a timer firing. Returns the recomputed sizing to republish, or
    /// `None` if the firing belongs to a superseded timer.
    pub fn on_elapsed(&mut self, generation: u64, viewport: Viewport) -> Option<Sizing> {
        if generation != self.generation || self.pending.is_none() {
            tracing::debug!("ignoring stale resize timer (generation {generation})");
            return None;
        }
        self.pending = None;
        self.current = compute_sizing(viewport);
        Some(self.current)
    }

    /// Drop any pending timer without publishing.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for SizingController {
    fn drop(&mut self) {
        self.cancel();
    }
}

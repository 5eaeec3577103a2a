//! Event channel between the independent producers and the orchestrator.
//!
//! Tracker callbacks, segmentation results, render ticks, window events and
//! the resize debounce timer all push into one unbounded channel. The
//! orchestrator is its single consumer, so no two handlers ever run at the
//! same time, but events from different producers interleave in whatever
//! order they were emitted.
//!
//! `Shutdown` travels on a separate control lane that the stream always
//! drains first, so teardown never waits behind queued frames. Camera frames
//! carry a completion handle: the capture task waits on its `FrameReceipt`
//! before grabbing the next frame.

use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;

use crate::collab::types::{
    CameraFrame, SegmentationResults, TrackerSpec, WindowEventKind,
};
use crate::pipeline::types::TrackPayload;

/// Everything the orchestrator reacts to.
#[derive(Debug)]
pub enum PipelineEvent {
    /// Tracker finished loading. Non-zero `error_code` is fatal.
    TrackerReady {
        error_code: i32,
        spec: Option<TrackerSpec>,
    },
    /// Tracker processed a frame.
    Track(TrackPayload),
    /// Capture device delivered a frame for segmentation.
    CameraFrame(CapturedFrame),
    /// Segmenter produced a mask for a frame.
    Segmentation(SegmentationResults),
    /// Renderer is about to draw a frame.
    RenderTick,
    /// Host window resized or changed orientation.
    Window(WindowEventKind),
    /// Resize debounce timer fired.
    ResizeElapsed { generation: u64 },
    /// UI selected a model by name.
    SelectModel(String),
    /// Explicit teardown request (e.g. unmount).
    Shutdown,
}

impl PipelineEvent {
    fn is_control(&self) -> bool {
        matches!(self, Self::Shutdown)
    }
}

/// A camera frame on its way to the segmenter.
#[derive(Debug)]
pub struct CapturedFrame {
    image: CameraFrame,
    done: FrameDone,
}

impl CapturedFrame {
    /// Wrap `image`, returning the receipt the producer waits on.
    pub fn new(image: CameraFrame) -> (Self, FrameReceipt) {
        let (tx, rx) = oneshot::channel();
        let frame = Self {
            image,
            done: FrameDone(tx),
        };
        (frame, FrameReceipt(rx))
    }

    pub fn image(&self) -> &CameraFrame {
        &self.image
    }

    pub fn into_parts(self) -> (CameraFrame, FrameDone) {
        (self.image, self.done)
    }
}

/// Consumer half of a frame handshake. Completing or dropping it releases
/// the producer.
#[derive(Debug)]
pub struct FrameDone(oneshot::Sender<()>);

impl FrameDone {
    pub fn complete(self) {
        let _ = self.0.send(());
    }
}

/// Producer half of a frame handshake.
#[derive(Debug)]
pub struct FrameReceipt(oneshot::Receiver<()>);

impl FrameReceipt {
    /// Resolves once the frame has been consumed or discarded.
    pub async fn wait(self) {
        let _ = self.0.await;
    }
}

/// Producer side of the pipeline channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventSink {
    events: UnboundedSender<PipelineEvent>,
    control: UnboundedSender<PipelineEvent>,
}

impl EventSink {
    /// Push an event. Returns `false` once the pipeline has gone away.
    pub fn emit(&self, event: PipelineEvent) -> bool {
        let lane = if event.is_control() {
            &self.control
        } else {
            &self.events
        };
        match lane.send(event) {
            Ok(()) => true,
            Err(_) => {
                tracing::debug!("pipeline channel closed, dropping event");
                false
            }
        }
    }

    /// Push a camera frame. `None` once the pipeline has gone away.
    pub fn emit_frame(&self, image: CameraFrame) -> Option<FrameReceipt> {
        let (frame, receipt) = CapturedFrame::new(image);
        self.emit(PipelineEvent::CameraFrame(frame)).then_some(receipt)
    }
}

/// Consumer side of the pipeline channel.
#[derive(Debug)]
pub struct EventStream {
    events: UnboundedReceiver<PipelineEvent>,
    control: UnboundedReceiver<PipelineEvent>,
}

impl EventStream {
    /// Wait for the next event; `None` once every sink has been dropped.
    /// Control events are returned ahead of anything already queued.
    pub async fn recv(&mut self) -> Option<PipelineEvent> {
        tokio::select! {
            biased;
            Some(event) = self.control.recv() => Some(event),
            event = self.events.recv() => event,
        }
    }

    /// Take the next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<PipelineEvent> {
        match self.control.try_recv() {
            Ok(event) => return Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => {}
        }
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }
}

/// Create a connected sink/stream pair.
pub fn channel() -> (EventSink, EventStream) {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (control_tx, control_rx) = mpsc::unbounded_channel();
    (
        EventSink {
            events: events_tx,
            control: control_tx,
        },
        EventStream {
            events: events_rx,
            control: control_rx,
        },
    )
}

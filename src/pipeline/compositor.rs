use crate::collab::backend::{BackgroundSource, CaptureDevice};
use crate::collab::types::SegmentationResults;
use crate::pipeline::error::Result;
use crate::pipeline::event::EventSink;
use crate::pipeline::raster::{BlendMode, Surface};
use crate::pipeline::types::Sizing;

/// What a `composite` call did with its frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeOutcome {
    /// Output redrawn. `with_background` is false when no background frame
    /// was available and the area outside the person was left transparent.
    Composited { with_background: bool },
    /// Output surface not laid out yet; frame dropped.
    Skipped,
}

/// Layers the live camera, a person mask and a replacement background.
///
/// Owns the capture device feeding the segmenter and releases it on `stop`
/// or when dropped.
pub struct SegmentationCompositor {
    capture: Box<dyn CaptureDevice>,
    background: Option<Box<dyn BackgroundSource>>,
    output: Surface,
}

impl SegmentationCompositor {
    pub fn new(
        capture: Box<dyn CaptureDevice>,
        background: Option<Box<dyn BackgroundSource>>,
        sizing: Sizing,
    ) -> Self {
        Self {
            capture,
            background,
            output: Surface::new(sizing.width, sizing.height),
        }
    }

    /// Begin frame delivery. The rate is set by the capture device.
    pub fn start(&mut self, sink: EventSink) -> Result<()> {
        self.capture.start(sink)
    }

    /// Release the capture device. Idempotent.
    pub fn stop(&mut self) {
        if self.capture.is_active() {
            self.capture.stop();
            tracing::info!("segmentation capture released");
        }
    }

    pub fn is_active(&self) -> bool {
        self.capture.is_active()
    }

    pub fn resize_output(&mut self, sizing: Sizing) {
        self.output.resize(sizing.width, sizing.height);
    }

    pub fn output(&self) -> &Surface {
        &self.output
    }

    /// Composite one segmentation result onto the output surface.
    ///
    /// The person is cut out by drawing the mask, then the camera frame with
    /// source-in; the background is drawn behind it with destination-over.
    /// Continuous mask values blend proportionally.
    pub fn composite(&mut self, results: &SegmentationResults) -> Result<CompositeOutcome> {
        if self.output.is_empty() {
            return Ok(CompositeOutcome::Skipped);
        }

        self.output.clear();
        self.output.draw_mask(&results.mask)?;
        {
            let mut person = self.output.with_blend(BlendMode::SourceIn);
            person.draw_image(&results.source)?;
        }

        let background = self
            .background
            .as_mut()
            .and_then(|source| source.next_frame())
            // A still-loading source may hand back an empty frame.
            .filter(|frame| frame.width() > 0 && frame.height() > 0);
        let with_background = match background {
            Some(frame) => {
                let mut behind = self.output.with_blend(BlendMode::DestinationOver);
                behind.draw_image(&frame)?;
                true
            }
            None => false,
        };

        self.output.reset_blend();
        Ok(CompositeOutcome::Composited { with_background })
    }
}

impl Drop for SegmentationCompositor {
    fn drop(&mut self) {
        self.stop();
    }
}

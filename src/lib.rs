pub mod collab;
pub mod diagnostics;
pub mod pipeline;
pub mod preview;
pub mod settings;

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use collab::dummy::dummy_collaborators;
use diagnostics::stats::DiagnosticSnapshot;
use pipeline::error::{PipelineError, Result};
use pipeline::event::{channel, PipelineEvent};
use pipeline::orchestrator::{FrameOrchestrator, PipelineState};
use pipeline::types::Viewport;
use settings::types::PipelineSettings;

pub use pipeline::orchestrator::Collaborators;

/// Parameters of a simulated pipeline run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub viewport: Viewport,
    pub duration: Duration,
    /// Switch to this model halfway through the run.
    pub switch_model: Option<String>,
    /// Write the final composite here as JPEG.
    pub snapshot_path: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            viewport: Viewport::new(1280, 720),
            duration: Duration::from_secs(3),
            switch_model: Some("glass".to_string()),
            snapshot_path: None,
        }
    }
}

/// What a simulated run produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub diagnostics: DiagnosticSnapshot,
    pub frames_drawn: u64,
    pub frames_with_face: u64,
    pub final_model: String,
}

/// Run the whole pipeline against simulated collaborators for
/// `options.duration`, then tear it down.
///
/// Must be called inside a tokio runtime.
pub async fn run(settings: PipelineSettings, options: RunOptions) -> Result<RunSummary> {
    settings.validate()?;
    let (collaborators, draw_log) = dummy_collaborators(options.viewport);
    let orchestrator = run_pipeline(settings, collaborators, &options).await?;

    if let Some(path) = &options.snapshot_path {
        write_snapshot(&orchestrator, path)?;
    }

    let drawn = draw_log.snapshot();
    let summary = RunSummary {
        diagnostics: orchestrator.diagnostics(),
        frames_drawn: drawn.frames,
        frames_with_face: drawn.visible_frames,
        final_model: orchestrator.selection().name().to_string(),
    };
    Ok(summary)
}

/// Start a pipeline over `collaborators` and feed it events until the
/// run's timeline shuts it down. A failed start is returned as the error
/// that caused it, after the pipeline's resources have been released.
pub async fn run_pipeline(
    settings: PipelineSettings,
    collaborators: Collaborators,
    options: &RunOptions,
) -> Result<FrameOrchestrator> {
    let (sink, mut stream) = channel();
    let mut orchestrator = FrameOrchestrator::new(settings, collaborators, sink.clone());

    orchestrator.start()?;
    tracing::info!(
        "pipeline started, models available: {}",
        orchestrator.available_models().join(", ")
    );

    let timeline = {
        let sink = sink.clone();
        let duration = options.duration;
        let switch_model = options.switch_model.clone();
        tokio::spawn(async move {
            if let Some(name) = switch_model {
                tokio::time::sleep(duration / 2).await;
                sink.emit(PipelineEvent::SelectModel(name));
                tokio::time::sleep(duration - duration / 2).await;
            } else {
                tokio::time::sleep(duration).await;
            }
            sink.emit(PipelineEvent::Shutdown);
        })
    };

    orchestrator.run(&mut stream).await;
    timeline.abort();

    if orchestrator.state() == PipelineState::Failed {
        let error = orchestrator.take_failure().unwrap_or_else(|| {
            PipelineError::Tracker("pipeline failed without a reported error".to_string())
        });
        orchestrator.shutdown();
        return Err(error);
    }
    Ok(orchestrator)
}

fn write_snapshot(orchestrator: &FrameOrchestrator, path: &std::path::Path) -> Result<()> {
    let output = orchestrator.compositor().output();
    if output.is_empty() {
        tracing::warn!("no composite to write, output is not laid out");
        return Ok(());
    }
    let jpeg = preview::compress::compress_jpeg(&output.to_rgba_image(), 90)?;
    std::fs::write(path, jpeg)?;
    tracing::info!("composite snapshot written to {}", path.display());
    Ok(())
}

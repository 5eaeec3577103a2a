use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use facefilter_lib::settings::types::PipelineSettings;
use facefilter_lib::RunOptions;

/// Usage: `facefilter [seconds] [snapshot.jpg]`
fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = match PipelineSettings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let mut args = std::env::args().skip(1);
    let mut options = RunOptions::default();
    if let Some(seconds) = args.next() {
        match seconds.parse::<f64>() {
            Ok(s) if s > 0.0 => options.duration = Duration::from_secs_f64(s),
            _ => {
                tracing::error!("invalid duration '{seconds}'");
                return ExitCode::FAILURE;
            }
        }
    }
    options.snapshot_path = args.next().map(PathBuf::from);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(facefilter_lib::run(settings, options)) {
        Ok(summary) => {
            match serde_json::to_string_pretty(&summary) {
                Ok(json) => println!("{json}"),
                Err(e) => tracing::warn!("failed to serialise summary: {e}"),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

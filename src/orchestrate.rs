//! `run`: the whole pipeline in one invocation.
//!
//! The two collectors run as child processes of this same executable, one
//! after the other. The merge happens in-process, then the dashboard is
//! started as a child and kept in the foreground until Ctrl+C.

use crate::config::Config;
use crate::error::{BoxError, PipelineError};
use crate::merge;
use std::path::Path;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, info, instrument, warn};

/// Command line for one pipeline stage run as a child process.
pub fn stage_command(exe: &Path, stage: &str, config_path: Option<&str>, api_key: Option<&str>) -> Command {
    let mut cmd = Command::new(exe);
    if let Some(path) = config_path {
        cmd.arg("--config").arg(path);
    }
    cmd.arg(stage);
    if let Some(key) = api_key {
        cmd.env("OPENAI_API_KEY", key);
    }
    cmd.stdin(Stdio::null());
    cmd
}

/// Run `stage` to completion; a non-zero exit aborts the pipeline.
#[instrument(level = "info", skip(exe, config_path, api_key))]
async fn run_stage(exe: &Path, stage: &str, config_path: Option<&str>, api_key: Option<&str>) -> Result<(), BoxError> {
    let status = stage_command(exe, stage, config_path, api_key).status().await?;
    if !status.success() {
        return Err(PipelineError::ChildFailed {
            stage: stage.to_string(),
            status: status.to_string(),
        }
        .into());
    }
    info!(stage, "Stage finished");
    Ok(())
}

async fn stop_viewer(mut viewer: Child) {
    match viewer.kill().await {
        Ok(()) => info!("Dashboard stopped"),
        Err(e) => debug!(error = %e, "Dashboard already gone"),
    }
}

#[instrument(level = "info", skip_all)]
pub async fn run(config: &Config, config_path: Option<&str>) -> Result<(), BoxError> {
    let exe = std::env::current_exe()?;
    let api_key = config.model.api_key.as_deref();

    info!("Running news collectors");
    run_stage(&exe, "ai-collect", config_path, api_key).await?;
    run_stage(&exe, "collect", config_path, api_key).await?;

    let merged = merge::run(config)?;
    info!(merged, "News collector finished");

    let mut viewer = stage_command(&exe, "view", config_path, None).spawn()?;
    info!(bind = %config.viewer.bind, "Dashboard started. Press Ctrl+C to stop it and exit.");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Stopping dashboard");
            stop_viewer(viewer).await;
        }
        status = viewer.wait() => {
            warn!(status = ?status, "Dashboard exited on its own");
        }
    }
    Ok(())
}

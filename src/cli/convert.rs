use anyhow::Result;
use log::info;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use mzgroup::failure::{FailureLog, FailureLogError, FailureRecord};
use mzgroup::manifest::Manifest;
use mzgroup::pipeline::{GroupOutcome, GroupProcessor, UNKNOWN_SOURCE_FILE};
use mzgroup::remote::{FtpTransport, RemoteLocator};

use super::config::Config;
use super::print_status;

/// Task id used when neither the flag, the environment nor the config names one
const DEFAULT_TASK_ID: &str = "unknown";

/// Convert one manifest group to MGF
pub fn run(
    manifest: PathBuf,
    config: Option<PathBuf>,
    pipeline_dir: Option<PathBuf>,
    task_id: Option<String>,
    download_dir: Option<PathBuf>,
    host: Option<String>,
) -> Result<ExitCode> {
    let config = match config {
        Some(path) => match Config::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                // Without a config only flags, environment and defaults name the log
                let failure_log = FailureLog::new(
                    pipeline_dir.as_deref().unwrap_or(Path::new(".")),
                    Some(task_id.as_deref().unwrap_or(DEFAULT_TASK_ID)),
                );
                record_setup_failure(&failure_log, &manifest, &e);
                return Ok(ExitCode::FAILURE);
            }
        },
        None => Config::default(),
    };

    let mut layout = config.archive;
    if let Some(host) = host {
        layout.host = host;
    }
    let pipeline_dir = pipeline_dir
        .or(config.failure_log.pipeline_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    let task_id = task_id
        .or(config.failure_log.task_id)
        .unwrap_or_else(|| DEFAULT_TASK_ID.to_string());
    let download_dir = download_dir
        .or(config.failure_log.download_dir)
        .unwrap_or_else(|| PathBuf::from("."));

    info!("mzgroup - manifest to MGF");
    info!("Manifest:     {}", manifest.display());
    info!("Archive:      {}:{}", layout.host, layout.port);
    info!("Pipeline dir: {}", pipeline_dir.display());
    info!("Task id:      {task_id}");

    let failure_log = FailureLog::new(&pipeline_dir, Some(&task_id));

    if let Err(e) = std::fs::create_dir_all(&download_dir) {
        let error = anyhow::Error::new(e).context(format!(
            "Failed to create download directory: {}",
            download_dir.display()
        ));
        record_setup_failure(&failure_log, &manifest, &error);
        return Ok(ExitCode::FAILURE);
    }

    let transport = FtpTransport::new(layout.host.clone(), layout.port);
    let locator = RemoteLocator::new(transport, layout).with_download_dir(&download_dir);
    let mut processor = GroupProcessor::new(locator, failure_log.clone());

    let result = panic::catch_unwind(AssertUnwindSafe(|| processor.process(&manifest)));

    match result {
        Ok(Ok(GroupOutcome::Converted { output, spectra })) => {
            print_status(true, &format!("Wrote {spectra} spectra to {}", output.display()));
            Ok(ExitCode::SUCCESS)
        }
        Ok(Ok(GroupOutcome::Failed { log_path, .. })) => {
            print_status(false, &format!("Wrote {}", log_path.display()));
            Ok(ExitCode::FAILURE)
        }
        Ok(Err(unrecorded)) => {
            eprintln!(
                "Critical error: Failed to log failure. Original error: {}",
                unrecorded.record.error_message
            );
            eprintln!("Logging error: {}", unrecorded.source);
            Ok(ExitCode::FAILURE)
        }
        Err(payload) => {
            record_panic(&failure_log, &manifest, payload.as_ref());
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Write a failure record for a panic raised while processing `manifest`
fn record_panic(failure_log: &FailureLog, manifest: &Path, payload: &(dyn Any + Send)) {
    let reason = panic_message(payload);
    let message = format!("Unexpected panic while processing {}: {reason}", manifest.display());
    match record_failure(failure_log, manifest, message) {
        Ok(path) => print_status(
            false,
            &format!("Unexpected panic caught and logged to {}", path.display()),
        ),
        Err(e) => {
            eprintln!("Critical error: Failed to log panic. Original error: {reason}");
            eprintln!("Logging error: {e}");
        }
    }
}

/// Write a failure record for an error raised before the group could be processed
fn record_setup_failure(failure_log: &FailureLog, manifest: &Path, error: &anyhow::Error) {
    let message = format!("Error processing {}: {error:#}", manifest.display());
    match record_failure(failure_log, manifest, message) {
        Ok(path) => print_status(false, &format!("Wrote {}", path.display())),
        Err(e) => {
            eprintln!("Critical error: Failed to log failure. Original error: {error:#}");
            eprintln!("Logging error: {e}");
        }
    }
}

/// Record `message` against the manifest's file, or `unknown_mzml_file` when it is unreadable
fn record_failure(
    failure_log: &FailureLog,
    manifest: &Path,
    message: String,
) -> Result<PathBuf, FailureLogError> {
    let (filename, count) = match Manifest::from_tsv_file(manifest) {
        Ok(m) => (m.filename().to_string(), m.len()),
        Err(_) => (UNKNOWN_SOURCE_FILE.to_string(), 0),
    };
    let record = FailureRecord::new(filename, message, count);
    failure_log.write(manifest, &record)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

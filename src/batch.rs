//! Batch driver
//!
//! Runs the pipeline over a list of model ids, one at a time. A failing model
//! is appended to the error log and the batch moves on; only a failure to
//! write that log stops the run.

use crate::error::{HubmetaError, PipelineError, Result};
use crate::hub::HubApi;
use crate::models::fetch::RepoFetcher;
use crate::models::pipeline::{Outcome, Pipeline};
use indicatif::ProgressBar;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only log of failed models, two lines per failure
#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append the model id, then the error message, each on its own line
    pub fn append(&self, model_id: &str, error: &PipelineError) -> Result<()> {
        let message = error.to_string().lines().collect::<Vec<_>>().join(" ");

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| self.write_error(source))?;

        writeln!(file, "{model_id}\n{message}").map_err(|source| self.write_error(source))
    }

    fn write_error(&self, source: std::io::Error) -> HubmetaError {
        HubmetaError::ErrorLog {
            path: self.path.clone(),
            source,
        }
    }
}

/// Counts of how each model ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub skipped: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.skipped + self.succeeded + self.failed
    }
}

/// Sequential driver over the per-model pipeline
#[derive(Debug)]
pub struct BatchDriver<H, F> {
    pipeline: Pipeline<H, F>,
    error_log: ErrorLog,
}

impl<H: HubApi, F: RepoFetcher> BatchDriver<H, F> {
    pub fn new(pipeline: Pipeline<H, F>, error_log: ErrorLog) -> Self {
        Self {
            pipeline,
            error_log,
        }
    }

    #[must_use]
    pub fn pipeline(&self) -> &Pipeline<H, F> {
        &self.pipeline
    }

    /// Process every id in order
    pub async fn run(&self, model_ids: &[String], progress: &ProgressBar) -> Result<BatchSummary> {
        let mut summary = BatchSummary::default();

        for model_id in model_ids {
            progress.set_message(model_id.clone());

            match self.pipeline.process(model_id).await {
                Ok(Outcome::Skipped) => {
                    summary.skipped += 1;
                    progress.suspend(|| println!("{model_id} already exists."));
                }
                Ok(Outcome::Stored(record)) => {
                    summary.succeeded += 1;
                    progress.suspend(|| {
                        println!(
                            "✓ {model_id} ({} bytes, {} downloads)",
                            record.size_bytes, record.downloads
                        );
                    });
                }
                Err(e) => {
                    summary.failed += 1;
                    progress.suspend(|| {
                        tracing::warn!(model_id = %model_id, error = %e, "Model failed");
                        println!("{e}");
                    });
                    self.error_log.append(model_id, &e)?;
                }
            }

            progress.inc(1);
        }

        progress.suspend(|| {
            tracing::info!(
                skipped = summary.skipped,
                succeeded = summary.succeeded,
                failed = summary.failed,
                "Batch complete"
            );
        });

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_error_log_appends_two_lines() {
        let temp_dir = TempDir::new().unwrap();
        let log = ErrorLog::new(temp_dir.path().join("error.txt"));

        let first = PipelineError::Fetch {
            model_id: "org/a".to_string(),
            reason: "boom".to_string(),
        };
        let second = PipelineError::Fetch {
            model_id: "b".to_string(),
            reason: "bang".to_string(),
        };
        log.append("org/a", &first).unwrap();
        log.append("b", &second).unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "org/a",
                "Failed to clone org/a: boom",
                "b",
                "Failed to clone b: bang"
            ]
        );
    }

    #[test]
    fn test_error_log_flattens_multiline_messages() {
        let temp_dir = TempDir::new().unwrap();
        let log = ErrorLog::new(temp_dir.path().join("error.txt"));

        let error = PipelineError::Fetch {
            model_id: "gpt2".to_string(),
            reason: "line one\nline two".to_string(),
        };
        log.append("gpt2", &error).unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_error_log_unwritable_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let log = ErrorLog::new(temp_dir.path().join("missing-dir/error.txt"));

        let error = PipelineError::Fetch {
            model_id: "gpt2".to_string(),
            reason: "x".to_string(),
        };
        assert!(matches!(
            log.append("gpt2", &error),
            Err(HubmetaError::ErrorLog { .. })
        ));
    }

    #[test]
    fn test_summary_total() {
        let summary = BatchSummary {
            skipped: 1,
            succeeded: 2,
            failed: 3,
        };
        assert_eq!(summary.total(), 6);
    }
}

use crate::error::PipelineError;
use crate::hub::{fetch_downloads, HubApi};
use crate::models::cache::{RecordCache, Reservation};
use crate::models::fetch::{RepoFetcher, WorkingRepo};
use crate::models::record::{cache_key, CacheRecord};
use crate::models::size::select_source;
use std::path::PathBuf;

pub const README_FILE: &str = "README.md";

/// How a model's pipeline run ended without error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A record or placeholder already existed; nothing was done
    Skipped,
    /// A new record was written
    Stored(CacheRecord),
}

/// Per-model metadata pipeline: gate, clone, size, readme, downloads, persist
///
/// Runs at most once per cache key. The slot is reserved before any network
/// work, and a failed run leaves the empty placeholder behind, so later runs
/// skip that key until the placeholder is cleared.
#[derive(Debug)]
pub struct Pipeline<H, F> {
    cache: RecordCache,
    work_root: PathBuf,
    hub: H,
    fetcher: F,
}

impl<H: HubApi, F: RepoFetcher> Pipeline<H, F> {
    pub fn new(cache: RecordCache, work_root: impl Into<PathBuf>, hub: H, fetcher: F) -> Self {
        Self {
            cache,
            work_root: work_root.into(),
            hub,
            fetcher,
        }
    }

    #[must_use]
    pub fn cache(&self) -> &RecordCache {
        &self.cache
    }

    #[must_use]
    pub fn hub(&self) -> &H {
        &self.hub
    }

    #[must_use]
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Run the pipeline for one model id
    pub async fn process(&self, model_id: &str) -> Result<Outcome, PipelineError> {
        let key = cache_key(model_id);

        let slot = match self.cache.reserve(key) {
            Ok(Reservation::Reserved(slot)) => slot,
            Ok(Reservation::Cached(path)) => {
                tracing::debug!(model_id = %model_id, path = %path.display(), "Already cached");
                return Ok(Outcome::Skipped);
            }
            Err(source) => {
                return Err(PipelineError::Reserve {
                    path: self.cache.record_path(key),
                    source,
                })
            }
        };

        // Dropping `repo` removes the clone on every return below.
        let repo = WorkingRepo::create(&self.work_root, key).map_err(|source| {
            PipelineError::Workspace {
                model_id: model_id.to_string(),
                source,
            }
        })?;

        self.fetcher.fetch(model_id, repo.path()).await?;

        let size_bytes = {
            let source = select_source(repo.path());
            source.resolve().map_err(|e| PipelineError::Size {
                model_id: model_id.to_string(),
                path: source.path().to_path_buf(),
                reason: e.to_string(),
            })?
        };
        tracing::debug!(model_id = %model_id, size_bytes, "Resolved weight size");

        let readme_path = repo.path().join(README_FILE);
        let description = tokio::fs::read_to_string(&readme_path)
            .await
            .map_err(|e| PipelineError::Readme {
                model_id: model_id.to_string(),
                path: readme_path.clone(),
                reason: e.to_string(),
            })?;

        let downloads = fetch_downloads(&self.hub, model_id)
            .await
            .map_err(|source| PipelineError::ModelInfo {
                model_id: model_id.to_string(),
                source,
            })?;
        tracing::debug!(model_id = %model_id, downloads, "Fetched download count");

        let record = CacheRecord {
            pretrained_model_name: model_id.to_string(),
            description,
            size_bytes,
            downloads,
        };

        self.cache
            .store(&slot, &record)
            .map_err(|source| PipelineError::Persist {
                path: slot.path().to_path_buf(),
                source,
            })?;

        tracing::debug!(
            model_id = %model_id,
            size_bytes,
            downloads,
            path = %slot.path().display(),
            "Stored model record"
        );

        drop(repo);
        Ok(Outcome::Stored(record))
    }
}

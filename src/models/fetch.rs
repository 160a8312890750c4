use crate::error::{HubmetaError, PipelineError, Result};
use async_trait::async_trait;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::TempDir;
use tokio::process::Command;

/// Places a model repository's files into a local directory
#[async_trait]
pub trait RepoFetcher: Send + Sync {
    /// Populate `dest` (an existing, empty directory) with the repository of `model_id`
    async fn fetch(&self, model_id: &str, dest: &Path) -> std::result::Result<(), PipelineError>;
}

/// Metadata-only `git clone` from the hub
///
/// Runs with `GIT_LFS_SKIP_SMUDGE=1`, so weight files arrive as LFS pointer
/// files instead of the actual tensors. There is no timeout on the clone.
#[derive(Debug, Clone)]
pub struct GitFetcher {
    git: PathBuf,
    endpoint: String,
}

impl GitFetcher {
    /// Create a fetcher using the given git binary and hub endpoint
    ///
    /// # Errors
    /// - Returns error if the git binary cannot be found
    pub fn new(git: &str, endpoint: &str) -> Result<Self> {
        let git = which::which(git).map_err(|e| {
            HubmetaError::Config(format!("git binary '{git}' not found in PATH: {e}"))
        })?;

        Ok(Self {
            git,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Clone URL for a model repository
    #[must_use]
    pub fn clone_url(&self, model_id: &str) -> String {
        format!("{}/{}", self.endpoint, model_id)
    }
}

#[async_trait]
impl RepoFetcher for GitFetcher {
    async fn fetch(&self, model_id: &str, dest: &Path) -> std::result::Result<(), PipelineError> {
        let url = self.clone_url(model_id);
        tracing::debug!(model_id = %model_id, url = %url, dest = %dest.display(), "Cloning repository");

        let status = Command::new(&self.git)
            .arg("clone")
            .arg(&url)
            .arg(dest)
            .env("GIT_LFS_SKIP_SMUDGE", "1")
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| PipelineError::Fetch {
                model_id: model_id.to_string(),
                reason: format!("failed to run {}: {e}", self.git.display()),
            })?;

        // A failed clone leaves missing files behind, which size resolution reports.
        if !status.success() {
            tracing::debug!(model_id = %model_id, status = %status, "git clone exited unsuccessfully");
        }

        Ok(())
    }
}

/// Scoped working directory for one model's clone
///
/// Named after the cache key and removed when dropped, whichever way the
/// pipeline exits.
#[derive(Debug)]
pub struct WorkingRepo {
    path: PathBuf,
    dir: Option<TempDir>,
}

impl WorkingRepo {
    /// Create an empty directory `<root>/<key>-XXXXXX`
    pub fn create(root: &Path, key: &str) -> io::Result<Self> {
        fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("{key}-"))
            .tempdir_in(root)?;

        Ok(Self {
            path: dir.path().to_path_buf(),
            dir: Some(dir),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkingRepo {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            match dir.close() {
                Ok(()) => tracing::debug!(path = %self.path.display(), "Removed working directory"),
                Err(e) => tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to remove working directory"
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_working_repo_named_after_key() {
        let root = TempDir::new().unwrap();
        let repo = WorkingRepo::create(root.path(), "model-x").unwrap();

        assert!(repo.path().is_dir());
        assert!(repo.path().starts_with(root.path()));
        let name = repo.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("model-x-"));
    }

    #[test]
    fn test_working_repo_removed_on_drop() {
        let root = TempDir::new().unwrap();
        let repo = WorkingRepo::create(root.path(), "gpt2").unwrap();
        fs::create_dir_all(repo.path().join(".git/objects")).unwrap();
        fs::write(repo.path().join("README.md"), "hello").unwrap();
        let path = repo.path().to_path_buf();

        drop(repo);
        assert!(!path.exists());
    }

    #[test]
    fn test_working_repos_for_same_key_do_not_collide() {
        let root = TempDir::new().unwrap();
        let first = WorkingRepo::create(root.path(), "gpt2").unwrap();
        let second = WorkingRepo::create(root.path(), "gpt2").unwrap();
        assert_ne!(first.path(), second.path());
    }

    #[test]
    fn test_working_repo_creates_root() {
        let root = TempDir::new().unwrap();
        let nested = root.path().join("work/nested");
        let repo = WorkingRepo::create(&nested, "t5-small").unwrap();
        assert!(repo.path().starts_with(&nested));
    }

    #[test]
    fn test_git_fetcher_missing_binary() {
        let result = GitFetcher::new("definitely-not-a-git-binary-1234", "https://huggingface.co");
        assert!(matches!(result, Err(HubmetaError::Config(_))));
    }

    #[test]
    fn test_clone_url() {
        // If git is not installed there is nothing to check
        if let Ok(fetcher) = GitFetcher::new("git", "https://huggingface.co/") {
            assert_eq!(fetcher.clone_url("org/model-x"), "https://huggingface.co/org/model-x");
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fetch_runs_clone_without_lfs_and_tolerates_failure() {
        use std::os::unix::fs::PermissionsExt;

        let bin = TempDir::new().unwrap();
        let script = bin.path().join("fake-git");
        fs::write(
            &script,
            "#!/bin/sh\n\
             printf '%s\\n' \"$@\" > \"$3/args.txt\"\n\
             printf '%s\\n' \"$GIT_LFS_SKIP_SMUDGE\" > \"$3/lfs.txt\"\n\
             exit 1\n",
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let fetcher =
            GitFetcher::new(script.to_str().unwrap(), "https://hub.example/").unwrap();
        let root = TempDir::new().unwrap();
        let repo = WorkingRepo::create(root.path(), "model-x").unwrap();

        // A non-zero exit is left for size resolution to report
        fetcher.fetch("org/model-x", repo.path()).await.unwrap();

        let args = fs::read_to_string(repo.path().join("args.txt")).unwrap();
        let dest = repo.path().to_string_lossy().to_string();
        assert_eq!(
            args.lines().collect::<Vec<_>>(),
            vec!["clone", "https://hub.example/org/model-x", dest.as_str()]
        );
        let lfs = fs::read_to_string(repo.path().join("lfs.txt")).unwrap();
        assert_eq!(lfs.trim_end(), "1");
    }

    #[tokio::test]
    #[ignore = "requires git and network access"]
    async fn test_clone_small_repo() {
        let fetcher = GitFetcher::new("git", "https://huggingface.co").expect("git must be installed");
        let root = TempDir::new().unwrap();
        let repo = WorkingRepo::create(root.path(), "tiny-gpt2").unwrap();

        fetcher
            .fetch("sshleifer/tiny-gpt2", repo.path())
            .await
            .unwrap();
        assert!(repo.path().join("config.json").exists());
    }
}

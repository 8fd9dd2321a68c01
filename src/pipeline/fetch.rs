//! Repository materialization.
//!
//! `RepositoryFetcher` places a fresh clone of a remote repository at
//! `<base>/<repository-name>`, removing any copy left by an earlier run.

use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

use super::persist::force_remove;
use crate::ai::with_timeout;
use crate::constants::pipeline;
use crate::types::{DocError, Result};

/// Final `/`-delimited segment of a repository URL.
///
/// Trailing slashes are ignored; `.git` suffixes are kept as part of the name.
pub fn repo_name_from_url(url: &str) -> Result<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(DocError::invalid_input("Repository URL is empty"));
    }

    let name = trimmed
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();

    if name.is_empty() || name == "." || name == ".." {
        return Err(DocError::invalid_input(format!(
            "Cannot derive a repository name from '{}'",
            url
        )));
    }

    Ok(name.to_string())
}

/// Trimmed `url` when it uses the http or https scheme
pub fn check_source_url(url: &str) -> Result<&str> {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(url)
    } else {
        Err(DocError::invalid_input(
            "repository URL must start with http:// or https://",
        ))
    }
}

/// Version-control client used to clone a repository
#[async_trait]
pub trait RepositoryCloner: Send + Sync {
    /// Clone `url` into `destination`, which does not exist yet
    async fn clone_repo(&self, url: &str, destination: &Path) -> Result<()>;
}

/// Clones with the `git` executable
#[derive(Debug, Clone)]
pub struct GitCloner {
    program: String,
    shallow: bool,
}

impl Default for GitCloner {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
            shallow: true,
        }
    }
}

impl GitCloner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch full history instead of `--depth 1`
    pub fn full_history(mut self) -> Self {
        self.shallow = false;
        self
    }
}

#[async_trait]
impl RepositoryCloner for GitCloner {
    async fn clone_repo(&self, url: &str, destination: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("clone");
        if self.shallow {
            cmd.arg("--depth").arg("1");
        }
        cmd.arg("--")
            .arg(url)
            .arg(destination)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = cmd
            .output()
            .await
            .map_err(|e| DocError::fetch(url, format!("failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.trim();
            return Err(DocError::fetch(
                url,
                if detail.is_empty() {
                    format!("{} clone exited with {}", self.program, output.status)
                } else {
                    detail.to_string()
                },
            ));
        }

        Ok(())
    }
}

pub struct RepositoryFetcher {
    base_dir: PathBuf,
    cloner: Arc<dyn RepositoryCloner>,
    timeout: Duration,
}

impl RepositoryFetcher {
    pub fn new(base_dir: impl Into<PathBuf>, cloner: Arc<dyn RepositoryCloner>) -> Self {
        Self {
            base_dir: base_dir.into(),
            cloner,
            timeout: Duration::from_secs(pipeline::CLONE_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn local_path_for(&self, source_url: &str) -> Result<PathBuf> {
        Ok(self.base_dir.join(repo_name_from_url(source_url)?))
    }

    /// Clone `source_url` to its deterministic local path, replacing any stale copy
    pub async fn materialize(&self, source_url: &str) -> Result<PathBuf> {
        let local_path = self.local_path_for(source_url)?;

        if local_path.exists() {
            debug!(path = %local_path.display(), "Removing previous checkout");
            force_remove(&local_path).map_err(|e| {
                DocError::fetch(
                    source_url,
                    format!("cannot remove {}: {}", local_path.display(), e),
                )
            })?;
        }

        fs::create_dir_all(&self.base_dir).map_err(|e| {
            DocError::fetch(
                source_url,
                format!("cannot create {}: {}", self.base_dir.display(), e),
            )
        })?;

        info!(url = source_url, path = %local_path.display(), "Cloning repository");
        with_timeout(
            self.timeout,
            self.cloner.clone_repo(source_url, &local_path),
            "repository clone",
        )
        .await?;

        Ok(local_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Writes one marker file per clone, named after the clone count
    struct CountingCloner {
        count: AtomicUsize,
    }

    #[async_trait]
    impl RepositoryCloner for CountingCloner {
        async fn clone_repo(&self, url: &str, destination: &Path) -> Result<()> {
            let n = self.count.fetch_add(1, Ordering::SeqCst) + 1;
            fs::create_dir_all(destination)?;
            fs::write(destination.join(format!("clone-{}", n)), url)?;
            Ok(())
        }
    }

    struct RejectingCloner;

    #[async_trait]
    impl RepositoryCloner for RejectingCloner {
        async fn clone_repo(&self, url: &str, _destination: &Path) -> Result<()> {
            Err(DocError::fetch(url, "repository not found"))
        }
    }

    #[test]
    fn test_check_source_url() {
        assert_eq!(
            check_source_url("  https://github.com/org/repo ").unwrap(),
            "https://github.com/org/repo"
        );
        assert!(check_source_url("http://host/repo").is_ok());
        assert!(check_source_url("git@github.com:org/repo.git").is_err());
        assert!(check_source_url("").is_err());
    }

    #[test]
    fn test_repo_name_from_url() {
        assert_eq!(
            repo_name_from_url("https://example.com/org/sample-repo").unwrap(),
            "sample-repo"
        );
        assert_eq!(
            repo_name_from_url("https://github.com/org/tool/").unwrap(),
            "tool"
        );
        assert_eq!(
            repo_name_from_url("https://github.com/org/tool.git").unwrap(),
            "tool.git"
        );
    }

    #[test]
    fn test_repo_name_rejects_invalid() {
        for url in ["", "   ", "https://example.com/org/..", "///"] {
            assert!(
                matches!(repo_name_from_url(url), Err(DocError::InvalidInput(_))),
                "{url:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_materialize_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let cloner = Arc::new(CountingCloner {
            count: AtomicUsize::new(0),
        });
        let fetcher = RepositoryFetcher::new(temp.path().join("workdir"), cloner);
        let url = "https://example.com/org/sample-repo";

        let first = fetcher.materialize(url).await.unwrap();
        let second = fetcher.materialize(url).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second, temp.path().join("workdir/sample-repo"));

        let entries: Vec<_> = fs::read_dir(&second)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries, vec!["clone-2"]);

        let siblings = fs::read_dir(temp.path().join("workdir")).unwrap().count();
        assert_eq!(siblings, 1);
    }

    #[tokio::test]
    async fn test_materialize_propagates_fetch_error() {
        let temp = TempDir::new().unwrap();
        let fetcher = RepositoryFetcher::new(temp.path(), Arc::new(RejectingCloner));

        let err = fetcher
            .materialize("https://example.com/org/missing")
            .await
            .unwrap_err();
        assert!(matches!(err, DocError::Fetch { .. }));
        assert!(err.to_string().contains("repository not found"));
    }

    #[tokio::test]
    async fn test_git_clone_failure_is_fetch_error() {
        let temp = TempDir::new().unwrap();
        let missing_source = temp.path().join("no-such-repo");
        let url = missing_source.to_string_lossy().to_string();

        let err = GitCloner::new()
            .clone_repo(&url, &temp.path().join("dest"))
            .await
            .unwrap_err();
        assert!(matches!(err, DocError::Fetch { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_materialize_replaces_read_only_checkout() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let stale = temp.path().join("sample-repo/.git/objects");
        fs::create_dir_all(&stale).unwrap();
        fs::write(stale.join("pack"), "old").unwrap();
        fs::set_permissions(stale.join("pack"), fs::Permissions::from_mode(0o444)).unwrap();
        fs::set_permissions(&stale, fs::Permissions::from_mode(0o555)).unwrap();

        let cloner = Arc::new(CountingCloner {
            count: AtomicUsize::new(0),
        });
        let fetcher = RepositoryFetcher::new(temp.path(), cloner);
        let path = fetcher
            .materialize("https://example.com/org/sample-repo")
            .await
            .unwrap();

        assert!(!path.join(".git").exists());
        assert!(path.join("clone-1").exists());
    }
}

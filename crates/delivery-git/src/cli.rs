//! `git` command-line implementation of [`RepoTool`].

use async_trait::async_trait;
use delivery_types::{RelativeFilePath, RepoReference};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::ToolError;
use crate::tool::RepoTool;

/// Runs the system `git` binary with hardened settings.
///
/// Every invocation:
/// - sets `GIT_TERMINAL_PROMPT=0` so a missing credential fails instead of
///   blocking on a prompt
/// - sets `GIT_LFS_SKIP_SMUDGE=1`
/// - disables hooks with `core.hooksPath=`
/// - is killed when its future is dropped
///
/// Forwarded credentials are passed as an `http.extraHeader` through
/// `GIT_CONFIG_*` environment variables, never on the command line.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitCli {
    /// Creates a wrapper around `program`, looked up on `PATH` if relative.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Checks that `program` runs, returning the wrapper and its version line.
    pub async fn discover(program: impl Into<PathBuf>) -> Result<(Self, String), ToolError> {
        let cli = Self::new(program);
        let mut cmd = Command::new(&cli.program);
        cmd.arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let stdout = cli.run(cmd, None).await?;
        let version = String::from_utf8_lossy(&stdout).trim().to_string();
        Ok((cli, version))
    }

    /// Returns the program path.
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, repo: &RepoReference, dir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.env("GIT_TERMINAL_PROMPT", "0")
            .env("GIT_LFS_SKIP_SMUDGE", "1")
            .args(["-c", "core.hooksPath="])
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(credentials) = repo.credentials() {
            cmd.env("GIT_CONFIG_COUNT", "1")
                .env("GIT_CONFIG_KEY_0", "http.extraHeader")
                .env(
                    "GIT_CONFIG_VALUE_0",
                    format!("Authorization: {}", credentials.to_authorization()),
                );
        }

        cmd
    }

    async fn run(&self, mut cmd: Command, input: Option<&[u8]>) -> Result<Vec<u8>, ToolError> {
        let spawn_error = |source| ToolError::Spawn {
            program: self.program.display().to_string(),
            source,
        };

        if input.is_some() {
            cmd.stdin(Stdio::piped());
        }

        let mut child = cmd.spawn().map_err(spawn_error)?;

        if let (Some(input), Some(mut stdin)) = (input, child.stdin.take()) {
            stdin.write_all(input).await.map_err(spawn_error)?;
        }

        let output = child.wait_with_output().await.map_err(spawn_error)?;

        if !output.status.success() {
            return Err(ToolError::Exit {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl RepoTool for GitCli {
    async fn clone_sparse(&self, repo: &RepoReference, dest: &Path) -> Result<(), ToolError> {
        debug!(repo = %repo, dest = %dest.display(), "git clone");

        let mut cmd = self.command(repo, dest);
        cmd.args(["clone", "--filter=blob:none", "--depth=1", "--sparse", "--"])
            .arg(repo.url().as_str())
            .arg(dest);

        self.run(cmd, None).await.map(drop)
    }

    async fn init_sparse_checkout(
        &self,
        repo: &RepoReference,
        dir: &Path,
    ) -> Result<(), ToolError> {
        debug!(repo = %repo, "git sparse-checkout init");

        let mut cmd = self.command(repo, dir);
        cmd.args(["sparse-checkout", "init", "--cone"]);

        self.run(cmd, None).await.map(drop)
    }

    async fn list_tree(
        &self,
        repo: &RepoReference,
        dir: &Path,
        file: &RelativeFilePath,
    ) -> Result<Vec<u8>, ToolError> {
        debug!(repo = %repo, file = %file, "git ls-tree");

        let mut cmd = self.command(repo, dir);
        cmd.args(["ls-tree", "-z", "HEAD", "--", file.as_str()]);

        self.run(cmd, None).await
    }

    async fn set_sparse_checkout(
        &self,
        repo: &RepoReference,
        dir: &Path,
        file: &RelativeFilePath,
    ) -> Result<(), ToolError> {
        debug!(repo = %repo, file = %file, "git sparse-checkout set");

        // Patterns go through stdin so a path starting with '-' is never
        // read as an option.
        let mut cmd = self.command(repo, dir);
        cmd.args(["sparse-checkout", "set", "--stdin"]);

        let input = format!("{file}\n");
        self.run(cmd, Some(input.as_bytes())).await.map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, FetchStage};
    use crate::orchestrator::FetchOrchestrator;
    use crate::tree::{ObjectKind, TreeInspection};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    const FILES: &[(&str, &str)] = &[
        ("README", "Hello World!\n"),
        ("docs/top.md", "# Top\n"),
        ("docs/guide/intro.md", "# Intro\n"),
    ];

    fn git(dir: &Path, args: &[&str]) {
        let output = std::process::Command::new("git")
            .args(["-c", "user.name=Delivery Test", "-c", "user.email=test@example.com"])
            .args(["-c", "init.defaultBranch=main"])
            .args(args)
            .current_dir(dir)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }

    /// Creates a repository and a blob-filtered sparse clone of it.
    fn blobless_clone() -> (TempDir, PathBuf) {
        let root = tempfile::tempdir().unwrap();
        let origin = root.path().join("origin");
        std::fs::create_dir(&origin).unwrap();

        git(&origin, &["init", "-q"]);
        for (path, content) in FILES {
            let target = origin.join(path);
            std::fs::create_dir_all(target.parent().unwrap()).unwrap();
            std::fs::write(target, content).unwrap();
        }
        git(&origin, &["add", "."]);
        git(&origin, &["commit", "-q", "-m", "initial"]);
        git(&origin, &["config", "uploadpack.allowFilter", "true"]);
        git(&origin, &["config", "uploadpack.allowAnySHA1InWant", "true"]);

        let url = format!("file://{}", origin.display());
        git(
            root.path(),
            &["clone", "-q", "--filter=blob:none", "--depth=1", "--sparse", &url, "checkout"],
        );

        let checkout = root.path().join("checkout");
        (root, checkout)
    }

    fn repo() -> RepoReference {
        RepoReference::new("github", "octocat", "Hello-World").unwrap()
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let err = GitCli::discover("/nonexistent/bin/git-delivery-test")
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_discover_reports_version() {
        let (cli, version) = GitCli::discover("git").await.unwrap();
        assert_eq!(cli.program(), Path::new("git"));
        assert!(version.starts_with("git version"));
    }

    #[tokio::test]
    async fn test_clone_into_missing_dir_fails_to_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone");

        let err = GitCli::default()
            .clone_sparse(&repo(), &missing)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_sparse_checkout_materializes_single_files() {
        let (_root, checkout) = blobless_clone();
        let cli = GitCli::default();
        let repo = repo();

        cli.init_sparse_checkout(&repo, &checkout).await.unwrap();

        for (path, content) in FILES {
            let file = RelativeFilePath::new(*path).unwrap();

            let listing = cli.list_tree(&repo, &checkout, &file).await.unwrap();
            let entry = TreeInspection::parse(&listing)
                .unwrap()
                .into_blob(path)
                .unwrap();
            assert_eq!(entry.kind, ObjectKind::Blob);
            assert_eq!(entry.path, *path);

            cli.set_sparse_checkout(&repo, &checkout, &file)
                .await
                .unwrap();
            assert_eq!(
                std::fs::read_to_string(checkout.join(path)).unwrap(),
                *content
            );
        }
    }

    #[tokio::test]
    async fn test_list_tree_directory_and_missing_path() {
        let (_root, checkout) = blobless_clone();
        let cli = GitCli::default();
        let repo = repo();
        cli.init_sparse_checkout(&repo, &checkout).await.unwrap();

        let docs = RelativeFilePath::new("docs").unwrap();
        let listing = cli.list_tree(&repo, &checkout, &docs).await.unwrap();
        let err = TreeInspection::parse(&listing)
            .unwrap()
            .into_blob("docs")
            .unwrap_err();
        assert!(matches!(err, FetchError::NotABlob { ref kind, .. } if kind == "tree"));

        let missing = RelativeFilePath::new("docs/nope.md").unwrap();
        let listing = cli.list_tree(&repo, &checkout, &missing).await.unwrap();
        let err = TreeInspection::parse(&listing)
            .unwrap()
            .into_blob("docs/nope.md")
            .unwrap_err();
        assert!(matches!(err, FetchError::NotFound(_)));
    }

    #[cfg(target_os = "linux")]
    fn process_gone(pid: &str) -> bool {
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            // Killed but not yet reaped.
            Ok(stat) => stat
                .rsplit(')')
                .next()
                .is_some_and(|rest| rest.trim_start().starts_with('Z')),
            Err(_) => true,
        }
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_deadline_kills_running_process() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pid");
        let script = dir.path().join("slow-git");
        std::fs::write(
            &script,
            format!("#!/bin/sh\necho $$ > '{}'\nexec sleep 60\n", pid_file.display()),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let workdir = dir.path().join("work");
        std::fs::create_dir(&workdir).unwrap();
        let orchestrator = FetchOrchestrator::new(Arc::new(GitCli::new(script.clone())));
        let file = RelativeFilePath::new("README").unwrap();
        let deadline = tokio::time::Instant::now() + Duration::from_millis(500);

        let err = orchestrator
            .fetch(&repo(), &file, &workdir, deadline)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FetchError::Timeout {
                stage: FetchStage::Clone
            }
        ));

        let pid = std::fs::read_to_string(&pid_file).unwrap();
        let pid = pid.trim();
        let mut gone = false;
        for _ in 0..50 {
            if process_gone(pid) {
                gone = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(gone, "process {pid} outlived its deadline");
    }
}

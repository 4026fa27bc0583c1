//! Local git working copy driven through the `git` executable.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::application::ports::{RepoFile, VersionControl};
use crate::domain::{AppError, Result};

/// A clone of the backup repository on disk.
pub struct GitRepo {
    path: PathBuf,
}

impl GitRepo {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the directory already holds a repository.
    #[must_use]
    pub fn is_repo(&self) -> bool {
        self.path.join(".git").exists()
    }

    /// Run `git <args>` inside the working copy and return trimmed stdout.
    fn git(&self, args: &[&str]) -> Result<String> {
        run_git(Some(&self.path), args)
    }
}

fn run_git(cwd: Option<&Path>, args: &[&str]) -> Result<String> {
    let mut command = Command::new("git");
    command.args(args);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    tracing::debug!(args = ?args, "Running git");

    let output = command.output().map_err(|e| AppError::VersionControl {
        message: format!("Failed to run git {}: {e}", args.join(" ")),
    })?;

    if !output.status.success() {
        return Err(AppError::VersionControl {
            message: format!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

impl VersionControl for GitRepo {
    fn clone_if_absent(&self, url: &str, branch: &str) -> Result<()> {
        if self.is_repo() {
            tracing::info!(path = %self.path.display(), "Repository already present");
            return Ok(());
        }

        fs::create_dir_all(&self.path)
            .map_err(|e| AppError::io(format!("Failed to create {}", self.path.display()), e))?;

        let target = self.path.to_string_lossy();
        tracing::info!(url, branch, path = %target, "Cloning repository");
        run_git(None, &["clone", "-b", branch, url, target.as_ref()])?;

        Ok(())
    }

    fn pull(&self) -> Result<()> {
        tracing::info!("Pulling latest changes");
        self.git(&["pull"]).map(|_| ())
    }

    fn write_files(&self, files: &[RepoFile]) -> Result<()> {
        for file in files {
            let target = self.path.join(&file.path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| AppError::io("Failed to create directory", e))?;
            }
            fs::write(&target, &file.content)
                .map_err(|e| AppError::io(format!("Failed to write {}", target.display()), e))?;
            tracing::debug!(path = %file.path, "File written");
        }
        Ok(())
    }

    fn commit_and_push(&self, message: &str) -> Result<bool> {
        let status = self.git(&["status", "--porcelain"])?;
        if status.is_empty() {
            tracing::info!("No changes to commit");
            return Ok(false);
        }

        self.git(&["add", "."])?;
        self.git(&["commit", "-m", message])?;

        let branch = self.git(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        self.git(&["push", "origin", branch.as_str()])?;

        tracing::info!(branch = %branch, "Changes pushed");
        Ok(true)
    }
}

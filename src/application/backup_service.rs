//! Archive publication and git mirroring use cases.

use chrono::Local;

use crate::domain::{AppError, ArchiveDocument, RemoteArtifact, Result, Token};
use crate::infrastructure::{archive_file_name, ArchiveCache};

use super::ports::{RepoFile, VersionControl};
use super::publisher::RemotePublisher;

/// Where and on which branch archives are published.
#[derive(Debug, Clone)]
pub struct PublishTarget {
    /// Repository as `owner/name`.
    pub repo: String,
    pub branch: String,
    /// Directory inside the repository.
    pub directory: String,
}

/// Repository path for an archive file.
#[must_use]
pub fn publish_path(directory: &str, file_name: &str) -> String {
    let directory = directory.trim_matches('/');
    if directory.is_empty() {
        file_name.to_string()
    } else {
        format!("{directory}/{file_name}")
    }
}

/// Commit message for a published archive.
#[must_use]
pub fn publish_message(file_name: &str) -> String {
    format!("Update ChatGPT backup: {file_name}")
}

/// Use `explicit` when given, otherwise the cached archive.
///
/// # Errors
/// Returns `AppError::InvalidData` when neither is available.
pub fn resolve_archive(
    explicit: Option<ArchiveDocument>,
    cache: &ArchiveCache,
) -> Result<ArchiveDocument> {
    if let Some(document) = explicit {
        return Ok(document);
    }

    let (json, file_name) = cache.archive()?.ok_or_else(|| AppError::InvalidData {
        message: "No backup data available".into(),
    })?;

    Ok(ArchiveDocument {
        file_name: file_name.unwrap_or_else(|| archive_file_name(Local::now())),
        json,
    })
}

/// Publish one archive under the target directory.
///
/// # Errors
/// Returns `AppError::Publish` when the store rejects the upsert.
pub async fn publish_backup(
    publisher: &RemotePublisher,
    credentials: &Token,
    target: &PublishTarget,
    document: &ArchiveDocument,
) -> Result<RemoteArtifact> {
    if target.repo.trim().is_empty() {
        return Err(AppError::Config {
            message: "GitHub token and repository are required".into(),
        });
    }

    let path = publish_path(&target.directory, &document.file_name);
    let message = publish_message(&document.file_name);

    publisher
        .publish(
            credentials,
            &target.repo,
            &path,
            &document.json,
            &message,
            &target.branch,
        )
        .await
}

/// Mirror archives into a local clone and push them.
///
/// Returns whether anything was committed.
///
/// # Errors
/// Returns `AppError::VersionControl` when a git step fails.
pub fn mirror_to_git(
    vcs: &dyn VersionControl,
    url: &str,
    branch: &str,
    directory: &str,
    documents: &[ArchiveDocument],
) -> Result<bool> {
    if documents.is_empty() {
        tracing::info!("No files to update");
        return Ok(false);
    }

    vcs.clone_if_absent(url, branch)?;
    vcs.pull()?;

    let files: Vec<RepoFile> = documents
        .iter()
        .map(|doc| RepoFile {
            path: publish_path(directory, &doc.file_name),
            content: doc.json.clone(),
        })
        .collect();
    vcs.write_files(&files)?;

    let names: Vec<&str> = documents.iter().map(|d| d.file_name.as_str()).collect();
    let message = publish_message(&names.join(", "));

    vcs.commit_and_push(&message)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::sync::Arc;

    use super::*;
    use crate::application::publisher::tests::MemoryStore;

    #[derive(Default)]
    struct ScriptedVcs {
        steps: RefCell<Vec<String>>,
        dirty: bool,
    }

    impl VersionControl for ScriptedVcs {
        fn clone_if_absent(&self, url: &str, branch: &str) -> Result<()> {
            self.steps.borrow_mut().push(format!("clone {url} {branch}"));
            Ok(())
        }

        fn pull(&self) -> Result<()> {
            self.steps.borrow_mut().push("pull".into());
            Ok(())
        }

        fn write_files(&self, files: &[RepoFile]) -> Result<()> {
            for file in files {
                self.steps.borrow_mut().push(format!("write {}", file.path));
            }
            Ok(())
        }

        fn commit_and_push(&self, message: &str) -> Result<bool> {
            self.steps.borrow_mut().push(format!("commit {message}"));
            Ok(self.dirty)
        }
    }

    fn doc(name: &str) -> ArchiveDocument {
        ArchiveDocument {
            file_name: name.into(),
            json: "[]".into(),
        }
    }

    #[test]
    fn test_publish_path() {
        assert_eq!(publish_path("backups", "a.json"), "backups/a.json");
        assert_eq!(publish_path("/backups/", "a.json"), "backups/a.json");
        assert_eq!(publish_path("", "a.json"), "a.json");
    }

    #[test]
    fn test_resolve_prefers_explicit() {
        let cache = ArchiveCache::open_in_memory().unwrap();
        cache.store_archive(&doc("cached.json")).unwrap();

        let resolved = resolve_archive(Some(doc("given.json")), &cache).unwrap();
        assert_eq!(resolved.file_name, "given.json");
    }

    #[test]
    fn test_resolve_falls_back_to_cache() {
        let cache = ArchiveCache::open_in_memory().unwrap();
        cache.store_archive(&doc("cached.json")).unwrap();

        assert_eq!(resolve_archive(None, &cache).unwrap().file_name, "cached.json");
    }

    #[test]
    fn test_resolve_generates_missing_name() {
        let cache = ArchiveCache::open_in_memory().unwrap();
        cache
            .set(crate::infrastructure::archive_cache::JSON_DATA_KEY, "[]")
            .unwrap();

        let resolved = resolve_archive(None, &cache).unwrap();
        assert!(resolved.file_name.starts_with("gpt-backup-"));
        assert!(resolved.file_name.ends_with(".json"));
    }

    #[test]
    fn test_resolve_without_data_fails() {
        let cache = ArchiveCache::open_in_memory().unwrap();
        assert!(matches!(
            resolve_archive(None, &cache),
            Err(AppError::InvalidData { .. })
        ));
    }

    #[tokio::test]
    async fn test_publish_backup_path_and_message() {
        let store = Arc::new(MemoryStore::default());
        let publisher = RemotePublisher::new(store.clone());
        let target = PublishTarget {
            repo: "me/backup".into(),
            branch: "main".into(),
            directory: "backups".into(),
        };

        let artifact = publish_backup(&publisher, &Token::new("gh"), &target, &doc("a.json"))
            .await
            .unwrap();

        assert_eq!(artifact.path, "backups/a.json");
        let requests = store.requests.lock().unwrap();
        assert_eq!(requests[0].1.message, "Update ChatGPT backup: a.json");
    }

    #[tokio::test]
    async fn test_publish_backup_requires_repo() {
        let publisher = RemotePublisher::new(Arc::new(MemoryStore::default()));
        let target = PublishTarget {
            repo: String::new(),
            branch: "main".into(),
            directory: "backups".into(),
        };

        let err = publish_backup(&publisher, &Token::new("gh"), &target, &doc("a.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Config { .. }));
    }

    #[test]
    fn test_mirror_runs_steps_in_order() {
        let vcs = ScriptedVcs {
            dirty: true,
            ..ScriptedVcs::default()
        };

        let changed = mirror_to_git(&vcs, "git@x:r.git", "main", "backups", &[doc("a.json")]).unwrap();

        assert!(changed);
        assert_eq!(
            *vcs.steps.borrow(),
            vec![
                "clone git@x:r.git main",
                "pull",
                "write backups/a.json",
                "commit Update ChatGPT backup: a.json",
            ]
        );
    }

    #[test]
    fn test_mirror_reports_unchanged_tree() {
        let vcs = ScriptedVcs::default();
        assert!(!mirror_to_git(&vcs, "u", "main", "backups", &[doc("a.json")]).unwrap());
    }

    #[test]
    fn test_mirror_without_files_is_noop() {
        let vcs = ScriptedVcs::default();
        assert!(!mirror_to_git(&vcs, "u", "main", "backups", &[]).unwrap());
        assert!(vcs.steps.borrow().is_empty());
    }
}

//! Infrastructure layer - external adapters (HTTP, filesystem, git, cache).
//!
//! This layer handles all I/O operations and external dependencies.

pub mod archive;
pub mod archive_cache;
pub mod chat_api;
pub mod config;
pub mod git_repo;
pub mod github;

pub use archive::{archive_file_name, parse_archive, read_archive, write_archive};
pub use archive_cache::ArchiveCache;
pub use chat_api::{ChatApiClient, SessionEndpointProvider, StaticTokenProvider};
pub use config::{config_file_path, ensure_config_exists, load_config, render_config};
pub use git_repo::GitRepo;
pub use github::GitHubContents;

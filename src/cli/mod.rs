//! CLI interface using clap.
//!
//! Provides command-line arguments and subcommands for the tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// gpt-backup - Export your ChatGPT conversation history.
#[derive(Parser, Debug)]
#[command(name = "gpt-backup")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to an alternative config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export conversations into a timestamped JSON archive.
    Export {
        /// Offset of the first listed page.
        #[arg(long, default_value = "0")]
        start_offset: u64,

        /// Offset at which listing stops (-1 = everything).
        #[arg(long, default_value = "-1", allow_hyphen_values = true)]
        stop_offset: i64,

        /// Directory for the archive file.
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Branch linearization: active-branch or mapping-order.
        #[arg(long)]
        linearization: Option<String>,

        /// Bearer token; skips the session endpoint when set.
        #[arg(long, env = "CHATGPT_ACCESS_TOKEN", hide_env_values = true)]
        access_token: Option<String>,

        /// Session cookie sent to the session endpoint.
        #[arg(long, env = "CHATGPT_SESSION_COOKIE", hide_env_values = true)]
        session_cookie: Option<String>,

        /// Publish the archive to GitHub after writing it.
        #[arg(long)]
        publish: bool,

        #[command(flatten)]
        github: GitHubArgs,
    },

    /// Publish an archive to a GitHub repository.
    Publish {
        /// Archive file (defaults to the most recently cached archive).
        #[arg(short, long)]
        file: Option<PathBuf>,

        #[command(flatten)]
        github: GitHubArgs,
    },

    /// Commit archives into a local clone and push them.
    GitSync {
        /// Archive files (defaults to the most recently cached archive).
        #[arg(short, long)]
        file: Vec<PathBuf>,

        /// Repository URL to clone when no local clone exists.
        #[arg(long)]
        repo_url: Option<String>,
    },

    /// Show the conversations contained in an archive.
    Summary {
        /// Archive file (defaults to the most recently cached archive).
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Inspect or create the configuration file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Remote publication options.
#[derive(clap::Args, Debug, Clone)]
pub struct GitHubArgs {
    /// GitHub token with contents write access.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Target repository as owner/name.
    #[arg(long)]
    pub repo: Option<String>,

    /// Target branch.
    #[arg(long)]
    pub branch: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration.
    Show,
    /// Write a default config file if none exists.
    Init,
    /// Print the config file path.
    Path,
}

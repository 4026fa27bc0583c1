//! gpt-backup - Export ChatGPT conversation history.
//!
//! Pages through the conversation list, fetches every conversation at a
//! fixed pace, writes one JSON archive and optionally publishes it to a
//! GitHub repository or a local git clone.
//!
//!   gpt-backup export                       # Full export into ~/.gpt-backup/exports
//!   gpt-backup export --stop-offset 100     # First 100 conversations
//!   gpt-backup export --publish --repo me/b # Export and push via GitHub API
//!   gpt-backup publish -f archive.json      # Publish an existing archive
//!   gpt-backup git-sync                     # Commit cached archive into a clone
//!   gpt-backup summary                      # Table of the cached archive

mod application;
mod cli;
mod domain;
mod infrastructure;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use application::{
    format_batch_stats, format_batch_table, format_progress, mirror_to_git, publish_backup,
    resolve_archive, ConversationFetcher, ExportAggregator, ProgressListener, PublishTarget,
    RemotePublisher, TokioScheduler,
};
use application::ports::SessionTokenProvider;
use cli::{Cli, Commands, ConfigAction, GitHubArgs};
use domain::{AppConfig, AppError, ArchiveDocument, Linearization, Progress, StopOffset, Token};
use infrastructure::{
    config_file_path, ensure_config_exists, load_config, parse_archive, read_archive,
    render_config, write_archive, ArchiveCache, ChatApiClient, GitHubContents, GitRepo,
    SessionEndpointProvider, StaticTokenProvider,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Main application logic.
async fn run(cli: Cli) -> domain::Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Export {
            start_offset,
            stop_offset,
            output_dir,
            linearization,
            access_token,
            session_cookie,
            publish,
            github,
        } => {
            let options = ExportOptions {
                start_offset,
                stop_offset,
                output_dir,
                linearization,
                access_token,
                session_cookie,
            };
            cmd_export(&config, options, publish.then_some(&github)).await?;
        }
        Commands::Publish { file, github } => {
            cmd_publish(&config, file.as_deref(), &github).await?;
        }
        Commands::GitSync { file, repo_url } => {
            cmd_git_sync(&config, &file, repo_url)?;
        }
        Commands::Summary { file } => {
            cmd_summary(&config, file.as_deref())?;
        }
        Commands::Config { action } => {
            let path = cli.config.unwrap_or_else(config_file_path);
            cmd_config(&config, &path, &action)?;
        }
    }

    Ok(())
}

/// Arguments of the export command.
struct ExportOptions {
    start_offset: u64,
    stop_offset: i64,
    output_dir: Option<PathBuf>,
    linearization: Option<String>,
    access_token: Option<String>,
    session_cookie: Option<String>,
}

/// Prints progress lines to the terminal.
struct ConsoleProgress;

impl ProgressListener for ConsoleProgress {
    fn on_progress(&self, progress: Progress) {
        println!("{} {}", "→".cyan(), format_progress(&progress));
    }
}

/// Export conversations, write the archive and cache it.
async fn cmd_export(
    config: &AppConfig,
    options: ExportOptions,
    publish: Option<&GitHubArgs>,
) -> domain::Result<()> {
    if options.stop_offset < -1 {
        return Err(AppError::Config {
            message: format!("Invalid stop offset {}: use -1 for no limit", options.stop_offset),
        });
    }
    let stop = StopOffset::from_raw(options.stop_offset);
    let publish = publish
        .map(|github| publish_target(config, github))
        .transpose()?;

    let linearization = match options.linearization.as_deref() {
        Some(raw) => raw
            .parse::<Linearization>()
            .map_err(|message| AppError::Config { message })?,
        None => config.export.linearization,
    };

    let client = Arc::new(ChatApiClient::new(&config.api)?);
    let tokens: Arc<dyn SessionTokenProvider> = match options.access_token {
        Some(token) => Arc::new(StaticTokenProvider::new(Token::new(token))),
        None => Arc::new(SessionEndpointProvider::new(
            client.as_ref().clone(),
            options.session_cookie,
        )),
    };
    let scheduler = Arc::new(TokioScheduler);

    let fetcher = ConversationFetcher::new(client.clone(), scheduler.clone(), config.retry, linearization);
    let aggregator = ExportAggregator::new(tokens, client, fetcher, scheduler, config.pacing.clone())
        .with_progress(Arc::new(ConsoleProgress));

    println!("{} Starting export...", "⏳".bold());
    let batch = aggregator.run(options.start_offset, stop).await?;

    if batch.is_empty() {
        println!("{} No conversations found in the requested range", "⚠".yellow());
    }

    let dir = options.output_dir.unwrap_or_else(|| config.exports_dir());
    let (path, document) = write_archive(&dir, &batch, Local::now())?;

    ArchiveCache::open(&config.cache_db_path())?.store_archive(&document)?;

    println!(
        "{} Exported {} conversations ({} messages) to {}",
        "✓".green().bold(),
        batch.len(),
        batch.message_count(),
        path.display()
    );

    if let Some((credentials, target)) = publish {
        publish_document(config, &credentials, &target, &document).await?;
    }

    Ok(())
}

/// Publish an archive file or the cached archive.
async fn cmd_publish(
    config: &AppConfig,
    file: Option<&Path>,
    github: &GitHubArgs,
) -> domain::Result<()> {
    let explicit = file.map(read_archive).transpose()?;
    let cache = ArchiveCache::open(&config.cache_db_path())?;
    let document = resolve_archive(explicit, &cache)?;
    let (credentials, target) = publish_target(config, github)?;

    publish_document(config, &credentials, &target, &document).await
}

async fn publish_document(
    config: &AppConfig,
    credentials: &Token,
    target: &PublishTarget,
    document: &ArchiveDocument,
) -> domain::Result<()> {
    let store = GitHubContents::new(&config.publish.api_base, &config.api.user_agent)?;
    let publisher = RemotePublisher::new(Arc::new(store));

    let artifact = publish_backup(&publisher, credentials, target, document).await?;

    println!(
        "{} Backed up to GitHub: {}/{} ({} bytes, {})",
        "✓".green().bold(),
        target.repo,
        artifact.path,
        artifact.content.len(),
        artifact.version_token.as_deref().unwrap_or("no sha")
    );

    Ok(())
}

/// Resolve credentials and target from flags, falling back to config.
fn publish_target(config: &AppConfig, github: &GitHubArgs) -> domain::Result<(Token, PublishTarget)> {
    let token = github.github_token.clone().filter(|t| !t.is_empty());
    let repo = github.repo.clone().or_else(|| config.publish.repo.clone());

    let (Some(token), Some(repo)) = (token, repo) else {
        return Err(AppError::Config {
            message: "GitHub token and repository are required".into(),
        });
    };

    Ok((
        Token::new(token),
        PublishTarget {
            repo,
            branch: github
                .branch
                .clone()
                .unwrap_or_else(|| config.publish.branch.clone()),
            directory: config.publish.directory.clone(),
        },
    ))
}

/// Write archives into the local clone, then commit and push.
fn cmd_git_sync(config: &AppConfig, files: &[PathBuf], repo_url: Option<String>) -> domain::Result<()> {
    let repo = GitRepo::new(config.git_repo_path());
    let url = repo_url
        .or_else(|| config.git.repo_url.clone())
        .unwrap_or_default();

    if url.is_empty() && !repo.is_repo() {
        return Err(AppError::Config {
            message: format!(
                "No clone at {} and no repository URL configured",
                repo.path().display()
            ),
        });
    }

    let documents = if files.is_empty() {
        let cache = ArchiveCache::open(&config.cache_db_path())?;
        vec![resolve_archive(None, &cache)?]
    } else {
        files
            .iter()
            .map(|f| read_archive(f))
            .collect::<domain::Result<Vec<_>>>()?
    };

    let changed = mirror_to_git(
        &repo,
        &url,
        &config.git.branch,
        &config.publish.directory,
        &documents,
    )?;

    if changed {
        println!("{} Repository updated:", "✓".green().bold());
        for doc in &documents {
            println!("  - {}", doc.file_name);
        }
    } else {
        println!("{} No changes to commit", "⚠".yellow());
    }

    Ok(())
}

/// Show a table of the conversations in an archive.
fn cmd_summary(config: &AppConfig, file: Option<&Path>) -> domain::Result<()> {
    let explicit = file.map(read_archive).transpose()?;
    let cache = ArchiveCache::open(&config.cache_db_path())?;
    let document = resolve_archive(explicit, &cache)?;
    let batch = parse_archive(&document.json)?;

    println!("{}", document.file_name.bold());
    println!("{}", format_batch_table(&batch));
    println!();
    println!("{}", format_batch_stats(&batch));

    Ok(())
}

/// Configuration subcommands.
fn cmd_config(config: &AppConfig, path: &Path, action: &ConfigAction) -> domain::Result<()> {
    match action {
        ConfigAction::Show => println!("{}", render_config(config)?),
        ConfigAction::Init => {
            if ensure_config_exists(path)? {
                println!("{} Created {}", "✓".green().bold(), path.display());
            } else {
                println!("Config already exists: {}", path.display());
            }
        }
        ConfigAction::Path => println!("{}", path.display()),
    }
    Ok(())
}

/// Setup tracing/logging based on verbosity level.
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}

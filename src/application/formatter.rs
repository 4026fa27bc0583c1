//! Terminal output for archives and export progress.

use chrono::DateTime;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};

use crate::domain::{ExportBatch, Progress};

/// Formats a table listing of the conversations in an archive.
#[must_use]
pub fn format_batch_table(batch: &ExportBatch) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "Created", "Msgs", "Models", "Title"]);

    for (i, conv) in batch.conversations.iter().enumerate() {
        let models = conv.models();
        let models = if models.is_empty() {
            "-".to_string()
        } else {
            truncate(&models.join(", "), 24)
        };

        let title = conv
            .title
            .as_deref()
            .filter(|t| !t.is_empty())
            .map_or_else(|| "Untitled".to_string(), |t| truncate(t, 40));

        table.add_row(vec![
            (i + 1).to_string(),
            format_epoch(conv.create_time),
            conv.message_count().to_string(),
            models,
            title,
        ]);
    }

    table.to_string()
}

/// Formats archive totals for display.
#[must_use]
pub fn format_batch_stats(batch: &ExportBatch) -> String {
    format!(
        "{}\n  Conversations: {}\n  Total messages: {}",
        "📊 Statistics".bold(),
        batch.len().to_string().cyan(),
        batch.message_count().to_string().cyan(),
    )
}

/// One progress line, e.g. `[ 44%] offset 20`.
#[must_use]
pub fn format_progress(progress: &Progress) -> String {
    format!(
        "[{:>3}%] offset {} ({}/{})",
        progress.percent, progress.offset, progress.accumulated, progress.requested
    )
}

/// Render epoch seconds as a UTC timestamp.
fn format_epoch(seconds: Option<f64>) -> String {
    #[allow(clippy::cast_possible_truncation)]
    let millis = seconds.map(|s| (s * 1000.0) as i64);
    millis
        .and_then(DateTime::from_timestamp_millis)
        .map_or_else(|| "-".to_string(), |dt| dt.format("%Y-%m-%d %H:%M").to_string())
}

/// Truncates a string to max length (in characters) with ellipsis.
fn truncate(s: &str, max_len: usize) -> String {
    let s = s.lines().next().unwrap_or(s);
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

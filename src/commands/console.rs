//! Interactive review console
//!
//! Reads operator commands line by line and prints each rendered page. Operator
//! mistakes (bad row id, unsupported page size, export failure) are reported and
//! the loop continues; only a broken output stream ends it early.

use anyhow::Result;
use serde_json::Value;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

use crate::application::enrichment::EnrichedRow;
use crate::application::review::ReviewSession;
use crate::commands::operator::{HELP, OperatorCommand};
use crate::commands::previews::write_previews;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub struct Console<W> {
    review: ReviewSession,
    preview_dir: PathBuf,
    default_output: PathBuf,
    out: W,
}

impl<W: AsyncWrite + Unpin> Console<W> {
    pub fn new(review: ReviewSession, preview_dir: PathBuf, default_output: PathBuf, out: W) -> Self {
        Self {
            review,
            preview_dir,
            default_output,
            out,
        }
    }

    pub fn review(&self) -> &ReviewSession {
        &self.review
    }

    /// Consume the console, returning the session and the output stream
    pub fn into_parts(self) -> (ReviewSession, W) {
        (self.review, self.out)
    }

    /// Show the first page, then process commands until `quit` or end of input
    pub async fn run<R: AsyncBufRead + Unpin>(&mut self, input: R) -> Result<()> {
        self.say(&self.review.status().to_string()).await?;
        self.show_page().await?;

        let mut lines = input.lines();
        loop {
            self.out.write_all(b"> ").await?;
            self.out.flush().await?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            match line.parse::<OperatorCommand>() {
                Ok(command) => {
                    if self.execute(command).await? == Flow::Quit {
                        break;
                    }
                }
                Err(e) => self.say(&e.to_string()).await?,
            }
        }

        info!("Console closed");
        Ok(())
    }

    async fn execute(&mut self, command: OperatorCommand) -> Result<Flow> {
        match command {
            OperatorCommand::Page(page) => {
                self.review.go_to(page);
                self.show_page().await?;
            }
            OperatorCommand::Next => {
                self.review.next_page();
                self.show_page().await?;
            }
            OperatorCommand::Previous => {
                self.review.previous_page();
                self.show_page().await?;
            }
            OperatorCommand::PageSize(size) => match self.review.set_page_size(size) {
                Ok(()) => self.show_page().await?,
                Err(e) => self.say(&e.to_string()).await?,
            },
            OperatorCommand::Pacing(ms) => match self.review.set_pacing(ms) {
                Ok(()) => self.say(&format!("Pacing set to {ms} ms")).await?,
                Err(e) => self.say(&e.to_string()).await?,
            },
            OperatorCommand::Match(row_id) => {
                let result = self.review.set_match(row_id, true).map(|()| true);
                self.report_judgment(row_id, result).await?;
            }
            OperatorCommand::Unmatch(row_id) => {
                let result = self.review.set_match(row_id, false).map(|()| false);
                self.report_judgment(row_id, result).await?;
            }
            OperatorCommand::Toggle(row_id) => {
                let result = self.review.toggle_match(row_id);
                self.report_judgment(row_id, result).await?;
            }
            OperatorCommand::Reset => {
                self.review.reset_matches();
                self.say("All matches cleared").await?;
            }
            OperatorCommand::Export(path) => {
                let path = path.unwrap_or_else(|| self.default_output.clone());
                match self.review.export(&path) {
                    Ok(export) => {
                        self.say(&format!(
                            "Exported {} rows ({} matched) to {}",
                            export.rows.len(),
                            export.matched_count(),
                            path.display()
                        ))
                        .await?;
                    }
                    Err(e) => {
                        warn!("⚠️ Export failed: {}", e);
                        self.say(&format!("Export failed: {e}")).await?;
                    }
                }
            }
            OperatorCommand::Status => self.say(&self.review.status().to_string()).await?,
            OperatorCommand::ClearCache => {
                let dropped = self.review.clear_cache();
                self.say(&format!("Cache cleared ({dropped} entries)")).await?;
            }
            OperatorCommand::Help => self.say(HELP).await?,
            OperatorCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    async fn report_judgment<E: std::fmt::Display>(
        &mut self,
        row_id: usize,
        result: Result<bool, E>,
    ) -> Result<()> {
        let message = match result {
            Ok(true) => format!("Row {row_id}: match"),
            Ok(false) => format!("Row {row_id}: no match"),
            Err(e) => e.to_string(),
        };
        self.say(&message).await
    }

    async fn show_page(&mut self) -> Result<()> {
        let report = self.review.render_page().await;
        let header = format!(
            "--- page {}/{} (rows {:?}) ---",
            self.review.page(),
            self.review.total_pages(),
            self.review.current_rows()
        );
        self.say(&header).await?;

        match write_previews(&self.preview_dir, &report.rows).await {
            Ok(files) if !files.is_empty() => {
                let note = format!("{} previews in {}", files.len(), self.preview_dir.display());
                self.say(&note).await?;
            }
            Ok(_) => {}
            Err(e) => warn!("⚠️ Preview directory unavailable: {}", e),
        }

        for row in &report.rows {
            self.say(&render_row(row)).await?;
        }
        Ok(())
    }

    async fn say(&mut self, text: &str) -> Result<()> {
        self.out.write_all(text.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        Ok(())
    }
}

/// One line per row: match state, row id, outcomes and detail columns
pub fn render_row(row: &EnrichedRow) -> String {
    let mut line = format!(
        "[{}] #{:<5} primary: {:<16} secondary: {:<16}",
        if row.matched { "x" } else { " " },
        row.row_id,
        row.primary.label(),
        row.secondary.label()
    );
    if !row.details.is_empty() {
        line.push(' ');
        line.push_str(&Value::Object(row.details.clone()).to_string());
    }
    line.trim_end().to_string()
}

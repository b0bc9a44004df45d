//! `autodep watch`: build once, then rebuild on every batch of changes.
//!
//! Both the pipeline and the append engine diff against their previous
//! snapshots, so a rebuild only reparses and rewrites what changed.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::cli::WatchArgs;
use crate::commands::utils::{self, Session};
use crate::error::Result;
use crate::ui;
use crate::watcher::{FileChange, FileWatcher};

pub async fn execute(args: WatchArgs) -> Result<()> {
    let root = utils::project_root(&args.config)?;
    let loaded = utils::load_config(&args.config, args.out.as_deref())?;
    let debounce = Duration::from_millis(args.debounce.unwrap_or(loaded.config.settings.debounce_ms));
    let with_append = !args.analyze_only && loaded.config.append.is_some();

    let mut session = Session::new(loaded.config, with_append).await?;
    rebuild(&mut session).await?;

    let mut ignored = session.ignored_paths();
    ignored.push(root.join("node_modules"));
    let (_watcher, mut changes) = FileWatcher::new(root.clone(), ignored)?;
    ui::info(&format!("Watching {} (Ctrl+C to stop)", root.display()));

    loop {
        tokio::select! {
            change = changes.recv() => {
                let Some(change) = change else { break };
                let batch = collect_batch(change, &mut changes, debounce).await;
                debug!(changes = batch.len(), "rebuilding");
                // a failed rebuild is reported; the next change retries
                if let Err(err) = rebuild(&mut session).await {
                    warn!(error = %err, "rebuild failed");
                    ui::error(&err.to_string());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                ui::info("Stopping");
                break;
            }
        }
    }
    Ok(())
}

async fn rebuild(session: &mut Session) -> Result<()> {
    let start = Instant::now();
    let outcome = session.analyze().await?;
    if outcome.recomputed {
        for line in ui::bundle_summary(&outcome.deps) {
            ui::info(&line);
        }
    }
    if let Some(summary) = session.append().await? {
        if !summary.is_empty() {
            ui::info(&ui::append_summary(&summary));
        }
    }
    ui::success(&format!("Rebuilt in {}", ui::format_duration(start.elapsed())));
    Ok(())
}

/// Gather changes until none arrive for `debounce`.
async fn collect_batch(
    first: FileChange,
    changes: &mut mpsc::Receiver<FileChange>,
    debounce: Duration,
) -> Vec<PathBuf> {
    let mut batch = vec![first.path().to_path_buf()];
    while let Ok(Some(change)) = tokio::time::timeout(debounce, changes.recv()).await {
        let path = change.path().to_path_buf();
        if !batch.contains(&path) {
            batch.push(path);
        }
    }
    batch
}

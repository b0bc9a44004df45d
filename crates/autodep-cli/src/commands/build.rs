//! `autodep build`: analyze, then append when configured.

use std::time::Instant;

use crate::cli::BuildArgs;
use crate::commands::utils::{self, Session};
use crate::error::Result;
use crate::ui;

pub async fn execute(args: BuildArgs) -> Result<()> {
    let start = Instant::now();
    let loaded = utils::load_config(&args.config, args.out.as_deref())?;
    let with_append = loaded.config.append.is_some();
    if !with_append {
        ui::warning("No [append] section; only writing the dependency snapshot");
    }

    let mut session = Session::new(loaded.config, with_append).await?;
    let outcome = session.analyze().await?;
    for line in ui::bundle_summary(&outcome.deps) {
        ui::info(&line);
    }
    if let Some(summary) = session.append().await? {
        ui::info(&ui::append_summary(&summary));
    }

    ui::success(&format!("Built in {}", ui::format_duration(start.elapsed())));
    Ok(())
}

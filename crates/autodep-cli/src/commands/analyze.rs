//! `autodep analyze`: write the per-bundle dependency snapshot.

use std::time::Instant;

use crate::cli::AnalyzeArgs;
use crate::commands::utils::{self, Session};
use crate::error::Result;
use crate::ui;

pub async fn execute(args: AnalyzeArgs) -> Result<()> {
    let start = Instant::now();
    let loaded = utils::load_config(&args.config, args.out.as_deref())?;
    let deps_file = loaded.config.output.deps_file.clone();

    let mut session = Session::new(loaded.config, false).await?;
    let outcome = session.analyze().await?;

    for line in ui::bundle_summary(&outcome.deps) {
        ui::info(&line);
    }
    ui::success(&format!(
        "Wrote {} in {}",
        deps_file.display(),
        ui::format_duration(start.elapsed())
    ));
    Ok(())
}

//! `autodep append`: merge generated bundles into upstream output.

use std::sync::Arc;
use std::time::Instant;

use autodep::NativeRuntime;

use crate::cli::AppendArgs;
use crate::commands::utils;
use crate::error::Result;
use crate::ui;

pub async fn execute(args: AppendArgs) -> Result<()> {
    let start = Instant::now();
    let loaded = utils::load_config(&args.config, None)?;

    let mut engine = utils::create_append_engine(&loaded.config, Arc::new(NativeRuntime::new()))?;
    let summary = engine.build().await?;

    ui::success(&format!(
        "{} in {}",
        ui::append_summary(&summary),
        ui::format_duration(start.elapsed())
    ));
    Ok(())
}

//! `autodep check`: load and validate the configuration without building.

use autodep_config::{ConfigValidator, FsValidator};

use crate::cli::CheckArgs;
use crate::commands::utils;
use crate::error::Result;
use crate::ui;

pub async fn execute(args: CheckArgs) -> Result<()> {
    ui::info("Checking configuration...");

    // load() already ran the schema checks
    let loaded = utils::load_config(&args.config, None)?;
    match &loaded.source {
        Some(source) => ui::info(&format!("Using {}", source.path.display())),
        None => ui::warning("No configuration file found, using defaults"),
    }

    if args.fs {
        FsValidator.validate(&loaded.config)?;
    }

    if args.print {
        println!("{}", loaded.config.to_toml()?);
    }

    ui::success("Configuration is valid");
    Ok(())
}

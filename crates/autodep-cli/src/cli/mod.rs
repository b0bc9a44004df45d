//! Command-line interface definition.
//!
//! - `autodep analyze` - find and resolve imports, write the dependency snapshot
//! - `autodep append` - merge generated bundles into build output
//! - `autodep build` - analyze, then append
//! - `autodep watch` - build, then rebuild on changes
//! - `autodep check` - validate configuration

mod commands;

use clap::Parser;

pub use commands::{
    AnalyzeArgs, AppendArgs, BuildArgs, CheckArgs, Command, ConfigArgs, TokenModeArg, WatchArgs,
};

/// autodep - vendor bundle dependencies for JavaScript builds
#[derive(Parser, Debug)]
#[command(
    name = "autodep",
    version,
    about = "Incremental third-party import analysis and vendor bundle assembly",
    long_about = "autodep finds the third-party packages imported by your source trees,\n\
                  resolves them against node_modules, splits them into named bundles and\n\
                  merges externally built bundles back into your build output."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

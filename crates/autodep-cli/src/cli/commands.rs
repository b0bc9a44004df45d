use std::path::PathBuf;

use autodep::TokenMode;
use clap::{Args, Subcommand, ValueEnum};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze source trees and write the per-bundle dependency snapshot
    Analyze(AnalyzeArgs),

    /// Merge generated bundles into upstream build output
    Append(AppendArgs),

    /// Analyze, then append
    Build(BuildArgs),

    /// Build, then rebuild incrementally whenever files change
    Watch(WatchArgs),

    /// Load and validate the configuration
    Check(CheckArgs),
}

/// Options shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Configuration file (autodep.toml, *.json or package.json)
    ///
    /// Discovered in the project directory when omitted.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Project directory (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Maximum concurrent parse and resolve tasks
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// How file changes are detected between builds
    #[arg(long, value_enum, value_name = "MODE")]
    pub token_mode: Option<TokenModeArg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TokenModeArg {
    /// Size and modification time
    Stat,
    /// Hash of the file content
    Content,
}

impl From<TokenModeArg> for TokenMode {
    fn from(mode: TokenModeArg) -> Self {
        match mode {
            TokenModeArg::Stat => TokenMode::Stat,
            TokenModeArg::Content => TokenMode::Content,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Where to write the dependency snapshot
    #[arg(short, long, value_name = "FILE")]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct AppendArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Where to write the dependency snapshot
    #[arg(short, long, value_name = "FILE")]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Where to write the dependency snapshot
    #[arg(short, long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Quiet period before a rebuild, in milliseconds
    #[arg(long, value_name = "MS")]
    pub debounce: Option<u64>,

    /// Only analyze; skip the append step
    #[arg(long)]
    pub analyze_only: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Also check that configured directories exist
    #[arg(long)]
    pub fs: bool,

    /// Print the effective configuration as TOML
    #[arg(long)]
    pub print: bool,
}

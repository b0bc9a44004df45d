//! Command implementations.
//!
//! - [`analyze`]: dependency snapshot only
//! - [`append`]: merge generated bundles into upstream output
//! - [`build`]: analyze, then append
//! - [`watch`]: build, then rebuild on change
//! - [`check`]: configuration validation
//!
//! Each module exposes an `execute` function taking its parsed arguments.

pub mod analyze;
pub mod append;
pub mod build;
pub mod check;
pub mod watch;
pub(crate) mod utils;

pub use analyze::execute as analyze_execute;
pub use append::execute as append_execute;
pub use build::execute as build_execute;
pub use check::execute as check_execute;
pub use watch::execute as watch_execute;

//! Configuration for autodep: types, discovery, layered loading and
//! validation.

pub mod config;
pub mod discovery;
pub mod error;
pub mod loading;
pub mod settings;
pub mod validation;

pub use config::*;
pub use error::*;
pub use settings::*;

pub use discovery::{ConfigDiscovery, ConfigFormat, ConfigSource};
pub use loading::{ConfigLoader, ConfigOverrides, ENV_PREFIX, LoadedConfig, discover};
pub use validation::{ConfigValidator, FsValidator, SchemaValidator};

//! Global settings shared by every command.

use autodep::TokenMode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Task limit for parsing and resolution; CPU count (at most 8) when
    /// absent.
    #[serde(default)]
    pub max_concurrency: Option<usize>,

    /// `stat` (size and mtime) or `content` (BLAKE3 hash).
    #[serde(default)]
    pub token_mode: TokenMode,

    /// Names skipped while listing trees; `node_modules` and `.git` when
    /// absent.
    #[serde(default)]
    pub ignore: Option<Vec<String>>,

    #[serde(default)]
    pub log_level: Option<String>,

    /// Debounce for `watch`, in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    200
}

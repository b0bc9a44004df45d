//! Terminal output: status lines and build summaries.

mod messages;

use std::time::Duration;

use autodep::{AppendSummary, BundleDeps};

pub use messages::{error, info, success, warning};

/// Apply `--no-color`. Without it, owo-colors follows the terminal and
/// `NO_COLOR`/`FORCE_COLOR`.
pub fn init_colors(no_color: bool) {
    if no_color {
        owo_colors::set_override(false);
    }
}

pub fn format_duration(duration: Duration) -> String {
    let ms = duration.as_millis();
    if ms < 1000 {
        format!("{}ms", ms)
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}

/// One line per bundle, e.g. `app: 3 static, 1 dynamic, 0 template`.
pub fn bundle_summary(deps: &BundleDeps) -> Vec<String> {
    deps.iter()
        .map(|(name, bundle)| {
            format!(
                "{}: {} static, {} dynamic, {} template",
                name,
                bundle.static_imports.len(),
                bundle.dynamic_imports.len(),
                bundle.dynamic_template_imports.len()
            )
        })
        .collect()
}

pub fn append_summary(summary: &AppendSummary) -> String {
    if summary.is_empty() {
        return "output up to date".to_string();
    }
    format!(
        "{} merged, {} copied, {} removed",
        summary.regenerated, summary.written, summary.removed
    )
}

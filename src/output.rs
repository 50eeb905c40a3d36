//! # Terminal Output
//!
//! Rendering helpers for the `filedest` binary: per-error lines and the
//! end-of-run summary.
//!
//! Color and emoji use follow the `--color=never|always|auto` flag. In auto
//! mode the usual environment conventions apply: `NO_COLOR` (any value),
//! `CLICOLOR=0` and `TERM=dumb` turn color off, `CLICOLOR_FORCE` turns it on
//! even without a TTY.

use std::env;

use console::style;

use crate::error::Error;
use crate::sink::Summary;

/// Whether colored output and emoji are used.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub use_color: bool,
}

impl OutputConfig {
    /// Build from the `--color` flag value, falling back to environment
    /// detection for anything other than `always` or `never`.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };
        Self { use_color }
    }

    fn detect_color_support() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }
        console::Term::stdout().features().colors_supported()
    }

    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// `emoji` when color is on, `plain` otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji
    } else {
        plain
    }
}

/// One line describing a failed descriptor, prefixed with the failed
/// operation.
pub fn error_line(config: &OutputConfig, err: &Error) -> String {
    let label = format!("{} {}", emoji(config, "❌", "[ERR]"), err.operation());
    if config.use_color {
        format!("{}: {}", style(label).red().bold(), err)
    } else {
        format!("{}: {}", label, err)
    }
}

/// Multi-line human-readable summary of a finished stage.
pub fn summary_text(config: &OutputConfig, summary: &Summary) -> String {
    let headline = if summary.failed == 0 {
        format!(
            "{} {} item(s) written",
            emoji(config, "✅", "[OK]"),
            summary.emitted()
        )
    } else {
        format!(
            "{} {} item(s) written, {} failed",
            emoji(config, "⚠️", "[WARN]"),
            summary.emitted(),
            summary.failed
        )
    };

    let mut lines = vec![headline];
    let rows = [
        ("files", summary.written),
        ("streamed", summary.streamed),
        ("directories", summary.directories),
        ("symlinks", summary.symlinks),
        ("empty", summary.empty),
        ("skipped", summary.skipped),
    ];
    for (label, count) in rows.iter().filter(|(_, count)| *count > 0) {
        let count = if config.use_color {
            style(count).cyan().to_string()
        } else {
            count.to_string()
        };
        lines.push(format!("  {:<12} {}", label, count));
    }
    lines.join("\n")
}

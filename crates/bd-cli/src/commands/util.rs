//! Shared utilities for CLI commands.

use std::fmt::Write;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use bd_core::{BreakdownInput, Diagnostics, RootSpan, TimeSpan};

/// Reads an input document from `path`, or from stdin when `path` is `-`.
pub fn read_input(path: &Path) -> Result<BreakdownInput> {
    if path == Path::new("-") {
        return BreakdownInput::from_reader(io::stdin().lock()).context("failed to parse stdin");
    }
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    BreakdownInput::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse {}", path.display()))
}

/// Formats an optional id, using `-` for none.
pub fn format_id(id: Option<i64>) -> String {
    id.map_or_else(|| "-".to_string(), |id| id.to_string())
}

/// Heading line for one root span.
pub fn root_heading(root: &RootSpan) -> String {
    format!(
        "ROOT {} (source {}, context {}) [{}, {})",
        root.id,
        root.source_id,
        root.context,
        root.start,
        root.end()
    )
}

/// Generates a 10-character progress bar.
/// Values <5% of max get a single block for visibility.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn progress_bar(value: i64, max: i64) -> String {
    if max <= 0 {
        return "░░░░░░░░░░".to_string();
    }

    let ratio = value as f64 / max as f64;
    let filled = if ratio < 0.05 && value > 0 {
        1
    } else {
        (ratio * 10.0).round().clamp(0.0, 10.0) as usize
    };

    let empty = 10 - filled;
    format!("{}{}", "█".repeat(filled), "░".repeat(empty))
}

/// Appends a footer describing dropped or ignored input, if any.
pub fn write_diagnostics(output: &mut String, diagnostics: &Diagnostics) {
    if !diagnostics.malformed.is_empty() {
        writeln!(output).unwrap();
        writeln!(
            output,
            "Dropped {} malformed row(s):",
            diagnostics.malformed.len()
        )
        .unwrap();
        for m in &diagnostics.malformed {
            writeln!(output, "  - {} {} ({}): {}", m.kind, m.id, m.context, m.reason).unwrap();
        }
    }
    if diagnostics.unknown_context > 0 {
        writeln!(output).unwrap();
        writeln!(
            output,
            "Ignored {} row(s) in contexts without root spans.",
            diagnostics.unknown_context
        )
        .unwrap();
    }
    if diagnostics.uncovered_roots > 0 {
        writeln!(output).unwrap();
        writeln!(
            output,
            "{} root span(s) had no overlapping intervals.",
            diagnostics.uncovered_roots
        )
        .unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_bar_scales_to_ten_blocks() {
        assert_eq!(progress_bar(50, 100), "█████░░░░░");
        assert_eq!(progress_bar(100, 100), "██████████");
        assert_eq!(progress_bar(0, 100), "░░░░░░░░░░");
    }

    #[test]
    fn progress_bar_small_values_get_one_block() {
        assert_eq!(progress_bar(1, 1000), "█░░░░░░░░░");
    }

    #[test]
    fn progress_bar_zero_max_is_empty() {
        assert_eq!(progress_bar(5, 0), "░░░░░░░░░░");
    }

    #[test]
    fn format_id_uses_dash_for_none() {
        assert_eq!(format_id(None), "-");
        assert_eq!(format_id(Some(12)), "12");
    }

    #[test]
    fn read_input_reports_missing_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("missing.json");

        let err = read_input(&path).unwrap_err();

        assert!(err.to_string().starts_with("failed to open"));
    }

    #[test]
    fn read_input_parses_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("input.json");
        std::fs::write(
            &path,
            r#"{"roots": [{"id": 1, "context": "T1", "start": 0, "duration": 10}]}"#,
        )
        .unwrap();

        let input = read_input(&path).unwrap();

        assert_eq!(input.roots.len(), 1);
        assert!(input.slices.is_empty());
    }
}

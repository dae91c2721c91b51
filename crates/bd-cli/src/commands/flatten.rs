//! Flatten command: show the innermost-active slice sequence of every root.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use bd_core::{BreakdownConfig, BreakdownInput, SliceBreakdown, TimeSpan, flatten_slices};

use super::util::{format_id, root_heading, write_diagnostics};

pub fn run<W: Write>(
    writer: &mut W,
    input: &BreakdownInput,
    config: &BreakdownConfig,
    json: bool,
) -> Result<()> {
    let flat = flatten_slices(input, config).context("failed to flatten slices")?;

    if json {
        serde_json::to_writer_pretty(&mut *writer, &flat)?;
        writeln!(writer)?;
    } else {
        write!(writer, "{}", format_slices(&flat))?;
    }
    Ok(())
}

/// Formats the flattened stack, one section per root.
pub fn format_slices(flat: &SliceBreakdown) -> String {
    let mut output = String::new();

    if flat.roots.is_empty() {
        writeln!(output, "No root spans with contributing intervals.").unwrap();
    }

    for (i, root) in flat.roots.iter().enumerate() {
        if i > 0 {
            writeln!(output).unwrap();
        }
        writeln!(output, "{}", root_heading(root)).unwrap();
        writeln!(
            output,
            "  {:>10} {:>10}  {:>8}  {:>5}  LABEL",
            "START", "END", "SLICE", "DEPTH"
        )
        .unwrap();
        for interval in flat.intervals.iter().filter(|f| f.root_id == root.id) {
            let depth = interval
                .depth
                .map_or_else(|| "-".to_string(), |d| d.to_string());
            writeln!(
                output,
                "  {:>10} {:>10}  {:>8}  {:>5}  {}",
                interval.start,
                interval.end(),
                format_id(interval.slice_id),
                depth,
                interval.label.as_deref().unwrap_or("(idle)")
            )
            .unwrap();
        }
    }

    write_diagnostics(&mut output, &flat.diagnostics);
    output
}

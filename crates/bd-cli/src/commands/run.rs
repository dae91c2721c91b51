//! Run command: decompose every root span into exclusive, attributed records.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use bd_core::{Breakdown, BreakdownConfig, BreakdownInput, TimeSpan, compute_breakdown};

use super::util::{format_id, root_heading, write_diagnostics};

pub fn run<W: Write>(
    writer: &mut W,
    input: &BreakdownInput,
    config: &BreakdownConfig,
    json: bool,
) -> Result<()> {
    let breakdown = compute_breakdown(input, config).context("failed to compute breakdown")?;

    if json {
        serde_json::to_writer_pretty(&mut *writer, &breakdown)?;
        writeln!(writer)?;
    } else {
        write!(writer, "{}", format_breakdown(&breakdown))?;
    }
    Ok(())
}

/// Formats the human-readable record table, one section per root.
pub fn format_breakdown(breakdown: &Breakdown) -> String {
    let mut output = String::new();

    if breakdown.roots.is_empty() {
        writeln!(output, "No root spans with contributing intervals.").unwrap();
    }

    for (i, root) in breakdown.roots.iter().enumerate() {
        if i > 0 {
            writeln!(output).unwrap();
        }
        writeln!(output, "{}", root_heading(root)).unwrap();
        writeln!(
            output,
            "  {:>10} {:>10}  {:>8}  {:>8}  CAUSE",
            "START", "END", "SLICE", "STATE"
        )
        .unwrap();
        for record in breakdown.records.iter().filter(|r| r.root_id == root.id) {
            writeln!(
                output,
                "  {:>10} {:>10}  {:>8}  {:>8}  {}",
                record.start,
                record.end(),
                format_id(record.slice_id),
                format_id(record.state_id),
                record.cause
            )
            .unwrap();
        }
    }

    write_diagnostics(&mut output, &breakdown.diagnostics);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    use bd_core::input::{RootRow, SliceRow, StateRow};
    use insta::assert_snapshot;

    fn sample_input() -> BreakdownInput {
        BreakdownInput {
            roots: vec![RootRow {
                id: Some(7),
                context: Some("main".into()),
                start: Some(0),
                duration: Some(100),
            }],
            slices: vec![
                SliceRow {
                    id: Some(1),
                    context: Some("main".into()),
                    start: Some(10),
                    duration: Some(30),
                    label: Some("activityStart".to_string()),
                    ..SliceRow::default()
                },
                SliceRow {
                    id: Some(2),
                    context: Some("main".into()),
                    parent_id: Some(1),
                    start: Some(15),
                    duration: Some(10),
                    label: Some("inflate".to_string()),
                    ..SliceRow::default()
                },
            ],
            states: vec![StateRow {
                id: Some(3),
                context: Some("main".into()),
                start: Some(0),
                duration: Some(100),
                state: Some("Running".to_string()),
                ..StateRow::default()
            }],
        }
    }

    #[test]
    fn formats_records_per_root() {
        let breakdown = compute_breakdown(&sample_input(), &BreakdownConfig::default()).unwrap();

        let output = format_breakdown(&breakdown);

        assert_snapshot!(output, @r"
        ROOT 0 (source 7, context main) [0, 100)
               START        END     SLICE     STATE  CAUSE
                   0         10         -         3  Running
                  10         15         1         3  activityStart
                  15         25         2         3  inflate
                  25         40         1         3  activityStart
                  40        100         -         3  Running
        ");
    }

    #[test]
    fn formats_empty_breakdown_with_diagnostics() {
        let mut input = sample_input();
        input.roots[0].duration = Some(0);

        let breakdown = compute_breakdown(&input, &BreakdownConfig::default()).unwrap();
        let output = format_breakdown(&breakdown);

        assert_snapshot!(output, @r"
        No root spans with contributing intervals.

        Dropped 1 malformed row(s):
          - root span 7 (main): root span has non-positive duration 0

        Ignored 3 row(s) in contexts without root spans.
        ");
    }

    #[test]
    fn json_output_is_parseable() {
        let mut output = Vec::new();
        run(&mut output, &sample_input(), &BreakdownConfig::default(), true).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(value["records"].as_array().unwrap().len(), 5);
        assert_eq!(value["records"][2]["cause"], "inflate");
        assert_eq!(value["roots"][0]["source_id"], 7);
    }
}

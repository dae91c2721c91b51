//! Summary command: total exclusive time per cause for every root span.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use bd_core::{
    Breakdown, BreakdownConfig, BreakdownInput, CauseTotal, Diagnostics, RootSpan, RootSummary,
    compute_breakdown, summarize,
};
use serde::Serialize;

use super::util::{progress_bar, root_heading, write_diagnostics};

/// JSON summary structure.
#[derive(Debug, Serialize)]
pub struct JsonSummary<'a> {
    pub roots: Vec<JsonRootSummary<'a>>,
    pub diagnostics: &'a Diagnostics,
}

#[derive(Debug, Serialize)]
pub struct JsonRootSummary<'a> {
    pub root: &'a RootSpan,
    pub covered: i64,
    pub causes: &'a [CauseTotal],
}

pub fn run<W: Write>(
    writer: &mut W,
    input: &BreakdownInput,
    config: &BreakdownConfig,
    json: bool,
) -> Result<()> {
    let breakdown = compute_breakdown(input, config).context("failed to compute breakdown")?;
    let summaries = summarize(&breakdown.records);

    if json {
        write!(writer, "{}", format_summary_json(&breakdown, &summaries)?)?;
    } else {
        write!(writer, "{}", format_summary(&breakdown, &summaries))?;
    }
    Ok(())
}

/// Pairs each summary with the root span it describes.
fn with_roots<'a>(
    breakdown: &'a Breakdown,
    summaries: &'a [RootSummary],
) -> impl Iterator<Item = (&'a RootSpan, &'a RootSummary)> {
    summaries.iter().filter_map(|summary| {
        breakdown
            .roots
            .iter()
            .find(|root| root.id == summary.root_id)
            .map(|root| (root, summary))
    })
}

pub fn format_summary(breakdown: &Breakdown, summaries: &[RootSummary]) -> String {
    let mut output = String::new();

    if summaries.is_empty() {
        writeln!(output, "No root spans with contributing intervals.").unwrap();
    }

    for (i, (root, summary)) in with_roots(breakdown, summaries).enumerate() {
        if i > 0 {
            writeln!(output).unwrap();
        }
        writeln!(output, "{}", root_heading(root)).unwrap();
        for cause in &summary.causes {
            writeln!(
                output,
                "  {:<24} {:>10} {:>5.1}%  {}",
                cause.cause,
                cause.duration,
                cause.percentage,
                progress_bar(cause.duration, summary.duration)
            )
            .unwrap();
        }
    }

    write_diagnostics(&mut output, &breakdown.diagnostics);
    output
}

pub fn format_summary_json(breakdown: &Breakdown, summaries: &[RootSummary]) -> Result<String> {
    let report = JsonSummary {
        roots: with_roots(breakdown, summaries)
            .map(|(root, summary)| JsonRootSummary {
                root,
                covered: summary.duration,
                causes: &summary.causes,
            })
            .collect(),
        diagnostics: &breakdown.diagnostics,
    };
    let mut json = serde_json::to_string_pretty(&report)?;
    json.push('\n');
    Ok(json)
}

//! Plain-text charts written next to the CSV reports.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::analyzers::types::SectionMean;
use crate::analyzers::utility::{mean, stddev};
use crate::record::{ScoreField, StudentRecord};

pub const GRADE_DISTRIBUTION_FILE: &str = "grade_distribution.txt";
pub const SECTION_COMPARISON_FILE: &str = "section_comparison.txt";

const BAR_WIDTH: usize = 50;
const BINS: usize = 10;

fn bin_label(bin: usize) -> String {
    let low = bin * 10;
    let high = if bin == BINS - 1 { 100 } else { low + 9 };
    format!("{low}-{high}")
}

fn bin_of(score: f64) -> usize {
    ((score.max(0.0) / 10.0).floor() as usize).min(BINS - 1)
}

/// Histogram of final scores in 10-point bins, with the class mean marked.
pub fn render_grade_distribution(records: &[StudentRecord]) -> String {
    let scores: Vec<f64> = records
        .iter()
        .filter_map(|r| r.value(&ScoreField::FinalScore))
        .collect();

    let mut out = String::new();
    if scores.is_empty() {
        let _ = writeln!(out, "Distribution of Final Scores: no graded students");
        return out;
    }

    let avg = mean(&scores);
    let _ = writeln!(
        out,
        "Distribution of Final Scores (n={}, mean={:.2}, sd={:.2})",
        scores.len(),
        avg,
        stddev(&scores, avg)
    );

    let mut counts = [0usize; BINS];
    for s in &scores {
        counts[bin_of(*s)] += 1;
    }
    let max_count = counts.iter().copied().max().unwrap_or(0).max(1);
    let mean_bin = bin_of(avg);

    for (bin, count) in counts.iter().enumerate() {
        let len = count * BAR_WIDTH / max_count;
        let len = if *count > 0 { len.max(1) } else { 0 };
        let marker = if bin == mean_bin { " <- mean" } else { "" };
        let _ = writeln!(
            out,
            "{:>6} | {:<width$} {}{}",
            bin_label(bin),
            "#".repeat(len),
            count,
            marker,
            width = BAR_WIDTH
        );
    }
    out
}

/// Horizontal bars of section averages on a 0-100 scale.
pub fn render_section_averages(summary: &BTreeMap<String, SectionMean>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Average Final Score by Section (0-100)");
    if summary.is_empty() {
        let _ = writeln!(out, "No graded sections.");
        return out;
    }

    let label_width = summary.keys().map(|k| k.chars().count()).max().unwrap_or(0);
    for (section, avg) in summary {
        let len = ((avg.mean.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f64).round() as usize;
        let _ = writeln!(
            out,
            "{:<lw$} | {:<bw$} {:.2}",
            section,
            "=".repeat(len),
            avg.mean,
            lw = label_width,
            bw = BAR_WIDTH
        );
    }
    out
}

/// Writes one chart into `output_dir`, creating the directory if needed.
pub fn write_chart(output_dir: &Path, name: &str, body: &str) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let path = output_dir.join(name);
    fs::write(&path, body).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "Chart saved");
    Ok(path)
}

/// Writes both charts into `output_dir` and returns their paths.
pub fn write_charts(
    records: &[StudentRecord],
    summary: &BTreeMap<String, SectionMean>,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    Ok(vec![
        write_chart(
            output_dir,
            GRADE_DISTRIBUTION_FILE,
            &render_grade_distribution(records),
        )?,
        write_chart(
            output_dir,
            SECTION_COMPARISON_FILE,
            &render_section_averages(summary),
        )?,
    ])
}

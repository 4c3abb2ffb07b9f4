//! Output formatting and persistence for graded rosters.
//!
//! Supports plain-text console reports, CSV export (per section and for the
//! at-risk list) and JSON serialization.

use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::analyzers::grade::NOT_GRADED;
use crate::analyzers::types::{ClassStatistics, SectionComparison};
use crate::record::StudentRecord;

/// Written in place of the at-risk CSV when nobody is at risk.
pub const NO_AT_RISK_MESSAGE: &str = "No at-risk students found.";

const RULE: &str = "---------------------------------------------------------";

/// Formats a score for CSV cells: empty when missing, at least one decimal otherwise.
pub fn format_score(score: Option<f64>) -> String {
    match score {
        None => String::new(),
        Some(v) if v.fract() == 0.0 => format!("{v:.1}"),
        Some(v) => v.to_string(),
    }
}

/// Renders the course summary block.
pub fn render_summary(stats: &ClassStatistics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "--- COURSE PERFORMANCE SUMMARY ---");

    if stats.total_students == 0 {
        let _ = writeln!(out, "No summary statistics available.");
        return out;
    }

    let _ = writeln!(out, "Total students: {}", stats.total_students);
    let _ = writeln!(out, "Graded students: {}", stats.graded_students);
    let _ = writeln!(out, "Class average: {:.2}", stats.final_score.mean);
    let _ = writeln!(out, "Highest score: {:.2}", stats.final_score.max);
    let _ = writeln!(out, "Lowest score: {:.2}", stats.final_score.min);
    let _ = writeln!(out, "Standard deviation: {:.2}", stats.stddev);
    let _ = writeln!(
        out,
        "Percentiles: 25th {:.2} | 50th {:.2} | 75th {:.2} | 90th {:.2}",
        stats.percentiles.p25, stats.percentiles.p50, stats.percentiles.p75, stats.percentiles.p90
    );
    let _ = writeln!(
        out,
        "At risk count: {} (below {:.2})",
        stats.at_risk_count, stats.at_risk_threshold
    );

    let _ = writeln!(out, "Section averages:");
    if stats.section_averages.is_empty() {
        let _ = writeln!(out, "  (no graded students)");
    }
    for (section, avg) in &stats.section_averages {
        let _ = writeln!(out, "  - {}: {:.2}", section, avg.mean);
    }

    let _ = writeln!(out, "Grade distribution:");
    for entry in &stats.grade_distribution {
        let _ = writeln!(out, "  - {}: {}", entry.grade, entry.count);
    }

    let _ = writeln!(out, "{RULE}");
    out
}

/// Renders the section-by-section comparison block.
pub fn render_section_comparison(comparison: &BTreeMap<String, SectionComparison>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "--- SECTION PERFORMANCE COMPARISON ---");

    if comparison.is_empty() {
        let _ = writeln!(out, "No section comparison data available.");
        return out;
    }

    for (section, stats) in comparison {
        let _ = writeln!(out);
        let _ = writeln!(out, "Section: {section}");
        let _ = writeln!(out, "  Students: {}", stats.count);
        let _ = writeln!(out, "  Average:  {}", stats.average);
        let _ = writeln!(out, "  Median:   {}", stats.median);
        let _ = writeln!(out, "  Mode:     {}", stats.mode);
        let _ = writeln!(out, "  Highest:  {}", stats.highest);
        let _ = writeln!(out, "  Lowest:   {}", stats.lowest);
    }

    let _ = writeln!(out, "{RULE}");
    out
}

/// Renders the roster one student per line, in its current order.
pub fn render_roster(records: &[StudentRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "--- Current Student Roster ---");

    if records.is_empty() {
        let _ = writeln!(out, "No students loaded.");
        return out;
    }

    let _ = writeln!(
        out,
        "Displaying {} students (in current sort order):",
        records.len()
    );
    for r in records {
        let grade = r.letter_grade.as_deref().unwrap_or(NOT_GRADED);
        let score = r
            .final_score
            .map(|s| format!("{s:.2}"))
            .unwrap_or_else(|| NOT_GRADED.to_string());
        let _ = writeln!(
            out,
            "  ID: {:<6} | Name: {}, {:<20} | Section: {:<7} | Grade: {} ({})",
            r.student_id, r.last_name, r.first_name, r.section, grade, score
        );
    }
    out
}

fn record_header(quiz_count: usize) -> Vec<String> {
    let mut header: Vec<String> = ["student_id", "last_name", "first_name", "section"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    header.extend((1..=quiz_count).map(|n| format!("quiz_{n}")));
    header.extend(
        [
            "midterm",
            "final_exam",
            "attendance_percent",
            "final_score",
            "letter_grade",
            "is_at_risk",
        ]
        .iter()
        .map(|s| s.to_string()),
    );
    header
}

fn record_fields(r: &StudentRecord, quiz_count: usize) -> Vec<String> {
    let mut fields = vec![
        r.student_id.clone(),
        r.last_name.clone(),
        r.first_name.clone(),
        r.section.clone(),
    ];
    fields.extend((0..quiz_count).map(|i| format_score(r.quizzes.get(i).copied().flatten())));
    fields.push(format_score(r.midterm));
    fields.push(format_score(r.final_exam));
    fields.push(format_score(r.attendance_percent));
    fields.push(format_score(r.final_score));
    fields.push(r.letter_grade.clone().unwrap_or_default());
    fields.push(r.is_at_risk.to_string());
    fields
}

/// Writes records as a CSV file with a header row, replacing any existing file.
pub fn write_records(path: &Path, records: &[&StudentRecord]) -> Result<()> {
    let quiz_count = records.iter().map(|r| r.quizzes.len()).max().unwrap_or(0);
    debug!(path = %path.display(), rows = records.len(), "Writing CSV");

    let mut writer = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;

    writer.write_record(record_header(quiz_count))?;
    for r in records {
        writer.write_record(record_fields(r, quiz_count))?;
    }
    writer.flush()?;

    Ok(())
}

fn safe_section_name(section: &str) -> String {
    section
        .chars()
        .map(|c| match c {
            ' ' | '-' | '/' | '\\' => '_',
            other => other,
        })
        .collect()
}

/// File name used for a section's CSV report.
pub fn section_file_name(section: &str) -> String {
    format!("section_{}_report.csv", safe_section_name(section))
}

/// Like [`section_file_name`], but adds `_2`, `_3`, ... when another section
/// already claimed the name in `taken`.
fn unique_section_file_name(section: &str, taken: &mut HashSet<String>) -> String {
    let safe = safe_section_name(section);
    let mut name = format!("section_{safe}_report.csv");
    let mut n = 2;
    while !taken.insert(name.clone()) {
        name = format!("section_{safe}_{n}_report.csv");
        n += 1;
    }
    name
}

/// Exports one CSV per section into `output_dir`.
///
/// Returns the paths written, ordered by section. Sections whose names only
/// differ in characters that are replaced in file names get distinct,
/// suffixed files.
pub fn export_section_reports(records: &[StudentRecord], output_dir: &Path) -> Result<Vec<PathBuf>> {
    if records.is_empty() {
        info!("No student data available to export");
        return Ok(Vec::new());
    }

    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let mut sections: BTreeMap<&str, Vec<&StudentRecord>> = BTreeMap::new();
    for r in records {
        sections.entry(r.section_label()).or_default().push(r);
    }

    let mut taken = HashSet::new();
    let mut written = Vec::with_capacity(sections.len());
    for (section, rows) in sections {
        let name = unique_section_file_name(section, &mut taken);
        if name != section_file_name(section) {
            warn!(section, file = %name, "Section file name already used, writing to a suffixed file");
        }
        let path = output_dir.join(name);
        write_records(&path, &rows)?;
        info!(section, path = %path.display(), "Section report saved");
        written.push(path);
    }

    Ok(written)
}

/// Exports the at-risk list to `path`, or a one-line notice when it is empty.
pub fn export_at_risk_list(at_risk: &[&StudentRecord], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    if at_risk.is_empty() {
        fs::write(path, format!("{NO_AT_RISK_MESSAGE}\n"))
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "At-risk report generated (empty)");
        return Ok(());
    }

    write_records(path, at_risk)?;
    info!(path = %path.display(), students = at_risk.len(), "At-risk report generated");
    Ok(())
}

/// Serializes a value to pretty-printed JSON at `path`.
pub fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    let body = serde_json::to_vec_pretty(value)?;
    fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))?;
    debug!(path = %path.display(), "JSON written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::types::{BasicStats, Mode, Percentiles, SectionMean};

    fn graded(id: &str, last: &str, section: &str, score: f64, at_risk: bool) -> StudentRecord {
        StudentRecord {
            quizzes: vec![Some(80.0), None],
            midterm: Some(85.0),
            final_score: Some(score),
            letter_grade: Some("B".to_string()),
            is_at_risk: at_risk,
            ..StudentRecord::new(id, last, "Ana", section)
        }
    }

    fn read_rows(path: &Path) -> Vec<csv::StringRecord> {
        let mut rdr = csv::Reader::from_path(path).unwrap();
        rdr.records().map(|r| r.unwrap()).collect()
    }

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(None), "");
        assert_eq!(format_score(Some(62.0)), "62.0");
        assert_eq!(format_score(Some(88.75)), "88.75");
    }

    #[test]
    fn test_section_file_name() {
        assert_eq!(section_file_name("BSIT-1A"), "section_BSIT_1A_report.csv");
        assert_eq!(section_file_name("Block 2"), "section_Block_2_report.csv");
    }

    #[test]
    fn test_render_summary() {
        let mut sections = BTreeMap::new();
        sections.insert("BSIT-1A".to_string(), SectionMean { mean: 90.25 });
        let stats = ClassStatistics {
            total_students: 5,
            graded_students: 5,
            final_score: BasicStats {
                mean: 84.3,
                min: 62.0,
                max: 95.5,
            },
            percentiles: Percentiles::default(),
            stddev: 11.6,
            at_risk_threshold: 65.0,
            at_risk_count: 1,
            section_averages: sections,
            grade_distribution: Vec::new(),
        };

        let text = render_summary(&stats);
        assert!(text.contains("--- COURSE PERFORMANCE SUMMARY"));
        assert!(text.contains("Class average: 84.30"));
        assert!(text.contains("Total students: 5"));
        assert!(text.contains("At risk count: 1"));
        assert!(text.contains("  - BSIT-1A: 90.25"));
    }

    #[test]
    fn test_render_section_comparison() {
        let mut comparison = BTreeMap::new();
        comparison.insert(
            "BSIT-1A".to_string(),
            SectionComparison {
                count: 2,
                average: "90.25".to_string(),
                median: "90.25".to_string(),
                mode: Mode::NoUniqueMode,
                highest: "95.50".to_string(),
                lowest: "85.00".to_string(),
            },
        );

        let text = render_section_comparison(&comparison);
        assert!(text.contains("Section: BSIT-1A"));
        assert!(text.contains("Mode:     N/A (no unique mode)"));
        assert!(render_section_comparison(&BTreeMap::new()).contains("No section comparison data"));
    }

    #[test]
    fn test_render_roster() {
        let text = render_roster(&[graded("101", "Reyes", "BSIT-1A", 95.5, false)]);
        assert!(text.contains("Displaying 1 students"));
        assert!(text.contains("ID: 101"));
        assert!(text.contains("Grade: B (95.50)"));
        assert!(render_roster(&[]).contains("No students loaded."));
    }

    #[test]
    fn test_export_at_risk_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports/at_risk_report.csv");
        let rec = graded("103", "Lim", "BSIT-1C", 62.0, true);

        export_at_risk_list(&[&rec], &path).unwrap();

        let rows = read_rows(&path);
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "103");
        assert_eq!(&rows[0][1], "Lim");

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let headers = rdr.headers().unwrap().clone();
        let score_idx = headers.iter().position(|h| h == "final_score").unwrap();
        let row = rdr.records().next().unwrap().unwrap();
        assert_eq!(&row[score_idx], "62.0");
    }

    #[test]
    fn test_export_empty_at_risk_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("at_risk_report.csv");

        export_at_risk_list(&[], &path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim(), NO_AT_RISK_MESSAGE);
    }

    #[test]
    fn test_export_section_reports() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![
            graded("101", "Reyes", "BSIT-1A", 95.5, false),
            graded("102", "Santos", "BSIT-1B", 88.0, false),
            graded("104", "Tan", "BSIT-1A", 85.0, false),
        ];

        let written = export_section_reports(&records, dir.path()).unwrap();
        assert_eq!(written.len(), 2);

        let path_1a = dir.path().join("section_BSIT_1A_report.csv");
        assert!(path_1a.exists());
        assert!(dir.path().join("section_BSIT_1B_report.csv").exists());

        let ids: Vec<String> = read_rows(&path_1a).iter().map(|r| r[0].to_string()).collect();
        assert_eq!(ids, vec!["101", "104"]);
    }

    #[test]
    fn test_export_section_reports_keeps_colliding_sections_apart() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![
            graded("101", "Reyes", "BSIT-1A", 95.5, false),
            graded("102", "Santos", "BSIT 1A", 88.0, false),
        ];

        let written = export_section_reports(&records, dir.path()).unwrap();
        assert_eq!(
            written,
            vec![
                dir.path().join("section_BSIT_1A_report.csv"),
                dir.path().join("section_BSIT_1A_2_report.csv"),
            ]
        );

        // "BSIT 1A" sorts before "BSIT-1A"
        let first: Vec<String> = read_rows(&written[0]).iter().map(|r| r[0].to_string()).collect();
        let second: Vec<String> = read_rows(&written[1]).iter().map(|r| r[0].to_string()).collect();
        assert_eq!(first, vec!["102"]);
        assert_eq!(second, vec!["101"]);
    }

    #[test]
    fn test_csv_header_covers_quizzes_and_derived_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let rec = graded("101", "Reyes", "BSIT-1A", 95.5, false);

        write_records(&path, &[&rec]).unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = rdr.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(
            headers,
            vec![
                "student_id",
                "last_name",
                "first_name",
                "section",
                "quiz_1",
                "quiz_2",
                "midterm",
                "final_exam",
                "attendance_percent",
                "final_score",
                "letter_grade",
                "is_at_risk"
            ]
        );
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        write_json(&path, &SectionMean { mean: 90.25 }).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["mean"], 90.25);
    }
}

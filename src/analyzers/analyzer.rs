use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use tracing::info;

use crate::analyzers::compare::compare_sections;
use crate::analyzers::statistics::{at_risk_students, class_statistics};
use crate::analyzers::transform::transform_all;
use crate::analyzers::types::{ClassStatistics, ReportSummary, SectionComparison};
use crate::chart::write_charts;
use crate::config::Config;
use crate::output::{
    export_at_risk_list, export_section_reports, render_section_comparison, render_summary,
    write_json,
};
use crate::record::StudentRecord;

pub const AT_RISK_FILE: &str = "at_risk_report.csv";
pub const SUMMARY_FILE: &str = "summary.json";

/// Optional capabilities of the full report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub charts: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self { charts: true }
    }
}

/// Everything a full report produced.
#[derive(Debug)]
pub struct FullReport {
    pub records: Vec<StudentRecord>,
    pub statistics: ClassStatistics,
    pub comparison: BTreeMap<String, SectionComparison>,
    pub at_risk_ids: Vec<String>,
    /// Summary and comparison text, ready for the console.
    pub console: String,
    pub artifacts: Vec<PathBuf>,
}

/// Grades the records and writes every report artifact into `output_dir`.
///
/// The input records are not modified; the annotated copies are returned in
/// the [`FullReport`].
#[tracing::instrument(skip_all, fields(records = records.len(), output_dir = %output_dir.display()))]
pub fn run_full_report(
    records: &[StudentRecord],
    config: &Config,
    output_dir: &Path,
    options: ReportOptions,
) -> Result<FullReport> {
    ensure!(!records.is_empty(), "no student data to report on");

    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let threshold = config.thresholds.at_risk_grade;
    let annotated = transform_all(records, config);
    let statistics = class_statistics(&annotated, &config.grading_scale, threshold);
    let comparison = compare_sections(&annotated);
    let at_risk = at_risk_students(&annotated, threshold);

    let mut console = render_summary(&statistics);
    console.push('\n');
    console.push_str(&render_section_comparison(&comparison));

    let mut artifacts = Vec::new();

    let at_risk_path = output_dir.join(AT_RISK_FILE);
    export_at_risk_list(&at_risk, &at_risk_path)?;
    artifacts.push(at_risk_path);

    artifacts.extend(export_section_reports(&annotated, output_dir)?);

    let at_risk_ids: Vec<String> = at_risk.iter().map(|r| r.student_id.clone()).collect();
    let summary = ReportSummary {
        generated_at: chrono::Utc::now(),
        class_statistics: &statistics,
        section_comparison: &comparison,
        at_risk_students: at_risk_ids.iter().map(String::as_str).collect(),
    };
    let summary_path = output_dir.join(SUMMARY_FILE);
    write_json(&summary_path, &summary)?;
    artifacts.push(summary_path);

    if options.charts {
        artifacts.extend(write_charts(
            &annotated,
            &statistics.section_averages,
            output_dir,
        )?);
    }

    info!(
        artifacts = artifacts.len(),
        at_risk = at_risk_ids.len(),
        "Full report generated"
    );

    Ok(FullReport {
        records: annotated,
        statistics,
        comparison,
        at_risk_ids,
        console,
        artifacts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::GRADE_DISTRIBUTION_FILE;

    fn config() -> Config {
        Config::from_json_str(
            r#"{
                "grade_weights": { "quiz": 0.25, "midterm": 0.30, "final": 0.30, "attendance": 0.15 },
                "grading_scale": { "A": 93.0, "B": 83.0, "C": 73.0, "D": 60.0, "F": 0.0 }
            }"#,
        )
        .unwrap()
    }

    fn student(id: &str, section: &str, score: f64) -> StudentRecord {
        StudentRecord {
            quizzes: vec![Some(score)],
            midterm: Some(score),
            final_exam: Some(score),
            attendance_percent: Some(score),
            ..StudentRecord::new(id, "Reyes", "Mika", section)
        }
    }

    #[test]
    fn test_full_report_writes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![
            student("101", "BSIT-1A", 95.0),
            student("102", "BSIT-1B", 50.0),
            StudentRecord::new("103", "Lim", "Jo", "BSIT-1B"),
        ];

        let report =
            run_full_report(&records, &config(), dir.path(), ReportOptions::default()).unwrap();

        assert_eq!(report.records[0].letter_grade.as_deref(), Some("A"));
        assert_eq!(report.statistics.graded_students, 2);
        assert_eq!(report.at_risk_ids, vec!["102", "103"]);
        assert!(report.console.contains("COURSE PERFORMANCE SUMMARY"));
        assert!(report.console.contains("Section: BSIT-1A"));

        assert!(dir.path().join(AT_RISK_FILE).exists());
        assert!(dir.path().join("section_BSIT_1A_report.csv").exists());
        assert!(dir.path().join("section_BSIT_1B_report.csv").exists());
        assert!(dir.path().join(GRADE_DISTRIBUTION_FILE).exists());

        let summary: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(SUMMARY_FILE)).unwrap())
                .unwrap();
        assert_eq!(summary["at_risk_students"][1], "103");
        assert!(summary["generated_at"].is_string());

        assert!(records[0].final_score.is_none());
    }

    #[test]
    fn test_full_report_without_charts() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![student("101", "BSIT-1A", 80.0)];

        let report =
            run_full_report(&records, &config(), dir.path(), ReportOptions { charts: false })
                .unwrap();

        assert!(!dir.path().join(GRADE_DISTRIBUTION_FILE).exists());
        assert_eq!(report.artifacts.len(), 3);
    }

    #[test]
    fn test_full_report_rejects_empty_roster() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run_full_report(&[], &config(), dir.path(), ReportOptions::default()).is_err());
    }
}

//! Result types produced by the statistics pipeline.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// Statistical mode of a set of scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    Unique(f64),
    NoUniqueMode,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Unique(v) => write!(f, "{v:.2}"),
            Mode::NoUniqueMode => f.write_str("N/A (no unique mode)"),
        }
    }
}

impl Serialize for Mode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Mean, minimum and maximum of a field. All zero when there are no values.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BasicStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// Quartiles and the 90th percentile of a field. All zero when there are no values.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Percentiles {
    #[serde(rename = "25th")]
    pub p25: f64,
    #[serde(rename = "50th")]
    pub p50: f64,
    #[serde(rename = "75th")]
    pub p75: f64,
    #[serde(rename = "90th")]
    pub p90: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SectionMean {
    pub mean: f64,
}

/// Side-by-side figures for one section, formatted for display with two decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionComparison {
    pub count: usize,
    pub average: String,
    pub median: String,
    pub mode: Mode,
    pub highest: String,
    pub lowest: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeCount {
    pub grade: String,
    pub count: usize,
}

/// Course-level summary over annotated records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassStatistics {
    pub total_students: usize,
    pub graded_students: usize,
    pub final_score: BasicStats,
    pub percentiles: Percentiles,
    pub stddev: f64,
    pub at_risk_threshold: f64,
    pub at_risk_count: usize,
    pub section_averages: BTreeMap<String, SectionMean>,
    pub grade_distribution: Vec<GradeCount>,
}

/// Document written to `summary.json` by the full report.
#[derive(Debug, Serialize)]
pub struct ReportSummary<'a> {
    pub generated_at: DateTime<Utc>,
    pub class_statistics: &'a ClassStatistics,
    pub section_comparison: &'a BTreeMap<String, SectionComparison>,
    pub at_risk_students: Vec<&'a str>,
}

use tracing::{debug, info};

use crate::analyzers::grade::letter_grade;
use crate::analyzers::utility::round2;
use crate::config::{Component, Config, GradeWeights};
use crate::record::StudentRecord;

/// Value a record contributes for one weighted component.
///
/// The quiz component is the mean of whatever quizzes are present and is 0.0
/// when there are none; the other components are missing when their score is.
fn component_value(record: &StudentRecord, component: Component) -> Option<f64> {
    match component {
        Component::Quiz => Some(record.quiz_average()),
        Component::Midterm => record.midterm,
        Component::Final => record.final_exam,
        Component::Attendance => record.attendance_percent,
    }
}

/// Computes the weighted final score, rounded to two decimals.
///
/// Returns `None` as soon as any weighted component is missing. Components
/// without a weight are never consulted.
pub fn compute_final_score(record: &StudentRecord, weights: &GradeWeights) -> Option<f64> {
    let mut total = 0.0;
    for (component, weight) in weights.iter() {
        let value = component_value(record, component)?;
        total += value * weight;
    }
    Some(round2(total))
}

/// At risk means a known score strictly below the threshold.
pub fn risk_flag(score: Option<f64>, threshold: f64) -> bool {
    matches!(score, Some(s) if s < threshold)
}

/// Returns a copy of `record` with final score, letter grade and risk flag filled in.
pub fn annotate(record: &StudentRecord, config: &Config) -> StudentRecord {
    let final_score = compute_final_score(record, &config.grade_weights);
    StudentRecord {
        final_score,
        letter_grade: Some(letter_grade(final_score, &config.grading_scale)),
        is_at_risk: risk_flag(final_score, config.thresholds.at_risk_grade),
        ..record.clone()
    }
}

/// Annotates every record. The input is left untouched.
pub fn transform_all(records: &[StudentRecord], config: &Config) -> Vec<StudentRecord> {
    debug!(records = records.len(), "Starting score transformation");
    let out: Vec<StudentRecord> = records.iter().map(|r| annotate(r, config)).collect();
    info!(
        transformed = out.len(),
        "Transformed records (final_score, letter_grade, is_at_risk)"
    );
    out
}

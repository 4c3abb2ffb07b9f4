//! Descriptive statistics over a roster.
//!
//! Every function here is a pure query over a slice of records. Missing
//! values are skipped, and too little data gives a defined fallback (zeros
//! or an empty list) rather than an error.

use std::collections::BTreeMap;

use crate::analyzers::grade::NOT_GRADED;
use crate::analyzers::types::{BasicStats, ClassStatistics, GradeCount, Percentiles, SectionMean};
use crate::analyzers::utility::{mean, round2, sorted, stddev};
use crate::config::GradingScale;
use crate::record::{ScoreField, StudentRecord};

/// Minimum number of values before outlier detection is attempted.
pub const MIN_OUTLIER_SAMPLE: usize = 4;

const IQR_FENCE: f64 = 1.5;

/// Non-missing values of `field`, in record order.
pub fn field_values(records: &[StudentRecord], field: &ScoreField) -> Vec<f64> {
    records.iter().filter_map(|r| r.value(field)).collect()
}

pub fn basic_stats(records: &[StudentRecord], field: &ScoreField) -> BasicStats {
    let values = field_values(records, field);
    if values.is_empty() {
        return BasicStats::default();
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    BasicStats {
        mean: round2(mean(&values)),
        min: round2(min),
        max: round2(max),
    }
}

/// Linear-interpolation percentile of already sorted values, rounded to two decimals.
///
/// The fractional rank is `k = (n - 1) * p / 100`. When `k` is whole the
/// value at that index is returned; otherwise the two neighbours are blended
/// by distance. `p` is clamped to `[0, 100]`; empty input gives 0.0.
pub fn percentile(sorted_values: &[f64], p: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }
    let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 100.0) };

    let k = (sorted_values.len() - 1) as f64 * (p / 100.0);
    let f = k.floor();
    let c = k.ceil();
    if f == c {
        return round2(sorted_values[k as usize]);
    }

    let d0 = sorted_values[f as usize] * (c - k);
    let d1 = sorted_values[c as usize] * (k - f);
    round2(d0 + d1)
}

pub fn percentiles(records: &[StudentRecord], field: &ScoreField) -> Percentiles {
    let values = sorted(&field_values(records, field));
    if values.is_empty() {
        return Percentiles::default();
    }

    Percentiles {
        p25: percentile(&values, 25.0),
        p50: percentile(&values, 50.0),
        p75: percentile(&values, 75.0),
        p90: percentile(&values, 90.0),
    }
}

/// Records whose `field` lies strictly outside the 1.5 x IQR fences.
///
/// Needs at least [`MIN_OUTLIER_SAMPLE`] values; below that nothing is flagged.
pub fn detect_outliers<'a>(
    records: &'a [StudentRecord],
    field: &ScoreField,
) -> Vec<&'a StudentRecord> {
    let values = sorted(&field_values(records, field));
    if values.len() < MIN_OUTLIER_SAMPLE {
        return Vec::new();
    }

    let q1 = percentile(&values, 25.0);
    let q3 = percentile(&values, 75.0);
    let iqr = q3 - q1;
    let lower = q1 - IQR_FENCE * iqr;
    let upper = q3 + IQR_FENCE * iqr;

    records
        .iter()
        .filter(|r| matches!(r.value(field), Some(v) if v < lower || v > upper))
        .collect()
}

/// Records whose final score is below `threshold`, counting a missing score as 0.
///
/// Unlike [`risk_flag`](crate::analyzers::transform::risk_flag), an ungraded
/// record is included whenever the threshold is above zero.
pub fn at_risk_students(records: &[StudentRecord], threshold: f64) -> Vec<&StudentRecord> {
    records
        .iter()
        .filter(|r| r.final_score.unwrap_or(0.0) < threshold)
        .collect()
}

/// Final scores grouped by section label, in record order.
pub(crate) fn scores_by_section(records: &[StudentRecord]) -> BTreeMap<String, Vec<f64>> {
    let mut sections: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for r in records {
        if let Some(score) = r.final_score {
            sections
                .entry(r.section_label().to_string())
                .or_default()
                .push(score);
        }
    }
    sections
}

/// Mean final score per section. Sections without any score are omitted.
pub fn section_summary(records: &[StudentRecord]) -> BTreeMap<String, SectionMean> {
    scores_by_section(records)
        .into_iter()
        .map(|(section, scores)| {
            (
                section,
                SectionMean {
                    mean: round2(mean(&scores)),
                },
            )
        })
        .collect()
}

/// Course summary over annotated records.
pub fn class_statistics(
    records: &[StudentRecord],
    scale: &GradingScale,
    at_risk_threshold: f64,
) -> ClassStatistics {
    let field = ScoreField::FinalScore;
    let scores = field_values(records, &field);

    ClassStatistics {
        total_students: records.len(),
        graded_students: scores.len(),
        final_score: basic_stats(records, &field),
        percentiles: percentiles(records, &field),
        stddev: round2(stddev(&scores, mean(&scores))),
        at_risk_threshold,
        at_risk_count: at_risk_students(records, at_risk_threshold).len(),
        section_averages: section_summary(records),
        grade_distribution: grade_distribution(records, scale),
    }
}

/// Count of records per letter grade, in scale order, followed by ungraded records.
///
/// Labels that do not appear on the scale are appended after it.
pub fn grade_distribution(records: &[StudentRecord], scale: &GradingScale) -> Vec<GradeCount> {
    let mut counts: Vec<GradeCount> = scale
        .labels()
        .chain(std::iter::once(NOT_GRADED))
        .map(|grade| GradeCount {
            grade: grade.to_string(),
            count: 0,
        })
        .collect();

    for r in records {
        let grade = r.letter_grade.as_deref().unwrap_or(NOT_GRADED);
        match counts.iter_mut().find(|c| c.grade == grade) {
            Some(entry) => entry.count += 1,
            None => counts.push(GradeCount {
                grade: grade.to_string(),
                count: 1,
            }),
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graded(
        id: &str,
        last: &str,
        section: &str,
        score: Option<f64>,
        grade: &str,
    ) -> StudentRecord {
        StudentRecord {
            final_score: score,
            letter_grade: Some(grade.to_string()),
            ..StudentRecord::new(id, last, "", section)
        }
    }

    fn sample() -> Vec<StudentRecord> {
        vec![
            graded("101", "Reyes", "BSIT-1A", Some(95.5), "A"),
            graded("102", "Santos", "BSIT-1B", Some(88.0), "B+"),
            graded("103", "Lim", "BSIT-1C", Some(62.0), "D"),
            graded("104", "Tan", "BSIT-1A", Some(85.0), "B"),
            graded("105", "Lee", "BSIT-1C", Some(91.0), "A-"),
        ]
    }

    #[test]
    fn test_basic_stats() {
        let stats = basic_stats(&sample(), &ScoreField::FinalScore);
        assert_eq!(stats.min, 62.0);
        assert_eq!(stats.max, 95.5);
        assert!((stats.mean - 84.3).abs() < 1e-9);
    }

    #[test]
    fn test_basic_stats_empty_is_zero() {
        let stats = basic_stats(&[], &ScoreField::FinalScore);
        assert_eq!(stats, BasicStats::default());

        let ungraded = vec![graded("1", "X", "A", None, "N/A")];
        assert_eq!(basic_stats(&ungraded, &ScoreField::FinalScore), BasicStats::default());
    }

    #[test]
    fn test_percentile_index_exact() {
        let values = [62.0, 85.0, 88.0, 91.0, 95.5];
        assert_eq!(percentile(&values, 25.0), 85.0);
        assert_eq!(percentile(&values, 50.0), 88.0);
        assert_eq!(percentile(&values, 75.0), 91.0);
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = [62.0, 85.0, 88.0, 91.0, 95.5];
        // k = 3.6 -> 91 * 0.4 + 95.5 * 0.6
        assert_eq!(percentile(&values, 90.0), 93.7);

        let ten: Vec<f64> = (1..=10).map(f64::from).collect();
        assert_eq!(percentile(&ten, 90.0), 9.1);
        assert_eq!(percentile(&[1.0, 2.0, 3.0, 4.0], 50.0), 2.5);
    }

    #[test]
    fn test_percentile_tie_rounds_to_even() {
        // k = 0.25 -> 85.5 * 0.75 + 86 * 0.25 = 85.625
        assert_eq!(percentile(&[85.5, 86.0], 25.0), 85.62);
    }

    #[test]
    fn test_percentile_edges() {
        assert_eq!(percentile(&[], 50.0), 0.0);
        assert_eq!(percentile(&[42.0], 90.0), 42.0);
        assert_eq!(percentile(&[10.0, 20.0, 30.0], 0.0), 10.0);
        assert_eq!(percentile(&[10.0, 20.0, 30.0], 100.0), 30.0);
        assert_eq!(percentile(&[10.0, 20.0, 30.0], 250.0), 30.0);
    }

    #[test]
    fn test_percentiles_from_records() {
        let p = percentiles(&sample(), &ScoreField::FinalScore);
        assert_eq!(p.p25, 85.0);
        assert_eq!(p.p50, 88.0);
        assert_eq!(p.p75, 91.0);
        assert_eq!(p.p90, 93.7);
        assert_eq!(percentiles(&[], &ScoreField::FinalScore), Percentiles::default());
    }

    #[test]
    fn test_detect_outliers_needs_four_values() {
        let records = vec![
            graded("1", "A", "S", Some(0.0), "F"),
            graded("2", "B", "S", Some(50.0), "F"),
            graded("3", "C", "S", Some(100.0), "A"),
        ];
        assert!(detect_outliers(&records, &ScoreField::FinalScore).is_empty());
    }

    #[test]
    fn test_detect_outliers_flags_far_values() {
        let mut records: Vec<StudentRecord> = (0..8)
            .map(|i| graded(&format!("{i}"), "X", "S", Some(80.0 + i as f64), "B"))
            .collect();
        records.push(graded("low", "Low", "S", Some(10.0), "F"));
        records.push(graded("none", "None", "S", None, "N/A"));

        let outliers = detect_outliers(&records, &ScoreField::FinalScore);
        assert_eq!(outliers.len(), 1);
        assert_eq!(outliers[0].student_id, "low");
    }

    #[test]
    fn test_detect_outliers_ignores_values_on_fences() {
        // q1 = 10, q3 = 20, fences at -5 and 35
        let on_upper: Vec<StudentRecord> = [10.0, 10.0, 15.0, 20.0, 35.0]
            .iter()
            .enumerate()
            .map(|(i, s)| graded(&format!("{i}"), "X", "S", Some(*s), "C"))
            .collect();
        assert!(detect_outliers(&on_upper, &ScoreField::FinalScore).is_empty());

        // q1 = 30, q3 = 40, fences at 15 and 55
        let on_lower: Vec<StudentRecord> = [15.0, 30.0, 35.0, 40.0, 40.0]
            .iter()
            .enumerate()
            .map(|(i, s)| graded(&format!("{i}"), "X", "S", Some(*s), "C"))
            .collect();
        assert!(detect_outliers(&on_lower, &ScoreField::FinalScore).is_empty());

        let past_upper: Vec<StudentRecord> = [10.0, 10.0, 15.0, 20.0, 35.5]
            .iter()
            .enumerate()
            .map(|(i, s)| graded(&format!("{i}"), "X", "S", Some(*s), "C"))
            .collect();
        let outliers = detect_outliers(&past_upper, &ScoreField::FinalScore);
        assert_eq!(outliers.len(), 1);
        assert_eq!(outliers[0].student_id, "4");
    }

    #[test]
    fn test_detect_outliers_on_sample_roster() {
        // q1 = 85, q3 = 91, fences at 76 and 100
        let records = sample();
        let outliers = detect_outliers(&records, &ScoreField::FinalScore);
        let ids: Vec<&str> = outliers.iter().map(|r| r.student_id.as_str()).collect();
        assert_eq!(ids, vec!["103"]);
    }

    #[test]
    fn test_at_risk_students() {
        let records = sample();
        let at_risk = at_risk_students(&records, 65.0);
        assert_eq!(at_risk.len(), 1);
        assert_eq!(at_risk[0].student_id, "103");
    }

    #[test]
    fn test_at_risk_students_counts_missing_score_as_zero() {
        let records = vec![graded("1", "X", "S", None, "N/A")];
        assert_eq!(at_risk_students(&records, 65.0).len(), 1);
        assert!(at_risk_students(&records, 0.0).is_empty());
    }

    #[test]
    fn test_section_summary() {
        let summary = section_summary(&sample());
        assert_eq!(summary["BSIT-1A"].mean, 90.25);
        assert_eq!(summary["BSIT-1B"].mean, 88.0);
        assert_eq!(summary["BSIT-1C"].mean, 76.5);
    }

    #[test]
    fn test_section_summary_omits_sections_without_scores() {
        let mut records = sample();
        records.push(graded("106", "Cruz", "BSIT-1D", None, "N/A"));
        records.push(graded("107", "Diaz", "", Some(70.0), "C-"));

        let summary = section_summary(&records);
        assert!(!summary.contains_key("BSIT-1D"));
        assert_eq!(summary["Unknown"].mean, 70.0);
    }

    #[test]
    fn test_class_statistics() {
        let scale = GradingScale::new(
            [("A", 93.0), ("A-", 90.0), ("B+", 87.0), ("B", 83.0), ("D", 60.0), ("F", 0.0)]
                .map(|(l, t)| (l.to_string(), t)),
        )
        .unwrap();
        let mut records = sample();
        records.push(graded("106", "Cruz", "BSIT-1D", None, "N/A"));

        let stats = class_statistics(&records, &scale, 65.0);
        assert_eq!(stats.total_students, 6);
        assert_eq!(stats.graded_students, 5);
        assert_eq!(stats.at_risk_count, 2);
        assert_eq!(stats.final_score.max, 95.5);

        let counts: Vec<(&str, usize)> = stats
            .grade_distribution
            .iter()
            .map(|g| (g.grade.as_str(), g.count))
            .collect();
        assert_eq!(
            counts,
            vec![("A", 1), ("A-", 1), ("B+", 1), ("B", 1), ("D", 1), ("F", 0), ("N/A", 1)]
        );
    }
}

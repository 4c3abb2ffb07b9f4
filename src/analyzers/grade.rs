use crate::config::GradingScale;

/// Grade given to a record without a final score.
pub const NOT_GRADED: &str = "N/A";

/// Converts a final score into a letter grade using the configured scale.
///
/// Bands are checked highest threshold first and the first one the score
/// meets or exceeds wins, so a score exactly on a threshold earns that grade.
/// With the usual course scale:
///
/// | Range     | Grade |
/// |-----------|-------|
/// | >= 93     | A     |
/// | >= 90     | A-    |
/// | >= 87     | B+    |
/// | ...       | ...   |
/// | >= 60     | D     |
/// | < 60      | F     |
///
/// Scores below every threshold fall back to the lowest defined grade.
pub fn letter_grade(score: Option<f64>, scale: &GradingScale) -> String {
    let Some(score) = score else {
        return NOT_GRADED.into();
    };

    scale
        .bands()
        .iter()
        .find(|band| score >= band.min_score)
        .map(|band| band.label.clone())
        .unwrap_or_else(|| scale.fallback_label().to_string())
}

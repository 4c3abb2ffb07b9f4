//! Student records and the typed selector used to pull numeric fields out of them.

use std::fmt;
use std::str::FromStr;

use crate::analyzers::utility::mean;

/// Section label used when a record has no section.
pub const UNKNOWN_SECTION: &str = "Unknown";

/// A single roster row after ingestion.
///
/// Raw scores are either a value in `[0, 100]` or `None`. The last three
/// fields are written by the score transformer; `letter_grade` stays `None`
/// until the record has been through it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StudentRecord {
    pub student_id: String,
    pub last_name: String,
    pub first_name: String,
    pub section: String,

    // raw scores
    pub quizzes: Vec<Option<f64>>,
    pub midterm: Option<f64>,
    pub final_exam: Option<f64>,
    pub attendance_percent: Option<f64>,

    // derived
    pub final_score: Option<f64>,
    pub letter_grade: Option<String>,
    pub is_at_risk: bool,
}

impl StudentRecord {
    /// Creates a record with identity fields only and no scores.
    pub fn new(student_id: &str, last_name: &str, first_name: &str, section: &str) -> Self {
        StudentRecord {
            student_id: student_id.to_string(),
            last_name: last_name.to_string(),
            first_name: first_name.to_string(),
            section: section.to_string(),
            ..Default::default()
        }
    }

    /// Mean of the quiz scores that are present, or 0.0 when none are.
    pub fn quiz_average(&self) -> f64 {
        let present: Vec<f64> = self.quizzes.iter().flatten().copied().collect();
        mean(&present)
    }

    /// Looks up a numeric field. Missing values come back as `None`.
    pub fn value(&self, field: &ScoreField) -> Option<f64> {
        match field {
            ScoreField::FinalScore => self.final_score,
            ScoreField::Midterm => self.midterm,
            ScoreField::FinalExam => self.final_exam,
            ScoreField::Attendance => self.attendance_percent,
            ScoreField::QuizAverage => {
                if self.quizzes.iter().any(Option::is_some) {
                    Some(self.quiz_average())
                } else {
                    None
                }
            }
            ScoreField::Quiz(n) => n
                .checked_sub(1)
                .and_then(|idx| self.quizzes.get(idx).copied().flatten()),
        }
    }

    /// Grouping key for section-level aggregation.
    pub fn section_label(&self) -> &str {
        if self.section.is_empty() {
            UNKNOWN_SECTION
        } else {
            &self.section
        }
    }

    pub fn is_graded(&self) -> bool {
        self.letter_grade.is_some()
    }
}

/// Numeric field a statistic is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoreField {
    #[default]
    FinalScore,
    Midterm,
    FinalExam,
    Attendance,
    QuizAverage,
    /// 1-based quiz column.
    Quiz(usize),
}

impl FromStr for ScoreField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        match name.as_str() {
            "final_score" | "score" => Ok(ScoreField::FinalScore),
            "midterm" | "midterm_score" => Ok(ScoreField::Midterm),
            "final_exam" | "final" => Ok(ScoreField::FinalExam),
            "attendance_percent" | "attendance" | "attendance_score" => {
                Ok(ScoreField::Attendance)
            }
            "quiz" | "quiz_average" | "quiz_score" => Ok(ScoreField::QuizAverage),
            other => other
                .strip_prefix("quiz")
                .map(|rest| rest.trim_start_matches('_'))
                .and_then(|digits| digits.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .map(ScoreField::Quiz)
                .ok_or_else(|| format!("unknown score field `{s}`")),
        }
    }
}

impl fmt::Display for ScoreField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreField::FinalScore => f.write_str("final_score"),
            ScoreField::Midterm => f.write_str("midterm"),
            ScoreField::FinalExam => f.write_str("final_exam"),
            ScoreField::Attendance => f.write_str("attendance_percent"),
            ScoreField::QuizAverage => f.write_str("quiz_average"),
            ScoreField::Quiz(n) => write!(f, "quiz_{n}"),
        }
    }
}

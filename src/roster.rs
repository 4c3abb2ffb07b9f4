//! In-memory roster editing.
//!
//! Changes live only for the session; the source CSV is never rewritten.

use std::cmp::Ordering;

use tracing::info;

use crate::analyzers::transform::transform_all;
use crate::config::Config;
use crate::error::RosterError;
use crate::record::StudentRecord;

/// Orderings offered for the roster view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Last name then first name, ignoring case.
    LastName,
    StudentId,
    /// Highest final score first; ungraded students last.
    FinalScore,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roster {
    records: Vec<StudentRecord>,
}

impl Roster {
    pub fn new(records: Vec<StudentRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[StudentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn find(&self, student_id: &str) -> Option<&StudentRecord> {
        let id = student_id.trim();
        self.records.iter().find(|r| r.student_id == id)
    }

    /// Adds a student with no scores yet.
    pub fn add(
        &mut self,
        student_id: &str,
        last_name: &str,
        first_name: &str,
        section: &str,
    ) -> Result<&StudentRecord, RosterError> {
        let id = student_id.trim();
        if id.is_empty() {
            return Err(RosterError::EmptyId);
        }
        if self.find(id).is_some() {
            return Err(RosterError::DuplicateId(id.to_string()));
        }

        self.records.push(StudentRecord::new(
            id,
            last_name.trim(),
            first_name.trim(),
            section.trim(),
        ));
        info!(student_id = id, "Student added");

        let last = self.records.len() - 1;
        Ok(&self.records[last])
    }

    /// Removes a student and returns the removed record.
    pub fn delete(&mut self, student_id: &str) -> Result<StudentRecord, RosterError> {
        let id = student_id.trim();
        let index = self
            .records
            .iter()
            .position(|r| r.student_id == id)
            .ok_or_else(|| RosterError::NotFound(id.to_string()))?;

        let removed = self.records.remove(index);
        info!(student_id = id, "Student deleted");
        Ok(removed)
    }

    pub fn sort(&mut self, key: SortKey) {
        match key {
            SortKey::LastName => self.records.sort_by(|a, b| {
                a.last_name
                    .to_lowercase()
                    .cmp(&b.last_name.to_lowercase())
                    .then_with(|| a.first_name.to_lowercase().cmp(&b.first_name.to_lowercase()))
            }),
            SortKey::StudentId => self.records.sort_by(|a, b| a.student_id.cmp(&b.student_id)),
            SortKey::FinalScore => self.records.sort_by(|a, b| match (a.final_score, b.final_score) {
                (Some(x), Some(y)) => y.total_cmp(&x),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }),
        }
    }

    /// Recomputes final scores, grades and risk flags for every student.
    pub fn annotate(&mut self, config: &Config) {
        self.records = transform_all(&self.records, config);
    }

    pub fn is_annotated(&self) -> bool {
        self.records.iter().all(|r| r.letter_grade.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Roster {
        let mut a = StudentRecord::new("103", "lim", "Jo", "BSIT-1C");
        a.final_score = Some(62.0);
        let mut b = StudentRecord::new("101", "Reyes", "Mika", "BSIT-1A");
        b.final_score = Some(95.5);
        let c = StudentRecord::new("102", "Lim", "Ana", "BSIT-1B");
        let mut d = StudentRecord::new("104", "Tan", "Lee", "BSIT-1A");
        d.final_score = Some(95.5);
        Roster::new(vec![a, b, c, d])
    }

    fn ids(roster: &Roster) -> Vec<&str> {
        roster.records().iter().map(|r| r.student_id.as_str()).collect()
    }

    #[test]
    fn test_add_student() {
        let mut roster = roster();
        let added = roster.add(" 105 ", " Cruz ", "Dana", "BSIT-1B").unwrap();
        assert_eq!(added.student_id, "105");
        assert_eq!(added.last_name, "Cruz");
        assert_eq!(added.final_score, None);
        assert_eq!(roster.len(), 5);
    }

    #[test]
    fn test_add_rejects_empty_and_duplicate_ids() {
        let mut roster = roster();
        assert_eq!(roster.add("  ", "Cruz", "Dana", "X"), Err(RosterError::EmptyId));
        assert_eq!(
            roster.add("101", "Cruz", "Dana", "X"),
            Err(RosterError::DuplicateId("101".to_string()))
        );
        assert_eq!(roster.len(), 4);
    }

    #[test]
    fn test_delete_student() {
        let mut roster = roster();
        let removed = roster.delete("102").unwrap();
        assert_eq!(removed.last_name, "Lim");
        assert!(roster.find("102").is_none());
        assert_eq!(
            roster.delete("999"),
            Err(RosterError::NotFound("999".to_string()))
        );
    }

    #[test]
    fn test_sort_by_last_name_ignores_case() {
        let mut roster = roster();
        roster.sort(SortKey::LastName);
        assert_eq!(ids(&roster), vec!["102", "103", "101", "104"]);
    }

    #[test]
    fn test_sort_by_id() {
        let mut roster = roster();
        roster.sort(SortKey::StudentId);
        assert_eq!(ids(&roster), vec!["101", "102", "103", "104"]);
    }

    #[test]
    fn test_sort_by_score_descending_ungraded_last() {
        let mut roster = roster();
        roster.sort(SortKey::FinalScore);
        assert_eq!(ids(&roster), vec!["101", "104", "103", "102"]);
    }

    #[test]
    fn test_annotate_fills_grades() {
        let config = Config::from_json_str(
            r#"{ "grade_weights": { "midterm": 1.0 }, "grading_scale": { "P": 50.0, "F": 0.0 } }"#,
        )
        .unwrap();
        let mut roster = Roster::new(vec![StudentRecord {
            midterm: Some(70.0),
            ..StudentRecord::new("1", "A", "B", "S")
        }]);

        assert!(!roster.is_annotated());
        roster.annotate(&config);
        assert!(roster.is_annotated());
        assert_eq!(roster.records()[0].letter_grade.as_deref(), Some("P"));
    }
}

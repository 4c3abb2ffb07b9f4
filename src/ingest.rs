//! CSV ingestion for student rosters.
//!
//! Rows are cleaned independently (whitespace trimmed, scores coerced to
//! `[0, 100]` or dropped to `None`) and then deduplicated by student ID.
//! Nothing in here fails on record content: problems come back as
//! [`Diagnostic`] values and are logged at `warn`.

use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, error, info, warn};

use crate::record::StudentRecord;

/// Non-fatal problems found while ingesting a roster.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// `student_id` or `last_name` is empty. The row is kept.
    MissingIdentity { row: usize },
    /// A later record reused an ID that was already seen.
    DuplicateSkipped { student_id: String },
    /// A record with no ID was dropped during deduplication.
    MissingIdSkipped { last_name: String },
    /// The CSV reader could not decode the row.
    MalformedRow { row: usize, message: String },
    /// The source file could not be opened.
    SourceUnavailable { path: String, message: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MissingIdentity { row } => {
                write!(f, "missing required data (ID/Name) in row {row}")
            }
            Diagnostic::DuplicateSkipped { student_id } => {
                write!(f, "duplicate student ID skipped: {student_id}")
            }
            Diagnostic::MissingIdSkipped { last_name } => {
                write!(f, "record skipped, missing student ID: {last_name}")
            }
            Diagnostic::MalformedRow { row, message } => {
                write!(f, "malformed row {row} skipped: {message}")
            }
            Diagnostic::SourceUnavailable { path, message } => {
                write!(f, "input CSV not available at {path}: {message}")
            }
        }
    }
}

/// Records produced by an ingestion step together with what went wrong.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Ingested {
    pub records: Vec<StudentRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    StudentId,
    LastName,
    FirstName,
    Section,
    Quiz,
    Midterm,
    FinalExam,
    Attendance,
    Ignored,
}

fn classify(header: &str) -> Column {
    let name = header.trim().to_ascii_lowercase();
    match name.as_str() {
        "student_id" => Column::StudentId,
        "last_name" => Column::LastName,
        "first_name" => Column::FirstName,
        "section" => Column::Section,
        "midterm" | "midterm_score" => Column::Midterm,
        "final_exam" | "final" => Column::FinalExam,
        "attendance_percent" | "attendance" | "attendance_score" => Column::Attendance,
        n if n.starts_with("quiz") => Column::Quiz,
        _ => Column::Ignored,
    }
}

/// Coerces a raw cell into a score.
///
/// Empty, non-numeric and out-of-range values all become `None`.
pub fn coerce_score(raw: &str) -> Option<f64> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }
    match value.parse::<f64>() {
        Ok(num) if (0.0..=100.0).contains(&num) => Some(num),
        _ => None,
    }
}

fn parse_row(columns: &[Column], row: &StringRecord) -> StudentRecord {
    let mut record = StudentRecord::default();

    for (idx, column) in columns.iter().enumerate() {
        let cell = row.get(idx).unwrap_or("").trim();
        match column {
            Column::StudentId => record.student_id = cell.to_string(),
            Column::LastName => record.last_name = cell.to_string(),
            Column::FirstName => record.first_name = cell.to_string(),
            Column::Section => record.section = cell.to_string(),
            Column::Quiz => record.quizzes.push(coerce_score(cell)),
            Column::Midterm => record.midterm = coerce_score(cell),
            Column::FinalExam => record.final_exam = coerce_score(cell),
            Column::Attendance => record.attendance_percent = coerce_score(cell),
            Column::Ignored => {}
        }
    }

    record
}

/// Cleans raw rows into records, keeping input order.
///
/// Row numbers in diagnostics are file lines, with the header on line 1.
pub fn parse_rows<'a>(
    headers: &StringRecord,
    rows: impl IntoIterator<Item = &'a StringRecord>,
) -> Ingested {
    let columns: Vec<Column> = headers.iter().map(classify).collect();
    for (header, column) in headers.iter().zip(&columns) {
        if *column == Column::Ignored {
            debug!(column = header.trim(), "Ignoring unrecognised column");
        }
    }

    let mut out = Ingested::default();
    for (offset, row) in rows.into_iter().enumerate() {
        let row_num = row
            .position()
            .map(|pos| pos.line() as usize)
            .unwrap_or(offset + 2);
        let record = parse_row(&columns, row);
        if record.student_id.is_empty() || record.last_name.is_empty() {
            warn!(row = row_num, "Missing required data (ID/Name)");
            out.diagnostics
                .push(Diagnostic::MissingIdentity { row: row_num });
        }
        out.records.push(record);
    }
    out
}

/// Keeps the first record for every non-empty student ID.
///
/// Later duplicates and records without an ID are dropped.
pub fn deduplicate(records: Vec<StudentRecord>) -> Ingested {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Ingested::default();

    for record in records {
        if record.student_id.is_empty() {
            warn!(last_name = %record.last_name, "Record skipped, missing student ID");
            out.diagnostics.push(Diagnostic::MissingIdSkipped {
                last_name: record.last_name,
            });
        } else if seen.contains(&record.student_id) {
            warn!(student_id = %record.student_id, "Duplicate student ID skipped");
            out.diagnostics.push(Diagnostic::DuplicateSkipped {
                student_id: record.student_id,
            });
        } else {
            seen.insert(record.student_id.clone());
            out.records.push(record);
        }
    }

    out
}

/// Parses and deduplicates CSV data from any reader.
pub fn ingest_reader<R: Read>(reader: R) -> Ingested {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers = match rdr.headers() {
        Ok(headers) => headers.clone(),
        Err(e) => {
            return Ingested {
                records: Vec::new(),
                diagnostics: vec![Diagnostic::MalformedRow {
                    row: 1,
                    message: e.to_string(),
                }],
            };
        }
    };

    let mut rows = Vec::new();
    let mut malformed = Vec::new();
    for (offset, result) in rdr.records().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => {
                let row = e
                    .position()
                    .map(|pos| pos.line() as usize)
                    .unwrap_or(offset + 2);
                warn!(row, error = %e, "Malformed CSV row skipped");
                malformed.push(Diagnostic::MalformedRow {
                    row,
                    message: e.to_string(),
                });
            }
        }
    }

    let parsed = parse_rows(&headers, &rows);
    let mut deduped = deduplicate(parsed.records);

    let mut diagnostics = malformed;
    diagnostics.extend(parsed.diagnostics);
    diagnostics.append(&mut deduped.diagnostics);

    Ingested {
        records: deduped.records,
        diagnostics,
    }
}

/// Loads a roster CSV: parse, clean, then deduplicate.
///
/// A missing or unreadable file yields an empty result carrying a
/// [`Diagnostic::SourceUnavailable`]; the caller decides whether to stop.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn ingest(path: impl AsRef<Path>) -> Ingested {
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            error!(error = %e, "Input CSV file not available");
            return Ingested {
                records: Vec::new(),
                diagnostics: vec![Diagnostic::SourceUnavailable {
                    path: path.display().to_string(),
                    message: e.to_string(),
                }],
            };
        }
    };

    let ingested = ingest_reader(file);
    info!(
        records = ingested.records.len(),
        diagnostics = ingested.diagnostics.len(),
        "Loaded valid student records"
    );
    ingested
}

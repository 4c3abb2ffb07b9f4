//! Grading and statistics pipeline.
//!
//! This module turns raw student records into weighted final scores, letter
//! grades and risk flags, then computes class-level statistics, section
//! comparisons and outliers, and orchestrates the full report.

pub mod analyzer;
pub mod compare;
pub mod grade;
pub mod statistics;
pub mod transform;
pub mod types;
pub mod utility;

use std::collections::BTreeMap;

use crate::analyzers::statistics::scores_by_section;
use crate::analyzers::types::SectionComparison;
use crate::analyzers::utility::{mean, median, mode};
use crate::record::StudentRecord;

/// Per-section count, average, median, mode, highest and lowest final score.
///
/// Only records with a final score take part, and a section appears only if
/// at least one of its records has one. Figures are formatted with two
/// decimals; a section without a single most frequent score reports
/// [`Mode::NoUniqueMode`](crate::analyzers::types::Mode::NoUniqueMode).
pub fn compare_sections(records: &[StudentRecord]) -> BTreeMap<String, SectionComparison> {
    scores_by_section(records)
        .into_iter()
        .map(|(section, scores)| {
            let highest = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let lowest = scores.iter().copied().fold(f64::INFINITY, f64::min);
            let comparison = SectionComparison {
                count: scores.len(),
                average: format!("{:.2}", mean(&scores)),
                median: format!("{:.2}", median(&scores)),
                mode: mode(&scores),
                highest: format!("{highest:.2}"),
                lowest: format!("{lowest:.2}"),
            };
            (section, comparison)
        })
        .collect()
}

//! Table filtering for the response payload.

use crate::analysis::query::Interpretation;
use crate::models::Record;

/// Default number of rows returned when the query names no location.
pub const DEFAULT_PREVIEW_ROWS: usize = 10;

/// Rows to show for an interpreted query.
///
/// Compare returns the union of all matched locations in store order,
/// single returns the exact location, and anything unmatched returns the
/// first `preview_rows` rows of the table.
pub fn filter_table(
    records: &[Record],
    interpretation: &Interpretation,
    preview_rows: usize,
) -> Vec<Record> {
    match interpretation {
        Interpretation::Compare(areas) if !areas.is_empty() => records
            .iter()
            .filter(|r| areas.iter().any(|area| r.is_location(area)))
            .cloned()
            .collect(),
        Interpretation::Single(Some(area)) => records
            .iter()
            .filter(|r| r.is_location(area))
            .cloned()
            .collect(),
        _ => records.iter().take(preview_rows).cloned().collect(),
    }
}

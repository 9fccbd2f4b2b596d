//! Template summaries computed without any external call.

use crate::analysis::aggregator::{fallback_area, fallback_areas, mean_price};
use crate::analysis::format::{format_price, title_case};
use crate::analysis::query::Interpretation;
use crate::models::Record;

/// Build the local summary for an interpreted query.
///
/// `query` is echoed verbatim in compare mode.
pub fn local_summary(records: &[Record], query: &str, interpretation: &Interpretation) -> String {
    match interpretation {
        Interpretation::Compare(areas) => {
            let areas = if areas.is_empty() {
                fallback_areas(records)
            } else {
                areas.clone()
            };
            compare_summary(records, query, &areas)
        }
        Interpretation::Single(area) => match area.clone().or_else(|| fallback_area(records)) {
            Some(area) => area_summary(records, &area),
            None => format!("No data available for '{}'.", query),
        },
    }
}

/// Overall mean price for one area.
pub fn area_summary(records: &[Record], area: &str) -> String {
    match mean_price(records, area) {
        Some(avg) => format!(
            "Analysis for '{}': ₹{} per sqft.",
            title_case(area),
            format_price(avg)
        ),
        None => format!("No data available for '{}'.", area),
    }
}

/// One clause per area, joined by `" | "`.
pub fn compare_summary(records: &[Record], query: &str, areas: &[String]) -> String {
    let parts: Vec<String> = areas
        .iter()
        .map(|area| match mean_price(records, area) {
            Some(avg) => format!("{}: ₹{} per sqft", title_case(area), format_price(avg)),
            None => format!("{}: No data", title_case(area)),
        })
        .collect();

    format!("Analysis for '{}'. {}", query, parts.join(" | "))
}

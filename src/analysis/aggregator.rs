//! Price aggregation and chart shaping.
//!
//! All aggregates are computed over `flat_weighted_avg_rate`.

use crate::analysis::format::title_case;
use crate::analysis::query::Interpretation;
use crate::models::{ChartData, Dataset, Record};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Line color used for single-area charts.
pub const DEFAULT_COLOR: &str = "#4f46e5";

/// Rows whose location equals `area`, ignoring case.
pub fn rows_for<'a>(records: &'a [Record], area: &'a str) -> impl Iterator<Item = &'a Record> {
    records.iter().filter(move |r| r.is_location(area))
}

/// Mean price of all rows for `area`, or `None` when it has no rows.
pub fn mean_price(records: &[Record], area: &str) -> Option<f64> {
    let (sum, count) = rows_for(records, area)
        .fold((0.0, 0usize), |(sum, count), r| (sum + r.flat_weighted_avg_rate, count + 1));

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Mean price per year for `area`, sorted by year.
pub fn yearly_average(records: &[Record], area: &str) -> Vec<(i32, f64)> {
    let mut by_year: BTreeMap<i32, (f64, usize)> = BTreeMap::new();

    for record in rows_for(records, area) {
        let entry = by_year.entry(record.year).or_default();
        entry.0 += record.flat_weighted_avg_rate;
        entry.1 += 1;
    }

    by_year
        .into_iter()
        .map(|(year, (sum, count))| (year, sum / count as f64))
        .collect()
}

/// Sorted distinct years across the whole table.
pub fn all_years(records: &[Record]) -> Vec<i32> {
    let mut years: Vec<i32> = records.iter().map(|r| r.year).collect();
    years.sort_unstable();
    years.dedup();
    years
}

/// Stable `#rrggbb` color for a series, derived from its name.
pub fn series_color(area: &str) -> String {
    let digest = Sha256::digest(area.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    format!("#{:06x}", u64::from_be_bytes(prefix) % 0xFF_FFFF)
}

/// Price trend for one location: one dataset, x-axis limited to its years.
pub fn single_area_chart(records: &[Record], area: &str) -> ChartData {
    let (labels, data): (Vec<i32>, Vec<f64>) = yearly_average(records, area).into_iter().unzip();

    ChartData {
        labels,
        datasets: vec![Dataset {
            label: "Price".to_string(),
            data,
            border_color: DEFAULT_COLOR.to_string(),
        }],
        title: format!("Price Trend for {}", title_case(area)),
    }
}

/// One dataset per location; x-axis spans every year in the table.
///
/// A location with no rows still gets a dataset, with no points.
pub fn comparison_chart(records: &[Record], areas: &[String]) -> ChartData {
    let datasets = areas
        .iter()
        .map(|area| Dataset {
            label: title_case(area),
            data: yearly_average(records, area).into_iter().map(|(_, avg)| avg).collect(),
            border_color: series_color(area),
        })
        .collect();

    let names: Vec<String> = areas.iter().map(|a| title_case(a)).collect();

    ChartData {
        labels: all_years(records),
        datasets,
        title: format!("Price Comparison: {}", names.join(" vs ")),
    }
}

/// Chart for an interpreted query.
///
/// Without an extracted location, single mode charts the first row's
/// location and compare mode the first two distinct locations. Returns
/// `None` only for an empty table.
pub fn prepare_chart(records: &[Record], interpretation: &Interpretation) -> Option<ChartData> {
    match interpretation {
        Interpretation::Compare(areas) => {
            let areas = if areas.is_empty() {
                fallback_areas(records)
            } else {
                areas.clone()
            };
            if areas.is_empty() {
                return None;
            }
            Some(comparison_chart(records, &areas))
        }
        Interpretation::Single(area) => {
            let area = area.clone().or_else(|| fallback_area(records))?;
            Some(single_area_chart(records, &area))
        }
    }
}

/// Location of the first row.
pub fn fallback_area(records: &[Record]) -> Option<String> {
    records.first().map(|r| r.final_location.clone())
}

/// First two distinct locations, as spelled in the table.
pub fn fallback_areas(records: &[Record]) -> Vec<String> {
    let mut areas: Vec<String> = Vec::new();
    for record in records {
        if areas.len() == 2 {
            break;
        }
        if !areas.contains(&record.final_location) {
            areas.push(record.final_location.clone());
        }
    }
    areas
}

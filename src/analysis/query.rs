//! Query interpretation.
//!
//! Matching is plain substring containment against the lowercased query.
//! A location whose name is contained in another location's name matches
//! whenever the longer one does; both are reported.

use crate::models::Record;
use crate::store::known_locations;

/// Keyword that switches a query into compare mode.
pub const COMPARE_KEYWORD: &str = "compare";

/// What a query asks for, with the locations it names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interpretation {
    /// First known location found in the query, if any.
    Single(Option<String>),
    /// Every known location found in the query, in store order.
    Compare(Vec<String>),
}

impl Interpretation {
    /// Interpret `query` against the locations present in `records`.
    pub fn interpret(query: &str, records: &[Record]) -> Self {
        let locations = known_locations(records);
        if is_compare(query) {
            Interpretation::Compare(extract_areas(query, &locations))
        } else {
            Interpretation::Single(extract_primary_area(query, &locations))
        }
    }

    /// A query is valid when it names at least one known location.
    pub fn is_valid(&self) -> bool {
        match self {
            Interpretation::Single(area) => area.is_some(),
            Interpretation::Compare(areas) => !areas.is_empty(),
        }
    }

    pub fn is_compare(&self) -> bool {
        matches!(self, Interpretation::Compare(_))
    }
}

/// Whether the query contains the compare keyword, in any case.
pub fn is_compare(query: &str) -> bool {
    query.to_lowercase().contains(COMPARE_KEYWORD)
}

/// First location (in store order) contained in the query.
pub fn extract_primary_area(query: &str, locations: &[String]) -> Option<String> {
    let query = query.to_lowercase();
    locations
        .iter()
        .find(|area| query.contains(area.as_str()))
        .cloned()
}

/// Every location (in store order) contained in the query.
pub fn extract_areas(query: &str, locations: &[String]) -> Vec<String> {
    let query = query.to_lowercase();
    locations
        .iter()
        .filter(|area| query.contains(area.as_str()))
        .cloned()
        .collect()
}

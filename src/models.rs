//! Data models for the statistics service.
//!
//! This module contains the record schema loaded from the spreadsheet and
//! the payloads returned by the analysis endpoint.

use serde::{Deserialize, Serialize};

/// Prefix that marks a summary as a soft error.
pub const ERROR_MARKER: &str = "__error__";

/// Message reported when no known location appears in the query.
pub const UNKNOWN_LOCATION_MESSAGE: &str =
    "The location/area you entered is not available in our database";

/// One (location, year) observation.
///
/// Field order is significant: table rows serialize with keys in
/// declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Positional id, 1-based, assigned at load.
    pub id: u64,
    pub final_location: String,
    pub year: i32,
    pub total_sales_igr: f64,
    pub total_sold_igr: i64,
    pub flat_sold_igr: i64,
    pub office_sold_igr: i64,
    pub others_sold_igr: i64,
    pub shop_sold_igr: i64,
    pub commercial_sold_igr: i64,
    pub other_sold_igr: i64,
    pub residential_sold_igr: i64,
    /// Price per sqft; the metric every aggregate is computed over.
    pub flat_weighted_avg_rate: f64,
    pub office_weighted_avg_rate: f64,
    pub others_weighted_avg_rate: f64,
    pub shop_weighted_avg_rate: f64,
    pub flat_prevailing_rate_range: String,
    pub office_prevailing_rate_range: String,
    pub others_prevailing_rate_range: String,
    pub shop_prevailing_rate_range: String,
    pub total_carpet_area: f64,
    pub total_units: i64,
    pub flat_total: i64,
    pub shop_total: i64,
    pub office_total: i64,
    pub others_total: i64,
}

impl Default for Record {
    fn default() -> Self {
        // Range columns are free text but still default to zero.
        Self {
            id: 0,
            final_location: String::new(),
            year: 0,
            total_sales_igr: 0.0,
            total_sold_igr: 0,
            flat_sold_igr: 0,
            office_sold_igr: 0,
            others_sold_igr: 0,
            shop_sold_igr: 0,
            commercial_sold_igr: 0,
            other_sold_igr: 0,
            residential_sold_igr: 0,
            flat_weighted_avg_rate: 0.0,
            office_weighted_avg_rate: 0.0,
            others_weighted_avg_rate: 0.0,
            shop_weighted_avg_rate: 0.0,
            flat_prevailing_rate_range: "0".to_string(),
            office_prevailing_rate_range: "0".to_string(),
            others_prevailing_rate_range: "0".to_string(),
            shop_prevailing_rate_range: "0".to_string(),
            total_carpet_area: 0.0,
            total_units: 0,
            flat_total: 0,
            shop_total: 0,
            office_total: 0,
            others_total: 0,
        }
    }
}

impl Record {
    /// Case-insensitive exact match on the location name.
    pub fn is_location(&self, area: &str) -> bool {
        self.final_location.to_lowercase() == area.to_lowercase()
    }
}

/// One line on the chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub label: String,
    pub data: Vec<f64>,
    #[serde(rename = "borderColor")]
    pub border_color: String,
}

/// Chart-ready payload: x-axis years plus one dataset per series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<i32>,
    pub datasets: Vec<Dataset>,
    pub title: String,
}

/// Body of the analysis endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub summary: String,
    pub chart_data: Option<ChartData>,
    pub table_data: Vec<Record>,
}

impl AnalysisResponse {
    /// Soft error for a query that names no known location.
    pub fn unknown_location() -> Self {
        Self {
            summary: format!("{}{}", ERROR_MARKER, UNKNOWN_LOCATION_MESSAGE),
            chart_data: None,
            table_data: Vec::new(),
        }
    }
}

/// Outcome of a reload, reported rather than raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReloadOutcome {
    pub success: bool,
    pub message: String,
    pub records: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_defaults_to_zero() {
        let record = Record::default();
        assert_eq!(record.year, 0);
        assert_eq!(record.flat_weighted_avg_rate, 0.0);
        assert_eq!(record.flat_prevailing_rate_range, "0");
    }

    #[test]
    fn test_record_serializes_in_declaration_order() {
        let record = Record {
            id: 1,
            final_location: "andheri".to_string(),
            year: 2022,
            ..Default::default()
        };
        let json = serde_json::to_string(&record).unwrap();

        let id = json.find("\"id\"").unwrap();
        let location = json.find("\"final_location\"").unwrap();
        let year = json.find("\"year\"").unwrap();
        let others_total = json.find("\"others_total\"").unwrap();
        assert!(id < location && location < year && year < others_total);
    }

    #[test]
    fn test_is_location_ignores_case() {
        let record = Record {
            final_location: "Andheri".to_string(),
            ..Default::default()
        };
        assert!(record.is_location("andheri"));
        assert!(record.is_location("ANDHERI"));
        assert!(!record.is_location("andheri west"));
    }

    #[test]
    fn test_unknown_location_response() {
        let response = AnalysisResponse::unknown_location();
        assert_eq!(
            response.summary,
            "__error__The location/area you entered is not available in our database"
        );
        assert!(response.chart_data.is_none());
        assert!(response.table_data.is_empty());

        let json = serde_json::to_value(&response).unwrap();
        assert!(json["chart_data"].is_null());
        assert_eq!(json["table_data"], serde_json::json!([]));
    }

    #[test]
    fn test_dataset_uses_border_color_key() {
        let dataset = Dataset {
            label: "Price".to_string(),
            data: vec![1.0],
            border_color: "#4f46e5".to_string(),
        };
        let json = serde_json::to_value(&dataset).unwrap();
        assert_eq!(json["borderColor"], "#4f46e5");
    }
}

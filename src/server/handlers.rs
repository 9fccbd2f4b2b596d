//! Route handlers.

use super::request::AnalyzeRequest;
use super::AppState;
use crate::analysis::{filter_table, local_summary, prepare_chart, Interpretation};
use crate::loader;
use crate::models::{AnalysisResponse, ReloadOutcome};
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

/// Answer a free-text query about one or more locations.
///
/// A query that names no known location still gets a 200 response; the
/// summary carries the error marker instead.
pub async fn analyze(
    State(state): State<AppState>,
    request: AnalyzeRequest,
) -> Json<AnalysisResponse> {
    let query = request.query.to_lowercase();
    let records = state.store.snapshot().await;

    let interpretation = Interpretation::interpret(&query, &records);
    if !interpretation.is_valid() {
        info!("Rejected query '{}': no known location", query);
        return Json(AnalysisResponse::unknown_location());
    }

    let summary = if request.use_ai {
        state.summarizer.summarize(&records, &query).await
    } else {
        local_summary(&records, &query, &interpretation)
    };
    let chart_data = prepare_chart(&records, &interpretation);
    let table_data = filter_table(&records, &interpretation, state.data.preview_rows);

    info!(
        "Answered query '{}' ({} mode, {} rows)",
        query,
        if interpretation.is_compare() { "compare" } else { "single" },
        table_data.len()
    );

    Json(AnalysisResponse {
        summary,
        chart_data,
        table_data,
    })
}

/// Re-read the configured spreadsheet and replace the table.
pub async fn reload(State(state): State<AppState>) -> Json<ReloadOutcome> {
    let outcome = loader::reload(
        &state.store,
        &state.data.spreadsheet,
        state.data.sheet.as_deref(),
    )
    .await;
    Json(outcome)
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub records: usize,
    pub locations: usize,
    pub loaded_at: Option<DateTime<Utc>>,
}

/// Liveness plus a short description of the loaded table.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let records = state.store.len().await;
    let status = if records > 0 { "ok" } else { "empty" };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        records,
        locations: state.store.locations().await.len(),
        loaded_at: state.store.loaded_at().await,
    })
}

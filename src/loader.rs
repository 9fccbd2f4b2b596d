//! Spreadsheet loading.
//!
//! Reads the statistics workbook with calamine, renames its columns through
//! a fixed mapping table and turns every data row into a [`Record`].

use crate::models::{Record, ReloadOutcome};
use crate::store::RecordStore;
use calamine::{open_workbook_auto, Data, Reader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Spreadsheet header (lowercased) to record field.
///
/// Headers that already carry a field name are accepted as-is.
pub const COLUMN_MAPPING: &[(&str, &str)] = &[
    ("final location", "final_location"),
    ("total_sales - igr", "total_sales_igr"),
    ("total sold - igr", "total_sold_igr"),
    ("flat_sold - igr", "flat_sold_igr"),
    ("office_sold - igr", "office_sold_igr"),
    ("others_sold - igr", "others_sold_igr"),
    ("shop_sold - igr", "shop_sold_igr"),
    ("commercial_sold - igr", "commercial_sold_igr"),
    ("other_sold - igr", "other_sold_igr"),
    ("residential_sold - igr", "residential_sold_igr"),
    ("flat - weighted average rate", "flat_weighted_avg_rate"),
    ("office - weighted average rate", "office_weighted_avg_rate"),
    ("others - weighted average rate", "others_weighted_avg_rate"),
    ("shop - weighted average rate", "shop_weighted_avg_rate"),
    ("flat - most prevailing rate - range", "flat_prevailing_rate_range"),
    ("office - most prevailing rate - range", "office_prevailing_rate_range"),
    ("others - most prevailing rate - range", "others_prevailing_rate_range"),
    ("shop - most prevailing rate - range", "shop_prevailing_rate_range"),
    ("total carpet area supplied (sqft)", "total_carpet_area"),
    ("total units", "total_units"),
    ("flat total", "flat_total"),
    ("shop total", "shop_total"),
    ("office total", "office_total"),
    ("others total", "others_total"),
];

/// Every record field that can be filled from a column.
const FIELDS: &[&str] = &[
    "final_location",
    "year",
    "total_sales_igr",
    "total_sold_igr",
    "flat_sold_igr",
    "office_sold_igr",
    "others_sold_igr",
    "shop_sold_igr",
    "commercial_sold_igr",
    "other_sold_igr",
    "residential_sold_igr",
    "flat_weighted_avg_rate",
    "office_weighted_avg_rate",
    "others_weighted_avg_rate",
    "shop_weighted_avg_rate",
    "flat_prevailing_rate_range",
    "office_prevailing_rate_range",
    "others_prevailing_rate_range",
    "shop_prevailing_rate_range",
    "total_carpet_area",
    "total_units",
    "flat_total",
    "shop_total",
    "office_total",
    "others_total",
];

/// Errors raised while reading the workbook.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("workbook contains no sheets")]
    NoSheets,

    #[error("failed to read sheet '{name}': {source}")]
    Sheet {
        name: String,
        #[source]
        source: calamine::Error,
    },

    #[error("sheet has no header row")]
    MissingHeader,

    #[error("unexpected column '{0}'")]
    UnknownColumn(String),

    #[error("required column '{0}' is missing")]
    MissingColumn(&'static str),

    #[error("row {row}, column '{column}': {reason}")]
    InvalidCell {
        row: usize,
        column: String,
        reason: String,
    },

    #[error("load task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Resolve a spreadsheet header to a record field name.
pub fn map_column(header: &str) -> Option<&'static str> {
    let normalized = header.trim().to_lowercase();
    COLUMN_MAPPING
        .iter()
        .find(|(source, _)| *source == normalized)
        .map(|(_, field)| *field)
        .or_else(|| FIELDS.iter().copied().find(|field| *field == normalized))
}

/// Read every record from the workbook at `path`.
///
/// Uses `sheet` when given, otherwise the first sheet.
pub fn load_records(path: &Path, sheet: Option<&str>) -> Result<Vec<Record>, LoadError> {
    let mut workbook = open_workbook_auto(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or(LoadError::NoSheets)?,
    };
    debug!("Reading sheet '{}' from {}", name, path.display());

    let range = workbook
        .worksheet_range(&name)
        .map_err(|source| LoadError::Sheet {
            name: name.clone(),
            source,
        })?;

    parse_rows(range.rows())
}

/// Run [`load_records`] on the blocking pool.
pub async fn load_records_blocking(
    path: &Path,
    sheet: Option<&str>,
) -> Result<Vec<Record>, LoadError> {
    let path = path.to_path_buf();
    let sheet = sheet.map(str::to_string);
    tokio::task::spawn_blocking(move || load_records(&path, sheet.as_deref())).await?
}

/// Convert a header row plus data rows into records.
///
/// Rows whose cells are all empty are skipped.
pub fn parse_rows<'a, I>(mut rows: I) -> Result<Vec<Record>, LoadError>
where
    I: Iterator<Item = &'a [Data]>,
{
    let header = rows.next().ok_or(LoadError::MissingHeader)?;

    let mut columns: Vec<Option<&'static str>> = Vec::with_capacity(header.len());
    for cell in header {
        let title = cell_text(cell);
        if title.trim().is_empty() {
            columns.push(None);
            continue;
        }
        let field = map_column(&title).ok_or_else(|| LoadError::UnknownColumn(title.clone()))?;
        columns.push(Some(field));
    }

    for required in ["final_location", "year"] {
        if !columns.contains(&Some(required)) {
            return Err(LoadError::MissingColumn(required));
        }
    }

    let mut records = Vec::new();
    for (index, row) in rows.enumerate() {
        if row.iter().all(|cell| matches!(cell, Data::Empty)) {
            continue;
        }

        // Header is spreadsheet row 1.
        let row_number = index + 2;
        let mut record = Record {
            id: records.len() as u64 + 1,
            ..Default::default()
        };

        for (cell, field) in row.iter().zip(&columns) {
            if let Some(field) = field {
                set_field(&mut record, field, cell).map_err(|reason| LoadError::InvalidCell {
                    row: row_number,
                    column: field.to_string(),
                    reason,
                })?;
            }
        }

        if record.final_location.is_empty() {
            return Err(LoadError::InvalidCell {
                row: row_number,
                column: "final_location".to_string(),
                reason: "location is empty".to_string(),
            });
        }
        if record.year == 0 {
            return Err(LoadError::InvalidCell {
                row: row_number,
                column: "year".to_string(),
                reason: "year is empty".to_string(),
            });
        }

        records.push(record);
    }

    Ok(records)
}

/// Re-read the workbook and replace the store's contents.
///
/// The workbook is fully parsed before anything is deleted, so a bad file
/// leaves the previous table in place.
pub async fn reload(store: &RecordStore, path: &Path, sheet: Option<&str>) -> ReloadOutcome {
    match load_records_blocking(path, sheet).await {
        Ok(records) => {
            let inserted = store.replace_all(records).await;
            info!("Loaded {} records from {}", inserted, path.display());
            ReloadOutcome {
                success: true,
                message: "Data loaded successfully".to_string(),
                records: inserted,
            }
        }
        Err(e) => {
            warn!("Data load failed: {}", e);
            ReloadOutcome {
                success: false,
                message: format!("Error loading data: {}", e),
                records: store.len().await,
            }
        }
    }
}

fn set_field(record: &mut Record, field: &str, cell: &Data) -> Result<(), String> {
    match field {
        "final_location" => record.final_location = location_text(cell),
        "year" => {
            let year = cell_i64(cell)?;
            record.year = i32::try_from(year).map_err(|_| format!("year {} out of range", year))?;
        }
        "total_sales_igr" => record.total_sales_igr = cell_f64(cell)?,
        "total_sold_igr" => record.total_sold_igr = cell_i64(cell)?,
        "flat_sold_igr" => record.flat_sold_igr = cell_i64(cell)?,
        "office_sold_igr" => record.office_sold_igr = cell_i64(cell)?,
        "others_sold_igr" => record.others_sold_igr = cell_i64(cell)?,
        "shop_sold_igr" => record.shop_sold_igr = cell_i64(cell)?,
        "commercial_sold_igr" => record.commercial_sold_igr = cell_i64(cell)?,
        "other_sold_igr" => record.other_sold_igr = cell_i64(cell)?,
        "residential_sold_igr" => record.residential_sold_igr = cell_i64(cell)?,
        "flat_weighted_avg_rate" => record.flat_weighted_avg_rate = cell_f64(cell)?,
        "office_weighted_avg_rate" => record.office_weighted_avg_rate = cell_f64(cell)?,
        "others_weighted_avg_rate" => record.others_weighted_avg_rate = cell_f64(cell)?,
        "shop_weighted_avg_rate" => record.shop_weighted_avg_rate = cell_f64(cell)?,
        "flat_prevailing_rate_range" => record.flat_prevailing_rate_range = range_text(cell),
        "office_prevailing_rate_range" => record.office_prevailing_rate_range = range_text(cell),
        "others_prevailing_rate_range" => record.others_prevailing_rate_range = range_text(cell),
        "shop_prevailing_rate_range" => record.shop_prevailing_rate_range = range_text(cell),
        "total_carpet_area" => record.total_carpet_area = cell_f64(cell)?,
        "total_units" => record.total_units = cell_i64(cell)?,
        "flat_total" => record.flat_total = cell_i64(cell)?,
        "shop_total" => record.shop_total = cell_i64(cell)?,
        "office_total" => record.office_total = cell_i64(cell)?,
        "others_total" => record.others_total = cell_i64(cell)?,
        other => return Err(format!("no such field '{}'", other)),
    }
    Ok(())
}

fn cell_f64(cell: &Data) -> Result<f64, String> {
    let value = match cell {
        Data::Empty => 0.0,
        Data::Float(f) => *f,
        Data::Int(i) => *i as f64,
        Data::Bool(b) => f64::from(u8::from(*b)),
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed
                    .replace(',', "")
                    .parse::<f64>()
                    .map_err(|_| format!("'{}' is not a number", s))?
            }
        }
        other => return Err(format!("unsupported cell value {:?}", other)),
    };

    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("{} is not a finite number", value))
    }
}

fn cell_i64(cell: &Data) -> Result<i64, String> {
    match cell {
        Data::Int(i) => Ok(*i),
        other => cell_f64(other).map(|f| f.trunc() as i64),
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

fn location_text(cell: &Data) -> String {
    cell_text(cell).trim().to_string()
}

fn range_text(cell: &Data) -> String {
    let text = cell_text(cell);
    if text.trim().is_empty() {
        "0".to_string()
    } else {
        text
    }
}

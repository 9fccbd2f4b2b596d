//! Query analysis modules.
//!
//! Interprets a free-text query against the record table and shapes the
//! matched rows into a summary, a chart and a table.

pub mod aggregator;
pub mod format;
pub mod query;
pub mod summary;
pub mod table;

pub use aggregator::prepare_chart;
pub use query::Interpretation;
pub use summary::local_summary;
pub use table::filter_table;

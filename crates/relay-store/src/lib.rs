//! SQLite-backed persistence for a Tor relay scanner: relay server
//! descriptors, scan definitions, and per-relay scan results.
//!
//! Descriptor ingestion and scan execution live elsewhere; this crate only
//! stores what they produce. A [`Db`] wraps one `rusqlite::Connection`, which
//! is not `Sync`. Open one `Db` per thread if concurrent access is needed.
//! Each insert runs in its own autocommit transaction; callers that want to
//! group writes use [`Db::with_transaction`].

mod open;
mod error;
mod models;
mod insert;
mod query;
mod schema;
mod arrow_schemas;
mod export_parquet;

pub use open::Db;
pub use error::{Result, StoreError};
pub use models::*;
pub use export_parquet::export_table_to_parquet;

use crate::schema::SCHEMA_INIT;
use crate::Result;
use rusqlite::Connection;
use std::path::Path;

pub struct Db {
    pub conn: Connection,
}

impl Db {
    /// Open (or create) the store at `path` and ensure the schema exists.
    pub fn open_or_create(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        apply_pragmas(&conn)?;
        let db = Db { conn };
        db.create_schema()?;
        Ok(db)
    }

    /// In-memory store, mainly for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_pragmas(&conn)?;
        let db = Db { conn };
        db.create_schema()?;
        Ok(db)
    }

    /// Idempotent: applies the DDL batch only when the tables are absent.
    /// Safe to call any number of times.
    pub fn create_schema(&self) -> Result<()> {
        let exists: i64 = self.conn.query_row(
            "SELECT COUNT(1) FROM sqlite_master WHERE type='table' AND name='descriptors'",
            [],
            |r| r.get(0),
        )?;
        if exists == 0 {
            tracing::info!("initializing relay-store schema");
            self.conn.execute_batch(SCHEMA_INIT)?;
        }
        Ok(())
    }

    /// Runs `f` with all its writes grouped into one transaction. Commits
    /// when `f` succeeds; any error rolls back, so every exit path releases
    /// the store.
    pub fn with_transaction<T>(&self, f: impl FnOnce(&Db) -> Result<T>) -> Result<T> {
        let tx = self.conn.unchecked_transaction()?;
        let out = f(self)?;
        tx.commit()?;
        Ok(out)
    }
}

fn apply_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Scan, StoreError};

    #[test]
    fn create_schema_is_idempotent() {
        let db = Db::open_in_memory().unwrap();
        db.create_schema().unwrap();
        db.create_schema().unwrap();
        assert!(db.table_exists("descriptors").unwrap());
        assert!(db.table_exists("scans").unwrap());
        assert!(db.table_exists("scan_results").unwrap());
    }

    #[test]
    fn open_missing_parent_dir_fails() {
        let err = Db::open_or_create("/nonexistent-dir/relaywatch.db");
        assert!(err.is_err());
    }

    #[test]
    fn with_transaction_groups_writes() {
        let db = Db::open_in_memory().unwrap();
        let (a, b) = db
            .with_transaction(|db| {
                let a = db.insert_scan(&Scan {
                    submitter: "ops".into(),
                    scan_type: "latency".into(),
                    destination: "all".into(),
                })?;
                let b = db.insert_scan(&Scan {
                    submitter: "ops".into(),
                    scan_type: "bandwidth".into(),
                    destination: "all".into(),
                })?;
                Ok((a, b))
            })
            .unwrap();
        let scans = db.list_scans().unwrap();
        assert_eq!(scans.len(), 2);
        assert_eq!(scans[0].0, a);
        assert_eq!(scans[1].0, b);
    }

    #[test]
    fn with_transaction_rolls_back_on_error() {
        let db = Db::open_in_memory().unwrap();
        let err = db.with_transaction(|db| {
            db.insert_scan(&Scan {
                submitter: "ops".into(),
                scan_type: "latency".into(),
                destination: "all".into(),
            })?;
            Err::<(), _>(StoreError::NotFound("forced failure".into()))
        });
        assert!(matches!(err, Err(StoreError::NotFound(_))));
        assert!(db.list_scans().unwrap().is_empty());
    }
}

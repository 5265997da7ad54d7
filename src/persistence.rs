//! # SQLite Calibration Store
//!
//! Keeps the active field calibration in SQLite, for hosts that already
//! ship a database and would rather not manage a separate text file.
//!
//! The table holds a single row (`id = 1`); persisting a new calibration
//! replaces it.

use std::sync::Mutex;

use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension};

use crate::calibration::{CornerStore, FieldCorners};
use crate::error::{HeatmapError, Result};
use crate::GeoPoint;

/// [`CornerStore`] backed by a SQLite database.
pub struct SqliteCornerStore {
    db: Mutex<Connection>,
}

impl SqliteCornerStore {
    /// Open (or create) the database at `db_path`.
    pub fn new(db_path: &str) -> Result<Self> {
        let db = Connection::open(db_path)?;
        Self::init_schema(&db)?;
        info!("[CornerStore] Opened calibration database at {}", db_path);
        Ok(Self { db: Mutex::new(db) })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        Self::new(":memory:")
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS field_corners (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                lat1 REAL NOT NULL, lon1 REAL NOT NULL, ts1 INTEGER NOT NULL,
                lat2 REAL NOT NULL, lon2 REAL NOT NULL, ts2 INTEGER NOT NULL,
                lat3 REAL NOT NULL, lon3 REAL NOT NULL, ts3 INTEGER NOT NULL,
                lat4 REAL NOT NULL, lon4 REAL NOT NULL, ts4 INTEGER NOT NULL,
                captured_at INTEGER NOT NULL,
                saved_at INTEGER DEFAULT (strftime('%s', 'now'))
            );
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|_| HeatmapError::Persistence {
            message: "calibration database lock poisoned".to_string(),
        })
    }
}

impl CornerStore for SqliteCornerStore {
    fn persist(&self, corners: &FieldCorners) -> Result<()> {
        let [p1, p2, p3, p4] = corners.points();
        self.conn()?.execute(
            "INSERT OR REPLACE INTO field_corners (
                id,
                lat1, lon1, ts1, lat2, lon2, ts2,
                lat3, lon3, ts3, lat4, lon4, ts4,
                captured_at
            ) VALUES (1, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                p1.latitude,
                p1.longitude,
                p1.timestamp_millis,
                p2.latitude,
                p2.longitude,
                p2.timestamp_millis,
                p3.latitude,
                p3.longitude,
                p3.timestamp_millis,
                p4.latitude,
                p4.longitude,
                p4.timestamp_millis,
                corners.captured_at_millis,
            ],
        )?;
        debug!("[CornerStore] Saved field corners to SQLite");
        Ok(())
    }

    fn load(&self) -> Result<Option<FieldCorners>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT lat1, lon1, ts1, lat2, lon2, ts2,
                        lat3, lon3, ts3, lat4, lon4, ts4, captured_at
                 FROM field_corners WHERE id = 1",
                [],
                |row| {
                    let mut points = Vec::with_capacity(4);
                    for n in 0..4 {
                        points.push(GeoPoint::with_timestamp(
                            row.get(n * 3)?,
                            row.get(n * 3 + 1)?,
                            row.get(n * 3 + 2)?,
                        ));
                    }
                    let captured_at: i64 = row.get(12)?;
                    Ok((points, captured_at))
                },
            )
            .optional()?;

        match row {
            Some((points, captured_at)) => Ok(Some(
                FieldCorners::from_points(&points)?.with_captured_at(captured_at),
            )),
            None => Ok(None),
        }
    }

    fn clear(&self) -> Result<()> {
        self.conn()?.execute("DELETE FROM field_corners", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn corners(offset: f64) -> FieldCorners {
        FieldCorners::from_points(&[
            GeoPoint::with_timestamp(37.5660 + offset, 126.9770, 1),
            GeoPoint::with_timestamp(37.5660 + offset, 126.9790, 2),
            GeoPoint::with_timestamp(37.5670 + offset, 126.9790, 3),
            GeoPoint::with_timestamp(37.5670 + offset, 126.9770, 4),
        ])
        .unwrap()
    }

    #[test]
    fn test_empty_store() {
        let store = SqliteCornerStore::in_memory().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_persist_overwrites() {
        let store = SqliteCornerStore::in_memory().unwrap();
        store.persist(&corners(0.0)).unwrap();
        store.persist(&corners(1.0)).unwrap();
        assert_eq!(store.load().unwrap(), Some(corners(1.0)));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("calibration.db");
        let path = path.to_str().unwrap();

        {
            let store = SqliteCornerStore::new(path).unwrap();
            store.persist(&corners(0.5)).unwrap();
        }

        let store = SqliteCornerStore::new(path).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, corners(0.5));
        assert_eq!(loaded.captured_at_millis, 4);
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SQLite measurement store
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE measurements (
//!     id INTEGER PRIMARY KEY,
//!     sensor_id INTEGER NOT NULL,
//!     sensdata TEXT NOT NULL,       -- JSON [[voltage, delta_ms], ...]
//!     time TEXT NOT NULL,           -- RFC 3339 batch start
//!     rmsvalue REAL NOT NULL,
//!     sname TEXT NOT NULL,
//!     stype TEXT NOT NULL,
//!     thd REAL NOT NULL DEFAULT 0,
//!     pf REAL NOT NULL DEFAULT 0
//! );
//! CREATE INDEX idx_sensor_time ON measurements(sensor_id, time);
//! ```
//!
//! The index serves the collaborator read path
//! (`WHERE sensor_id = ? ORDER BY time DESC LIMIT n`).

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::config::SensorKind;
use crate::store::{Measurement, MeasurementStore, StoreError};

/// SQLite-backed [`MeasurementStore`].
///
/// Not internally synchronized: the batch writer thread is the sole
/// owner of the connection.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a file-backed store.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// In-memory store for testing.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS measurements (
                id INTEGER PRIMARY KEY,
                sensor_id INTEGER NOT NULL,
                sensdata TEXT NOT NULL,
                time TEXT NOT NULL,
                rmsvalue REAL NOT NULL,
                sname TEXT NOT NULL,
                stype TEXT NOT NULL,
                thd REAL NOT NULL DEFAULT 0,
                pf REAL NOT NULL DEFAULT 0
            )",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_sensor_time ON measurements(sensor_id, time)",
            [],
        )?;
        Ok(())
    }

    fn row_to_measurement(row: &rusqlite::Row) -> rusqlite::Result<Measurement> {
        let sensdata_json: String = row.get(2)?;
        let sensdata = serde_json::from_str(&sensdata_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?;

        let time_text: String = row.get(3)?;
        let time = DateTime::parse_from_rfc3339(&time_text)
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    3,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?
            .with_timezone(&Utc);

        let stype_text: String = row.get(6)?;
        let stype: SensorKind = stype_text.parse().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                6,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?;

        Ok(Measurement {
            id: row.get(0)?,
            sensor_id: row.get::<_, i64>(1)? as u32,
            sensdata,
            time,
            rmsvalue: row.get(4)?,
            sname: row.get(5)?,
            stype,
            thd: row.get(7)?,
            pf: row.get(8)?,
        })
    }
}

impl MeasurementStore for SqliteStore {
    fn max_id(&mut self) -> Result<i64, StoreError> {
        let max: i64 = self
            .conn
            .query_row("SELECT COALESCE(MAX(id), 0) FROM measurements", [], |row| {
                row.get(0)
            })?;
        Ok(max)
    }

    fn insert(&mut self, m: &Measurement) -> Result<(), StoreError> {
        let sensdata = serde_json::to_string(&m.sensdata)?;
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO measurements (id, sensor_id, sensdata, time, rmsvalue, sname, stype, thd, pf)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                m.id,
                i64::from(m.sensor_id),
                sensdata,
                m.time.to_rfc3339(),
                m.rmsvalue,
                m.sname,
                m.stype.as_str(),
                m.thd,
                m.pf,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn latest(&mut self, sensor_id: u32, count: usize) -> Result<Vec<Measurement>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, sensor_id, sensdata, time, rmsvalue, sname, stype, thd, pf
             FROM measurements
             WHERE sensor_id = ?1
             ORDER BY time DESC
             LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(
                params![i64::from(sensor_id), count as i64],
                Self::row_to_measurement,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn count(&mut self) -> Result<usize, StoreError> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM measurements", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn measurement(id: i64, sensor_id: u32, minute: u32) -> Measurement {
        Measurement {
            id,
            sensor_id,
            sensdata: vec![[1.0, 0.0], [2.0, 10.0]],
            time: Utc.with_ymd_and_hms(2026, 8, 1, 12, minute, 0).unwrap(),
            rmsvalue: 1.58,
            sname: "Voltage Sensor Ch2".to_string(),
            stype: SensorKind::Voltage,
            thd: 0.0,
            pf: 0.0,
        }
    }

    #[test]
    fn test_insert_and_latest_round_trip() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.insert(&measurement(1, 1, 0)).unwrap();
        store.insert(&measurement(2, 1, 1)).unwrap();
        store.insert(&measurement(3, 2, 1)).unwrap();

        let rows = store.latest(1, 1).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, 2);
        assert_eq!(rows[0].sensdata, vec![[1.0, 0.0], [2.0, 10.0]]);
        assert_eq!(rows[0].stype, SensorKind::Voltage);
        assert_eq!(rows[0].rmsvalue, 1.58);

        let both = store.latest(1, 5).unwrap();
        assert_eq!(both.len(), 2);
        assert_eq!(both[0].id, 2); // newest first
    }

    #[test]
    fn test_max_id_empty_and_seeded() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.max_id().unwrap(), 0);
        store.insert(&measurement(41, 1, 0)).unwrap();
        assert_eq!(store.max_id().unwrap(), 41);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.insert(&measurement(1, 1, 0)).unwrap();
        assert!(store.insert(&measurement(1, 2, 1)).is_err());
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gridsense.db");
        let path = path.to_str().unwrap();
        {
            let mut store = SqliteStore::open(path).unwrap();
            store.insert(&measurement(5, 1, 0)).unwrap();
        }
        let mut reopened = SqliteStore::open(path).unwrap();
        assert_eq!(reopened.max_id().unwrap(), 5);
    }
}

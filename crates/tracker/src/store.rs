//! Append-only SQLite store for coverage events.
//!
//! The `action` table is written once per event and read back only as a
//! full scan in insertion order. There is no update or delete path.

use crate::event::{CoverageEvent, Payload};
use crate::result::{TrackerError, TrackerResult};
use rusqlite::{params, Connection, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

const DDL_SQL: &str = "
CREATE TABLE IF NOT EXISTS action (
    id INTEGER PRIMARY KEY ASC,
    event TEXT,
    venture_config_id TEXT,
    venture_reference TEXT,
    created_at TEXT,
    culture TEXT,
    action_type TEXT,
    action_reference TEXT,
    version TEXT,
    route TEXT,
    service_name TEXT,
    coverage REAL
)";

const INSERT_SQL: &str = "
INSERT INTO action (
    event, venture_config_id, venture_reference, created_at, culture,
    action_type, action_reference, version, route, service_name, coverage
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)";

const SELECT_SQL: &str = "
SELECT event, venture_config_id, venture_reference, created_at, culture,
       action_type, action_reference, version, route, service_name, coverage
FROM action
ORDER BY id ASC";

/// Durable, append-only log of coverage events.
///
/// One connection is shared by every caller; the mutex serializes reads
/// and writes since `rusqlite::Connection` is not `Sync`.
#[derive(Debug)]
pub struct ActionStore {
    path: Option<PathBuf>,
    conn: Mutex<Connection>,
}

impl ActionStore {
    /// Open (or create) the database file and ensure the `action` table exists.
    ///
    /// Safe to call on every startup.
    pub fn open(path: impl AsRef<Path>) -> TrackerResult<Self> {
        let path = path.as_ref();
        let location = path.display().to_string();
        let conn = Connection::open(path)
            .map_err(|err| TrackerError::storage_unavailable(&location, err))?;
        let store = Self {
            path: Some(path.to_path_buf()),
            conn: Mutex::new(conn),
        };
        store.initialize(&location)?;
        info!(db = %location, "action store ready");
        Ok(store)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> TrackerResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|err| TrackerError::storage_unavailable(":memory:", err))?;
        let store = Self {
            path: None,
            conn: Mutex::new(conn),
        };
        store.initialize(":memory:")?;
        Ok(store)
    }

    fn initialize(&self, location: &str) -> TrackerResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| TrackerError::storage_unavailable(location, "connection lock poisoned"))?;
        conn.execute_batch(DDL_SQL)
            .map_err(|err| TrackerError::storage_unavailable(location, err))
    }

    /// Location of the database file, `None` for in-memory stores
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, String> {
        self.conn
            .lock()
            .map_err(|_| "connection lock poisoned".to_string())
    }

    /// Persist one event as a new row.
    ///
    /// The insert is a single statement, so a failure leaves no partial row.
    pub fn append(&self, event: &CoverageEvent) -> TrackerResult<()> {
        let payload = event
            .payload
            .as_ref()
            .ok_or_else(|| TrackerError::persistence("event has no payload"))?;
        let conn = self.lock().map_err(TrackerError::persistence)?;
        let mut stmt = conn
            .prepare_cached(INSERT_SQL)
            .map_err(TrackerError::persistence)?;
        stmt.execute(params![
            event.event,
            event.venture_config_id,
            event.venture_reference,
            event.created_at,
            event.culture,
            event.action_type,
            event.action_reference,
            event.version,
            event.route,
            payload.service_name,
            payload.coverage,
        ])
        .map_err(TrackerError::persistence)?;
        debug!(
            event = %event.event,
            service = %payload.service_name,
            coverage = payload.coverage,
            "event appended"
        );
        Ok(())
    }

    /// Every persisted event in insertion order. An empty table yields an empty vec.
    pub fn scan_all(&self) -> TrackerResult<Vec<CoverageEvent>> {
        let conn = self.lock().map_err(TrackerError::query)?;
        let mut stmt = conn
            .prepare_cached(SELECT_SQL)
            .map_err(TrackerError::query)?;
        let rows = stmt.query_map([], map_row).map_err(TrackerError::query)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(TrackerError::query)
    }

    /// Number of stored events
    pub fn count(&self) -> TrackerResult<usize> {
        let conn = self.lock().map_err(TrackerError::query)?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM action", [], |row| row.get(0))
            .map_err(TrackerError::query)?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<CoverageEvent> {
    Ok(CoverageEvent {
        event: text(row, 0)?,
        venture_config_id: text(row, 1)?,
        venture_reference: text(row, 2)?,
        created_at: text(row, 3)?,
        culture: text(row, 4)?,
        action_type: text(row, 5)?,
        action_reference: text(row, 6)?,
        version: text(row, 7)?,
        route: text(row, 8)?,
        payload: Some(Payload {
            service_name: text(row, 9)?,
            coverage: row.get::<_, Option<f64>>(10)?.unwrap_or_default(),
        }),
    })
}

/// Text columns are nullable in the schema; read NULL as empty.
fn text(row: &Row<'_>, idx: usize) -> rusqlite::Result<String> {
    Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::event::TRACK_TEST_COVERAGE_EVENT;
    use std::sync::Arc;

    fn sample(id: &str) -> CoverageEvent {
        CoverageEvent {
            event: TRACK_TEST_COVERAGE_EVENT.to_string(),
            venture_config_id: id.to_string(),
            venture_reference: id.to_string(),
            created_at: "2021-03-02T08:30:00+00:00".to_string(),
            culture: "en_EN".to_string(),
            action_type: "api".to_string(),
            action_reference: String::new(),
            version: "1.0.0".to_string(),
            route: String::new(),
            payload: Some(Payload::new("test", 23.5)),
        }
    }

    #[test]
    fn test_open_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.db");
        let store = ActionStore::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(store.path(), Some(path.as_path()));
    }

    #[test]
    fn test_open_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.db");
        {
            let store = ActionStore::open(&path).unwrap();
            store.append(&sample("1")).unwrap();
        }
        let reopened = ActionStore::open(&path).unwrap();
        assert_eq!(reopened.scan_all().unwrap(), vec![sample("1")]);
    }

    #[test]
    fn test_open_unreachable_path_is_storage_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("nested").join("stats.db");
        let err = ActionStore::open(&path).unwrap_err();
        assert!(matches!(err, TrackerError::StorageUnavailable { .. }));
    }

    #[test]
    fn test_scan_empty_store() {
        let store = ActionStore::open_in_memory().unwrap();
        assert!(store.scan_all().unwrap().is_empty());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_append_then_scan_round_trips_all_fields() {
        let store = ActionStore::open_in_memory().unwrap();
        let mut event = sample("57EFFB23");
        event.action_reference = "ringier/pkg/statsdb".to_string();
        event.route = "/action".to_string();
        event.payload = Some(Payload::new("tracker", 63.3));
        store.append(&event).unwrap();

        let all = store.scan_all().unwrap();
        assert_eq!(all, vec![event]);
    }

    #[test]
    fn test_equivalent_appends_are_not_deduplicated() {
        let store = ActionStore::open_in_memory().unwrap();
        store.append(&sample("1")).unwrap();
        store.append(&sample("1")).unwrap();
        let all = store.scan_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], all[1]);
    }

    #[test]
    fn test_scan_preserves_insertion_order() {
        let store = ActionStore::open_in_memory().unwrap();
        for id in ["c", "a", "b"] {
            store.append(&sample(id)).unwrap();
        }
        let ids: Vec<_> = store
            .scan_all()
            .unwrap()
            .into_iter()
            .map(|e| e.venture_config_id)
            .collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[test]
    fn test_append_without_payload_fails() {
        let store = ActionStore::open_in_memory().unwrap();
        let mut event = sample("1");
        event.payload = None;
        let err = store.append(&event).unwrap_err();
        assert!(matches!(err, TrackerError::Persistence { .. }));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_concurrent_appends_are_serialized() {
        let store = Arc::new(ActionStore::open_in_memory().unwrap());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for j in 0..10 {
                        store.append(&sample(&format!("{i}-{j}"))).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.count().unwrap(), 80);
    }
}

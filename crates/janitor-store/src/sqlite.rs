//! SQLite-based store implementation

use chrono::{DateTime, Local};
use janitor_api::{EndpointAction, RunReport};
use janitor_util::RunId;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::{AuditEvent, Store, StoreError, StoreResult, TerminationRecord};

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing and dry runs)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("store lock poisoned".into()))
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Audit log (append-only)
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_json TEXT NOT NULL
            );

            -- Termination ledger
            CREATE TABLE IF NOT EXISTS terminations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id TEXT NOT NULL,
                workspace TEXT NOT NULL,
                endpoint_id TEXT NOT NULL,
                recorded_at TEXT NOT NULL,
                action_json TEXT NOT NULL
            );

            -- Run reports
            CREATE TABLE IF NOT EXISTS run_reports (
                run_id TEXT PRIMARY KEY,
                finished_at TEXT NOT NULL,
                report_json TEXT NOT NULL
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
            CREATE INDEX IF NOT EXISTS idx_terminations_run ON terminations(run_id);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

fn parse_timestamp(s: &str) -> DateTime<Local> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Local))
        .unwrap_or_else(|_| janitor_util::now())
}

impl Store for SqliteStore {
    fn append_audit(&self, mut event: AuditEvent) -> StoreResult<()> {
        let conn = self.conn()?;
        let event_json = serde_json::to_string(&event.event)?;

        conn.execute(
            "INSERT INTO audit_log (timestamp, event_json) VALUES (?, ?)",
            params![event.timestamp.to_rfc3339(), event_json],
        )?;

        event.id = conn.last_insert_rowid();
        debug!(event_id = event.id, "Audit event appended");

        Ok(())
    }

    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, timestamp, event_json FROM audit_log ORDER BY id DESC LIMIT ?",
        )?;

        let rows = stmt.query_map([limit], |row| {
            let id: i64 = row.get(0)?;
            let timestamp_str: String = row.get(1)?;
            let event_json: String = row.get(2)?;
            Ok((id, timestamp_str, event_json))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, timestamp_str, event_json) = row?;
            let event: crate::AuditEventType = serde_json::from_str(&event_json)?;

            events.push(AuditEvent {
                id,
                timestamp: parse_timestamp(&timestamp_str),
                event,
            });
        }

        Ok(events)
    }

    fn record_termination(&self, record: &TerminationRecord) -> StoreResult<()> {
        let conn = self.conn()?;
        let action_json = serde_json::to_string(&record.action)?;

        conn.execute(
            r#"
            INSERT INTO terminations (run_id, workspace, endpoint_id, recorded_at, action_json)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![
                record.run_id.to_string(),
                record.workspace,
                record.action.candidate.cluster_id.as_str(),
                record.recorded_at.to_rfc3339(),
                action_json
            ],
        )?;

        debug!(
            run_id = %record.run_id,
            endpoint_id = %record.action.candidate.cluster_id,
            "Termination recorded"
        );
        Ok(())
    }

    fn get_terminations(&self, run_id: &RunId) -> StoreResult<Vec<TerminationRecord>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT workspace, recorded_at, action_json FROM terminations
            WHERE run_id = ? ORDER BY id ASC
            "#,
        )?;

        let rows = stmt.query_map([run_id.to_string()], |row| {
            let workspace: String = row.get(0)?;
            let recorded_at: String = row.get(1)?;
            let action_json: String = row.get(2)?;
            Ok((workspace, recorded_at, action_json))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (workspace, recorded_at, action_json) = row?;
            let action: EndpointAction = serde_json::from_str(&action_json)?;
            records.push(TerminationRecord {
                run_id: run_id.clone(),
                workspace,
                recorded_at: parse_timestamp(&recorded_at),
                action,
            });
        }

        Ok(records)
    }

    fn save_run_report(&self, report: &RunReport) -> StoreResult<()> {
        let conn = self.conn()?;
        let json = serde_json::to_string(report)?;

        conn.execute(
            r#"
            INSERT INTO run_reports (run_id, finished_at, report_json)
            VALUES (?, ?, ?)
            ON CONFLICT(run_id)
            DO UPDATE SET finished_at = excluded.finished_at, report_json = excluded.report_json
            "#,
            params![
                report.run_id.to_string(),
                report.finished_at.to_rfc3339(),
                json
            ],
        )?;

        debug!(run_id = %report.run_id, "Run report saved");
        Ok(())
    }

    fn load_run_report(&self, run_id: &RunId) -> StoreResult<Option<RunReport>> {
        let conn = self.conn()?;

        let json: Option<String> = conn
            .query_row(
                "SELECT report_json FROM run_reports WHERE run_id = ?",
                [run_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(s) => Ok(Some(serde_json::from_str(&s)?)),
            None => Ok(None),
        }
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuditEventType;
    use janitor_api::{
        ActionOutcome, ClusterDetails, KeepUntil, TerminationCandidate, WorkspaceReport,
    };
    use janitor_util::EndpointId;

    fn action(id: &str, outcome: ActionOutcome) -> EndpointAction {
        EndpointAction {
            candidate: TerminationCandidate {
                cluster_name: format!("wh-{id}"),
                creator_user_name: Some("dev@example.com".into()),
                cluster_id: EndpointId::new(id),
                autotermination_minutes: Some(60),
                cluster_details: ClusterDetails {
                    min_num_clusters: Some(1),
                    max_num_clusters: Some(1),
                    cluster_size: Some("Small".into()),
                },
                keep_alive: false,
                keep_until: KeepUntil::Unset,
            },
            outcome,
        }
    }

    #[test]
    fn test_in_memory_store() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.is_healthy());
    }

    #[test]
    fn test_audit_log() {
        let store = SqliteStore::in_memory().unwrap();

        store
            .append_audit(AuditEvent::new(AuditEventType::WorkspaceSkipped {
                workspace: "Interview Workspace".into(),
            }))
            .unwrap();
        store
            .append_audit(AuditEvent::new(AuditEventType::RunFinished {
                run_id: RunId::new(),
                deleted: 2,
                failed: 0,
            }))
            .unwrap();

        let events = store.get_recent_audits(10).unwrap();
        assert_eq!(events.len(), 2);
        // Newest first
        assert!(matches!(events[0].event, AuditEventType::RunFinished { deleted: 2, .. }));
        assert!(matches!(events[1].event, AuditEventType::WorkspaceSkipped { .. }));
    }

    #[test]
    fn test_termination_ledger() {
        let store = SqliteStore::in_memory().unwrap();
        let run_id = RunId::new();
        let other_run = RunId::new();

        for (run, id, outcome) in [
            (&run_id, "a", ActionOutcome::Deleted),
            (&other_run, "b", ActionOutcome::Deleted),
            (
                &run_id,
                "c",
                ActionOutcome::Failed {
                    error: "HTTP 500".into(),
                },
            ),
        ] {
            store
                .record_termination(&TerminationRecord {
                    run_id: run.clone(),
                    workspace: "dev".into(),
                    recorded_at: janitor_util::now(),
                    action: action(id, outcome),
                })
                .unwrap();
        }

        let records = store.get_terminations(&run_id).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].action.candidate.cluster_id.as_str(), "a");
        assert_eq!(records[1].action.candidate.cluster_id.as_str(), "c");
        assert!(matches!(records[1].action.outcome, ActionOutcome::Failed { .. }));
    }

    #[test]
    fn test_run_report() {
        let store = SqliteStore::in_memory().unwrap();
        let run_id = RunId::new();

        assert!(store.load_run_report(&run_id).unwrap().is_none());

        let mut workspace = WorkspaceReport::new("dev", "https://dev.example.com");
        workspace.endpoints.push(action("a", ActionOutcome::DryRun));
        let now = janitor_util::now();
        let report = RunReport::new(run_id.clone(), now, now, true, vec![workspace]);
        store.save_run_report(&report).unwrap();

        let loaded = store.load_run_report(&run_id).unwrap().unwrap();
        assert!(loaded.dry_run);
        assert_eq!(loaded.workspaces.len(), 1);
        assert_eq!(loaded.workspaces[0].endpoints[0].outcome, ActionOutcome::DryRun);
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("janitor.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .append_audit(AuditEvent::new(AuditEventType::WorkspaceSkipped {
                    workspace: "dev".into(),
                }))
                .unwrap();
        }

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.get_recent_audits(10).unwrap().len(), 1);
    }
}

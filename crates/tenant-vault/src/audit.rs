//! Append-only audit log, one JSON-lines file per UTC day.
//!
//! Grounded on spec.md §7's wire format and `app/services/vault_engine.py`'s
//! use of a dedicated writer so concurrent requests never interleave
//! partial lines. Writes are serialized through an `mpsc` channel drained
//! by a single background task; reads (there are none from this crate —
//! audit files are consumed by downstream tooling) would simply re-open
//! the file, since JSON-lines is append-friendly without coordination.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::error;

use tenant_types::{AccessAction, Decision, ResourceClass, UserId};

/// One line of the audit log.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    /// Unique id for this entry.
    pub id: String,
    /// UTC instant the decision was made.
    pub timestamp: chrono::DateTime<Utc>,
    /// Actor who made the request.
    pub actor_id: UserId,
    /// Action requested.
    pub action: AccessAction,
    /// Resource targeted.
    pub resource_id: String,
    /// Resolved resource class.
    pub resource_class: ResourceClass,
    /// Outcome of the decision.
    pub decision: Decision,
    /// Denial reason, when `decision` is `denied`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Caller IP, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    /// Caller user agent, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// A handle to the background audit-log writer. Cloning shares the same
/// underlying channel and file.
#[derive(Clone)]
pub struct AuditLog {
    tx: mpsc::UnboundedSender<AuditEntry>,
}

impl AuditLog {
    /// Spawn the writer task, appending to `log_dir/audit_YYYY-MM-DD.jsonl`,
    /// rolling to a new file when UTC date changes.
    pub fn spawn(log_dir: impl Into<PathBuf>) -> Self {
        let log_dir = log_dir.into();
        let (tx, mut rx) = mpsc::unbounded_channel::<AuditEntry>();

        tokio::spawn(async move {
            let mut current_day: Option<chrono::NaiveDate> = None;
            let mut file: Option<tokio::fs::File> = None;

            while let Some(entry) = rx.recv().await {
                let day = entry.timestamp.date_naive();
                if current_day != Some(day) || file.is_none() {
                    match open_for_day(&log_dir, day).await {
                        Ok(f) => {
                            file = Some(f);
                            current_day = Some(day);
                        }
                        Err(e) => {
                            error!(error = %e, "failed to open audit log file; entry dropped");
                            continue;
                        }
                    }
                }
                let Some(f) = file.as_mut() else { continue };
                let line = match serde_json::to_string(&entry) {
                    Ok(line) => line,
                    Err(e) => {
                        error!(error = %e, "failed to serialize audit entry; entry dropped");
                        continue;
                    }
                };
                if let Err(e) = f.write_all(line.as_bytes()).await {
                    error!(error = %e, "failed to write audit entry");
                    continue;
                }
                if let Err(e) = f.write_all(b"\n").await {
                    error!(error = %e, "failed to write audit entry newline");
                }
            }
        });

        Self { tx }
    }

    /// Queue `entry` for append. Never blocks; if the writer task has
    /// somehow died, the entry is dropped and logged rather than panicking
    /// the caller — vault operations must never fail because auditing did.
    pub fn append(&self, entry: AuditEntry) {
        if self.tx.send(entry).is_err() {
            error!("audit log writer task is gone; entry dropped");
        }
    }
}

async fn open_for_day(dir: &Path, day: chrono::NaiveDate) -> std::io::Result<tokio::fs::File> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("audit_{}.jsonl", day.format("%Y-%m-%d")));
    tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn append_writes_a_line() {
        let dir = tempdir().unwrap();
        let log = AuditLog::spawn(dir.path());
        log.append(AuditEntry {
            id: "1".into(),
            timestamp: Utc::now(),
            actor_id: UserId::new("u1").unwrap(),
            action: AccessAction::Read,
            resource_id: "doc-1".into(),
            resource_class: ResourceClass::Own,
            decision: Decision::Allowed,
            reason: None,
            ip: None,
            user_agent: None,
        });

        // Give the background writer a chance to run.
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
        let path = dir.path().join(format!("audit_{today}.jsonl"));
        let contents = tokio::fs::read_to_string(path).await.unwrap();
        assert!(contents.contains("\"doc-1\""));
        assert!(contents.trim_end().lines().count() == 1);
    }
}

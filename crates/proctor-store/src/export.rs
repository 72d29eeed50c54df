use std::fs;
use std::path::Path;

use proctor_core::SessionReport;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::store::Store;

/// Write the scored report for `session_id` as pretty JSON.
pub fn export_report_json(store: &Store, session_id: Uuid, path: &Path) -> Result<SessionReport> {
    let session = store.load_session(session_id)?;
    let report = SessionReport::from_session(&session);
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| StoreError::InvalidData(format!("serialize report: {e}")))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, json)?;
    tracing::info!(session = %session_id, "exported report to {}", path.display());
    Ok(report)
}

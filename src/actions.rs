//! Per-row actions. Every mutation calls the server first and touches local
//! rows only after it succeeds; a failure leaves one notice and nothing else.

use crate::api::{self, ApiError, ErrorKind, Transport};
use crate::entity::{Entity, StatusValue};
use crate::view::ListView;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Transient message for the UI's snackbar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionOutcome {
    Committed,
    Failed,
    UnknownRow,
}

/// Splits off failures that must leave the view (authorization).
fn local_failure(err: ApiError) -> Result<ApiError, ApiError> {
    if err.kind() == ErrorKind::Authorization {
        Err(err)
    } else {
        Ok(err)
    }
}

impl<E: Entity> ListView<E> {
    fn position(&self, id: &str) -> Option<usize> {
        self.rows.iter().position(|r| r.id() == id)
    }

    pub fn toggle_status(
        &mut self,
        transport: &dyn Transport,
        id: &str,
    ) -> Result<ActionOutcome, ApiError> {
        let Some(idx) = self.position(id) else {
            return Ok(ActionOutcome::UnknownRow);
        };
        let next = self.rows[idx].status().toggled();
        self.set_status(transport, id, next)
    }

    pub fn set_status(
        &mut self,
        transport: &dyn Transport,
        id: &str,
        status: E::Status,
    ) -> Result<ActionOutcome, ApiError> {
        if self.position(id).is_none() {
            return Ok(ActionOutcome::UnknownRow);
        }
        match api::patch_status::<E>(transport, id, status) {
            Ok(patched) => {
                // Rows may have been replaced while the request was out.
                if let Some(idx) = self.position(id) {
                    self.rows[idx] = patched;
                }
                self.notify(
                    NoticeLevel::Success,
                    format!("Status changed to {}", status.as_str()),
                );
                Ok(ActionOutcome::Committed)
            }
            Err(e) => {
                let e = local_failure(e)?;
                log::warn!("status change for {} {} failed: {}", E::FAMILY.path(), id, e);
                self.notify(NoticeLevel::Error, format!("Failed to update status: {}", e));
                Ok(ActionOutcome::Failed)
            }
        }
    }

    fn remove_local(&mut self, id: &str) {
        if let Some(idx) = self.position(id) {
            self.rows.remove(idx);
            self.total = self.total.saturating_sub(1);
        }
        self.table.selected.retain(|s| s != id);
    }

    pub fn delete_row(
        &mut self,
        transport: &dyn Transport,
        id: &str,
    ) -> Result<ActionOutcome, ApiError> {
        if self.position(id).is_none() {
            return Ok(ActionOutcome::UnknownRow);
        }
        match api::delete::<E>(transport, id) {
            Ok(()) => {
                self.remove_local(id);
                self.notify(NoticeLevel::Success, "Delete success!");
                Ok(ActionOutcome::Committed)
            }
            Err(e) => {
                let e = local_failure(e)?;
                log::warn!("delete of {} {} failed: {}", E::FAMILY.path(), id, e);
                self.notify(NoticeLevel::Error, format!("Failed to delete: {}", e));
                Ok(ActionOutcome::Failed)
            }
        }
    }

    /// Deletes every selected row; each one commits on its own success.
    /// Leaves a single summary notice. Returns the ids that were removed.
    pub fn delete_selected(&mut self, transport: &dyn Transport) -> Result<Vec<String>, ApiError> {
        let ids = self.table.selected.clone();
        let mut removed = Vec::new();
        let mut failed = 0usize;
        for id in &ids {
            if self.position(id).is_none() {
                self.table.selected.retain(|s| s != id);
                continue;
            }
            match api::delete::<E>(transport, id) {
                Ok(()) => {
                    self.remove_local(id);
                    removed.push(id.clone());
                }
                Err(e) => {
                    let e = local_failure(e)?;
                    log::warn!("delete of {} {} failed: {}", E::FAMILY.path(), id, e);
                    failed += 1;
                }
            }
        }
        if failed == 0 {
            self.notify(NoticeLevel::Success, format!("Deleted {} rows", removed.len()));
        } else {
            self.notify(
                NoticeLevel::Error,
                format!("Deleted {} rows, {} failed", removed.len(), failed),
            );
        }
        Ok(removed)
    }
}

/// Client-side route of the edit form for one row.
pub fn edit_route(family: crate::entity::EntityFamily, id: &str) -> String {
    format!("/dashboard/{}/{}/edit", family.path(), id)
}

use crate::actions::{edit_route, ActionOutcome};
use crate::api::{ApiError, Transport};
use crate::entity::{Entity, StatusValue};
use crate::ipc::error::{api_err, err, ok};
use crate::ipc::helpers::{required_str, view_mut};
use crate::ipc::types::{with_view, AppState, Request};
use crate::view::ListView;
use serde_json::json;

fn outcome_response(
    req: &Request,
    row_id: &str,
    outcome: Result<ActionOutcome, ApiError>,
    snapshot: impl FnOnce() -> serde_json::Value,
) -> serde_json::Value {
    match outcome {
        Ok(ActionOutcome::UnknownRow) => err(
            &req.id,
            "not_found",
            "row is not on the loaded page",
            Some(json!({ "id": row_id })),
        ),
        Ok(outcome) => ok(&req.id, json!({ "outcome": outcome, "view": snapshot() })),
        Err(e) => api_err(&req.id, &e),
    }
}

/// `None` when `status` is outside the family's vocabulary.
fn set_status_named<E: Entity>(
    v: &mut ListView<E>,
    transport: &dyn Transport,
    id: &str,
    status: &str,
) -> Option<Result<ActionOutcome, ApiError>> {
    let status = E::Status::parse(status)?;
    Some(v.set_status(transport, id, status))
}

fn handle_rows_toggle_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let view = match view_mut(&mut state.views, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let outcome = with_view!(&mut *view, v => v.toggle_status(&state.transport, &id));
    outcome_response(req, &id, outcome, || view.snapshot())
}

fn handle_rows_set_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let status = match required_str(req, "status") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let view = match view_mut(&mut state.views, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let family = view.family();
    let outcome =
        with_view!(&mut *view, v => set_status_named(v, &state.transport, &id, &status));
    let Some(outcome) = outcome else {
        return err(
            &req.id,
            "bad_params",
            format!("unknown status for {}: {}", family.path(), status),
            Some(json!({ "allowed": family.statuses() })),
        );
    };
    outcome_response(req, &id, outcome, || view.snapshot())
}

fn handle_rows_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let view = match view_mut(&mut state.views, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let outcome = with_view!(&mut *view, v => v.delete_row(&state.transport, &id));
    outcome_response(req, &id, outcome, || view.snapshot())
}

fn handle_rows_delete_selected(state: &mut AppState, req: &Request) -> serde_json::Value {
    let view = match view_mut(&mut state.views, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match with_view!(&mut *view, v => v.delete_selected(&state.transport)) {
        Ok(removed) => ok(&req.id, json!({ "removed": removed, "view": view.snapshot() })),
        Err(e) => api_err(&req.id, &e),
    }
}

fn handle_rows_edit_route(state: &mut AppState, req: &Request) -> serde_json::Value {
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let view = match view_mut(&mut state.views, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    ok(&req.id, json!({ "route": edit_route(view.family(), &id) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "rows.toggleStatus" => Some(handle_rows_toggle_status(state, req)),
        "rows.setStatus" => Some(handle_rows_set_status(state, req)),
        "rows.delete" => Some(handle_rows_delete(state, req)),
        "rows.deleteSelected" => Some(handle_rows_delete_selected(state, req)),
        "rows.editRoute" => Some(handle_rows_edit_route(state, req)),
        _ => None,
    }
}

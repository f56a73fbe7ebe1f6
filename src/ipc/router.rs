use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    let resp = dispatch(state, &req);
    // A 401 anywhere ends the session for every view, not just the caller's.
    if state.take_unauthorized() {
        log::warn!("signed out after {} was rejected as unauthorized", req.method);
        state.sign_out();
    }
    resp
}

fn dispatch(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Some(resp) = handlers::core::try_handle(state, req) {
        return resp;
    }
    if let Some(resp) = handlers::views::try_handle(state, req) {
        return resp;
    }
    if let Some(resp) = handlers::rows::try_handle(state, req) {
        return resp;
    }
    if let Some(resp) = handlers::entities::try_handle(state, req) {
        return resp;
    }
    if let Some(resp) = handlers::lookups::try_handle(state, req) {
        return resp;
    }

    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}

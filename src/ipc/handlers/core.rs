use crate::ipc::error::{api_err, ok};
use crate::ipc::helpers::{param_str, required_str};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn session_json(state: &AppState) -> serde_json::Value {
    json!({
        "baseUrl": state.session().base_url().as_str(),
        "signedIn": state.session().is_signed_in(),
    })
}

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "session": session_json(state),
            "openViews": state.views.len(),
            "rowsPerPageOptions": state.config.rows_per_page_options,
            "defaultRowsPerPage": state.config.default_rows_per_page,
        }),
    )
}

fn handle_session_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, session_json(state))
}

fn handle_session_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let token = match required_str(req, "token") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let base_url = param_str(req, "baseUrl")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| state.session().base_url().to_string());

    if let Err(e) = state.set_session(&base_url, Some(token)) {
        return api_err(&req.id, &e);
    }
    log::info!("session set for {}", state.session().base_url());
    ok(&req.id, session_json(state))
}

fn handle_session_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.sign_out();
    ok(&req.id, session_json(state))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "session.get" => Some(handle_session_get(state, req)),
        "session.set" => Some(handle_session_set(state, req)),
        "session.clear" => Some(handle_session_clear(state, req)),
        _ => None,
    }
}

use crate::api;
use crate::entity::with_entity;
use crate::ipc::error::{api_err, err, ok};
use crate::ipc::helpers::{family, required_str};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_entities_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let family = match family(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let res = with_entity!(family, E => {
        api::fetch_one::<E>(&state.transport, &id).map(|row| json!(row))
    });
    match res {
        Ok(entity) => ok(&req.id, json!({ "entity": entity })),
        Err(e) => api_err(&req.id, &e),
    }
}

/// Edit-form save: sends only the fields the form changed.
fn handle_entities_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let family = match family(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(partial) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "missing patch object", None);
    };
    if partial.is_empty() {
        return err(&req.id, "bad_params", "patch must change at least one field", None);
    }
    // Ids are server-assigned; status has its own endpoint.
    if let Some(key) = ["id", "_id", "status"].iter().find(|k| partial.contains_key(**k)) {
        return err(
            &req.id,
            "bad_params",
            format!("{} cannot be changed through entities.update", key),
            None,
        );
    }

    let res = with_entity!(family, E => {
        api::patch::<E>(&state.transport, &id, partial).map(|row| json!(row))
    });
    match res {
        Ok(entity) => ok(&req.id, json!({ "entity": entity })),
        Err(e) => api_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "entities.get" => Some(handle_entities_get(state, req)),
        "entities.update" => Some(handle_entities_update(state, req)),
        _ => None,
    }
}

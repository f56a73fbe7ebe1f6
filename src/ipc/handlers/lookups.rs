use crate::api;
use crate::entity::with_entity;
use crate::ipc::error::{api_err, ok};
use crate::ipc::helpers::{family, param_str, required_str};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

const DEFAULT_LOOKUP_LIMIT: usize = 50;

fn handle_lookups_options(state: &mut AppState, req: &Request) -> serde_json::Value {
    let family = match family(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let query = param_str(req, "query").unwrap_or("").to_string();
    let limit = req
        .params
        .get("limit")
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_LOOKUP_LIMIT);

    let res = with_entity!(family, E => api::lookup_options::<E>(&state.transport, &query, limit));
    match res {
        Ok(options) => ok(&req.id, json!({ "options": options })),
        Err(e) => api_err(&req.id, &e),
    }
}

fn handle_locations_countries(state: &mut AppState, req: &Request) -> serde_json::Value {
    match api::fetch_countries(&state.transport) {
        Ok(countries) => ok(&req.id, json!({ "countries": countries })),
        Err(e) => api_err(&req.id, &e),
    }
}

fn handle_locations_cities(state: &mut AppState, req: &Request) -> serde_json::Value {
    let country_code = match required_str(req, "countryCode") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match api::fetch_cities(&state.transport, &country_code) {
        Ok(cities) => ok(&req.id, json!({ "cities": cities })),
        Err(e) => api_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "lookups.options" => Some(handle_lookups_options(state, req)),
        "locations.countries" => Some(handle_locations_countries(state, req)),
        "locations.cities" => Some(handle_locations_cities(state, req)),
        _ => None,
    }
}

use crate::api::HttpTransport;
use crate::entity::{Entity, EntityFamily};
use crate::ipc::error::{api_err, err, ok};
use crate::ipc::helpers::{
    family, required_bool, required_str, required_usize, rows_per_page, view_mut,
};
use crate::ipc::types::{with_view, AnyView, AppState, Request};
use crate::view::ListView;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Filter fields a request may change; absent fields are left alone.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilterParams {
    name: Option<String>,
    status: Option<String>,
    role: Option<Vec<String>>,
    #[serde(default)]
    scope: BTreeMap<String, Option<String>>,
}

impl FilterParams {
    fn parse(req: &Request, value: Option<&serde_json::Value>) -> Result<Self, serde_json::Value> {
        match value {
            None | Some(serde_json::Value::Null) => Ok(Self::default()),
            Some(v) => serde_json::from_value(v.clone())
                .map_err(|e| err(&req.id, "bad_params", format!("invalid filters: {}", e), None)),
        }
    }

    fn validate(&self, req: &Request, family: EntityFamily) -> Result<(), serde_json::Value> {
        if let Some(status) = &self.status {
            if !family.accepts_status_filter(status) {
                return Err(err(
                    &req.id,
                    "bad_params",
                    format!("unknown status for {}: {}", family.path(), status),
                    Some(json!({ "allowed": family.statuses() })),
                ));
            }
        }
        if let Some(key) = self.scope.keys().find(|k| !family.scope_keys().contains(&k.as_str())) {
            return Err(err(
                &req.id,
                "bad_params",
                format!("unknown scope filter for {}: {}", family.path(), key),
                Some(json!({ "allowed": family.scope_keys() })),
            ));
        }
        Ok(())
    }

    /// Returns whether the server has to be asked again.
    fn apply<E: Entity>(self, v: &mut ListView<E>) -> bool {
        let mut refetch = false;
        if let Some(status) = self.status {
            refetch |= v.set_status_filter(&status);
        }
        for (key, value) in self.scope {
            refetch |= v.set_scope(&key, value);
        }
        if let Some(role) = self.role {
            refetch |= v.set_role(role);
        }
        if let Some(name) = self.name {
            refetch |= v.set_name(&name);
        }
        refetch
    }
}

fn respond(
    transport: &HttpTransport,
    view: &mut AnyView,
    req: &Request,
    refetch: bool,
) -> serde_json::Value {
    if refetch {
        if let Err(e) = view.load(transport) {
            return api_err(&req.id, &e);
        }
    }
    ok(
        &req.id,
        json!({ "view": view.snapshot(), "refetched": refetch }),
    )
}

fn handle_views_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let family = match family(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let rpp = if req.params.get("rowsPerPage").is_some() {
        match rows_per_page(req, "rowsPerPage") {
            Ok(v) => v,
            Err(resp) => return resp,
        }
    } else {
        state.config.rows_per_page()
    };
    let filters = match FilterParams::parse(req, req.params.get("filters")) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(resp) = filters.validate(req, family) {
        return resp;
    }

    let mut view = AnyView::open(family, rpp);
    with_view!(&mut view, v => {
        filters.apply(v);
    });
    if let Err(e) = view.load(&state.transport) {
        return api_err(&req.id, &e);
    }

    let view_id = Uuid::new_v4().to_string();
    let snapshot = view.snapshot();
    state.views.insert(view_id.clone(), view);
    log::info!("opened {} view {}", family.path(), view_id);
    ok(&req.id, json!({ "viewId": view_id, "view": snapshot }))
}

fn handle_views_close(state: &mut AppState, req: &Request) -> serde_json::Value {
    let view_id = match required_str(req, "viewId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let closed = state.views.remove(&view_id).is_some();
    ok(&req.id, json!({ "closed": closed }))
}

fn handle_views_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let views: Vec<serde_json::Value> = state
        .views
        .iter()
        .map(|(id, v)| json!({ "viewId": id, "family": v.family() }))
        .collect();
    ok(&req.id, json!({ "views": views }))
}

fn handle_views_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let view = match view_mut(&mut state.views, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(&state.transport, view, req, false)
}

fn handle_views_refresh(state: &mut AppState, req: &Request) -> serde_json::Value {
    let view = match view_mut(&mut state.views, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(&state.transport, view, req, true)
}

fn handle_views_set_page(state: &mut AppState, req: &Request) -> serde_json::Value {
    let page = match required_usize(req, "page") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let view = match view_mut(&mut state.views, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let refetch = with_view!(&mut *view, v => v.set_page(page));
    respond(&state.transport, view, req, refetch)
}

fn handle_views_set_rows_per_page(state: &mut AppState, req: &Request) -> serde_json::Value {
    let n = match rows_per_page(req, "rowsPerPage") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let view = match view_mut(&mut state.views, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let refetch = with_view!(&mut *view, v => v.set_rows_per_page(n));
    respond(&state.transport, view, req, refetch)
}

fn handle_views_sort(state: &mut AppState, req: &Request) -> serde_json::Value {
    let column = match required_str(req, "column") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let view = match view_mut(&mut state.views, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    with_view!(&mut *view, v => v.sort(&column));
    respond(&state.transport, view, req, false)
}

fn handle_views_set_dense(state: &mut AppState, req: &Request) -> serde_json::Value {
    let dense = match required_bool(req, "dense") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let view = match view_mut(&mut state.views, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    with_view!(&mut *view, v => v.set_dense(dense));
    respond(&state.transport, view, req, false)
}

fn handle_views_set_filter(state: &mut AppState, req: &Request) -> serde_json::Value {
    let filters = match FilterParams::parse(req, Some(&req.params)) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let view = match view_mut(&mut state.views, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(resp) = filters.validate(req, view.family()) {
        return resp;
    }
    let refetch = with_view!(&mut *view, v => filters.apply(v));
    respond(&state.transport, view, req, refetch)
}

fn handle_views_reset_filters(state: &mut AppState, req: &Request) -> serde_json::Value {
    let view = match view_mut(&mut state.views, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let refetch = with_view!(&mut *view, v => v.reset_filters());
    respond(&state.transport, view, req, refetch)
}

fn handle_views_select_row(state: &mut AppState, req: &Request) -> serde_json::Value {
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let view = match view_mut(&mut state.views, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if !with_view!(&mut *view, v => v.select_row(&id)) {
        return err(
            &req.id,
            "not_found",
            "row is not on the loaded page",
            Some(json!({ "id": id })),
        );
    }
    respond(&state.transport, view, req, false)
}

fn handle_views_select_all(state: &mut AppState, req: &Request) -> serde_json::Value {
    let checked = match required_bool(req, "checked") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let view = match view_mut(&mut state.views, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    with_view!(&mut *view, v => v.select_all(checked));
    respond(&state.transport, view, req, false)
}

fn handle_views_take_notices(state: &mut AppState, req: &Request) -> serde_json::Value {
    let view = match view_mut(&mut state.views, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let notices = with_view!(&mut *view, v => v.take_notices());
    ok(&req.id, json!({ "notices": notices }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "views.open" => Some(handle_views_open(state, req)),
        "views.close" => Some(handle_views_close(state, req)),
        "views.list" => Some(handle_views_list(state, req)),
        "views.get" => Some(handle_views_get(state, req)),
        "views.refresh" => Some(handle_views_refresh(state, req)),
        "views.setPage" => Some(handle_views_set_page(state, req)),
        "views.setRowsPerPage" => Some(handle_views_set_rows_per_page(state, req)),
        "views.sort" => Some(handle_views_sort(state, req)),
        "views.setDense" => Some(handle_views_set_dense(state, req)),
        "views.setFilter" => Some(handle_views_set_filter(state, req)),
        "views.resetFilters" => Some(handle_views_reset_filters(state, req)),
        "views.selectRow" => Some(handle_views_select_row(state, req)),
        "views.selectAll" => Some(handle_views_select_all(state, req)),
        "views.takeNotices" => Some(handle_views_take_notices(state, req)),
        _ => None,
    }
}

use crate::entity::EntityFamily;
use crate::ipc::error::err;
use crate::ipc::types::{AnyView, Request};
use std::collections::BTreeMap;
use std::num::NonZeroUsize;

pub fn param_str<'a>(req: &'a Request, key: &str) -> Option<&'a str> {
    req.params.get(key).and_then(|v| v.as_str())
}

/// Missing or blank string params become a `bad_params` response.
pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    match param_str(req, key).map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(err(&req.id, "bad_params", format!("missing {}", key), None)),
    }
}

pub fn required_usize(req: &Request, key: &str) -> Result<usize, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing or invalid {}", key), None))
}

pub fn required_bool(req: &Request, key: &str) -> Result<bool, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_bool())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn rows_per_page(req: &Request, key: &str) -> Result<NonZeroUsize, serde_json::Value> {
    let n = required_usize(req, key)?;
    NonZeroUsize::new(n)
        .ok_or_else(|| err(&req.id, "bad_params", format!("{} must be positive", key), None))
}

pub fn family(req: &Request) -> Result<EntityFamily, serde_json::Value> {
    let raw = required_str(req, "family")?;
    EntityFamily::parse(&raw).ok_or_else(|| {
        err(
            &req.id,
            "bad_params",
            format!("unknown family: {}", raw),
            Some(serde_json::json!({
                "known": EntityFamily::ALL.iter().map(|f| f.path()).collect::<Vec<_>>()
            })),
        )
    })
}

/// Takes the view map rather than the whole state so callers can still reach
/// the transport.
pub fn view_mut<'a>(
    views: &'a mut BTreeMap<String, AnyView>,
    req: &Request,
) -> Result<&'a mut AnyView, serde_json::Value> {
    let view_id = required_str(req, "viewId")?;
    match views.get_mut(&view_id) {
        Some(v) => Ok(v),
        None => Err(err(
            &req.id,
            "not_found",
            "view not open",
            Some(serde_json::json!({ "viewId": view_id })),
        )),
    }
}

use crate::api::ApiError;
use serde_json::json;

/// Where the UI sends the user after the session is dropped.
pub const SIGN_IN_ROUTE: &str = "/auth/sign-in";

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

pub fn api_err(id: &str, e: &ApiError) -> serde_json::Value {
    let mut details = json!({ "kind": e.kind() });
    match e {
        ApiError::Unauthorized | ApiError::SignedOut => {
            details["redirect"] = json!(SIGN_IN_ROUTE);
        }
        ApiError::Rejected { status, .. } | ApiError::Server { status, .. } => {
            details["status"] = json!(status);
        }
        _ => {}
    }
    err(id, e.code(), e.to_string(), Some(details))
}

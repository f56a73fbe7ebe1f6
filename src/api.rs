//! REST transport and the per-family fetch adapter.
//!
//! Every request carries the session's bearer token. A 401 fires the session's
//! unauthorized hook once and surfaces as `ApiError::Unauthorized`; nothing here
//! retries.

use crate::entity::{Entity, StatusValue};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("session expired or revoked")]
    Unauthorized,
    #[error("not signed in")]
    SignedOut,
    #[error("not found")]
    NotFound,
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid API base URL: {0}")]
    InvalidBaseUrl(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Transport,
    Authorization,
    Validation,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Unauthorized | ApiError::SignedOut => ErrorKind::Authorization,
            ApiError::NotFound | ApiError::Rejected { .. } => ErrorKind::Validation,
            ApiError::Http(_)
            | ApiError::Server { .. }
            | ApiError::Decode(_)
            | ApiError::InvalidBaseUrl(_) => ErrorKind::Transport,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Http(_) | ApiError::Server { .. } => "transport_failed",
            ApiError::Unauthorized => "unauthorized",
            ApiError::SignedOut => "signed_out",
            ApiError::NotFound => "not_found",
            ApiError::Rejected { .. } => "rejected",
            ApiError::Decode(_) => "decode_failed",
            ApiError::InvalidBaseUrl(_) => "bad_config",
        }
    }
}

pub type UnauthorizedHook = Arc<dyn Fn() + Send + Sync>;

/// Credentials and the callback to run when the server rejects them.
#[derive(Clone)]
pub struct AuthSession {
    base_url: Url,
    token: Option<String>,
    on_unauthorized: Option<UnauthorizedHook>,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("base_url", &self.base_url.as_str())
            .field("signed_in", &self.token.is_some())
            .finish()
    }
}

impl AuthSession {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ApiError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ApiError::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(base_url.to_string()));
        }
        let token = token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        Ok(Self {
            base_url,
            token,
            on_unauthorized: None,
        })
    }

    pub fn with_unauthorized_hook(mut self, hook: UnauthorizedHook) -> Self {
        self.on_unauthorized = Some(hook);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn is_signed_in(&self) -> bool {
        self.token.is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Appends each segment as-is; a `/` inside one is escaped, not split.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segs) = url.path_segments_mut() {
            segs.pop_if_empty().extend(segments);
        }
        url
    }

    fn notify_unauthorized(&self) {
        if let Some(hook) = &self.on_unauthorized {
            hook();
        }
    }
}

/// The three verbs the list views need from the remote API. Paths are given
/// as segments below the base URL.
pub trait Transport {
    fn get(&self, path: &[&str], query: &[(String, String)]) -> Result<Value, ApiError>;
    fn patch(&self, path: &[&str], body: &Value) -> Result<Value, ApiError>;
    fn delete(&self, path: &[&str]) -> Result<(), ApiError>;
}

pub struct HttpTransport {
    client: reqwest::blocking::Client,
    session: AuthSession,
}

impl HttpTransport {
    pub fn new(session: AuthSession, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self { client, session })
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    fn token(&self) -> Result<&str, ApiError> {
        self.session.token().ok_or(ApiError::SignedOut)
    }

    fn send(&self, req: reqwest::blocking::RequestBuilder) -> Result<Value, ApiError> {
        let resp = req
            .bearer_auth(self.token()?)
            .header("Accept", "application/json")
            .send()?;
        let status = resp.status();

        if status == StatusCode::UNAUTHORIZED {
            log::warn!("API answered 401; ending session");
            self.session.notify_unauthorized();
            return Err(ApiError::Unauthorized);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound);
        }
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            let message = error_message(&text).unwrap_or(text);
            return Err(if status.is_client_error() {
                ApiError::Rejected {
                    status: status.as_u16(),
                    message,
                }
            } else {
                ApiError::Server {
                    status: status.as_u16(),
                    message,
                }
            });
        }

        let bytes = resp.bytes()?;
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Pulls `message` (or `error`) out of a JSON error body.
fn error_message(body: &str) -> Option<String> {
    let v: Value = serde_json::from_str(body).ok()?;
    v.get("message")
        .or_else(|| v.get("error"))
        .and_then(|m| m.as_str())
        .map(|s| s.to_string())
}

impl Transport for HttpTransport {
    fn get(&self, path: &[&str], query: &[(String, String)]) -> Result<Value, ApiError> {
        let mut url = self.session.endpoint(path);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        log::debug!("GET {}", url);
        self.send(self.client.get(url))
    }

    fn patch(&self, path: &[&str], body: &Value) -> Result<Value, ApiError> {
        let url = self.session.endpoint(path);
        log::debug!("PATCH {}", url);
        self.send(self.client.patch(url).json(body))
    }

    fn delete(&self, path: &[&str]) -> Result<(), ApiError> {
        let url = self.session.endpoint(path);
        log::debug!("DELETE {}", url);
        self.send(self.client.delete(url)).map(|_| ())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchedPage<E> {
    pub rows: Vec<E>,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub status: String,
    pub page: usize,
    pub page_size: usize,
    pub scope: BTreeMap<String, String>,
}

impl PageQuery {
    fn params(&self) -> Vec<(String, String)> {
        let mut out = vec![
            ("status".to_string(), self.status.clone()),
            ("page".to_string(), self.page.to_string()),
            ("limit".to_string(), self.page_size.to_string()),
        ];
        out.extend(
            self.scope
                .iter()
                .filter(|(_, v)| !v.trim().is_empty())
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        out
    }
}

fn entity_path<E: Entity>(id: &str) -> [&str; 2] {
    [E::FAMILY.path(), id]
}

/// Decodes a list body into rows, tolerating a missing or null array.
fn decode_rows<E: Entity>(body: &Value) -> Result<Vec<E>, ApiError> {
    let list = body
        .get(E::FAMILY.list_key())
        .or_else(|| body.get("items"))
        .cloned()
        .or_else(|| body.is_array().then(|| body.clone()))
        .unwrap_or(Value::Null);
    if list.is_null() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_value(list)?)
}

pub fn fetch_page<E: Entity>(
    transport: &dyn Transport,
    query: &PageQuery,
) -> Result<FetchedPage<E>, ApiError> {
    let body = transport.get(&[E::FAMILY.path()], &query.params())?;
    let rows: Vec<E> = decode_rows(&body)?;
    let total = body
        .get("total")
        .and_then(|v| v.as_u64())
        .map(|t| t as usize)
        .unwrap_or(rows.len())
        .max(rows.len());
    Ok(FetchedPage { rows, total })
}

pub fn fetch_one<E: Entity>(transport: &dyn Transport, id: &str) -> Result<E, ApiError> {
    let body = transport.get(&entity_path::<E>(id), &[])?;
    Ok(serde_json::from_value(body)?)
}

/// `PATCH /{E}/{id}/status`, returning the entity as the server now has it.
pub fn patch_status<E: Entity>(
    transport: &dyn Transport,
    id: &str,
    status: E::Status,
) -> Result<E, ApiError> {
    let path = [E::FAMILY.path(), id, "status"];
    let body = transport.patch(&path, &json!({ "status": status.as_str() }))?;
    Ok(serde_json::from_value(body)?)
}

pub fn patch<E: Entity>(
    transport: &dyn Transport,
    id: &str,
    partial: &serde_json::Map<String, Value>,
) -> Result<E, ApiError> {
    let body = transport.patch(&entity_path::<E>(id), &Value::Object(partial.clone()))?;
    Ok(serde_json::from_value(body)?)
}

pub fn delete<E: Entity>(transport: &dyn Transport, id: &str) -> Result<(), ApiError> {
    transport.delete(&entity_path::<E>(id))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupOption {
    pub id: String,
    pub label: String,
}

/// Options for a scope-select autocomplete: active rows of a family whose
/// label contains `query`.
pub fn lookup_options<E: Entity>(
    transport: &dyn Transport,
    query: &str,
    limit: usize,
) -> Result<Vec<LookupOption>, ApiError> {
    let active = E::Status::VALUES
        .first()
        .map(|s| s.as_str())
        .unwrap_or(crate::entity::STATUS_ALL);
    let page: FetchedPage<E> = fetch_page(
        transport,
        &PageQuery {
            status: active.to_string(),
            page: 0,
            page_size: limit,
            scope: BTreeMap::new(),
        },
    )?;
    let needle = query.trim().to_lowercase();
    Ok(page
        .rows
        .iter()
        .map(|row| LookupOption {
            id: row.id().to_string(),
            label: row.label(),
        })
        .filter(|opt| needle.is_empty() || opt.label.to_lowercase().contains(&needle))
        .collect())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Country {
    #[serde(alias = "isoCode")]
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct City {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub country_code: Option<String>,
}

fn decode_list<T: serde::de::DeserializeOwned>(body: Value, key: &str) -> Result<Vec<T>, ApiError> {
    let list = match body {
        Value::Object(mut map) => map.remove(key).unwrap_or(Value::Null),
        list @ Value::Array(_) => list,
        _ => Value::Null,
    };
    if list.is_null() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_value(list)?)
}

pub fn fetch_countries(transport: &dyn Transport) -> Result<Vec<Country>, ApiError> {
    let body = transport.get(&["locations", "countries"], &[])?;
    decode_list(body, "countries")
}

pub fn fetch_cities(transport: &dyn Transport, country_code: &str) -> Result<Vec<City>, ApiError> {
    let body = transport.get(
        &["locations", "cities"],
        &[("countryCode".to_string(), country_code.to_string())],
    )?;
    decode_list(body, "cities")
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Get(String, Vec<(String, String)>),
        Patch(String, Value),
        Delete(String),
    }

    /// Replays queued results in order and records every call.
    #[derive(Default)]
    pub struct FakeTransport {
        pub calls: RefCell<Vec<Call>>,
        replies: RefCell<VecDeque<Result<Value, ApiError>>>,
    }

    impl FakeTransport {
        pub fn reply(&self, v: Value) -> &Self {
            self.replies.borrow_mut().push_back(Ok(v));
            self
        }

        pub fn fail(&self, e: ApiError) -> &Self {
            self.replies.borrow_mut().push_back(Err(e));
            self
        }

        fn next(&self) -> Result<Value, ApiError> {
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or(Ok(Value::Null))
        }
    }

    impl Transport for FakeTransport {
        fn get(&self, path: &[&str], query: &[(String, String)]) -> Result<Value, ApiError> {
            self.calls
                .borrow_mut()
                .push(Call::Get(path.join("/"), query.to_vec()));
            self.next()
        }

        fn patch(&self, path: &[&str], body: &Value) -> Result<Value, ApiError> {
            self.calls
                .borrow_mut()
                .push(Call::Patch(path.join("/"), body.clone()));
            self.next()
        }

        fn delete(&self, path: &[&str]) -> Result<(), ApiError> {
            self.calls.borrow_mut().push(Call::Delete(path.join("/")));
            self.next().map(|_| ())
        }
    }
}

use std::borrow::Cow;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{Map, Value};

use toolgate_core::{Error, GatewayConfig};

pub const USER_AGENT: &str = concat!("toolgate/", env!("CARGO_PKG_VERSION"));

/// Build the single outbound client shared by every integration.
///
/// # Errors
///
/// Returns [`Error::Internal`] if the TLS backend cannot be initialised.
pub fn build_client(config: &GatewayConfig) -> Result<Client, Error> {
    Client::builder()
        .timeout(config.http_timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| Error::Internal(format!("failed to build HTTP client: {e}")))
}

/// Send a request and return its status and raw body.
pub(crate) async fn send_raw(request: RequestBuilder) -> Result<(StatusCode, String), Error> {
    let response = request.send().await.map_err(|e| Error::Http(e.to_string()))?;
    let status = response.status();
    let body = response.text().await.map_err(|e| Error::Http(e.to_string()))?;
    Ok((status, body))
}

/// Send a request and decode a JSON body. Non-2xx statuses become
/// [`Error::Upstream`]; an empty body decodes as `null`.
pub(crate) async fn send_json(service: &str, request: RequestBuilder) -> Result<Value, Error> {
    let (status, body) = send_raw(request).await?;
    if !status.is_success() {
        return Err(Error::upstream(service, upstream_message(status, &body)));
    }
    parse_body(service, &body)
}

pub(crate) fn parse_body(service: &str, body: &str) -> Result<Value, Error> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body)
        .map_err(|e| Error::upstream(service, format!("invalid JSON response: {e}")))
}

/// Pull the most useful message out of an error body.
///
/// Google nests it under `error.message`, GitHub uses `message`, Slack and
/// OAuth endpoints use a bare `error` string.
pub(crate) fn upstream_message(status: StatusCode, body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let message = parsed.as_ref().and_then(|v| {
        v.pointer("/error/message")
            .or_else(|| v.get("message"))
            .or_else(|| v.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });
    match message {
        Some(message) => format!("{status}: {message}"),
        None if body.trim().is_empty() => status.to_string(),
        None => format!("{status}: {}", body.trim()),
    }
}

/// Copy only the listed keys that are present in `source`.
pub(crate) fn pick(source: &Value, keys: &[&str]) -> Value {
    let mut out = Map::new();
    for key in keys {
        if let Some(value) = source.get(*key) {
            out.insert((*key).to_string(), value.clone());
        }
    }
    Value::Object(out)
}

/// Percent-encode one URL path segment.
pub(crate) fn segment(raw: &str) -> Cow<'_, str> {
    urlencoding::encode(raw)
}

/// Percent-encode a repository path, keeping `/` separators.
pub(crate) fn path_segments(raw: &str) -> String {
    raw.trim_matches('/')
        .split('/')
        .map(|part| urlencoding::encode(part).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

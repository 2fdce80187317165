//! Inbound request model.
//!
//! # Responsibilities
//! - Normalize the method to upper case and strip the query string from the path
//! - Lower-case header names so lookups are case-insensitive
//! - Decode the body once (JSON or form) while keeping the raw bytes
//! - Adapt an `http::Request` coming from the transport into a [`Request`]
//!
//! # Design Decisions
//! - A `Request` is immutable once built; there are no setters
//! - Missing data degrades to caller-supplied defaults, never to an error
//! - `files` and `server` are opaque maps the dispatch core never inspects

use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use axum::body::Bytes;
use axum::http::request::Parts;
use serde_json::{Map, Value};

/// Media type of JSON payloads.
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Media type of urlencoded form payloads.
pub const FORM_MEDIA_TYPE: &str = "application/x-www-form-urlencoded";

/// HTTP verb, normalized to upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    /// Any verb outside the well-known set, stored upper-cased.
    Other(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Other(verb) => verb,
        }
    }
}

impl FromStr for Method {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let verb = s.trim().to_ascii_uppercase();
        Ok(match verb.as_str() {
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "PATCH" => Method::Patch,
            "DELETE" => Method::Delete,
            "OPTIONS" => Method::Options,
            _ => Method::Other(verb),
        })
    }
}

impl From<&str> for Method {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(method) => method,
            Err(never) => match never {},
        }
    }
}

impl From<&axum::http::Method> for Method {
    fn from(method: &axum::http::Method) -> Self {
        Method::from(method.as_str())
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable snapshot of an inbound request.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query: Map<String, Value>,
    body: Map<String, Value>,
    headers: HashMap<String, String>,
    raw_body: Bytes,
    files: Map<String, Value>,
    server: Map<String, Value>,
}

impl Request {
    /// Start building a request. Defaults to `GET /`.
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    /// Adapt a transport-level request whose body has already been read.
    ///
    /// Header values that are not valid UTF-8 are dropped. Repeated headers
    /// are joined with `", "`.
    pub fn from_http(parts: &Parts, body: Bytes, remote_addr: Option<SocketAddr>) -> Self {
        let mut builder = Request::builder()
            .method(&parts.method)
            .path(parts.uri.path())
            .raw_body(body);

        if let Some(query) = parts.uri.query() {
            builder = builder.query_map(decode_form(query.as_bytes()));
        }

        let mut headers: Vec<(String, String)> = Vec::with_capacity(parts.headers.len());
        for (name, value) in parts.headers.iter() {
            let Ok(value) = std::str::from_utf8(value.as_bytes()) else {
                tracing::debug!(header = %name, "Dropping non UTF-8 header value");
                continue;
            };
            match headers.iter_mut().find(|(existing, _)| existing == name.as_str()) {
                Some((_, joined)) => {
                    joined.push_str(", ");
                    joined.push_str(value);
                }
                None => headers.push((name.as_str().to_string(), value.to_string())),
            }
        }
        for (name, value) in headers {
            builder = builder.header(name, value);
        }

        if let Some(addr) = remote_addr {
            builder = builder.server_var("REMOTE_ADDR", addr.ip().to_string());
            builder = builder.server_var("REMOTE_PORT", addr.port());
        }
        if let Some(request_id) = parts.headers.get("x-request-id").and_then(|v| v.to_str().ok()) {
            builder = builder.server_var("REQUEST_ID", request_id);
        }

        builder
            .server_var("REQUEST_URI", parts.uri.to_string())
            .server_var("SERVER_PROTOCOL", format!("{:?}", parts.version))
            .build()
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_params(&self) -> &Map<String, Value> {
        &self.query
    }

    pub fn body_data(&self) -> &Map<String, Value> {
        &self.body
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn raw_body(&self) -> &Bytes {
        &self.raw_body
    }

    pub fn files(&self) -> &Map<String, Value> {
        &self.files
    }

    pub fn server(&self) -> &Map<String, Value> {
        &self.server
    }

    /// Query-string parameter, if present.
    pub fn query(&self, key: &str) -> Option<&Value> {
        self.query.get(key)
    }

    /// Query-string parameter, or `default` when unset.
    pub fn query_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.query.get(key).cloned().unwrap_or_else(|| default.into())
    }

    /// Decoded body field, if present.
    pub fn input(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    /// Decoded body field, or `default` when unset.
    pub fn input_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.body.get(key).cloned().unwrap_or_else(|| default.into())
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Case-insensitive header lookup falling back to `default`.
    pub fn header_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.header(name).unwrap_or(default)
    }

    /// The `Content-Type` header, or an empty string.
    pub fn content_type(&self) -> &str {
        self.header_or("content-type", "")
    }

    /// True when the body is declared as JSON.
    pub fn is_json(&self) -> bool {
        self.content_type().contains(JSON_MEDIA_TYPE)
    }

    /// True when the client accepts JSON (explicitly or via `*/*`).
    pub fn expects_json(&self) -> bool {
        let accept = self.header_or("accept", "");
        accept.contains(JSON_MEDIA_TYPE) || accept.contains("*/*")
    }

    /// The raw body as text, when it is valid UTF-8.
    pub fn raw_body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.raw_body).ok()
    }
}

/// Builder for [`Request`]. Header names are lower-cased on insert.
#[derive(Debug, Default)]
pub struct RequestBuilder {
    method: Option<Method>,
    path: Option<String>,
    query: Map<String, Value>,
    body: Option<Map<String, Value>>,
    headers: HashMap<String, String>,
    raw_body: Bytes,
    files: Map<String, Value>,
    server: Map<String, Value>,
}

impl RequestBuilder {
    pub fn method(mut self, method: impl Into<Method>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Set the URI path. A trailing query string is stripped and its
    /// parameters are added to the query map unless already set.
    pub fn path(mut self, uri: &str) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (uri, None),
        };
        if let Some(query) = query {
            for (key, value) in decode_form(query.as_bytes()) {
                self.query.entry(key).or_insert(value);
            }
        }
        self.path = Some(if path.is_empty() { "/".to_string() } else { path.to_string() });
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn query_map(mut self, query: Map<String, Value>) -> Self {
        self.query.extend(query);
        self
    }

    /// Provide already-decoded body data. Skips body decoding in `build`.
    pub fn body(mut self, body: Map<String, Value>) -> Self {
        self.body = Some(body);
        self
    }

    pub fn input(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.body
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn raw_body(mut self, raw: impl Into<Bytes>) -> Self {
        self.raw_body = raw.into();
        self
    }

    /// Set a JSON body: both the raw bytes and the JSON content type.
    pub fn json(self, payload: &Value) -> Self {
        let raw = payload.to_string();
        self.header("content-type", JSON_MEDIA_TYPE).raw_body(raw)
    }

    pub fn file(mut self, key: impl Into<String>, meta: impl Into<Value>) -> Self {
        self.files.insert(key.into(), meta.into());
        self
    }

    pub fn server_var(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.server.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Request {
        let body = match self.body {
            Some(body) => body,
            None => {
                let content_type = self
                    .headers
                    .get("content-type")
                    .map(String::as_str)
                    .unwrap_or("");
                decode_body(content_type, &self.raw_body)
            }
        };

        Request {
            method: self.method.unwrap_or(Method::Get),
            path: self.path.unwrap_or_else(|| "/".to_string()),
            query: self.query,
            body,
            headers: self.headers,
            raw_body: self.raw_body,
            files: self.files,
            server: self.server,
        }
    }
}

/// Decode a raw body according to its declared content type.
///
/// Only JSON objects and urlencoded forms yield fields; anything else
/// leaves the body map empty and is reachable through `raw_body`.
fn decode_body(content_type: &str, raw: &[u8]) -> Map<String, Value> {
    if raw.is_empty() {
        return Map::new();
    }

    let content_type = content_type.to_ascii_lowercase();
    if content_type.contains(JSON_MEDIA_TYPE) {
        match serde_json::from_slice::<Value>(raw) {
            Ok(Value::Object(fields)) => fields,
            Ok(_) => Map::new(),
            Err(e) => {
                tracing::debug!(error = %e, "Request body is not valid JSON");
                Map::new()
            }
        }
    } else if content_type.contains(FORM_MEDIA_TYPE) {
        decode_form(raw)
    } else {
        Map::new()
    }
}

/// Decode `a=1&b=2` pairs. Repeated keys keep the last value.
fn decode_form(input: &[u8]) -> Map<String, Value> {
    url::form_urlencoded::parse(input)
        .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
        .collect()
}

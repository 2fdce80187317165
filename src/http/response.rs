//! Outbound response model.
//!
//! # Responsibilities
//! - Collect status, headers, content and content type through fluent setters
//! - Keep the `Content-Type` header in sync with the declared content type
//! - Serialize content for its content type (JSON, XML, text)
//! - Emit the finished response exactly once, to the transport or a writer
//!
//! # Design Decisions
//! - `Value::Null` content means "no body" for every content type
//! - Structured content under a type that cannot express it falls back to JSON
//! - Finalizing consumes the `Response`, so a second emission cannot compile
//! - Header names compare case-insensitively; last write wins per name

use std::fmt;
use std::io::Write;

use axum::body::{Body, Bytes};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use serde_json::Value;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::http::xml::{self, XmlError};

/// Value of the identifying marker header stamped on every response.
pub const POWERED_BY: &str = concat!("api-dispatch/", env!("CARGO_PKG_VERSION"));

pub const CONTENT_TYPE: &str = "Content-Type";
pub const X_POWERED_BY: &str = "X-Powered-By";

/// Declared content type of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentType {
    Json,
    Xml,
    PlainText,
    Html,
    /// Caller-supplied media type.
    Custom(String),
}

impl ContentType {
    pub fn mime(&self) -> &str {
        match self {
            ContentType::Json => "application/json",
            ContentType::Xml => "application/xml",
            ContentType::PlainText => "text/plain",
            ContentType::Html => "text/html",
            ContentType::Custom(mime) => mime,
        }
    }

    /// Map a media type string onto the closed set, keeping unknown ones as-is.
    pub fn parse(mime: &str) -> Self {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "application/json" => ContentType::Json,
            "application/xml" | "text/xml" => ContentType::Xml,
            "text/plain" => ContentType::PlainText,
            "text/html" => ContentType::Html,
            _ => ContentType::Custom(mime.to_string()),
        }
    }
}

impl From<&str> for ContentType {
    fn from(mime: &str) -> Self {
        ContentType::parse(mime)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Xml(#[from] XmlError),
    #[error("failed to write response: {0}")]
    Io(#[from] std::io::Error),
}

/// Response under construction.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: Vec<(String, String)>,
    content: Value,
    content_type: ContentType,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    /// Empty `200` JSON response carrying the seeded headers.
    pub fn new() -> Self {
        let content_type = ContentType::Json;
        Self {
            status: StatusCode::OK,
            headers: vec![
                (CONTENT_TYPE.to_string(), content_type.mime().to_string()),
                (X_POWERED_BY.to_string(), POWERED_BY.to_string()),
            ],
            content: Value::Null,
            content_type,
        }
    }

    /// JSON response with the given content and status.
    pub fn json(content: Value, status: StatusCode) -> Self {
        let mut response = Self::new();
        response.set_content(content).set_status_code(status);
        response
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn content(&self) -> &Value {
        &self.content
    }

    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn set_status_code(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name, value)),
        }
        self
    }

    pub fn set_headers<I, K, V>(&mut self, headers: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in headers {
            self.set_header(name, value);
        }
        self
    }

    pub fn set_content(&mut self, content: Value) -> &mut Self {
        self.content = content;
        self
    }

    /// Change the content type and rewrite the `Content-Type` header.
    pub fn set_content_type(&mut self, content_type: impl Into<ContentType>) -> &mut Self {
        self.content_type = content_type.into();
        let mime = self.content_type.mime().to_string();
        self.set_header(CONTENT_TYPE, mime)
    }

    /// Attach the four cross-origin headers.
    pub fn with_cors(&mut self, origin: &str, methods: &str, headers: &str, max_age: u64) -> &mut Self {
        self.set_header("Access-Control-Allow-Origin", origin)
            .set_header("Access-Control-Allow-Methods", methods)
            .set_header("Access-Control-Allow-Headers", headers)
            .set_header("Access-Control-Max-Age", max_age.to_string())
    }

    /// Allow caching for `ttl_secs` seconds.
    pub fn with_caching(&mut self, ttl_secs: u64) -> &mut Self {
        let ttl = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
        let expires = OffsetDateTime::now_utc()
            .checked_add(time::Duration::seconds(ttl))
            .unwrap_or(OffsetDateTime::now_utc());
        self.set_header("Cache-Control", format!("public, max-age={ttl_secs}"))
            .set_header("Expires", http_date(expires))
    }

    /// Forbid caching.
    pub fn without_caching(&mut self) -> &mut Self {
        self.set_header("Cache-Control", "no-store, no-cache, must-revalidate")
            .set_header("Pragma", "no-cache")
            .set_header("Expires", "0")
    }

    /// Serialize the content for the declared content type.
    pub fn output(&self) -> Result<Bytes, ResponseError> {
        if self.content.is_null() {
            return Ok(Bytes::new());
        }

        let structured = self.content.is_object() || self.content.is_array();
        let body = match &self.content_type {
            ContentType::Json => serde_json::to_vec(&self.content)?,
            ContentType::Xml => xml::encode(&self.content)?,
            ContentType::PlainText | ContentType::Html | ContentType::Custom(_) if !structured => {
                scalar_text(&self.content).into_bytes()
            }
            ContentType::PlainText | ContentType::Html | ContentType::Custom(_) => {
                serde_json::to_vec(&self.content)?
            }
        };
        Ok(Bytes::from(body))
    }

    /// Serialize once and freeze the response for the transport.
    pub fn finalize(self) -> Result<FinalizedResponse, ResponseError> {
        let body = self.output()?;
        Ok(FinalizedResponse {
            status: self.status,
            headers: self.headers,
            body,
        })
    }

    /// Write the status line, every header and the body to `out`.
    pub fn send<W: Write>(self, out: &mut W) -> Result<(), ResponseError> {
        self.finalize()?.write_to(out)
    }
}

/// A serialized response, ready for the transport.
#[derive(Debug, Clone)]
pub struct FinalizedResponse {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl FinalizedResponse {
    /// Emit as HTTP/1.1 wire format.
    ///
    /// `Content-Length` is added unless the status forbids a body (1xx, 204)
    /// or the header was already set.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<(), ResponseError> {
        write!(
            out,
            "HTTP/1.1 {} {}\r\n",
            self.status.as_u16(),
            self.status.canonical_reason().unwrap_or("Unknown")
        )?;
        for (name, value) in &self.headers {
            write!(out, "{name}: {value}\r\n")?;
        }
        if self.needs_content_length() {
            write!(out, "Content-Length: {}\r\n", self.body.len())?;
        }
        out.write_all(b"\r\n")?;
        out.write_all(&self.body)?;
        out.flush()?;
        Ok(())
    }

    fn needs_content_length(&self) -> bool {
        let bodiless = self.status.is_informational() || self.status == StatusCode::NO_CONTENT;
        !bodiless
            && !self
                .headers
                .iter()
                .any(|(name, _)| name.eq_ignore_ascii_case("content-length"))
    }
}

impl IntoResponse for FinalizedResponse {
    fn into_response(self) -> axum::response::Response {
        let mut response = axum::response::Response::new(Body::from(self.body));
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        for (name, value) in self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_bytes(value.as_bytes()),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => tracing::warn!(header = %name, "Skipping invalid response header"),
            }
        }
        response
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn http_date(at: OffsetDateTime) -> String {
    let format = format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    );
    at.format(&format).unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let response = Response::new();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.content_type(), &ContentType::Json);
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(response.header("X-Powered-By"), Some(POWERED_BY));
        assert!(response.output().unwrap().is_empty());
    }

    #[test]
    fn test_set_content_type_rewrites_header() {
        let mut response = Response::new();
        response.set_content_type(ContentType::Xml);
        assert_eq!(response.header("Content-Type"), Some("application/xml"));

        response.set_content_type("text/csv");
        assert_eq!(response.content_type(), &ContentType::Custom("text/csv".into()));
        assert_eq!(response.header("Content-Type"), Some("text/csv"));
        assert_eq!(
            response.headers().iter().filter(|(n, _)| n == CONTENT_TYPE).count(),
            1
        );
    }

    #[test]
    fn test_last_header_write_wins() {
        let mut response = Response::new();
        response
            .set_header("X-Trace", "one")
            .set_header("x-trace", "two")
            .set_headers([("X-Other", "a"), ("X-TRACE", "three")]);

        assert_eq!(response.header("X-Trace"), Some("three"));
        assert_eq!(response.headers().len(), 4);
    }

    #[test]
    fn test_json_round_trip() {
        let response = Response::json(json!({"a": 1}), StatusCode::OK);
        let bytes = response.output().unwrap();
        let decoded: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(decoded, json!({"a": 1}));
    }

    #[test]
    fn test_null_content_is_empty_for_every_type() {
        for content_type in [ContentType::Json, ContentType::Xml, ContentType::PlainText] {
            let mut response = Response::new();
            response.set_content_type(content_type);
            assert!(response.output().unwrap().is_empty());
        }
    }

    #[test]
    fn test_plain_text_and_fallback() {
        let mut text = Response::new();
        text.set_content_type(ContentType::PlainText)
            .set_content(json!("hello"));
        assert_eq!(text.output().unwrap(), Bytes::from("hello"));

        let mut custom = Response::new();
        custom
            .set_content_type("application/vnd.custom")
            .set_content(json!({"k": [1]}));
        assert_eq!(custom.output().unwrap(), Bytes::from(r#"{"k":[1]}"#));
    }

    #[test]
    fn test_xml_output() {
        let mut response = Response::new();
        response
            .set_content_type(ContentType::Xml)
            .set_content(json!({"id": 7}));
        let body = response.output().unwrap();

        assert!(String::from_utf8_lossy(&body).contains("<response><id>7</id></response>"));
    }

    #[test]
    fn test_cors_and_caching_headers() {
        let mut response = Response::new();
        response.with_cors("*", "GET, POST", "Content-Type", 600);
        assert_eq!(response.header("Access-Control-Allow-Origin"), Some("*"));
        assert_eq!(response.header("Access-Control-Allow-Methods"), Some("GET, POST"));
        assert_eq!(response.header("Access-Control-Allow-Headers"), Some("Content-Type"));
        assert_eq!(response.header("Access-Control-Max-Age"), Some("600"));

        response.with_caching(60);
        assert_eq!(response.header("Cache-Control"), Some("public, max-age=60"));
        assert!(response.header("Expires").unwrap().ends_with(" GMT"));

        response.without_caching();
        assert_eq!(
            response.header("Cache-Control"),
            Some("no-store, no-cache, must-revalidate")
        );
        assert_eq!(response.header("Pragma"), Some("no-cache"));
        assert_eq!(response.header("Expires"), Some("0"));
    }

    #[test]
    fn test_send_writes_status_headers_then_body() {
        let response = Response::json(json!({"ok": true}), StatusCode::CREATED);
        let mut out = Vec::new();
        response.send(&mut out).unwrap();
        let wire = String::from_utf8(out).unwrap();

        assert!(wire.starts_with("HTTP/1.1 201 Created\r\n"));
        assert!(wire.contains("Content-Type: application/json\r\n"));
        assert!(wire.ends_with("\r\n\r\n{\"ok\":true}"));
    }

    #[test]
    fn test_no_content_has_no_content_length() {
        let response = Response::json(Value::Null, StatusCode::NO_CONTENT);
        let mut out = Vec::new();
        response.send(&mut out).unwrap();
        let wire = String::from_utf8(out).unwrap();

        assert!(wire.starts_with("HTTP/1.1 204 No Content\r\n"));
        assert!(!wire.to_ascii_lowercase().contains("content-length"));
        assert!(wire.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_preset_content_length_written_once() {
        let mut response = Response::json(json!({"ok": true}), StatusCode::OK);
        response.set_header("content-length", "11");
        let mut out = Vec::new();
        response.send(&mut out).unwrap();
        let wire = String::from_utf8(out).unwrap().to_ascii_lowercase();

        assert_eq!(wire.matches("content-length").count(), 1);
        assert!(wire.contains("content-length: 11\r\n"));
        assert!(wire.ends_with("\r\n\r\n{\"ok\":true}"));
    }

    #[test]
    fn test_into_axum_response() {
        let finalized = Response::json(json!([1, 2]), StatusCode::ACCEPTED)
            .finalize()
            .unwrap();
        let response = finalized.into_response();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
    }
}

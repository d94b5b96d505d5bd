use crate::error::ResponseError;
use http::header::{HeaderName, IntoHeaderName, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, StatusCode};
use serde_json::Value;
use tracing::warn;

/// Status, headers and body handed back to the transport.
///
/// The body is written as raw text only when the content type is `text/*`; every other
/// response, including a JSON string under `application/json`, is serialized as JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    /// HTTP status code (200, 404, 500, etc.)
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Value,
}

impl HandlerResponse {
    #[must_use]
    pub fn new(status: u16, headers: HeaderMap, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// JSON response with `content-type: application/json`.
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self::new(status, headers, body)
    }

    /// Plain-text response.
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        Self::new(status, headers, Value::String(body.into()))
    }

    /// `{"error": message}`
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "error": message }))
    }

    /// Merge caller headers over the defaults. Repeated caller values are kept.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        let mut last: Option<HeaderName> = None;
        for (name, value) in headers {
            match name {
                Some(name) => {
                    self.headers.insert(name.clone(), value);
                    last = Some(name);
                }
                None => {
                    if let Some(name) = &last {
                        self.headers.append(name, value);
                    }
                }
            }
        }
        self
    }

    /// Add or replace a header. Values that are not valid header text are dropped.
    pub fn set_header<K: IntoHeaderName>(&mut self, name: K, value: &str) {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers.insert(name, value);
            }
            Err(e) => warn!(error = %e, "Dropping invalid response header value"),
        }
    }

    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.get_header(CONTENT_TYPE.as_str())
    }

    /// Status as an `http::StatusCode`; out-of-range codes become 500.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Whether the body goes on the wire as raw text rather than JSON.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.content_type()
            .is_some_and(|ct| ct.trim_start().to_ascii_lowercase().starts_with("text/"))
    }

    /// Serialized body bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ResponseError::Serialize`] if the body cannot be encoded as JSON.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ResponseError> {
        match &self.body {
            Value::String(s) if self.is_text() => Ok(s.clone().into_bytes()),
            other => Ok(serde_json::to_vec(other)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_and_text_content_types() {
        assert_eq!(
            HandlerResponse::json(200, json!({})).content_type(),
            Some("application/json")
        );
        let text = HandlerResponse::text(200, "ok");
        assert_eq!(text.content_type(), Some("text/plain; charset=utf-8"));
        assert_eq!(text.to_bytes().unwrap(), b"ok");
    }

    #[test]
    fn test_json_string_body_stays_valid_json() {
        let resp = HandlerResponse::json(200, json!("active"));
        assert!(!resp.is_text());
        let bytes = resp.to_bytes().unwrap();
        assert_eq!(bytes, br#""active""#.to_vec());
        assert_eq!(serde_json::from_slice::<Value>(&bytes).unwrap(), json!("active"));

        let bare = HandlerResponse::new(200, HeaderMap::new(), json!("x"));
        assert_eq!(bare.to_bytes().unwrap(), br#""x""#.to_vec());
    }

    #[test]
    fn test_caller_headers_override_defaults() {
        let mut extra = HeaderMap::new();
        extra.insert(CONTENT_TYPE, HeaderValue::from_static("application/vnd.x+json"));
        extra.append("x-tag", HeaderValue::from_static("a"));
        extra.append("x-tag", HeaderValue::from_static("b"));
        let resp = HandlerResponse::json(201, json!([1])).with_headers(extra);
        assert_eq!(resp.content_type(), Some("application/vnd.x+json"));
        assert_eq!(resp.headers.get_all("x-tag").iter().count(), 2);
    }

    #[test]
    fn test_invalid_header_value_is_dropped() {
        let mut resp = HandlerResponse::error(404, "nope");
        resp.set_header("x-bad", "line\nbreak");
        assert!(resp.get_header("x-bad").is_none());
        assert_eq!(resp.body, json!({"error": "nope"}));
    }

    #[test]
    fn test_out_of_range_status() {
        assert_eq!(
            HandlerResponse::json(42, Value::Null).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

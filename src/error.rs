//! Error taxonomy.
//!
//! Source absence is not an error and never appears here; see
//! [`SlotOutcome::Absent`](crate::binder::SlotOutcome::Absent).

use crate::binder::RequestId;
use crate::envelope::HandlerResponse;
use crate::signature::Slot;
use serde::Serialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use thiserror::Error;

/// One schema violation: JSON pointer into the bound document plus a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub path: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Binding failure surfaced to the caller.
#[derive(Debug, Error)]
pub enum BindError {
    /// A present, non-empty source was rejected by its resolved schema.
    #[error("{slot} payload failed {schema} validation: {}", summarize(.issues))]
    Validation {
        slot: Slot,
        schema: &'static str,
        issues: Vec<FieldIssue>,
    },

    /// The schema document itself does not compile. A programming error.
    #[error("schema {schema} does not compile: {message}")]
    SchemaCompile {
        schema: &'static str,
        message: String,
    },
}

fn summarize(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|i| {
            if i.path.is_empty() {
                i.message.clone()
            } else {
                format!("{}: {}", i.path, i.message)
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

impl BindError {
    pub(crate) fn validation(slot: Slot, schema: &'static str, issues: Vec<FieldIssue>) -> Self {
        Self::Validation {
            slot,
            schema,
            issues,
        }
    }

    /// Source tag of a validation failure.
    #[must_use]
    pub fn slot(&self) -> Option<Slot> {
        match self {
            Self::Validation { slot, .. } => Some(*slot),
            Self::SchemaCompile { .. } => None,
        }
    }

    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    #[must_use]
    pub fn issues(&self) -> &[FieldIssue] {
        match self {
            Self::Validation { issues, .. } => issues,
            Self::SchemaCompile { .. } => &[],
        }
    }

    /// 400 for client data, 500 for a broken schema.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::SchemaCompile { .. } => 500,
        }
    }

    /// Problem document (RFC 7807 shape) describing the failure.
    #[must_use]
    pub fn to_problem(&self) -> Value {
        match self {
            Self::Validation {
                slot,
                schema,
                issues,
            } => json!({
                "type": "about:blank",
                "title": "Validation Error",
                "status": 400,
                "detail": format!("{slot} payload does not match {schema}"),
                "source": slot.source_tag(),
                "errors": issues,
            }),
            Self::SchemaCompile { .. } => json!({
                "type": "about:blank",
                "title": "Internal Server Error",
                "status": 500,
                "detail": "payload schema is misconfigured",
            }),
        }
    }

    /// Response a transport can send as-is.
    #[must_use]
    pub fn to_response(&self) -> HandlerResponse {
        let mut response = HandlerResponse::json(self.status(), self.to_problem());
        response.set_header(http::header::CONTENT_TYPE, "application/problem+json");
        response
    }

    /// Like [`to_response`](Self::to_response), with the problem document tagged with the
    /// id of the request that failed so clients can quote it.
    ///
    /// # Arguments
    ///
    /// * `request_id` - Id the dispatcher logged the failure under
    #[must_use]
    pub fn to_response_for(&self, request_id: RequestId) -> HandlerResponse {
        let mut response = self.to_response();
        if let Value::Object(doc) = &mut response.body {
            doc.insert("request_id".to_string(), json!(request_id));
        }
        response
    }
}

/// Rendering a response body failed.
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("response body is not serializable: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The envelope's data field cannot share a name with `code` or `msg`.
    #[error("`{0}` is reserved by the envelope and cannot name the data field")]
    ReservedDataField(String),
}

/// Loading or validating [`Settings`](crate::config::Settings) failed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid value for {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

//! # brrtbind
//!
//! **brrtbind** is the request/response binding layer that sits between an HTTP transport and
//! application handlers. Given an already-parsed request and the payload shapes a handler
//! declares, it locates, normalizes, validates and injects typed payloads from the JSON body,
//! the form body and the query string, and wraps handler results into a uniform response
//! envelope.
//!
//! ## Architecture
//!
//! - **[`descriptor`]** - Enumerations carrying both a wire value and a human description
//! - **[`schema`]** - The [`Schema`] trait, type-erased [`SchemaRef`] handles and the compiled
//!   validator cache
//! - **[`signature`]** - Handler signatures declared at registration time and the resolver that
//!   turns them into a [`HandlerDescriptor`]
//! - **[`normalize`]** - Multi-valued form/query maps and the single-value collapse rule
//! - **[`binder`]** - Instantiation, validation and injection of bound payloads
//! - **[`envelope`]** - Plain and templated (`data`/`code`/`msg`) response rendering
//! - **[`registry`]** - Per-route descriptor cache
//! - **[`dispatcher`]** - Glue that binds a request and invokes the registered handler
//! - **[`config`]** / **[`logging`]** - Service settings and tracing setup
//!
//! ### Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Transport
//!     participant Dispatcher
//!     participant Registry
//!     participant Binder
//!     participant Handler
//!     participant Envelope
//!
//!     Transport->>Dispatcher: dispatch(route, RawRequestPayloads)
//!     Dispatcher->>Registry: get_or_resolve(route)
//!     Registry-->>Dispatcher: Arc<HandlerDescriptor>
//!     Dispatcher->>Binder: bind(raw, descriptor)
//!     Binder->>Binder: json body / normalized form / normalized query
//!     alt Validation Failed
//!         Binder-->>Transport: 400 problem document (source: json|form|query)
//!     end
//!     Binder-->>Dispatcher: BoundPayloads
//!     Dispatcher->>Handler: RequestContext with injected payloads
//!     Handler->>Envelope: result.resp(status, headers)
//!     Envelope-->>Transport: HandlerResponse
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use brrtbind::prelude::*;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Serialize, Deserialize, Schema)]
//! struct UserInfoModel {
//!     user_id: i64,
//! }
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.register(
//!     HandlerSignature::new("user_info").json::<UserInfoModel>(),
//!     |ctx: &RequestContext| {
//!         let user = ctx.arg::<UserInfoModel>("json_data");
//!         Ok(HandlerResponse::json(200, serde_json::json!({ "seen": user.map(|u| u.user_id) })))
//!     },
//! );
//!
//! let raw = RawRequestPayloads::new().with_body(r#"{"user_id": 5}"#);
//! let response = dispatcher.dispatch("user_info", raw);
//! assert_eq!(response.status, 200);
//! assert_eq!(response.body["seen"], 5);
//! ```

// Lets `#[derive(Schema)]` expand to `::brrtbind::...` paths inside this crate too.
extern crate self as brrtbind;

pub mod binder;
pub mod config;
pub mod descriptor;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod logging;
pub mod normalize;
pub mod registry;
pub mod schema;
pub mod signature;

pub use binder::{
    Binder, BoundPayload, BoundPayloads, RawRequestPayloads, RequestContext, RequestId,
    SlotOutcome,
};
pub use brrtbind_macros::Schema;
pub use config::{RunMode, RuntimeConfig, Settings};
pub use descriptor::{DescribedEnum, EnumField};
pub use dispatcher::Dispatcher;
pub use envelope::{HandlerResponse, HasEnvelope, PlainResponse, TemplateRecord};
pub use error::{BindError, ConfigError, FieldIssue, ResponseError};
pub use logging::{init_logging, LogConfig, LoggingGuard};
pub use normalize::{normalize, MultiMap};
pub use registry::BindingRegistry;
pub use schema::{Schema, SchemaRef, ValidatorCache};
pub use signature::{
    resolve, BindTarget, HandlerDescriptor, HandlerSignature, ParamType, RequestType, Slot,
    SlotBinding,
};

/// Everything a handler module usually needs.
pub mod prelude {
    pub use crate::binder::{RawRequestPayloads, RequestContext};
    pub use crate::dispatcher::Dispatcher;
    pub use crate::envelope::{HandlerResponse, HasEnvelope, PlainResponse, TemplateRecord};
    pub use crate::normalize::MultiMap;
    pub use crate::schema::Schema;
    pub use crate::signature::{HandlerSignature, ParamType, RequestType, Slot};
    pub use brrtbind_macros::Schema;
}

#[doc(hidden)]
pub mod __private {
    pub use serde;
    pub use serde_json;
}

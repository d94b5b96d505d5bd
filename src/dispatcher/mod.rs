//! # Dispatcher Module
//!
//! Registers handlers together with their signatures and runs one request end to end:
//! descriptor lookup, binding, injection, invocation.
//!
//! ## Handler Registration
//!
//! ```rust
//! use brrtbind::prelude::*;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, Schema)]
//! struct Search {
//!     tag: Vec<String>,
//! }
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.register(HandlerSignature::new("search").query::<Search>(), |ctx: &RequestContext| {
//!     let tags = ctx.arg::<Search>("query_data").map(|s| s.tag.len()).unwrap_or(0);
//!     Ok(HandlerResponse::json(200, serde_json::json!({ "tags": tags })))
//! });
//!
//! let raw = RawRequestPayloads::new().with_query_string("tag=a&tag=b");
//! assert_eq!(dispatcher.dispatch("search", raw).body["tags"], 2);
//! ```
//!
//! ## Request Flow
//!
//! 1. Look up the handler by route id; unknown routes answer 404
//! 2. Fetch the route's descriptor, resolving it on first dispatch
//! 3. Bind json, form and query payloads
//! 4. Inject them into a fresh [`RequestContext`](crate::binder::RequestContext)
//! 5. Invoke the handler and return its response
//!
//! ## Error Handling
//!
//! - Missing handlers return 404 responses
//! - Validation failures return a 400 problem document tagged with the failing source
//! - Handler errors and panics are caught and return 500 responses
//!
//! Every dispatcher answers the built-in `ping` route with `ok`.

mod core;

pub use self::core::{Dispatcher, HandlerFn, PING_ROUTE};

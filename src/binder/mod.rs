//! # Binder Module
//!
//! Turns raw request sources into validated, typed payloads and injects them into the
//! handler's [`RequestContext`].
//!
//! ## Sources
//!
//! | Slot | Source | Absent when |
//! |------|--------|-------------|
//! | json | request body | empty, undecodable, or an empty/false document |
//! | form | form multimap | no keys |
//! | query | query multimap | no keys |
//!
//! Form and query maps are normalized against the slot's schema first (see
//! [`crate::normalize`]).
//!
//! ## Instantiation
//!
//! A present source goes through three steps:
//!
//! 1. **Lax coercion** - textual scalars are converted to the declared integer, number or
//!    boolean type ([`coerce_lax`]). Disable with `BRRTBIND_LAX_COERCION=off`.
//! 2. **Validation** - the compiled JSON Schema reports every violation with its path.
//! 3. **Deserialization** - serde builds the typed instance.
//!
//! A failure in step 2 or 3 yields [`SlotOutcome::Invalid`] tagged with the source; it is
//! never folded into [`SlotOutcome::Absent`].
//!
//! ## Example
//!
//! ```rust
//! use brrtbind::binder::{Binder, RawRequestPayloads, RequestContext};
//! use brrtbind::signature::{resolve, HandlerSignature};
//! use brrtbind::Schema;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize, Schema)]
//! struct UserInfoModel {
//!     user_id: i64,
//! }
//!
//! let descriptor = resolve(&HandlerSignature::new("user_info").query::<UserInfoModel>());
//! let raw = RawRequestPayloads::new().with_query_string("?user_id=5");
//!
//! let bound = Binder::new().bind(&raw, &descriptor).unwrap();
//! let mut ctx = RequestContext::new("user_info", raw);
//! bound.inject_into(&mut ctx);
//!
//! assert_eq!(ctx.arg::<UserInfoModel>("query_data"), Some(&UserInfoModel { user_id: 5 }));
//! ```

mod coerce;
mod context;
mod core;

pub use self::coerce::coerce_lax;
pub use self::context::{RequestContext, RequestId};
pub use self::core::*;

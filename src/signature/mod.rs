//! # Signature Module
//!
//! Handlers declare the payload shapes they expect once, at registration time, and the
//! resolver turns that declaration into a [`HandlerDescriptor`] the binder consults on
//! every request.
//!
//! ## Slots
//!
//! There are three conventional payload channels, each with a fixed parameter name:
//!
//! | Slot | Parameter | Source |
//! |------|-----------|--------|
//! | [`Slot::Json`] | `json_data` | decoded request body |
//! | [`Slot::Form`] | `form_data` | form body multimap |
//! | [`Slot::Query`] | `query_data` | query string multimap |
//!
//! ## Resolution
//!
//! Each slot is resolved independently:
//!
//! 1. If the handler declares a parameter with the slot's name and a schema type, the payload
//!    is injected as that argument.
//! 2. Otherwise, if the handler declares a `request` parameter of a composite request type,
//!    and that type declares a schema field with the slot's name, the payload is set as a
//!    request attribute.
//! 3. Otherwise the slot is unresolved and its source is never bound.
//!
//! ```rust
//! use brrtbind::signature::{resolve, BindTarget, HandlerSignature, RequestType, Slot};
//! use brrtbind::Schema;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, Schema)]
//! struct Login {
//!     user: String,
//! }
//!
//! #[derive(Serialize, Deserialize, Schema)]
//! struct Paging {
//!     page: u32,
//! }
//!
//! let sig = HandlerSignature::new("login")
//!     .json::<Login>()
//!     .request(RequestType::composite("PagedRequest").query::<Paging>());
//! let descriptor = resolve(&sig);
//!
//! assert_eq!(descriptor.binding(Slot::Json).unwrap().target, BindTarget::Argument);
//! assert_eq!(descriptor.binding(Slot::Query).unwrap().target, BindTarget::RequestAttribute);
//! assert!(descriptor.binding(Slot::Form).is_none());
//! ```

mod core;

pub use self::core::*;

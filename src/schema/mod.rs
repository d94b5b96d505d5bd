//! # Schema Module
//!
//! Payload schema types and the machinery the binder uses to validate against them.
//!
//! ## Overview
//!
//! A schema type is an ordinary serde struct that also describes itself as a JSON Schema
//! document through the [`Schema`] trait. The document drives three things:
//!
//! - **Validation** - compiled once with `jsonschema` and cached in a [`ValidatorCache`]
//! - **Normalization** - the collection test that decides whether a single form/query value
//!   collapses to a scalar (see [`SchemaRef::is_collection_field`])
//! - **Coercion** - lax conversion of textual values into the declared scalar types
//!
//! ## Declaring Schemas
//!
//! ```rust
//! use brrtbind::Schema;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Serialize, Deserialize, Schema)]
//! struct SearchQuery {
//!     #[schema(min_length = 1)]
//!     q: String,
//!     tag: Vec<String>,
//!     page: Option<u32>,
//! }
//!
//! let doc = <SearchQuery as brrtbind::schema::Schema>::json_schema();
//! assert_eq!(doc["properties"]["tag"]["type"], "array");
//! assert_eq!(doc["required"], serde_json::json!(["q", "tag"]));
//! ```
//!
//! ## Type Erasure
//!
//! Handler signatures are declared at registration time, so the binder never sees the
//! concrete schema type. [`SchemaRef::of`] captures everything it needs: the name, the
//! schema document and a deserializer producing the typed instance behind `dyn Any`.

mod cache;
mod core;

pub use cache::ValidatorCache;
pub use self::core::*;

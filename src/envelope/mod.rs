//! # Envelope Module
//!
//! Response rendering for handler results.
//!
//! - **Plain** ([`PlainResponse`]) - the result is serialized field by field.
//! - **Templated** ([`HasEnvelope`]) - the result carries an embedded [`TemplateRecord`];
//!   rendering serializes the result without that record, stores it under the record's data
//!   field and emits `{data, code, msg}`.
//!
//! The templated wire shape is the same for every endpoint:
//!
//! ```text
//! { "data": <result fields minus the envelope field>, "code": "<string>", "msg": "<string>" }
//! ```
//!
//! ## Example
//!
//! ```rust
//! use brrtbind::envelope::{HasEnvelope, TemplateRecord};
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct UserResp {
//!     user_name: String,
//!     temp_data: TemplateRecord,
//! }
//!
//! impl HasEnvelope for UserResp {
//!     fn envelope(&self) -> &TemplateRecord {
//!         &self.temp_data
//!     }
//!     fn envelope_mut(&mut self) -> &mut TemplateRecord {
//!         &mut self.temp_data
//!     }
//! }
//!
//! let mut result = UserResp { user_name: "Alice".into(), temp_data: TemplateRecord::new() };
//! result.set_status("0000", "ok");
//! let response = result.resp(200, None).unwrap();
//!
//! assert_eq!(
//!     response.body,
//!     serde_json::json!({"data": {"user_name": "Alice"}, "code": "0000", "msg": "ok"})
//! );
//! ```

mod core;
mod response;

pub use self::core::*;
pub use self::response::HandlerResponse;

//! formwork-interchange: form config documents and save-in-progress wire types.
//!
//! Provides typed structs for the JSON form config document (chapters,
//! pages, `depends` declarations, declarative migrations, submission
//! mappings) and a single `from_document()` entry point that turns a
//! `serde_json::Value` into a `FormDocument`.
//!
//! The `wire` module holds the request/response bodies of the
//! in-progress-forms API. They are shared by the client in `formwork-sip`
//! and the mock server in `formwork-cli` so both sides agree on the
//! camelCase field names.

pub mod deserialize;
pub mod types;
pub mod wire;

pub use deserialize::{from_document, parse_condition, parse_depends, InterchangeError};
pub use types::*;

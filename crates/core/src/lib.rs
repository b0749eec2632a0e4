#![forbid(unsafe_code)]
#![deny(unused_must_use, missing_debug_implementations)]
#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro
)]

//! Swift bindings for a Convex backend.
//!
//! Two input variants share one pipeline:
//! - API: `api.d.ts` -> [`frontend`] types -> [`discover`] function references
//!   -> [`reduce`] validators -> [`render`] Swift
//! - Schema: `schema.ts` -> [`discover`] tables (validators directly) ->
//!   [`render`] Swift, plus the JSON IR dump and the [`report`]
//!
//! [`generator`] runs either variant end to end.

pub mod discover;
pub mod error;
pub mod frontend;
pub mod generator;
pub mod reduce;
pub mod render;
pub mod report;
pub mod schema;

pub use error::{Error, Result};
pub use generator::{
    ApiOptions, DEFAULT_API_PATH, DEFAULT_ROOTS, DEFAULT_SCHEMA_PATH, GeneratedApi,
    GeneratedSchema, generate_api, generate_api_from_source, generate_schema,
    generate_schema_from_source,
};

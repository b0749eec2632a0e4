//! Discovery of what to generate: function references in an API declaration
//! file, or tables in a schema source.

pub mod functions;
pub mod tables;

pub use functions::{
    DefaultSelection, FunctionKind, FunctionRef, Selection, Visibility, discover_functions,
};
pub use tables::discover_tables;

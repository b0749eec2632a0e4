//! Declaration-file frontend.
//!
//! Pipeline:
//! 1. `source`: text -> swc module, lowered to declarations (`syntax`)
//! 2. `checker`: declarations -> arena of structural types addressed by `TypeId`
//!
//! `prelude` supplies the framework types generated files import.

pub mod checker;
mod prelude;
pub mod source;
pub mod syntax;

pub use checker::{Property, TypeChecker, TypeId, TypeKind};

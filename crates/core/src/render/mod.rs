//! Swift rendering of reduced validators.
//!
//! Three layers:
//! 1. `codegen`: validators -> Swift AST, with names registered in a per-run
//!    `RenderContext`
//! 2. `types`: the Swift AST (types, structs, enums, markers, aliases)
//! 3. `emit`: Swift AST -> source text via the `Emit` trait
//!
//! `utils` holds naming and escaping helpers shared by the layers.

mod codegen;
mod emit;
mod types;
pub mod utils;

pub use codegen::{FunctionShape, RenderContext, Rendered, codegen_api, codegen_schema, encoding_for};
pub use emit::Emit;
pub use types::{
    Encoding, Presence, PropertyWrapper, Side, SwiftEnum, SwiftField, SwiftFile, SwiftStruct,
    SwiftType, TableMarker, TypeAlias,
};

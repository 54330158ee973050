//! Schema-directed mapping compiler.
//!
//! Given structural descriptions of two record types and a declarative correspondence spec, the
//! compiler emits Rust code that copies and converts every field from a source value into a
//! destination value. The generated code links against `mapweave-registry` only and never
//! inspects types at run time.
//!
//! # Pipeline
//!
//! 1. [`config::load`] (or hand-built [`spec`] values) describes the mapping units.
//! 2. A [`provider::TypeProvider`] answers structural questions about named types.
//! 3. [`resolve`] pairs destination fields with source paths.
//! 4. [`classify`] picks a conversion strategy for every pair.
//! 5. [`Compiler::generate`] renders one file per output path plus the registry bootstrap.
//!
//! Generation is deterministic: identical inputs yield byte-identical files.

pub mod classify;
pub mod config;
pub mod error;
mod generate;
pub mod provider;
pub mod resolve;
pub mod spec;
mod synth;
pub mod types;

pub use error::{CompileError, ConfigError};
pub use generate::{Compiler, GeneratedFile};
pub use provider::{TypeCatalog, TypeProvider};
pub use spec::Generation;

//! Runtime registry for generated mapping units.
//!
//! Generated mapping code links against this crate only. It provides:
//!
//! - [`Registry`] - lazily resolved, memoized named objects plus the function index that lets
//!   independently generated units delegate to each other and to hand-written conversions.
//! - [`ConverterFn`] / [`MapperFn`] - the two callable shapes stored in the index.
//! - [`Context`] and [`MapError`] - the call surface of every mapping operation.
//!
//! # Function Index
//!
//! Each registration carries explicit [`Exports`]: one [`FuncDecl`] per `(source, dest)` pair the
//! object handles. Nothing is discovered from method names at runtime.
//!
//! | Lookup | Winner |
//! |--------|--------|
//! | `get_func(s, d, None)` | last registered global binding for `(s, d)` |
//! | `get_func(s, d, Some(owner))` | last binding of `owner` for `(s, d)`, global or not |

mod context;
mod error;
mod func;
mod index;
mod registry;
mod slot;

pub use context::Context;
pub use error::{BoxError, MapError, RegistryError, not_found_as_none};
pub use func::{
	BoundFunc, ConverterFn, Exports, FuncDecl, FuncKind, MapperFn, Object, converter_fn, mapper_fn,
};
pub use registry::Registry;
pub use slot::SlotState;

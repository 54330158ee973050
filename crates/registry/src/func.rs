//! Typed conversion callables and their registration declarations.

use std::any::Any;
use std::sync::Arc;

use crate::{Context, MapError, RegistryError};

/// Value-producing conversion: `S -> D`.
pub type ConverterFn<S, D> = Arc<dyn Fn(&Context, &S) -> Result<D, MapError> + Send + Sync>;

/// In-place mapping: copies `S` into an existing `D`.
pub type MapperFn<S, D> = Arc<dyn Fn(&Context, &S, &mut D) -> Result<(), MapError> + Send + Sync>;

/// Type-erased registry object.
pub type Object = Arc<dyn Any + Send + Sync>;

/// Type-erased [`ConverterFn`] or [`MapperFn`].
pub(crate) type Func = Arc<dyn Any + Send + Sync>;

/// Projects a resolved owner object into its bound callable.
pub(crate) type Binder = Arc<dyn Fn(&Object) -> Option<Func> + Send + Sync>;

/// Wraps a closure as a [`ConverterFn`].
pub fn converter_fn<S, D, F>(f: F) -> ConverterFn<S, D>
where
	F: Fn(&Context, &S) -> Result<D, MapError> + Send + Sync + 'static,
{
	Arc::new(f)
}

/// Wraps a closure as a [`MapperFn`].
pub fn mapper_fn<S, D, F>(f: F) -> MapperFn<S, D>
where
	F: Fn(&Context, &S, &mut D) -> Result<(), MapError> + Send + Sync + 'static,
{
	Arc::new(f)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FuncKind {
	Mapper,
	Converter,
}

/// One `(source type, dest type)` binding exported by a registry object.
///
/// Type names are the canonical names emitted by the mapping compiler (`location#Name` for named
/// types, the Rust spelling for primitives and containers).
#[derive(Clone)]
pub struct FuncDecl {
	pub(crate) source_type: String,
	pub(crate) dest_type: String,
	pub(crate) operation: String,
	pub(crate) kind: FuncKind,
	pub(crate) bind: Binder,
}

impl FuncDecl {
	/// Declares a converter operation of owner type `O`.
	pub fn converter<O, S, D, B>(
		source_type: impl Into<String>,
		dest_type: impl Into<String>,
		operation: impl Into<String>,
		bind: B,
	) -> Self
	where
		O: Any + Send + Sync,
		S: 'static,
		D: 'static,
		B: Fn(&O) -> ConverterFn<S, D> + Send + Sync + 'static,
	{
		Self {
			source_type: source_type.into(),
			dest_type: dest_type.into(),
			operation: operation.into(),
			kind: FuncKind::Converter,
			bind: Arc::new(move |object: &Object| {
				object.downcast_ref::<O>().map(|owner| Arc::new(bind(owner)) as Func)
			}),
		}
	}

	/// Declares a mapper operation of owner type `O`.
	pub fn mapper<O, S, D, B>(
		source_type: impl Into<String>,
		dest_type: impl Into<String>,
		operation: impl Into<String>,
		bind: B,
	) -> Self
	where
		O: Any + Send + Sync,
		S: 'static,
		D: 'static,
		B: Fn(&O) -> MapperFn<S, D> + Send + Sync + 'static,
	{
		Self {
			source_type: source_type.into(),
			dest_type: dest_type.into(),
			operation: operation.into(),
			kind: FuncKind::Mapper,
			bind: Arc::new(move |object: &Object| {
				object.downcast_ref::<O>().map(|owner| Arc::new(bind(owner)) as Func)
			}),
		}
	}

	pub fn source_type(&self) -> &str {
		&self.source_type
	}

	pub fn dest_type(&self) -> &str {
		&self.dest_type
	}

	pub fn operation(&self) -> &str {
		&self.operation
	}

	pub fn kind(&self) -> FuncKind {
		self.kind
	}
}

impl std::fmt::Debug for FuncDecl {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FuncDecl")
			.field("source_type", &self.source_type)
			.field("dest_type", &self.dest_type)
			.field("operation", &self.operation)
			.field("kind", &self.kind)
			.finish()
	}
}

/// Function bindings declared alongside a registry object.
///
/// Exports are global by default: lookups without an owner id see them. [`Exports::local`]
/// restricts them to owner-qualified lookups.
#[derive(Clone, Debug)]
pub struct Exports {
	pub(crate) funcs: Vec<FuncDecl>,
	pub(crate) global: bool,
}

impl Default for Exports {
	fn default() -> Self {
		Self::new()
	}
}

impl Exports {
	pub fn new() -> Self {
		Self {
			funcs: Vec::new(),
			global: true,
		}
	}

	/// No function bindings (plain objects such as helpers).
	pub fn none() -> Self {
		Self::new()
	}

	pub fn func(mut self, decl: FuncDecl) -> Self {
		self.funcs.push(decl);
		self
	}

	pub fn local(mut self) -> Self {
		self.global = false;
		self
	}
}

/// A function resolved from the index, still type-erased.
#[derive(Clone)]
pub struct BoundFunc {
	pub(crate) owner: String,
	pub(crate) operation: String,
	pub(crate) source_type: String,
	pub(crate) dest_type: String,
	pub(crate) kind: FuncKind,
	pub(crate) func: Func,
}

impl BoundFunc {
	pub fn owner(&self) -> &str {
		&self.owner
	}

	pub fn operation(&self) -> &str {
		&self.operation
	}

	pub fn kind(&self) -> FuncKind {
		self.kind
	}

	pub fn into_converter<S: 'static, D: 'static>(self) -> Result<ConverterFn<S, D>, RegistryError> {
		if self.kind == FuncKind::Mapper {
			return Err(self.wrong_kind());
		}
		self.func
			.downcast_ref::<ConverterFn<S, D>>()
			.cloned()
			.ok_or_else(|| RegistryError::WrongType {
				id: self.owner.clone(),
				expected: std::any::type_name::<ConverterFn<S, D>>(),
			})
	}

	pub fn into_mapper<S: 'static, D: 'static>(self) -> Result<MapperFn<S, D>, RegistryError> {
		if self.kind == FuncKind::Converter {
			return Err(self.wrong_kind());
		}
		self.func
			.downcast_ref::<MapperFn<S, D>>()
			.cloned()
			.ok_or_else(|| RegistryError::WrongType {
				id: self.owner.clone(),
				expected: std::any::type_name::<MapperFn<S, D>>(),
			})
	}

	fn wrong_kind(&self) -> RegistryError {
		RegistryError::WrongKind {
			source_type: self.source_type.clone(),
			dest_type: self.dest_type.clone(),
			is_mapper: self.kind == FuncKind::Mapper,
			is_converter: self.kind == FuncKind::Converter,
		}
	}
}

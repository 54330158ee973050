use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::func::{
	BoundFunc, ConverterFn, Exports, FuncDecl, FuncKind, MapperFn, Object, converter_fn,
};
use crate::index::FunctionIndex;
use crate::slot::{Factory, Slot, SlotState};
use crate::{BoxError, Context, MapError, RegistryError};

/// Named-object container consumed by generated mapping units.
///
/// # Lifecycle
///
/// 1. **Init:** [`Registry::add`], [`Registry::add_factory`], [`Registry::add_converter`] and
///    [`Registry::merge`] take `&mut self`; the borrow checker keeps them out of the resolve phase.
/// 2. **Resolve:** [`Registry::get`] and the function lookups take `&self` and may run on any
///    number of threads. Factories run at most once per id.
#[derive(Default)]
pub struct Registry {
	slots: FxHashMap<String, Arc<Slot>>,
	index: FunctionIndex,
}

impl Registry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Stores an eagerly constructed object and indexes its exported functions.
	pub fn add<T: Any + Send + Sync>(&mut self, id: impl Into<String>, value: T, exports: Exports) {
		let id = id.into();
		self.index.insert(&id, &exports);
		self.slots
			.insert(id, Arc::new(Slot::resolved(Arc::new(value))));
	}

	/// Stores a factory resolved on first [`Registry::get`].
	///
	/// `exports` stands in for the object's type: the index is populated now, without running the
	/// factory.
	pub fn add_factory<T, F>(&mut self, id: impl Into<String>, exports: Exports, factory: F)
	where
		T: Any + Send + Sync,
		F: Fn(&Registry) -> Result<T, BoxError> + Send + Sync + 'static,
	{
		let id = id.into();
		let factory: Factory = Arc::new(move |registry: &Registry| {
			factory(registry).map(|value| Arc::new(value) as Object)
		});
		self.index.insert(&id, &exports);
		self.slots.insert(id, Arc::new(Slot::lazy(factory)));
	}

	/// Registers a standalone conversion function as the object `id`.
	pub fn add_converter<S, D, F>(
		&mut self,
		id: impl Into<String>,
		source_type: impl Into<String>,
		dest_type: impl Into<String>,
		convert: F,
	) where
		S: 'static,
		D: 'static,
		F: Fn(&Context, &S) -> Result<D, MapError> + Send + Sync + 'static,
	{
		let func = converter_fn(convert);
		let decl = FuncDecl::converter(source_type, dest_type, "convert", |owner: &ConverterFn<S, D>| {
			owner.clone()
		});
		self.add(id, func, Exports::new().func(decl));
	}

	/// Copies every object, factory and index entry of `other` into this registry.
	///
	/// `other` wins on id collisions and its index entries shadow this registry's for unqualified
	/// lookups. Merge before the first `get` on either registry.
	pub fn merge(&mut self, other: Registry) {
		tracing::debug!(objects = other.slots.len(), functions = other.index.len(), "merging registry");
		self.slots.extend(other.slots);
		self.index.extend(other.index);
	}

	/// Returns the object registered as `id`, resolving its factory on first access.
	pub fn get(&self, id: &str) -> Result<Object, RegistryError> {
		let slot = self
			.slots
			.get(id)
			.ok_or_else(|| RegistryError::NotFound { id: id.to_string() })?;
		slot.resolve(id, self)
	}

	/// Returns the object registered as `id` downcast to `T`.
	pub fn get_as<T: Any + Clone>(&self, id: &str) -> Result<T, RegistryError> {
		let object = self.get(id)?;
		object
			.downcast_ref::<T>()
			.cloned()
			.ok_or_else(|| RegistryError::WrongType {
				id: id.to_string(),
				expected: std::any::type_name::<T>(),
			})
	}

	/// Looks up the function bound for `source_type -> dest_type`.
	///
	/// With `owner`, returns that owner's binding; otherwise the most recently registered global
	/// binding.
	pub fn get_func(
		&self,
		source_type: &str,
		dest_type: &str,
		owner: Option<&str>,
	) -> Result<BoundFunc, RegistryError> {
		self.bind(source_type, dest_type, owner, None)
	}

	/// Looks up a converter. Unqualified lookups skip newer global mapper bindings for the pair.
	pub fn converter<S: 'static, D: 'static>(
		&self,
		source_type: &str,
		dest_type: &str,
		owner: Option<&str>,
	) -> Result<ConverterFn<S, D>, RegistryError> {
		self.bind(source_type, dest_type, owner, Some(FuncKind::Converter))?
			.into_converter()
	}

	/// Looks up a mapper. Unqualified lookups skip newer global converter bindings for the pair.
	pub fn mapper<S: 'static, D: 'static>(
		&self,
		source_type: &str,
		dest_type: &str,
		owner: Option<&str>,
	) -> Result<MapperFn<S, D>, RegistryError> {
		self.bind(source_type, dest_type, owner, Some(FuncKind::Mapper))?
			.into_mapper()
	}

	fn bind(
		&self,
		source_type: &str,
		dest_type: &str,
		owner: Option<&str>,
		kind: Option<FuncKind>,
	) -> Result<BoundFunc, RegistryError> {
		let entry = self
			.index
			.lookup(source_type, dest_type, owner, kind)
			.ok_or_else(|| RegistryError::FuncNotFound {
				source_type: source_type.to_string(),
				dest_type: dest_type.to_string(),
				owner: owner.map(str::to_string),
			})?;
		let object = self.get(&entry.owner)?;
		let func = (entry.bind)(&object).ok_or_else(|| RegistryError::WrongType {
			id: entry.owner.clone(),
			expected: "owner type declared by its exports",
		})?;
		Ok(BoundFunc {
			owner: entry.owner.clone(),
			operation: entry.operation.clone(),
			source_type: source_type.to_string(),
			dest_type: dest_type.to_string(),
			kind: entry.kind,
			func,
		})
	}

	/// Resolves every object whose id ends with `Mapper`.
	pub fn mappers(&self) -> Result<BTreeMap<String, Object>, RegistryError> {
		let mut ids: Vec<&String> = self
			.slots
			.keys()
			.filter(|id| id.ends_with("Mapper"))
			.collect();
		ids.sort();
		ids.into_iter()
			.map(|id| Ok((id.clone(), self.get(id)?)))
			.collect()
	}

	pub fn contains(&self, id: &str) -> bool {
		self.slots.contains_key(id)
	}

	pub fn state(&self, id: &str) -> Option<SlotState> {
		self.slots.get(id).map(|slot| slot.state())
	}

	/// Number of index entries registered for the pair, shadowed ones included.
	pub fn func_count(&self, source_type: &str, dest_type: &str) -> usize {
		self.index.entries(source_type, dest_type).len()
	}

	pub fn len(&self) -> usize {
		self.slots.len()
	}

	pub fn is_empty(&self) -> bool {
		self.slots.is_empty()
	}
}

impl std::fmt::Debug for Registry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut ids: Vec<_> = self.slots.keys().collect();
		ids.sort();
		f.debug_struct("Registry")
			.field("ids", &ids)
			.field("functions", &self.index.len())
			.finish()
	}
}

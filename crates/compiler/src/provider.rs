//! Type descriptors and the provider that supplies them.
//!
//! The compiler never inspects declarations itself. It asks a [`TypeProvider`] for a
//! [`TypeDescriptor`] by `(location, name)` and memoizes the answers for one invocation in a
//! [`DescriptorCache`].

use std::cell::RefCell;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::types::{Primitive, QualifiedName, TypeRef};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
	pub name: QualifiedName,
	pub kind: TypeKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
	/// Struct with named fields, in declaration order.
	Record(Vec<FieldDescriptor>),
	/// Single-field tuple struct over a primitive.
	Alias(Primitive),
	/// Trait, rendered as `Arc<dyn Trait>`.
	Contract,
}

impl TypeDescriptor {
	pub fn fields(&self) -> Option<&[FieldDescriptor]> {
		match &self.kind {
			TypeKind::Record(fields) => Some(fields),
			_ => None,
		}
	}

	pub fn is_record(&self) -> bool {
		matches!(self.kind, TypeKind::Record(_))
	}

	pub fn alias_of(&self) -> Option<Primitive> {
		match self.kind {
			TypeKind::Alias(primitive) => Some(primitive),
			_ => None,
		}
	}

	/// Finds a field by name, ASCII case-insensitively when `ignore_case` is set.
	pub fn field(&self, name: &str, ignore_case: bool) -> Option<&FieldDescriptor> {
		self.fields()?
			.iter()
			.find(|field| names_match(&field.name, name, ignore_case))
	}
}

pub(crate) fn names_match(a: &str, b: &str, ignore_case: bool) -> bool {
	a == b || (ignore_case && a.eq_ignore_ascii_case(b))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
	pub name: String,
	pub ty: TypeRef,
	pub access: FieldAccess,
}

/// How a field is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldAccess {
	Direct,
	/// Pseudo-field exposed through methods: `getter()` and `setter(value)`.
	Accessor {
		getter: Option<String>,
		setter: Option<String>,
	},
}

impl FieldDescriptor {
	pub fn direct(name: impl Into<String>, ty: TypeRef) -> Self {
		Self {
			name: name.into(),
			ty,
			access: FieldAccess::Direct,
		}
	}

	/// Pseudo-field with a `name()` getter and a `set_name(value)` setter.
	pub fn accessor(name: impl Into<String>, ty: TypeRef) -> Self {
		let name = name.into();
		Self {
			access: FieldAccess::Accessor {
				getter: Some(name.clone()),
				setter: Some(format!("set_{name}")),
			},
			name,
			ty,
		}
	}

	pub fn readable(&self) -> bool {
		match &self.access {
			FieldAccess::Direct => true,
			FieldAccess::Accessor { getter, .. } => getter.is_some(),
		}
	}

	pub fn writable(&self) -> bool {
		match &self.access {
			FieldAccess::Direct => true,
			FieldAccess::Accessor { setter, .. } => setter.is_some(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
	#[error("type {location}#{name} not found")]
	NotFound { location: String, name: String },
	#[error("type {location}#{name} is declared twice")]
	Duplicate { location: String, name: String },
}

/// Supplies structural descriptors for named types.
pub trait TypeProvider {
	fn describe(&self, location: &str, name: &str) -> Result<Arc<TypeDescriptor>, ProviderError>;
}

/// In-memory provider.
///
/// Built programmatically with [`TypeCatalog::record`] and friends, or loaded from the `[[types]]`
/// tables of a catalog file (see [`crate::config::load_catalog`]).
#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
	types: FxHashMap<QualifiedName, Arc<TypeDescriptor>>,
}

impl TypeCatalog {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, descriptor: TypeDescriptor) -> Result<(), ProviderError> {
		if self.types.contains_key(&descriptor.name) {
			return Err(ProviderError::Duplicate {
				location: descriptor.name.location,
				name: descriptor.name.name,
			});
		}
		self.types.insert(descriptor.name.clone(), Arc::new(descriptor));
		Ok(())
	}

	/// Adds (or replaces) a record type.
	pub fn record(mut self, location: &str, name: &str, fields: Vec<FieldDescriptor>) -> Self {
		self.put(location, name, TypeKind::Record(fields));
		self
	}

	pub fn alias(mut self, location: &str, name: &str, primitive: Primitive) -> Self {
		self.put(location, name, TypeKind::Alias(primitive));
		self
	}

	pub fn contract(mut self, location: &str, name: &str) -> Self {
		self.put(location, name, TypeKind::Contract);
		self
	}

	fn put(&mut self, location: &str, name: &str, kind: TypeKind) {
		let name = QualifiedName::new(location, name);
		self.types
			.insert(name.clone(), Arc::new(TypeDescriptor { name, kind }));
	}

	pub fn len(&self) -> usize {
		self.types.len()
	}

	pub fn is_empty(&self) -> bool {
		self.types.is_empty()
	}
}

impl TypeProvider for TypeCatalog {
	fn describe(&self, location: &str, name: &str) -> Result<Arc<TypeDescriptor>, ProviderError> {
		self.types
			.get(&QualifiedName::new(location, name))
			.cloned()
			.ok_or_else(|| ProviderError::NotFound {
				location: location.to_string(),
				name: name.to_string(),
			})
	}
}

/// Per-invocation memoization over a provider.
///
/// Single-threaded by construction: one cache belongs to one compiler run.
pub struct DescriptorCache<'p> {
	provider: &'p dyn TypeProvider,
	entries: RefCell<FxHashMap<QualifiedName, Arc<TypeDescriptor>>>,
}

impl<'p> DescriptorCache<'p> {
	pub fn new(provider: &'p dyn TypeProvider) -> Self {
		Self {
			provider,
			entries: RefCell::default(),
		}
	}

	pub fn describe(&self, name: &QualifiedName) -> Result<Arc<TypeDescriptor>, ProviderError> {
		if let Some(descriptor) = self.entries.borrow().get(name) {
			return Ok(descriptor.clone());
		}
		let descriptor = self.provider.describe(&name.location, &name.name)?;
		tracing::trace!(ty = %name, "described type");
		self.entries
			.borrow_mut()
			.insert(name.clone(), descriptor.clone());
		Ok(descriptor)
	}

	pub fn len(&self) -> usize {
		self.entries.borrow().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.borrow().is_empty()
	}
}

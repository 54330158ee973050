//! Type Compatibility Engine.
//!
//! Classifies a `(source, dest)` type pair into a [`Strategy`]. The precedence is fixed:
//!
//! 1. explicit converter override on the correspondence
//! 2. pair declared by a global conversion unit ([`ConversionCatalog`])
//! 3. identical types
//! 4. widening (std `From` between integers of one signedness, `f32 -> f64`, alias <-> primitive)
//! 5. sequence/array element-wise
//! 6. map value-wise (identical key types)
//! 7. record to record
//!
//! Anything else is a mismatch. Outer `Option` layers are ignored here; the synthesizer handles
//! them.

use crate::provider::{DescriptorCache, ProviderError, TypeKind};
use crate::spec::{ConverterDecl, NilCollectionPolicy, NilPolicy};
use crate::types::{Primitive, QualifiedName, TypeRef};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
	Identity,
	Widening(Widening),
	/// Delegate to a registry-bound converter, falling back to `fallback` when none is bound.
	Custom {
		owner: Option<String>,
		fallback: Option<Box<Strategy>>,
	},
	Structural,
	/// Element-wise (or value-wise for maps) mapping.
	Collection {
		element: Box<Strategy>,
		nil: NilPolicy,
	},
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Widening {
	/// `To::from(value)`.
	Numeric { to: Primitive },
	/// Primitive into its alias newtype.
	Wrap { alias: QualifiedName },
	/// Alias newtype into its primitive.
	Unwrap,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifyError {
	#[error("{source_type} is not compatible with {dest_type}")]
	Mismatch { source_type: String, dest_type: String },
	#[error(transparent)]
	Provider(#[from] ProviderError),
}

/// Compile-time view of the function index: the conversion pairs declared by conversion units.
#[derive(Debug, Clone, Default)]
pub struct ConversionCatalog {
	entries: Vec<CatalogEntry>,
}

#[derive(Debug, Clone)]
struct CatalogEntry {
	owner: String,
	source: String,
	dest: String,
	global: bool,
}

impl ConversionCatalog {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_decls(decls: &[ConverterDecl]) -> Self {
		let mut catalog = Self::new();
		for decl in decls {
			for (source, dest) in &decl.functions {
				catalog.declare(&decl.id, source, dest, decl.global);
			}
		}
		catalog
	}

	pub fn declare(&mut self, owner: &str, source: &TypeRef, dest: &TypeRef, global: bool) {
		self.entries.push(CatalogEntry {
			owner: owner.to_string(),
			source: source.canonical_name(),
			dest: dest.canonical_name(),
			global,
		});
	}

	pub fn has_global(&self, source: &TypeRef, dest: &TypeRef) -> bool {
		self.find(source, dest, |entry| entry.global)
	}

	pub fn owner_handles(&self, owner: &str, source: &TypeRef, dest: &TypeRef) -> bool {
		self.find(source, dest, |entry| entry.owner == owner)
	}

	fn find(&self, source: &TypeRef, dest: &TypeRef, accept: impl Fn(&CatalogEntry) -> bool) -> bool {
		let (source, dest) = (source.canonical_name(), dest.canonical_name());
		self.entries
			.iter()
			.any(|entry| entry.source == source && entry.dest == dest && accept(entry))
	}
}

pub struct Classifier<'a> {
	cache: &'a DescriptorCache<'a>,
	catalog: &'a ConversionCatalog,
}

impl<'a> Classifier<'a> {
	pub fn new(cache: &'a DescriptorCache<'a>, catalog: &'a ConversionCatalog) -> Self {
		Self { cache, catalog }
	}

	pub fn classify(
		&self,
		source: &TypeRef,
		dest: &TypeRef,
		converter: Option<&str>,
		nil: NilCollectionPolicy,
	) -> Result<Strategy, ClassifyError> {
		let (source, dest) = (source.strip_optional(), dest.strip_optional());

		if let Some(owner) = converter {
			// An override declared only for the element pair applies per element.
			if !self.catalog.owner_handles(owner, source, dest)
				&& let Some((source_elem, dest_elem, policy)) = element_pair(source, dest, nil)
				&& self.catalog.owner_handles(owner, source_elem, dest_elem)
			{
				let element = self.classify(source_elem, dest_elem, Some(owner), nil)?;
				return Ok(Strategy::Collection {
					element: Box::new(element),
					nil: policy,
				});
			}
			return Ok(self.custom(Some(owner), source, dest, nil)?);
		}

		if self.catalog.has_global(source, dest) {
			return Ok(self.custom(None, source, dest, nil)?);
		}

		self.default_strategy(source, dest, nil)
	}

	fn custom(
		&self,
		owner: Option<&str>,
		source: &TypeRef,
		dest: &TypeRef,
		nil: NilCollectionPolicy,
	) -> Result<Strategy, ProviderError> {
		let fallback = match self.default_strategy(source, dest, nil) {
			Ok(strategy) => Some(Box::new(strategy)),
			Err(ClassifyError::Mismatch { .. }) => None,
			Err(ClassifyError::Provider(err)) => return Err(err),
		};
		Ok(Strategy::Custom {
			owner: owner.map(str::to_string),
			fallback,
		})
	}

	/// Rules 3 to 7.
	fn default_strategy(
		&self,
		source: &TypeRef,
		dest: &TypeRef,
		nil: NilCollectionPolicy,
	) -> Result<Strategy, ClassifyError> {
		if source == dest {
			return Ok(Strategy::Identity);
		}
		if let Some(widening) = self.widening(source, dest)? {
			return Ok(Strategy::Widening(widening));
		}
		if let Some((source_elem, dest_elem, policy)) = element_pair(source, dest, nil) {
			let element = self.classify(source_elem, dest_elem, None, nil)?;
			return Ok(Strategy::Collection {
				element: Box::new(element),
				nil: policy,
			});
		}
		if let (TypeRef::Named(s), TypeRef::Named(d)) = (source, dest)
			&& self.cache.describe(s)?.is_record()
			&& self.cache.describe(d)?.is_record()
		{
			return Ok(Strategy::Structural);
		}
		Err(mismatch(source, dest))
	}

	fn widening(&self, source: &TypeRef, dest: &TypeRef) -> Result<Option<Widening>, ProviderError> {
		Ok(match (source, dest) {
			(TypeRef::Primitive(s), TypeRef::Primitive(d)) if s.widens_to(*d) => {
				Some(Widening::Numeric { to: *d })
			}
			(TypeRef::Named(s), TypeRef::Primitive(d)) => {
				(self.alias_of(s)? == Some(*d)).then_some(Widening::Unwrap)
			}
			(TypeRef::Primitive(s), TypeRef::Named(d)) => (self.alias_of(d)? == Some(*s))
				.then(|| Widening::Wrap { alias: d.clone() }),
			_ => None,
		})
	}

	fn alias_of(&self, name: &QualifiedName) -> Result<Option<Primitive>, ProviderError> {
		let descriptor = self.cache.describe(name)?;
		Ok(match descriptor.kind {
			TypeKind::Alias(primitive) => Some(primitive),
			_ => None,
		})
	}
}

/// Element (or map value) pair of two compatible collection types, with the nil policy of the
/// source collection kind.
fn element_pair<'t>(
	source: &'t TypeRef,
	dest: &'t TypeRef,
	nil: NilCollectionPolicy,
) -> Option<(&'t TypeRef, &'t TypeRef, NilPolicy)> {
	match (source, dest) {
		(TypeRef::Sequence(s) | TypeRef::Array(s, _), TypeRef::Sequence(d)) => {
			Some((&**s, &**d, nil.sequence))
		}
		(TypeRef::Array(s, n), TypeRef::Array(d, m)) if n == m => Some((&**s, &**d, nil.sequence)),
		(TypeRef::Map(_, sk, sv), TypeRef::Map(_, dk, dv)) if sk == dk => Some((&**sv, &**dv, nil.map)),
		_ => None,
	}
}

fn mismatch(source: &TypeRef, dest: &TypeRef) -> ClassifyError {
	ClassifyError::Mismatch {
		source_type: source.to_string(),
		dest_type: dest.to_string(),
	}
}

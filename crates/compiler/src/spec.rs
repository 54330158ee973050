//! Mapping specifications: the compiler's input model.
//!
//! A [`Generation`] is everything one compiler run needs: the mapping units, where their code goes,
//! the declared conversion units and the bootstrap target. It is usually produced by
//! [`crate::config::load`], but every type here is plain data and can be built directly.

use std::path::PathBuf;

use heck::ToSnakeCase;
use serde::Deserialize;

use crate::provider::names_match;
use crate::types::{QualifiedName, TypeRef};

/// Path marker meaning "the whole operand".
pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
	A,
	B,
}

impl Side {
	pub fn opposite(self) -> Self {
		match self {
			Self::A => Self::B,
			Self::B => Self::A,
		}
	}
}

impl std::fmt::Display for Side {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			Self::A => "a",
			Self::B => "b",
		})
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
	AToB,
	BToA,
}

impl Direction {
	pub fn source(self) -> Side {
		match self {
			Self::AToB => Side::A,
			Self::BToA => Side::B,
		}
	}

	pub fn dest(self) -> Side {
		self.source().opposite()
	}
}

/// One side of a mapping unit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Operand {
	pub location: String,
	pub name: String,
}

impl Operand {
	pub fn new(location: impl Into<String>, name: impl Into<String>) -> Self {
		Self {
			location: location.into(),
			name: name.into(),
		}
	}

	pub fn qualified(&self) -> QualifiedName {
		QualifiedName::new(&self.location, &self.name)
	}
}

/// What a nil source collection becomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NilPolicy {
	#[default]
	Nil,
	Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NilCollectionPolicy {
	pub map: NilPolicy,
	pub sequence: NilPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCorrespondence {
	pub a: String,
	pub b: String,
	/// Registry id of the conversion unit to use for this field.
	pub converter: Option<String>,
}

impl FieldCorrespondence {
	pub fn path(&self, side: Side) -> &str {
		match side {
			Side::A => &self.a,
			Side::B => &self.b,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreEntry {
	pub side: Side,
	pub path: String,
}

/// Field-level rules of one object mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectRules {
	pub explicit_only: bool,
	pub ignore_case: bool,
	pub allow_unmapped: bool,
	pub nil: NilCollectionPolicy,
	pub fields: Vec<FieldCorrespondence>,
	pub ignores: Vec<IgnoreEntry>,
}

impl ObjectRules {
	/// Rules for a nested record reached by structural recursion: implicit, no explicit entries.
	pub fn nested(&self) -> Self {
		Self {
			ignore_case: self.ignore_case,
			allow_unmapped: self.allow_unmapped,
			nil: self.nil,
			..Self::default()
		}
	}

	pub fn is_ignored(&self, side: Side, path: &str) -> bool {
		self.ignores.iter().any(|entry| {
			entry.side == side && names_match(&entry.path, path, self.ignore_case)
		})
	}
}

/// One mapping unit declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingSpec {
	pub id: String,
	pub a: Operand,
	pub b: Operand,
	pub bidirectional: bool,
	pub a_to_b: Option<String>,
	pub b_to_a: Option<String>,
	pub rules: ObjectRules,
}

impl MappingSpec {
	pub fn new(id: impl Into<String>, a: Operand, b: Operand) -> Self {
		Self {
			id: id.into(),
			a,
			b,
			bidirectional: false,
			a_to_b: None,
			b_to_a: None,
			rules: ObjectRules::default(),
		}
	}

	pub fn bidirectional(mut self) -> Self {
		self.bidirectional = true;
		self
	}

	pub fn field(mut self, a: &str, b: &str) -> Self {
		self.rules.fields.push(FieldCorrespondence {
			a: a.to_string(),
			b: b.to_string(),
			converter: None,
		});
		self
	}

	pub fn field_with(mut self, a: &str, b: &str, converter: &str) -> Self {
		self.rules.fields.push(FieldCorrespondence {
			a: a.to_string(),
			b: b.to_string(),
			converter: Some(converter.to_string()),
		});
		self
	}

	pub fn ignore(mut self, side: Side, path: &str) -> Self {
		self.rules.ignores.push(IgnoreEntry {
			side,
			path: path.to_string(),
		});
		self
	}

	pub fn operand(&self, side: Side) -> &Operand {
		match side {
			Side::A => &self.a,
			Side::B => &self.b,
		}
	}

	pub fn directions(&self) -> Vec<Direction> {
		if self.bidirectional {
			vec![Direction::AToB, Direction::BToA]
		} else {
			vec![Direction::AToB]
		}
	}

	/// Operation name for `direction`: the override, or `snake(source)_to_snake(dest)`.
	pub fn method_name(&self, direction: Direction) -> String {
		let name = match direction {
			Direction::AToB => &self.a_to_b,
			Direction::BToA => &self.b_to_a,
		};
		name.clone().unwrap_or_else(|| {
			format!(
				"{}_to_{}",
				self.operand(direction.source()).name.to_snake_case(),
				self.operand(direction.dest()).name.to_snake_case()
			)
		})
	}
}

/// Output file and the Rust module path it is included as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
	pub path: PathBuf,
	pub module: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingUnit {
	pub spec: MappingSpec,
	pub output: OutputTarget,
}

/// A hand-written conversion unit known at generation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConverterDecl {
	pub id: String,
	pub functions: Vec<(TypeRef, TypeRef)>,
	/// Global entries are picked for matching pairs without an explicit override.
	pub global: bool,
	/// Path of a `fn(&mut Registry)` the bootstrap calls to register the unit.
	pub register: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
	pub units: Vec<MappingUnit>,
	pub converters: Vec<ConverterDecl>,
	pub bootstrap: OutputTarget,
	/// Crate path of the runtime registry in generated code.
	pub runtime: String,
}

pub const DEFAULT_RUNTIME: &str = "mapweave_registry";

#[cfg(test)]
mod tests;

//! Type references as seen by the compiler.
//!
//! A [`TypeRef`] is the shape of a field type: primitives, named types (records, aliases,
//! contracts; resolved through the provider), and the container constructors. The textual form
//! accepted by [`TypeRef::parse`] is the Rust spelling with named types written `location#Name`:
//!
//! ```text
//! Option<Vec<crate::model#Item>>
//! std::collections::HashMap<String, i64>   (also accepted as HashMap<String, i64>)
//! [u8; 16]
//! ```

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// `location#Name` identity of a named type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
	pub location: String,
	pub name: String,
}

impl QualifiedName {
	pub fn new(location: impl Into<String>, name: impl Into<String>) -> Self {
		Self {
			location: location.into(),
			name: name.into(),
		}
	}
}

impl fmt::Display for QualifiedName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}#{}", self.location, self.name)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
	Bool,
	Char,
	String,
	I8,
	I16,
	I32,
	I64,
	Isize,
	U8,
	U16,
	U32,
	U64,
	Usize,
	F32,
	F64,
}

const PRIMITIVES: [(Primitive, &str); 15] = [
	(Primitive::Bool, "bool"),
	(Primitive::Char, "char"),
	(Primitive::String, "String"),
	(Primitive::I8, "i8"),
	(Primitive::I16, "i16"),
	(Primitive::I32, "i32"),
	(Primitive::I64, "i64"),
	(Primitive::Isize, "isize"),
	(Primitive::U8, "u8"),
	(Primitive::U16, "u16"),
	(Primitive::U32, "u32"),
	(Primitive::U64, "u64"),
	(Primitive::Usize, "usize"),
	(Primitive::F32, "f32"),
	(Primitive::F64, "f64"),
];

impl Primitive {
	pub fn from_name(name: &str) -> Option<Self> {
		PRIMITIVES.iter().find(|(_, n)| *n == name).map(|(p, _)| *p)
	}

	pub fn rust_name(self) -> &'static str {
		PRIMITIVES
			.iter()
			.find(|(p, _)| *p == self)
			.map(|(_, n)| *n)
			.unwrap_or("()")
	}

	/// Whether a value is duplicated by copy rather than `clone()`.
	pub fn is_copy(self) -> bool {
		self != Self::String
	}

	/// Lossless conversions backed by a std `From` impl within one signedness family.
	pub fn widens_to(self, to: Self) -> bool {
		use Primitive::*;
		matches!(
			(self, to),
			(I8, I16 | I32 | I64 | Isize)
				| (I16, I32 | I64 | Isize)
				| (I32, I64)
				| (U8, U16 | U32 | U64 | Usize)
				| (U16, U32 | U64 | Usize)
				| (U32, U64)
				| (F32, F64)
		)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapKind {
	Hash,
	BTree,
}

impl MapKind {
	pub fn name(self) -> &'static str {
		match self {
			Self::Hash => "HashMap",
			Self::BTree => "BTreeMap",
		}
	}
}

/// Structural shape of a field type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum TypeRef {
	Primitive(Primitive),
	Named(QualifiedName),
	/// Nilable value.
	Optional(Box<TypeRef>),
	Sequence(Box<TypeRef>),
	Array(Box<TypeRef>, usize),
	Map(MapKind, Box<TypeRef>, Box<TypeRef>),
}

impl TypeRef {
	pub fn named(location: impl Into<String>, name: impl Into<String>) -> Self {
		Self::Named(QualifiedName::new(location, name))
	}

	pub fn optional(inner: TypeRef) -> Self {
		Self::Optional(Box::new(inner))
	}

	pub fn sequence(element: TypeRef) -> Self {
		Self::Sequence(Box::new(element))
	}

	pub fn array(element: TypeRef, len: usize) -> Self {
		Self::Array(Box::new(element), len)
	}

	pub fn map(kind: MapKind, key: TypeRef, value: TypeRef) -> Self {
		Self::Map(kind, Box::new(key), Box::new(value))
	}

	pub fn parse(text: &str) -> Result<Self, TypeParseError> {
		let mut parser = Parser { text, pos: 0 };
		let ty = parser.type_ref()?;
		parser.skip_ws();
		if parser.pos != text.len() {
			return Err(parser.error("trailing input"));
		}
		Ok(ty)
	}

	pub fn is_optional(&self) -> bool {
		matches!(self, Self::Optional(_))
	}

	/// Removes every outer `Option` layer.
	pub fn strip_optional(&self) -> &TypeRef {
		let mut ty = self;
		while let Self::Optional(inner) = ty {
			ty = inner;
		}
		ty
	}

	pub fn as_named(&self) -> Option<&QualifiedName> {
		match self {
			Self::Named(name) => Some(name),
			_ => None,
		}
	}

	pub fn is_collection(&self) -> bool {
		matches!(self, Self::Sequence(_) | Self::Array(..) | Self::Map(..))
	}

	/// Key of the function index: the Rust spelling with `Option` erased at every level.
	pub fn canonical_name(&self) -> String {
		match self {
			Self::Primitive(p) => p.rust_name().to_string(),
			Self::Named(name) => name.to_string(),
			Self::Optional(inner) => inner.canonical_name(),
			Self::Sequence(element) => format!("Vec<{}>", element.canonical_name()),
			Self::Array(element, len) => format!("[{}; {len}]", element.canonical_name()),
			Self::Map(kind, key, value) => format!(
				"{}<{}, {}>",
				kind.name(),
				key.canonical_name(),
				value.canonical_name()
			),
		}
	}
}

impl From<Primitive> for TypeRef {
	fn from(primitive: Primitive) -> Self {
		Self::Primitive(primitive)
	}
}

impl fmt::Display for TypeRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Primitive(p) => f.write_str(p.rust_name()),
			Self::Named(name) => write!(f, "{name}"),
			Self::Optional(inner) => write!(f, "Option<{inner}>"),
			Self::Sequence(element) => write!(f, "Vec<{element}>"),
			Self::Array(element, len) => write!(f, "[{element}; {len}]"),
			Self::Map(kind, key, value) => write!(f, "{}<{key}, {value}>", kind.name()),
		}
	}
}

impl FromStr for TypeRef {
	type Err = TypeParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl TryFrom<String> for TypeRef {
	type Error = TypeParseError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::parse(&value)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid type `{text}` at offset {offset}: {reason}")]
pub struct TypeParseError {
	pub text: String,
	pub offset: usize,
	pub reason: &'static str,
}

struct Parser<'a> {
	text: &'a str,
	pos: usize,
}

impl Parser<'_> {
	fn error(&self, reason: &'static str) -> TypeParseError {
		TypeParseError {
			text: self.text.to_string(),
			offset: self.pos,
			reason,
		}
	}

	fn rest(&self) -> &str {
		&self.text[self.pos..]
	}

	fn skip_ws(&mut self) {
		let trimmed = self.rest().trim_start();
		self.pos = self.text.len() - trimmed.len();
	}

	fn eat(&mut self, token: char) -> bool {
		self.skip_ws();
		if self.rest().starts_with(token) {
			self.pos += token.len_utf8();
			true
		} else {
			false
		}
	}

	fn expect(&mut self, token: char, reason: &'static str) -> Result<(), TypeParseError> {
		if self.eat(token) { Ok(()) } else { Err(self.error(reason)) }
	}

	/// Path-like word: identifiers joined by `::`, optionally followed by `#Name`.
	fn word(&mut self) -> &str {
		self.skip_ws();
		let start = self.pos;
		let len = self
			.rest()
			.find(|c: char| !(c.is_alphanumeric() || c == '_' || c == ':' || c == '#'))
			.unwrap_or(self.rest().len());
		self.pos += len;
		&self.text[start..self.pos]
	}

	fn type_ref(&mut self) -> Result<TypeRef, TypeParseError> {
		if self.eat('[') {
			let element = self.type_ref()?;
			self.expect(';', "expected `;` in array type")?;
			let len = self
				.word()
				.parse::<usize>()
				.map_err(|_| self.error("expected array length"))?;
			self.expect(']', "expected `]`")?;
			return Ok(TypeRef::array(element, len));
		}

		let word = self.word().to_string();
		if word.is_empty() {
			return Err(self.error("expected a type"));
		}
		if let Some((location, name)) = word.split_once('#') {
			if location.is_empty() || name.is_empty() || name.contains(['#', ':']) {
				return Err(self.error("named types are written `location#Name`"));
			}
			return Ok(TypeRef::named(location, name));
		}
		let base = word.rsplit("::").next().unwrap_or(&word);
		match base {
			"Option" | "Vec" => {
				self.expect('<', "expected `<`")?;
				let inner = self.type_ref()?;
				self.expect('>', "expected `>`")?;
				Ok(if base == "Option" {
					TypeRef::optional(inner)
				} else {
					TypeRef::sequence(inner)
				})
			}
			"HashMap" | "BTreeMap" => {
				self.expect('<', "expected `<`")?;
				let key = self.type_ref()?;
				self.expect(',', "expected `,` between map key and value")?;
				let value = self.type_ref()?;
				self.expect('>', "expected `>`")?;
				let kind = if base == "HashMap" { MapKind::Hash } else { MapKind::BTree };
				Ok(TypeRef::map(kind, key, value))
			}
			_ => Primitive::from_name(base)
				.filter(|_| base == word)
				.map(TypeRef::Primitive)
				.ok_or_else(|| self.error("unknown type; named types are written `location#Name`")),
		}
	}
}

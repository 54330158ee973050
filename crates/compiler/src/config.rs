//! TOML configuration for mapping generation.
//!
//! ```toml
//! types = "types.toml"          # optional catalog for the CLI
//!
//! [mappers]
//! destination = "src/mappers.rs"
//! module = "crate::mappers"
//! nil-sequence = "empty"
//!
//! [[mappings]]
//! name = "TodoMapper"
//! destination = "src/generated.rs"
//! module = "crate::generated"
//! a = { location = "crate::model", name = "TodoModel" }
//! b = { location = "crate::domain", name = "Todo" }
//! bidirectional = true
//! fields = [{ a = "done", b = "finished" }, { a = "user_id", b = "user.id" }]
//! ignores = [{ a = "validate_only" }]
//!
//! [[converters]]
//! id = "IntStringConverter"
//! register = "crate::convert::register"
//! functions = [{ source = "i32", dest = "String" }]
//! ```
//!
//! String values may reference the environment as `${VAR}` or `${VAR:default}`. Relative paths are
//! resolved against the directory of the file that names them. Problems found after parsing are
//! collected and reported together.

use std::fs;
use std::path::{Path, PathBuf};

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::ConfigError;
use crate::provider::{FieldAccess, FieldDescriptor, TypeCatalog, TypeDescriptor, TypeKind};
use crate::spec::{
	ConverterDecl, DEFAULT_RUNTIME, FieldCorrespondence, Generation, IgnoreEntry, MappingSpec,
	MappingUnit, NilCollectionPolicy, NilPolicy, ObjectRules, Operand, OutputTarget, Side, WILDCARD,
};
use crate::types::{Primitive, QualifiedName, TypeRef};

/// A loaded configuration file.
#[derive(Debug, Clone)]
pub struct Config {
	pub generation: Generation,
	/// Type catalog file named by `types`, resolved.
	pub types: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct ConfigFile {
	types: Option<String>,
	mappers: MappersSection,
	#[serde(default)]
	mappings: Vec<MappingSection>,
	#[serde(default)]
	converters: Vec<ConverterSection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct MappersSection {
	destination: String,
	module: String,
	runtime: Option<String>,
	nil_map: Option<NilPolicy>,
	nil_sequence: Option<NilPolicy>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct MappingSection {
	name: String,
	destination: String,
	module: String,
	a: Operand,
	b: Operand,
	#[serde(default)]
	bidirectional: bool,
	a_to_b: Option<String>,
	b_to_a: Option<String>,
	#[serde(default)]
	explicit_only: bool,
	#[serde(default)]
	ignore_case: bool,
	#[serde(default)]
	allow_unmapped: bool,
	nil_map: Option<NilPolicy>,
	nil_sequence: Option<NilPolicy>,
	#[serde(default)]
	fields: Vec<FieldSection>,
	#[serde(default)]
	ignores: Vec<IgnoreSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldSection {
	a: String,
	b: String,
	converter: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct IgnoreSection {
	a: Option<String>,
	b: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConverterSection {
	id: String,
	#[serde(default = "default_global")]
	global: bool,
	register: Option<String>,
	#[serde(default)]
	functions: Vec<FunctionSection>,
}

fn default_global() -> bool {
	true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FunctionSection {
	source: TypeRef,
	dest: TypeRef,
}

/// Loads and validates a configuration file.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
	let text = read(path)?;
	parse(&text, path)
}

/// Parses configuration text; `path` locates relative paths and labels errors.
pub fn parse(text: &str, path: &Path) -> Result<Config, ConfigError> {
	let file: ConfigFile = decode(text, path)?;
	let base = path.parent().unwrap_or(Path::new(""));

	let problems = validate(&file);
	if !problems.is_empty() {
		return Err(ConfigError::Invalid {
			path: path.to_path_buf(),
			problems,
		});
	}

	let defaults = NilCollectionPolicy {
		map: file.mappers.nil_map.unwrap_or_default(),
		sequence: file.mappers.nil_sequence.unwrap_or_default(),
	};
	let units = file
		.mappings
		.into_iter()
		.map(|section| mapping_unit(section, base, defaults))
		.collect();
	let converters = file
		.converters
		.into_iter()
		.map(|section| ConverterDecl {
			id: section.id,
			functions: section
				.functions
				.into_iter()
				.map(|f| (f.source, f.dest))
				.collect(),
			global: section.global,
			register: section.register,
		})
		.collect();

	let config = Config {
		generation: Generation {
			units,
			converters,
			bootstrap: OutputTarget {
				path: base.join(&file.mappers.destination),
				module: file.mappers.module,
			},
			runtime: file
				.mappers
				.runtime
				.unwrap_or_else(|| DEFAULT_RUNTIME.to_string()),
		},
		types: file.types.map(|types| base.join(types)),
	};
	tracing::debug!(
		path = %path.display(),
		units = config.generation.units.len(),
		converters = config.generation.converters.len(),
		"loaded configuration"
	);
	Ok(config)
}

fn mapping_unit(section: MappingSection, base: &Path, defaults: NilCollectionPolicy) -> MappingUnit {
	let fields = section
		.fields
		.into_iter()
		.map(|field| FieldCorrespondence {
			a: field.a,
			b: field.b,
			converter: field.converter,
		})
		.collect();
	let ignores = section
		.ignores
		.into_iter()
		.filter_map(|ignore| match (ignore.a, ignore.b) {
			(Some(path), None) => Some(IgnoreEntry { side: Side::A, path }),
			(None, Some(path)) => Some(IgnoreEntry { side: Side::B, path }),
			_ => None,
		})
		.collect();

	MappingUnit {
		spec: MappingSpec {
			id: section.name,
			a: section.a,
			b: section.b,
			bidirectional: section.bidirectional,
			a_to_b: section.a_to_b,
			b_to_a: section.b_to_a,
			rules: ObjectRules {
				explicit_only: section.explicit_only,
				ignore_case: section.ignore_case,
				allow_unmapped: section.allow_unmapped,
				nil: NilCollectionPolicy {
					map: section.nil_map.unwrap_or(defaults.map),
					sequence: section.nil_sequence.unwrap_or(defaults.sequence),
				},
				fields,
				ignores,
			},
		},
		output: OutputTarget {
			path: base.join(&section.destination),
			module: section.module,
		},
	}
}

fn validate(file: &ConfigFile) -> Vec<String> {
	let mut problems = Vec::new();
	if file.mappers.destination.trim().is_empty() {
		problems.push("mappers: destination is empty".to_string());
	}
	if file.mappers.module.trim().is_empty() {
		problems.push("mappers: module is empty".to_string());
	}

	let mut names = FxHashSet::default();
	let mut modules: FxHashMap<&str, &str> = FxHashMap::default();
	for (i, mapping) in file.mappings.iter().enumerate() {
		let at = if mapping.name.is_empty() {
			format!("mappings[{i}]")
		} else {
			format!("mappings[{i}] ({})", mapping.name)
		};
		if mapping.name.trim().is_empty() {
			problems.push(format!("{at}: name is empty"));
		} else if !names.insert(mapping.name.as_str()) {
			problems.push(format!("{at}: mapping id {} is declared more than once", mapping.name));
		}
		if mapping.destination.trim().is_empty() {
			problems.push(format!("{at}: destination is empty"));
		} else if mapping.destination == file.mappers.destination {
			problems.push(format!("{at}: destination {} is the bootstrap file", mapping.destination));
		}
		if mapping.module.trim().is_empty() {
			problems.push(format!("{at}: module is empty"));
		}
		match modules.get(mapping.destination.as_str()) {
			Some(module) if *module != mapping.module => problems.push(format!(
				"{at}: destination {} is already generated as module {module}",
				mapping.destination
			)),
			Some(_) => {}
			None => {
				modules.insert(&mapping.destination, &mapping.module);
			}
		}
		for (side, operand) in [("a", &mapping.a), ("b", &mapping.b)] {
			if operand.location.trim().is_empty() || operand.name.trim().is_empty() {
				problems.push(format!("{at}: operand {side} needs a location and a name"));
			}
		}
		for (j, field) in mapping.fields.iter().enumerate() {
			if field.a.trim().is_empty() || field.b.trim().is_empty() {
				problems.push(format!("{at}: fields[{j}] has an empty side"));
			} else if field.a == WILDCARD && field.b == WILDCARD {
				problems.push(format!("{at}: fields[{j}] maps a wildcard to a wildcard"));
			}
		}
		for (j, ignore) in mapping.ignores.iter().enumerate() {
			if ignore.a.is_some() == ignore.b.is_some() {
				problems.push(format!("{at}: ignores[{j}] must name exactly one of a or b"));
			}
		}
	}

	for (i, converter) in file.converters.iter().enumerate() {
		if converter.id.trim().is_empty() {
			problems.push(format!("converters[{i}]: id is empty"));
		}
	}
	problems
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
	#[serde(default)]
	types: Vec<TypeSection>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", deny_unknown_fields)]
enum TypeSection {
	Record {
		location: String,
		name: String,
		#[serde(default)]
		fields: Vec<FieldDecl>,
	},
	Alias {
		location: String,
		name: String,
		of: String,
	},
	Contract {
		location: String,
		name: String,
	},
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldDecl {
	name: String,
	#[serde(rename = "type")]
	ty: TypeRef,
	getter: Option<String>,
	setter: Option<String>,
}

/// Loads a type catalog file (`[[types]]` tables).
///
/// ```toml
/// [[types]]
/// kind = "record"
/// location = "crate::model"
/// name = "TodoModel"
/// fields = [{ name = "done", type = "bool" }, { name = "secret", type = "String", getter = "secret" }]
///
/// [[types]]
/// kind = "alias"
/// location = "crate::model"
/// name = "Priority"
/// of = "u8"
/// ```
pub fn load_catalog(path: &Path) -> Result<TypeCatalog, ConfigError> {
	let text = read(path)?;
	parse_catalog(&text, path)
}

pub fn parse_catalog(text: &str, path: &Path) -> Result<TypeCatalog, ConfigError> {
	let file: CatalogFile = decode(text, path)?;
	let mut catalog = TypeCatalog::new();
	let mut problems = Vec::new();

	for section in file.types {
		let descriptor = match section {
			TypeSection::Record {
				location,
				name,
				fields,
			} => TypeDescriptor {
				name: QualifiedName::new(location, name),
				kind: TypeKind::Record(fields.into_iter().map(field_descriptor).collect()),
			},
			TypeSection::Alias { location, name, of } => {
				let Some(primitive) = Primitive::from_name(&of) else {
					problems.push(format!("{location}#{name}: `{of}` is not a primitive"));
					continue;
				};
				TypeDescriptor {
					name: QualifiedName::new(location, name),
					kind: TypeKind::Alias(primitive),
				}
			}
			TypeSection::Contract { location, name } => TypeDescriptor {
				name: QualifiedName::new(location, name),
				kind: TypeKind::Contract,
			},
		};
		if let Err(err) = catalog.insert(descriptor) {
			problems.push(err.to_string());
		}
	}

	if !problems.is_empty() {
		return Err(ConfigError::Invalid {
			path: path.to_path_buf(),
			problems,
		});
	}
	tracing::debug!(path = %path.display(), types = catalog.len(), "loaded type catalog");
	Ok(catalog)
}

fn field_descriptor(decl: FieldDecl) -> FieldDescriptor {
	let access = if decl.getter.is_none() && decl.setter.is_none() {
		FieldAccess::Direct
	} else {
		FieldAccess::Accessor {
			getter: decl.getter,
			setter: decl.setter,
		}
	};
	FieldDescriptor {
		name: decl.name,
		ty: decl.ty,
		access,
	}
}

fn read(path: &Path) -> Result<String, ConfigError> {
	fs::read_to_string(path).map_err(|cause| ConfigError::Io {
		path: path.to_path_buf(),
		cause,
	})
}

/// Parses TOML, expands environment references in every string, then deserializes.
fn decode<T: DeserializeOwned>(text: &str, path: &Path) -> Result<T, ConfigError> {
	let parse_error = |cause| ConfigError::Parse {
		path: path.to_path_buf(),
		cause,
	};
	let mut table: toml::Table = toml::from_str(text).map_err(parse_error)?;
	for (_, value) in table.iter_mut() {
		expand_value(value, &|name| std::env::var(name).ok());
	}
	toml::Value::Table(table).try_into().map_err(parse_error)
}

fn expand_value(value: &mut toml::Value, lookup: &dyn Fn(&str) -> Option<String>) {
	match value {
		toml::Value::String(text) => *text = expand_env(text, lookup),
		toml::Value::Array(items) => items.iter_mut().for_each(|item| expand_value(item, lookup)),
		toml::Value::Table(table) => table
			.iter_mut()
			.for_each(|(_, item)| expand_value(item, lookup)),
		_ => {}
	}
}

/// Replaces `${VAR}` and `${VAR:default}`. Unset variables without a default expand to nothing.
pub fn expand_env(text: &str, lookup: &dyn Fn(&str) -> Option<String>) -> String {
	let mut out = String::with_capacity(text.len());
	let mut rest = text;
	while let Some(start) = rest.find("${") {
		let Some(len) = rest[start + 2..].find('}') else {
			break;
		};
		out.push_str(&rest[..start]);
		let reference = &rest[start + 2..start + 2 + len];
		let (name, default) = reference.split_once(':').unwrap_or((reference, ""));
		out.push_str(&lookup(name).unwrap_or_else(|| default.to_string()));
		rest = &rest[start + 3 + len..];
	}
	out.push_str(rest);
	out
}

#[cfg(test)]
mod tests;

use std::fs;

use pretty_assertions::assert_eq;
use rstest::rstest;

use super::*;

const CONFIG: &str = r#"
types = "types.toml"

[mappers]
destination = "out/mappers.rs"
module = "crate::mappers"
nil-sequence = "empty"

[[mappings]]
name = "TodoMapper"
destination = "out/generated.rs"
module = "crate::generated"
a = { location = "crate::model", name = "TodoModel" }
b = { location = "crate::domain", name = "Todo" }
bidirectional = true
b-to-a = "restore"
fields = [
	{ a = "done", b = "finished" },
	{ a = "ordinal", b = "ordinal", converter = "FancyIntConverter" },
]
ignores = [{ a = "validate_only" }]

[[mappings]]
name = "ListMapper"
destination = "out/generated.rs"
module = "crate::generated"
a = { location = "crate::model", name = "ListModel" }
b = { location = "crate::domain", name = "List" }
nil-sequence = "nil"
nil-map = "empty"

[[converters]]
id = "IntStringConverter"
register = "crate::convert::register"
functions = [{ source = "i32", dest = "String" }]
"#;

/// A full configuration loads into a generation with inherited nil policies and resolved paths.
#[test]
fn test_load_config() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("mapweave.toml");
	fs::write(&path, CONFIG).unwrap();

	let config = load(&path).unwrap();
	let generation = &config.generation;

	assert_eq!(config.types, Some(dir.path().join("types.toml")));
	assert_eq!(generation.bootstrap.path, dir.path().join("out/mappers.rs"));
	assert_eq!(generation.runtime, DEFAULT_RUNTIME);
	assert_eq!(generation.units.len(), 2);

	let todo = &generation.units[0];
	assert_eq!(todo.output.path, dir.path().join("out/generated.rs"));
	assert_eq!(todo.spec.method_name(crate::spec::Direction::BToA), "restore");
	assert_eq!(todo.spec.rules.nil.sequence, NilPolicy::Empty);
	assert_eq!(todo.spec.rules.nil.map, NilPolicy::Nil);
	assert_eq!(todo.spec.rules.fields[1].converter.as_deref(), Some("FancyIntConverter"));
	assert_eq!(
		todo.spec.rules.ignores,
		vec![IgnoreEntry {
			side: Side::A,
			path: "validate_only".to_string(),
		}]
	);

	let list = &generation.units[1].spec;
	assert_eq!(list.rules.nil.sequence, NilPolicy::Nil);
	assert_eq!(list.rules.nil.map, NilPolicy::Empty);

	let converter = &generation.converters[0];
	assert!(converter.global);
	assert_eq!(converter.functions, vec![(TypeRef::parse("i32").unwrap(), TypeRef::parse("String").unwrap())]);
}

/// Every validation problem is reported, not only the first.
#[test]
fn test_validation_collects_all_problems() {
	let text = r#"
[mappers]
destination = ""
module = "crate::mappers"

[[mappings]]
name = "Twice"
destination = "a.rs"
module = "crate::a"
a = { location = "", name = "A" }
b = { location = "crate::b", name = "B" }
fields = [{ a = "*", b = "*" }, { a = "", b = "x" }]
ignores = [{ a = "x", b = "y" }, {}]

[[mappings]]
name = "Twice"
destination = "a.rs"
module = "crate::other"
a = { location = "crate::a", name = "A" }
b = { location = "crate::b", name = "B" }
"#;
	let err = parse(text, Path::new("mapweave.toml")).unwrap_err();
	let ConfigError::Invalid { problems, .. } = err else {
		panic!("expected validation failure, got {err:?}");
	};
	assert_eq!(
		problems,
		vec![
			"mappers: destination is empty",
			"mappings[0] (Twice): operand a needs a location and a name",
			"mappings[0] (Twice): fields[0] maps a wildcard to a wildcard",
			"mappings[0] (Twice): fields[1] has an empty side",
			"mappings[0] (Twice): ignores[0] must name exactly one of a or b",
			"mappings[0] (Twice): ignores[1] must name exactly one of a or b",
			"mappings[1] (Twice): mapping id Twice is declared more than once",
			"mappings[1] (Twice): destination a.rs is already generated as module crate::a",
		]
	);
}

/// Unknown keys and malformed type names are parse errors.
#[rstest]
#[case("[mappers]\ndestination = \"m.rs\"\nmodule = \"crate::m\"\ncolor = \"blue\"\n")]
#[case("[mappers]\ndestination = \"m.rs\"\nmodule = \"crate::m\"\n[[converters]]\nid = \"C\"\nfunctions = [{ source = \"Vec<\", dest = \"i32\" }]\n")]
#[case("[mappers\n")]
fn test_parse_errors(#[case] text: &str) {
	assert!(matches!(
		parse(text, Path::new("mapweave.toml")),
		Err(ConfigError::Parse { .. })
	));
}

/// Missing files are I/O errors that name the path.
#[test]
fn test_missing_file() {
	let err = load(Path::new("/nonexistent/mapweave.toml")).unwrap_err();
	assert_eq!(err.to_string(), "failed to read /nonexistent/mapweave.toml");
}

/// `${VAR}` and `${VAR:default}` references expand through the lookup.
#[rstest]
#[case("${HOME_DIR}/out", "/home/me/out")]
#[case("${MISSING:fallback}.rs", "fallback.rs")]
#[case("${MISSING}", "")]
#[case("no refs", "no refs")]
#[case("${UNTERMINATED", "${UNTERMINATED")]
#[case("${A:x}${HOME_DIR}", "x/home/me")]
fn test_expand_env(#[case] text: &str, #[case] expected: &str) {
	let lookup = |name: &str| (name == "HOME_DIR").then(|| "/home/me".to_string());
	assert_eq!(expand_env(text, &lookup), expected);
}

const CATALOG: &str = r#"
[[types]]
kind = "record"
location = "crate::model"
name = "UserModel"
fields = [
	{ name = "id", type = "String" },
	{ name = "secret", type = "Option<String>", getter = "secret", setter = "set_secret" },
]

[[types]]
kind = "alias"
location = "crate::model"
name = "Priority"
of = "u8"

[[types]]
kind = "contract"
location = "crate::model"
name = "Clock"
"#;

/// Catalog files produce records with accessor fields, aliases and contracts.
#[test]
fn test_parse_catalog() {
	use crate::provider::TypeProvider;

	let catalog = parse_catalog(CATALOG, Path::new("types.toml")).unwrap();
	assert_eq!(catalog.len(), 3);

	let user = catalog.describe("crate::model", "UserModel").unwrap();
	let secret = user.field("secret", false).unwrap();
	assert_eq!(secret.ty, TypeRef::parse("Option<String>").unwrap());
	assert!(matches!(secret.access, FieldAccess::Accessor { .. }));
	assert_eq!(
		catalog.describe("crate::model", "Priority").unwrap().alias_of(),
		Some(Primitive::U8)
	);
}

/// Aliases of non-primitives and duplicate declarations are collected as problems.
#[test]
fn test_catalog_problems() {
	let text = format!("{CATALOG}\n[[types]]\nkind = \"alias\"\nlocation = \"m\"\nname = \"Bad\"\nof = \"Vec\"\n\n[[types]]\nkind = \"contract\"\nlocation = \"crate::model\"\nname = \"Clock\"\n");
	let err = parse_catalog(&text, Path::new("types.toml")).unwrap_err();
	let ConfigError::Invalid { problems, .. } = err else {
		panic!("expected validation failure");
	};
	assert_eq!(
		problems,
		vec![
			"m#Bad: `Vec` is not a primitive",
			"type crate::model#Clock is declared twice",
		]
	);
}

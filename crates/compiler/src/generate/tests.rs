use std::path::Path;

use pretty_assertions::assert_eq;

use super::*;
use crate::provider::{FieldDescriptor, TypeCatalog};
use crate::spec::{ConverterDecl, DEFAULT_RUNTIME, MappingUnit, Operand};
use crate::types::TypeRef;

fn ty(text: &str) -> TypeRef {
	TypeRef::parse(text).unwrap()
}

fn types() -> TypeCatalog {
	TypeCatalog::new()
		.record(
			"crate::model",
			"TodoModel",
			vec![
				FieldDescriptor::direct("id", ty("String")),
				FieldDescriptor::direct("done", ty("bool")),
			],
		)
		.record(
			"crate::domain",
			"Todo",
			vec![
				FieldDescriptor::direct("id", ty("String")),
				FieldDescriptor::direct("finished", ty("bool")),
			],
		)
		.contract("crate::domain", "Clock")
}

fn unit(spec: MappingSpec, path: &str) -> MappingUnit {
	MappingUnit {
		spec,
		output: OutputTarget {
			path: PathBuf::from(path),
			module: "crate::generated".to_string(),
		},
	}
}

fn todo_spec(id: &str) -> MappingSpec {
	MappingSpec::new(
		id,
		Operand::new("crate::model", "TodoModel"),
		Operand::new("crate::domain", "Todo"),
	)
	.bidirectional()
	.field("done", "finished")
}

fn generation(units: Vec<MappingUnit>) -> Generation {
	Generation {
		units,
		converters: vec![ConverterDecl {
			id: "IntStringConverter".to_string(),
			functions: vec![(ty("i32"), ty("String"))],
			global: true,
			register: Some("crate::convert::register".to_string()),
		}],
		bootstrap: OutputTarget {
			path: PathBuf::from("out/mappers.rs"),
			module: "crate::mappers".to_string(),
		},
		runtime: DEFAULT_RUNTIME.to_string(),
	}
}

/// Units sharing a path land in one file; the bootstrap comes last.
#[test]
fn test_files_grouped_by_path() {
	let types = types();
	let files = Compiler::new(&types)
		.generate(&generation(vec![
			unit(todo_spec("TodoMapper"), "out/b.rs"),
			unit(todo_spec("OtherTodoMapper"), "out/a.rs"),
			unit(todo_spec("ThirdTodoMapper"), "out/b.rs"),
		]))
		.unwrap();
	let paths: Vec<&Path> = files.iter().map(|file| file.path.as_path()).collect();
	assert_eq!(
		paths,
		vec![
			Path::new("out/a.rs"),
			Path::new("out/b.rs"),
			Path::new("out/mappers.rs"),
		]
	);
	let b = &files[1].contents;
	let first = b.find("pub trait TodoMapper:").unwrap();
	let third = b.find("pub trait ThirdTodoMapper:").unwrap();
	assert!(first < third);
	assert_eq!(files[2].module, "crate::mappers");
}

/// The bootstrap registers each unit with its exported operations and calls converter hooks.
#[test]
fn test_bootstrap() {
	let types = types();
	let files = Compiler::new(&types)
		.generate(&generation(vec![unit(todo_spec("TodoMapper"), "out/generated.rs")]))
		.unwrap();
	let bootstrap = &files[1].contents;
	let lines: Vec<&str> = bootstrap.lines().map(str::trim).collect();
	for line in [
		"use crate::domain as pkg_crate_domain;",
		"use crate::generated as pkg_crate_generated;",
		"use crate::model as pkg_crate_model;",
		"pub fn register(registry: &mut rt::Registry) {",
		"let exports = rt::Exports::new()",
		".func(rt::FuncDecl::mapper(\"crate::model#TodoModel\", \"crate::domain#Todo\", \"todo_model_to_todo\", |owner: &std::sync::Arc<dyn pkg_crate_generated::TodoMapper>| {",
		"rt::mapper_fn::<pkg_crate_model::TodoModel, pkg_crate_domain::Todo, _>(move |ctx, source, dest| {",
		"pkg_crate_generated::TodoMapper::todo_model_to_todo(&*owner, ctx, source, dest)",
		".func(rt::FuncDecl::mapper(\"crate::domain#Todo\", \"crate::model#TodoModel\", \"todo_to_todo_model\", |owner: &std::sync::Arc<dyn pkg_crate_generated::TodoMapper>| {",
		"}));",
		"Ok(std::sync::Arc::new(pkg_crate_generated::TodoMapperImpl::new(registry)?))",
		"crate::convert::register(registry);",
		"pub fn new_registry() -> rt::Registry {",
	] {
		assert!(lines.contains(&line), "missing `{line}` in:\n{bootstrap}");
	}
}

/// Two runs over the same input produce the same files.
#[test]
fn test_deterministic() {
	let types = types();
	let generation = generation(vec![unit(todo_spec("TodoMapper"), "out/generated.rs")]);
	let compiler = Compiler::new(&types);
	assert_eq!(compiler.generate(&generation).unwrap(), compiler.generate(&generation).unwrap());
}

#[test]
fn test_duplicate_mapping_id() {
	let types = types();
	let err = Compiler::new(&types)
		.generate(&generation(vec![
			unit(todo_spec("TodoMapper"), "out/a.rs"),
			unit(todo_spec("TodoMapper"), "out/b.rs"),
		]))
		.unwrap_err();
	assert_eq!(
		err,
		CompileError::DuplicateMappingId {
			id: "TodoMapper".to_string()
		}
	);
}

/// Both directions of a bidirectional unit need distinct operation names.
#[test]
fn test_duplicate_method() {
	let types = types();
	let mut spec = todo_spec("TodoMapper");
	spec.a_to_b = Some("copy".to_string());
	spec.b_to_a = Some("copy".to_string());
	let err = Compiler::new(&types)
		.generate(&generation(vec![unit(spec, "out/a.rs")]))
		.unwrap_err();
	assert_eq!(
		err,
		CompileError::DuplicateMethod {
			unit: "TodoMapper".to_string(),
			method: "copy".to_string(),
		}
	);
}

/// Operands must be records, and must exist.
#[test]
fn test_operand_checks() {
	let types = types();
	let compiler = Compiler::new(&types);

	let clock = MappingSpec::new(
		"ClockMapper",
		Operand::new("crate::domain", "Clock"),
		Operand::new("crate::domain", "Todo"),
	);
	assert_eq!(
		compiler
			.generate(&generation(vec![unit(clock, "out/a.rs")]))
			.unwrap_err(),
		CompileError::NotARecord {
			unit: "ClockMapper".to_string(),
			ty: "crate::domain#Clock".to_string(),
		}
	);

	let missing = MappingSpec::new(
		"GhostMapper",
		Operand::new("crate::model", "Ghost"),
		Operand::new("crate::domain", "Todo"),
	);
	assert!(matches!(
		compiler.generate(&generation(vec![unit(missing, "out/a.rs")])),
		Err(CompileError::Provider { unit, .. }) if unit == "GhostMapper"
	));
}

/// Without the explicit correspondence, `finished` has no source and the unit fails.
#[test]
fn test_unmapped_field() {
	let types = types();
	let spec = MappingSpec::new(
		"TodoMapper",
		Operand::new("crate::model", "TodoModel"),
		Operand::new("crate::domain", "Todo"),
	);
	let err = Compiler::new(&types)
		.generate(&generation(vec![unit(spec, "out/a.rs")]))
		.unwrap_err();
	assert_eq!(
		err,
		CompileError::UnmappedField {
			unit: "TodoMapper".to_string(),
			field: "finished".to_string(),
			ty: "crate::domain#Todo".to_string(),
		}
	);
}

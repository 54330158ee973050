//! Code Synthesizer.
//!
//! Renders mapping units and the registry bootstrap as Rust source text. Generated files contain
//! no inner attributes, so they can be pulled in with `include!` as well as used as modules.

mod emit;
mod imports;
mod writer;

use crate::classify::{Classifier, ConversionCatalog};
use crate::error::CompileError;
use crate::provider::{DescriptorCache, TypeKind};
use crate::spec::{ConverterDecl, MappingSpec, OutputTarget};
use crate::types::TypeRef;

use self::emit::UnitEmitter;
use self::imports::Imports;
use self::writer::CodeWriter;

pub(crate) const HEADER: &str = "// Code generated by mapweave. DO NOT EDIT.";

/// Module alias of the runtime crate in generated files.
pub(crate) const RUNTIME_ALIAS: &str = "rt";

/// Rust spelling of `ty` as seen from the file owning `imports`.
pub(crate) fn render_type(
	imports: &mut Imports,
	cache: &DescriptorCache<'_>,
	unit: &str,
	ty: &TypeRef,
) -> Result<String, CompileError> {
	Ok(match ty {
		TypeRef::Primitive(p) => p.rust_name().to_string(),
		TypeRef::Named(name) => {
			let descriptor = cache.describe(name).map_err(CompileError::provider(unit))?;
			let path = imports.path(&name.location, &name.name);
			match descriptor.kind {
				TypeKind::Contract => format!("std::sync::Arc<dyn {path}>"),
				_ => path,
			}
		}
		TypeRef::Optional(inner) => format!("Option<{}>", render_type(imports, cache, unit, inner)?),
		TypeRef::Sequence(element) => {
			format!("Vec<{}>", render_type(imports, cache, unit, element)?)
		}
		TypeRef::Array(element, len) => {
			format!("[{}; {len}]", render_type(imports, cache, unit, element)?)
		}
		TypeRef::Map(kind, key, value) => format!(
			"std::collections::{}<{}, {}>",
			kind.name(),
			render_type(imports, cache, unit, key)?,
			render_type(imports, cache, unit, value)?
		),
	})
}

struct Operation {
	name: String,
	source_ty: String,
	dest_ty: String,
	body: String,
}

impl Operation {
	fn signature(&self) -> String {
		format!(
			"fn {}(&self, ctx: &{RUNTIME_ALIAS}::Context, source: &{}, dest: &mut {}) -> Result<(), {RUNTIME_ALIAS}::MapError>",
			self.name, self.source_ty, self.dest_ty
		)
	}
}

/// One generated source file holding any number of mapping units.
pub(crate) struct UnitFile<'a> {
	cache: &'a DescriptorCache<'a>,
	catalog: &'a ConversionCatalog,
	runtime: String,
	imports: Imports,
	out: CodeWriter,
}

impl<'a> UnitFile<'a> {
	pub fn new(
		module: &str,
		runtime: &str,
		cache: &'a DescriptorCache<'a>,
		catalog: &'a ConversionCatalog,
	) -> Self {
		Self {
			cache,
			catalog,
			runtime: runtime.to_string(),
			imports: Imports::new(module),
			out: CodeWriter::new(),
		}
	}

	/// Appends the traits, implementation and constructor of `spec`.
	pub fn add_unit(&mut self, spec: &MappingSpec) -> Result<(), CompileError> {
		let classifier = Classifier::new(self.cache, self.catalog);
		let mut emitter = UnitEmitter::new(spec, self.cache, classifier, &mut self.imports);

		let mut operations = Vec::new();
		for direction in spec.directions() {
			let source_ty = TypeRef::Named(spec.operand(direction.source()).qualified());
			let dest_ty = TypeRef::Named(spec.operand(direction.dest()).qualified());
			let source = self
				.cache
				.describe(&spec.operand(direction.source()).qualified())
				.map_err(CompileError::provider(&spec.id))?;
			let dest = self
				.cache
				.describe(&spec.operand(direction.dest()).qualified())
				.map_err(CompileError::provider(&spec.id))?;

			let mut body = CodeWriter::new();
			emitter.emit_operation(&mut body, direction, &source, &dest)?;
			operations.push(Operation {
				name: spec.method_name(direction),
				source_ty: emitter.render(&source_ty)?,
				dest_ty: emitter.render(&dest_ty)?,
				body: body.finish(),
			});
		}

		let out = &mut self.out;
		let name = &spec.id;
		out.blank();
		for (trait_name, doc) in [
			(format!("{name}Helper"), format!("Hook run after every `{name}` operation.")),
			(name.clone(), format!("Mapping operations of `{name}`.")),
		] {
			out.line(&format!("/// {doc}"));
			out.open(&format!("pub trait {trait_name}: Send + Sync {{"));
			for operation in &operations {
				out.line(&format!("{};", operation.signature()));
			}
			out.close("}");
			out.blank();
		}

		out.open(&format!("pub struct {name}Impl {{"));
		out.line(&format!("helper: Option<std::sync::Arc<dyn {name}Helper>>,"));
		for (i, slot) in emitter.converters.iter().enumerate() {
			out.line(&format!(
				"converter{i}: Option<{RUNTIME_ALIAS}::ConverterFn<{}, {}>>,",
				slot.source_ty, slot.dest_ty
			));
		}
		for (i, slot) in emitter.mappers.iter().enumerate() {
			out.line(&format!(
				"mapper{i}: Option<{RUNTIME_ALIAS}::MapperFn<{}, {}>>,",
				slot.source_ty, slot.dest_ty
			));
		}
		out.close("}");
		out.blank();

		out.open(&format!("impl {name}Impl {{"));
		out.line("/// Binds the helper and every delegate. Missing ones stay unbound.");
		out.open(&format!(
			"pub fn new(registry: &{RUNTIME_ALIAS}::Registry) -> Result<Self, {RUNTIME_ALIAS}::RegistryError> {{"
		));
		out.open("Ok(Self {");
		out.line(&format!(
			"helper: {RUNTIME_ALIAS}::not_found_as_none(registry.get_as::<std::sync::Arc<dyn {name}Helper>>({:?}))?,",
			format!("{name}Helper")
		));
		for (i, slot) in emitter.converters.iter().enumerate() {
			out.line(&format!(
				"converter{i}: {RUNTIME_ALIAS}::not_found_as_none(registry.converter::<{}, {}>({:?}, {:?}, {}))?,",
				slot.source_ty,
				slot.dest_ty,
				slot.source.canonical_name(),
				slot.dest.canonical_name(),
				match &slot.owner {
					Some(owner) => format!("Some({owner:?})"),
					None => "None".to_string(),
				}
			));
		}
		for (i, slot) in emitter.mappers.iter().enumerate() {
			out.line(&format!(
				"mapper{i}: {RUNTIME_ALIAS}::not_found_as_none(registry.mapper::<{}, {}>({:?}, {:?}, None))?,",
				slot.source_ty,
				slot.dest_ty,
				slot.source.canonical_name(),
				slot.dest.canonical_name()
			));
		}
		out.close("})");
		out.close("}");
		out.close("}");
		out.blank();

		out.line("#[allow(unused_variables, unused_mut, unused_assignments)]");
		out.open(&format!("impl {name} for {name}Impl {{"));
		for (i, operation) in operations.iter().enumerate() {
			if i > 0 {
				out.blank();
			}
			out.open(&format!("{} {{", operation.signature()));
			if !operation.body.is_empty() {
				out.line(operation.body.trim_end_matches('\n'));
			}
			out.open("if let Some(helper) = &self.helper {");
			out.line(&format!("helper.{}(ctx, source, dest)?;", operation.name));
			out.close("}");
			out.line("Ok(())");
			out.close("}");
		}
		out.close("}");

		tracing::debug!(
			unit = %spec.id,
			converters = emitter.converters.len(),
			mappers = emitter.mappers.len(),
			"synthesized unit"
		);
		Ok(())
	}

	pub fn finish(self) -> String {
		let mut file = CodeWriter::new();
		file.line(HEADER);
		file.blank();
		file.line(&format!("use {} as {RUNTIME_ALIAS};", self.runtime));
		for line in self.imports.lines() {
			file.line(&line);
		}
		let mut text = file.finish();
		text.push_str(&self.out.finish());
		text
	}
}

/// Renders the bootstrap file: `register` adds a factory per unit, then calls every declared
/// conversion unit's registration function; `new_registry` builds a registry from scratch.
pub(crate) fn bootstrap(
	units: &[(&MappingSpec, &OutputTarget)],
	converters: &[ConverterDecl],
	target: &OutputTarget,
	runtime: &str,
	cache: &DescriptorCache<'_>,
) -> Result<String, CompileError> {
	let mut imports = Imports::new(&target.module);
	let mut out = CodeWriter::new();

	out.blank();
	out.line("/// Adds every generated mapping unit and declared conversion unit to `registry`.");
	out.open(&format!(
		"pub fn register(registry: &mut {RUNTIME_ALIAS}::Registry) {{"
	));
	for (spec, output) in units {
		let name = &spec.id;
		let unit_trait = imports.path(&output.module, name);
		let unit_impl = imports.path(&output.module, &format!("{name}Impl"));

		out.open(&format!("let exports = {RUNTIME_ALIAS}::Exports::new()"));
		let directions = spec.directions();
		for (i, direction) in directions.iter().enumerate() {
			let source = TypeRef::Named(spec.operand(direction.source()).qualified());
			let dest = TypeRef::Named(spec.operand(direction.dest()).qualified());
			let source_ty = render_type(&mut imports, cache, name, &source)?;
			let dest_ty = render_type(&mut imports, cache, name, &dest)?;
			let method = spec.method_name(*direction);

			out.open(&format!(
				".func({RUNTIME_ALIAS}::FuncDecl::mapper({:?}, {:?}, {method:?}, |owner: &std::sync::Arc<dyn {unit_trait}>| {{",
				source.canonical_name(),
				dest.canonical_name()
			));
			out.line("let owner = owner.clone();");
			out.open(&format!(
				"{RUNTIME_ALIAS}::mapper_fn::<{source_ty}, {dest_ty}, _>(move |ctx, source, dest| {{"
			));
			out.line(&format!("{unit_trait}::{method}(&*owner, ctx, source, dest)"));
			out.close("})");
			out.close(if i + 1 == directions.len() { "}));" } else { "}))" });
		}
		out.dedent();
		out.open(&format!(
			"registry.add_factory({name:?}, exports, |registry: &{RUNTIME_ALIAS}::Registry| -> Result<std::sync::Arc<dyn {unit_trait}>, {RUNTIME_ALIAS}::BoxError> {{"
		));
		out.line(&format!("Ok(std::sync::Arc::new({unit_impl}::new(registry)?))"));
		out.close("});");
	}
	for converter in converters {
		if let Some(register) = &converter.register {
			out.line(&format!("{register}(registry);"));
		}
	}
	out.close("}");
	out.blank();
	out.line("/// Registry holding everything [`register`] adds.");
	out.open(&format!("pub fn new_registry() -> {RUNTIME_ALIAS}::Registry {{"));
	out.line(&format!("let mut registry = {RUNTIME_ALIAS}::Registry::new();"));
	out.line("register(&mut registry);");
	out.line("registry");
	out.close("}");

	let mut file = CodeWriter::new();
	file.line(HEADER);
	file.blank();
	file.line(&format!("use {runtime} as {RUNTIME_ALIAS};"));
	for line in imports.lines() {
		file.line(&line);
	}
	let mut text = file.finish();
	text.push_str(&out.finish());
	Ok(text)
}

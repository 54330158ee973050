//! Statement emission for one mapping unit.
//!
//! Names used in generated bodies: `source`, `dest` and `ctx` are the operation parameters,
//! `vN` are source-side bindings, `tN` destination temporaries, `eN`/`iN`/`kN` loop bindings.
//! Counters are per unit, so the output only depends on the unit itself.

use std::sync::Arc;

use crate::classify::{ClassifyError, Classifier, Strategy, Widening};
use crate::error::CompileError;
use crate::provider::{DescriptorCache, FieldAccess, TypeDescriptor, TypeKind};
use crate::resolve::{self, ResolvedField, Segment};
use crate::spec::{Direction, MappingSpec, NilCollectionPolicy, NilPolicy, ObjectRules};
use crate::types::{QualifiedName, TypeRef};

use super::imports::Imports;
use super::writer::CodeWriter;
use super::{RUNTIME_ALIAS, render_type};

/// Readable expression on the source side.
#[derive(Debug, Clone)]
struct Source {
	text: String,
	/// `text` is a reference binding rather than a place.
	is_ref: bool,
}

impl Source {
	fn root() -> Self {
		Self {
			text: "source".to_string(),
			is_ref: true,
		}
	}

	fn binding(name: String) -> Self {
		Self {
			text: name,
			is_ref: true,
		}
	}

	fn field(&self, name: &str) -> Self {
		Self {
			text: format!("{}.{name}", self.text),
			is_ref: false,
		}
	}

	/// Owned copy of the value.
	fn read(&self, ty: &TypeRef) -> String {
		match ty {
			TypeRef::Primitive(p) if p.is_copy() && self.is_ref => format!("*{}", self.text),
			TypeRef::Primitive(p) if p.is_copy() => self.text.clone(),
			_ => format!("{}.clone()", self.text),
		}
	}

	fn borrow(&self) -> String {
		if self.is_ref {
			self.text.clone()
		} else {
			format!("&{}", self.text)
		}
	}
}

/// Writable location on the destination side.
#[derive(Debug, Clone)]
enum Target {
	/// `place` is assignable; `base` spells the same place for projections and method calls.
	Place { base: String, place: String },
	/// Accessor pseudo-field.
	Setter {
		base: String,
		method: String,
		getter: Option<String>,
	},
}

impl Target {
	fn root() -> Self {
		Self::Place {
			base: "dest".to_string(),
			place: "*dest".to_string(),
		}
	}

	fn local(name: &str) -> Self {
		Self::Place {
			base: name.to_string(),
			place: name.to_string(),
		}
	}

	fn base(&self) -> &str {
		match self {
			Self::Place { base, .. } | Self::Setter { base, .. } => base,
		}
	}

	fn assign(&self, out: &mut CodeWriter, expr: &str) {
		match self {
			Self::Place { place, .. } => out.line(&format!("{place} = {expr};")),
			Self::Setter { base, method, .. } => out.line(&format!("{base}.{method}({expr});")),
		}
	}
}

#[derive(Debug)]
pub(crate) struct ConverterSlot {
	pub source: TypeRef,
	pub dest: TypeRef,
	pub owner: Option<String>,
	pub source_ty: String,
	pub dest_ty: String,
}

#[derive(Debug)]
pub(crate) struct MapperSlot {
	pub source: TypeRef,
	pub dest: TypeRef,
	pub source_ty: String,
	pub dest_ty: String,
}

/// Emits the bodies of one unit's operations and collects the delegate slots they use.
pub(crate) struct UnitEmitter<'a, 'i> {
	spec: &'a MappingSpec,
	cache: &'a DescriptorCache<'a>,
	classifier: Classifier<'a>,
	imports: &'i mut Imports,
	nil: NilCollectionPolicy,
	direction: Direction,
	pub converters: Vec<ConverterSlot>,
	pub mappers: Vec<MapperSlot>,
	next_var: usize,
	/// Record pairs inlined on the current path.
	stack: Vec<(String, String)>,
}

impl<'a, 'i> UnitEmitter<'a, 'i> {
	pub fn new(
		spec: &'a MappingSpec,
		cache: &'a DescriptorCache<'a>,
		classifier: Classifier<'a>,
		imports: &'i mut Imports,
	) -> Self {
		Self {
			spec,
			cache,
			classifier,
			imports,
			nil: spec.rules.nil,
			direction: Direction::AToB,
			converters: Vec::new(),
			mappers: Vec::new(),
			next_var: 0,
			stack: Vec::new(),
		}
	}

	/// Writes the body of the operation for `direction` into `out`.
	pub fn emit_operation(
		&mut self,
		out: &mut CodeWriter,
		direction: Direction,
		source: &TypeDescriptor,
		dest: &TypeDescriptor,
	) -> Result<(), CompileError> {
		self.direction = direction;
		self.stack.clear();
		let rules = self.spec.rules.clone();
		self.emit_record(out, &rules, source, dest, &Source::root(), &Target::root())
	}

	pub fn render(&mut self, ty: &TypeRef) -> Result<String, CompileError> {
		render_type(self.imports, self.cache, &self.spec.id, ty)
	}

	fn emit_record(
		&mut self,
		out: &mut CodeWriter,
		rules: &ObjectRules,
		source: &TypeDescriptor,
		dest: &TypeDescriptor,
		src: &Source,
		dst: &Target,
	) -> Result<(), CompileError> {
		let fields = resolve::resolve(&self.spec.id, self.direction, rules, source, dest, self.cache)?;
		for field in &fields {
			self.emit_field(out, field, src, dst)?;
		}
		Ok(())
	}

	fn emit_field(
		&mut self,
		out: &mut CodeWriter,
		field: &ResolvedField,
		src: &Source,
		dst: &Target,
	) -> Result<(), CompileError> {
		let depth = out.depth();
		let name = field.dest.to_string();

		let mut value = src.clone();
		let count = field.source.segments.len();
		for (i, segment) in field.source.segments.iter().enumerate() {
			value = self.read_segment(out, &value, segment);
			if i + 1 < count && segment.ty.is_optional() {
				let var = self.var("v");
				out.open(&format!("if let Some({var}) = {} {{", value.borrow()));
				value = Source::binding(var);
			}
		}

		let mut target = dst.clone();
		let count = field.dest.segments.len();
		for (i, segment) in field.dest.segments.iter().enumerate() {
			let base = target.base().to_string();
			target = match &segment.access {
				FieldAccess::Accessor {
					setter: Some(setter),
					getter,
				} if i + 1 == count => Target::Setter {
					base,
					method: setter.clone(),
					getter: getter.clone(),
				},
				_ if i + 1 < count && segment.ty.is_optional() => {
					let var = self.var("t");
					out.line(&format!(
						"let {var} = {base}.{}.get_or_insert_with(Default::default);",
						segment.name
					));
					Target::Place {
						place: format!("*{var}"),
						base: var,
					}
				}
				_ => Target::local(&format!("{base}.{}", segment.name)),
			};
		}

		let strategy = self
			.classifier
			.classify(
				&field.source.ty,
				&field.dest.ty,
				field.converter.as_deref(),
				self.nil,
			)
			.map_err(|err| match err {
				ClassifyError::Mismatch {
					source_type,
					dest_type,
				} => CompileError::TypeMismatch {
					unit: self.spec.id.clone(),
					field: name.clone(),
					source_type,
					dest_type,
				},
				ClassifyError::Provider(cause) => CompileError::Provider {
					unit: self.spec.id.clone(),
					cause,
				},
			})?;
		tracing::trace!(unit = %self.spec.id, field = %name, ?strategy, "classified field");

		self.convert(
			out,
			&value,
			&field.source.ty,
			&field.dest.ty,
			&strategy,
			&target,
			&name,
		)?;

		while out.depth() > depth {
			out.close("}");
		}
		Ok(())
	}

	fn read_segment(&mut self, out: &mut CodeWriter, base: &Source, segment: &Segment) -> Source {
		match &segment.access {
			FieldAccess::Accessor {
				getter: Some(getter),
				..
			} => {
				let var = self.var("v");
				out.line(&format!("let {var} = {}.{getter}();", base.text));
				Source {
					text: var,
					is_ref: false,
				}
			}
			_ => base.field(&segment.name),
		}
	}

	#[allow(clippy::too_many_arguments)]
	fn convert(
		&mut self,
		out: &mut CodeWriter,
		src: &Source,
		sty: &TypeRef,
		dty: &TypeRef,
		strategy: &Strategy,
		target: &Target,
		field: &str,
	) -> Result<(), CompileError> {
		if let Some(expr) = self.value_expr(src, sty, dty, strategy)? {
			target.assign(out, &expr);
			return Ok(());
		}

		if let TypeRef::Optional(inner) = sty {
			let var = self.var("v");
			out.open(&format!("if let Some({var}) = {} {{", src.borrow()));
			self.convert(out, &Source::binding(var), inner, dty, strategy, target, field)?;
			let dest_inner = dty.strip_optional();
			if self.empty_on_nil(sty) && dest_inner.is_collection() {
				out.reopen("} else {");
				target.assign(out, &wrap(dty, &empty_collection(dest_inner)));
			} else if dty.is_optional() && !self.is_object(inner)? {
				out.reopen("} else {");
				target.assign(out, "None");
			}
			out.close("}");
			return Ok(());
		}

		match strategy {
			Strategy::Custom { owner, fallback } => {
				let slot = self.converter_slot(sty, dty.strip_optional(), owner.as_deref())?;
				out.open(&format!("if let Some(convert) = &self.{slot} {{"));
				target.assign(out, &wrap(dty, &format!("convert(ctx, {})?", src.borrow())));
				out.reopen("} else {");
				match fallback {
					Some(fallback) => self.convert(out, src, sty, dty, fallback, target, field)?,
					None => out.line(&format!("{};", missing_converter(sty, dty))),
				}
				out.close("}");
			}
			Strategy::Structural => self.structural(out, src, sty, dty, target, field)?,
			Strategy::Collection { element, .. } => {
				self.collection(out, src, sty, dty, element, target, field)?
			}
			Strategy::Identity | Strategy::Widening(_) => {}
		}
		Ok(())
	}

	/// Side-effect free expression for the conversion, when one exists.
	fn value_expr(
		&mut self,
		src: &Source,
		sty: &TypeRef,
		dty: &TypeRef,
		strategy: &Strategy,
	) -> Result<Option<String>, CompileError> {
		if sty == dty && *strategy == Strategy::Identity && !self.empty_on_nil(sty) {
			return Ok(Some(src.read(sty)));
		}
		if sty.is_optional() {
			return Ok(None);
		}
		let dest_inner = dty.strip_optional();
		Ok(self
			.bare_expr(src, sty, dest_inner, strategy)?
			.map(|expr| wrap(dty, &expr)))
	}

	fn bare_expr(
		&mut self,
		src: &Source,
		sty: &TypeRef,
		dty: &TypeRef,
		strategy: &Strategy,
	) -> Result<Option<String>, CompileError> {
		Ok(Some(match strategy {
			Strategy::Identity => src.read(sty),
			Strategy::Widening(Widening::Numeric { to }) => {
				format!("{}::from({})", to.rust_name(), src.read(sty))
			}
			Strategy::Widening(Widening::Wrap { alias }) => {
				let path = self.imports.path(&alias.location, &alias.name);
				format!("{path}({})", src.read(sty))
			}
			Strategy::Widening(Widening::Unwrap) => Source {
				text: format!("{}.0", src.text),
				is_ref: false,
			}
			.read(dty),
			Strategy::Custom { owner, fallback } => {
				let fallback = match fallback {
					Some(fallback) => match self.bare_expr(src, sty, dty, fallback)? {
						Some(expr) => expr,
						None => return Ok(None),
					},
					None => missing_converter(sty, dty),
				};
				let slot = self.converter_slot(sty, dty, owner.as_deref())?;
				format!(
					"match &self.{slot} {{\n\tSome(convert) => convert(ctx, {})?,\n\tNone => {fallback},\n}}",
					src.borrow()
				)
			}
			Strategy::Structural | Strategy::Collection { .. } => return Ok(None),
		}))
	}

	fn structural(
		&mut self,
		out: &mut CodeWriter,
		src: &Source,
		sty: &TypeRef,
		dty: &TypeRef,
		target: &Target,
		field: &str,
	) -> Result<(), CompileError> {
		let dest_inner = dty.strip_optional();
		let (Some(source_name), Some(dest_name)) = (sty.as_named(), dest_inner.as_named()) else {
			return Err(self.mismatch(field, sty, dty));
		};
		let pair = (sty.canonical_name(), dest_inner.canonical_name());
		if self.stack.contains(&pair) {
			return Err(CompileError::CyclicType {
				unit: self.spec.id.clone(),
				field: field.to_string(),
				source_type: pair.0,
				dest_type: pair.1,
			});
		}
		let source = self.describe(source_name)?;
		let dest = self.describe(dest_name)?;
		let slot = self.mapper_slot(sty, dest_inner)?;

		let (place, finish) = self.mutable_place(out, dty, target)?;
		let Target::Place { place: lvalue, .. } = &place else {
			return Err(self.mismatch(field, sty, dty));
		};
		out.open(&format!("if let Some(map) = &self.{slot} {{"));
		out.line(&format!("map(ctx, {}, &mut {lvalue})?;", src.borrow()));
		out.reopen("} else {");
		self.stack.push(pair);
		let nested = self.spec.rules.nested();
		self.emit_record(out, &nested, &source, &dest, src, &place)?;
		self.stack.pop();
		out.close("}");
		if let Some(line) = finish {
			out.line(&line);
		}
		Ok(())
	}

	/// A place of the non-optional destination type, plus the statement that stores it back when
	/// the target is a setter.
	fn mutable_place(
		&mut self,
		out: &mut CodeWriter,
		dty: &TypeRef,
		target: &Target,
	) -> Result<(Target, Option<String>), CompileError> {
		match target {
			Target::Place { base, .. } if dty.is_optional() => {
				let var = self.var("t");
				out.line(&format!("let {var} = {base}.get_or_insert_with(Default::default);"));
				Ok((
					Target::Place {
						place: format!("*{var}"),
						base: var,
					},
					None,
				))
			}
			Target::Place { .. } => Ok((target.clone(), None)),
			Target::Setter {
				base,
				method,
				getter,
			} => {
				let ty = self.render(dty.strip_optional())?;
				let init = match getter {
					Some(getter) if dty.is_optional() => {
						format!("{base}.{getter}().unwrap_or_default()")
					}
					Some(getter) => format!("{base}.{getter}()"),
					None => "Default::default()".to_string(),
				};
				let var = self.var("t");
				out.line(&format!("let mut {var}: {ty} = {init};"));
				let store = format!("{base}.{method}({});", wrap(dty, &var));
				Ok((Target::local(&var), Some(store)))
			}
		}
	}

	#[allow(clippy::too_many_arguments)]
	fn collection(
		&mut self,
		out: &mut CodeWriter,
		src: &Source,
		sty: &TypeRef,
		dty: &TypeRef,
		element: &Strategy,
		target: &Target,
		field: &str,
	) -> Result<(), CompileError> {
		let dest_inner = dty.strip_optional();
		let dest_ty = self.render(dest_inner)?;
		let tmp = self.var("t");
		match (sty, dest_inner) {
			(TypeRef::Map(_, _, source_value), TypeRef::Map(_, _, dest_value)) => {
				out.line(&format!("let mut {tmp}: {dest_ty} = Default::default();"));
				let key = self.var("k");
				let elem = self.var("e");
				out.open(&format!("for ({key}, {elem}) in {}.iter() {{", src.text));
				let value = self.element(out, Source::binding(elem), source_value, dest_value, element, field)?;
				out.line(&format!("{tmp}.insert({key}.clone(), {value});"));
				out.close("}");
			}
			(TypeRef::Array(source_elem, _), TypeRef::Array(dest_elem, _)) => {
				out.line(&format!(
					"let mut {tmp}: {dest_ty} = std::array::from_fn(|_| Default::default());"
				));
				let index = self.var("i");
				let elem = self.var("e");
				out.open(&format!(
					"for ({index}, {elem}) in {}.iter().enumerate() {{",
					src.text
				));
				let slot = Target::local(&format!("{tmp}[{index}]"));
				self.convert(out, &Source::binding(elem), source_elem, dest_elem, element, &slot, field)?;
				out.close("}");
			}
			(TypeRef::Sequence(source_elem) | TypeRef::Array(source_elem, _), TypeRef::Sequence(dest_elem)) => {
				out.line(&format!(
					"let mut {tmp}: {dest_ty} = Vec::with_capacity({}.len());",
					src.text
				));
				let elem = self.var("e");
				out.open(&format!("for {elem} in {}.iter() {{", src.text));
				let value = self.element(out, Source::binding(elem), source_elem, dest_elem, element, field)?;
				out.line(&format!("{tmp}.push({value});"));
				out.close("}");
			}
			_ => return Err(self.mismatch(field, sty, dty)),
		}
		target.assign(out, &wrap(dty, &tmp));
		Ok(())
	}

	/// Expression holding one converted element, emitting a temporary when needed.
	fn element(
		&mut self,
		out: &mut CodeWriter,
		src: Source,
		sty: &TypeRef,
		dty: &TypeRef,
		strategy: &Strategy,
		field: &str,
	) -> Result<String, CompileError> {
		if let Some(expr) = self.value_expr(&src, sty, dty, strategy)? {
			return Ok(expr);
		}
		let var = self.var("v");
		let ty = self.render(dty)?;
		out.line(&format!("let mut {var}: {ty} = Default::default();"));
		self.convert(out, &src, sty, dty, strategy, &Target::local(&var), field)?;
		Ok(var)
	}

	fn converter_slot(
		&mut self,
		source: &TypeRef,
		dest: &TypeRef,
		owner: Option<&str>,
	) -> Result<String, CompileError> {
		let found = self.converters.iter().position(|slot| {
			slot.source == *source && slot.dest == *dest && slot.owner.as_deref() == owner
		});
		let index = match found {
			Some(index) => index,
			None => {
				let slot = ConverterSlot {
					source: source.clone(),
					dest: dest.clone(),
					owner: owner.map(str::to_string),
					source_ty: self.render(source)?,
					dest_ty: self.render(dest)?,
				};
				self.converters.push(slot);
				self.converters.len() - 1
			}
		};
		Ok(format!("converter{index}"))
	}

	fn mapper_slot(&mut self, source: &TypeRef, dest: &TypeRef) -> Result<String, CompileError> {
		let found = self
			.mappers
			.iter()
			.position(|slot| slot.source == *source && slot.dest == *dest);
		let index = match found {
			Some(index) => index,
			None => {
				let slot = MapperSlot {
					source: source.clone(),
					dest: dest.clone(),
					source_ty: self.render(source)?,
					dest_ty: self.render(dest)?,
				};
				self.mappers.push(slot);
				self.mappers.len() - 1
			}
		};
		Ok(format!("mapper{index}"))
	}

	/// Whether a nil value of `ty` becomes an empty collection.
	fn empty_on_nil(&self, ty: &TypeRef) -> bool {
		let TypeRef::Optional(inner) = ty else {
			return false;
		};
		let policy = match inner.strip_optional() {
			TypeRef::Sequence(_) | TypeRef::Array(..) => self.nil.sequence,
			TypeRef::Map(..) => self.nil.map,
			_ => return false,
		};
		policy == NilPolicy::Empty
	}

	/// Records and contracts: an absent source of these kinds skips the field.
	fn is_object(&self, ty: &TypeRef) -> Result<bool, CompileError> {
		let Some(name) = ty.strip_optional().as_named() else {
			return Ok(false);
		};
		Ok(matches!(
			self.describe(name)?.kind,
			TypeKind::Record(_) | TypeKind::Contract
		))
	}

	fn describe(&self, name: &QualifiedName) -> Result<Arc<TypeDescriptor>, CompileError> {
		self.cache
			.describe(name)
			.map_err(CompileError::provider(&self.spec.id))
	}

	fn mismatch(&self, field: &str, sty: &TypeRef, dty: &TypeRef) -> CompileError {
		CompileError::TypeMismatch {
			unit: self.spec.id.clone(),
			field: field.to_string(),
			source_type: sty.to_string(),
			dest_type: dty.to_string(),
		}
	}

	fn var(&mut self, prefix: &str) -> String {
		let var = format!("{prefix}{}", self.next_var);
		self.next_var += 1;
		var
	}
}

fn wrap(ty: &TypeRef, expr: &str) -> String {
	if ty.is_optional() {
		format!("Some({expr})")
	} else {
		expr.to_string()
	}
}

fn empty_collection(ty: &TypeRef) -> String {
	match ty {
		TypeRef::Sequence(_) => "Vec::new()".to_string(),
		TypeRef::Array(..) => "std::array::from_fn(|_| Default::default())".to_string(),
		_ => "Default::default()".to_string(),
	}
}

fn missing_converter(sty: &TypeRef, dty: &TypeRef) -> String {
	format!(
		"return Err({RUNTIME_ALIAS}::MapError::MissingConverter {{ source_type: {:?}, dest_type: {:?} }})",
		sty.canonical_name(),
		dty.canonical_name()
	)
}

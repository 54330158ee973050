//! Correspondence Resolver.
//!
//! Pairs every destination field with the source expression it is copied from. Iteration follows
//! destination declaration order, so the output (and the generated code) is deterministic.
//!
//! # Rules
//!
//! - A correspondence with [`WILDCARD`] on either side consumes the whole operand and is the only
//!   resolved field.
//! - Destination fields ignored on the destination side are skipped.
//! - Explicit correspondences naming a destination field exactly replace its implicit match.
//!   Several may target the same field and are kept in declaration order.
//! - Explicit correspondences into a nested path (`user.id`) leave the implicit match of the
//!   parent field in place and are resolved after it. A parent without a same-named source is
//!   not reported as unmapped.
//! - Otherwise, unless `explicit_only`, a same-named readable source field is used. A source field
//!   ignored on the source side means "deliberately unmapped". A missing one is an error unless
//!   `allow_unmapped`.
//! - Intermediate path segments must be direct record fields.

use crate::error::CompileError;
use crate::provider::{DescriptorCache, FieldAccess, FieldDescriptor, TypeDescriptor, names_match};
use crate::spec::{Direction, ObjectRules, Side, WILDCARD};
use crate::types::TypeRef;

/// One step of a field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
	/// Declared field name.
	pub name: String,
	pub access: FieldAccess,
	/// Declared field type, `Option` included.
	pub ty: TypeRef,
}

/// Path from an operand root to a field. No segments means the whole operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
	pub segments: Vec<Segment>,
	/// Type at the end of the path.
	pub ty: TypeRef,
}

impl FieldPath {
	fn whole(ty: TypeRef) -> Self {
		Self {
			segments: Vec::new(),
			ty,
		}
	}

	pub fn is_whole(&self) -> bool {
		self.segments.is_empty()
	}

	pub fn last(&self) -> Option<&Segment> {
		self.segments.last()
	}
}

impl std::fmt::Display for FieldPath {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		if self.segments.is_empty() {
			return f.write_str(WILDCARD);
		}
		for (i, segment) in self.segments.iter().enumerate() {
			if i > 0 {
				f.write_str(".")?;
			}
			f.write_str(&segment.name)?;
		}
		Ok(())
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedField {
	pub source: FieldPath,
	pub dest: FieldPath,
	pub converter: Option<String>,
}

struct Explicit<'r> {
	source: &'r str,
	dest: &'r str,
	converter: Option<&'r str>,
}

/// Resolves the fields copied from `source` into `dest` in `direction`.
pub fn resolve(
	unit: &str,
	direction: Direction,
	rules: &ObjectRules,
	source: &TypeDescriptor,
	dest: &TypeDescriptor,
	cache: &DescriptorCache<'_>,
) -> Result<Vec<ResolvedField>, CompileError> {
	let walker = Walker {
		unit,
		ignore_case: rules.ignore_case,
		cache,
	};
	let (source_side, dest_side) = (direction.source(), direction.dest());
	let source_ty = TypeRef::Named(source.name.clone());
	let dest_ty = TypeRef::Named(dest.name.clone());

	let explicit: Vec<Explicit<'_>> = rules
		.fields
		.iter()
		.map(|field| Explicit {
			source: field.path(source_side),
			dest: field.path(dest_side),
			converter: field.converter.as_deref(),
		})
		.collect();

	if let Some(entry) = explicit
		.iter()
		.find(|entry| entry.source == WILDCARD || entry.dest == WILDCARD)
	{
		let source_path = if entry.source == WILDCARD {
			FieldPath::whole(source_ty)
		} else {
			walker.walk(source_side, source, entry.source, Access::Read)?
		};
		let dest_path = if entry.dest == WILDCARD {
			FieldPath::whole(dest_ty)
		} else {
			walker.walk(dest_side, dest, entry.dest, Access::Write)?
		};
		return Ok(vec![ResolvedField {
			source: source_path,
			dest: dest_path,
			converter: entry.converter.map(str::to_string),
		}]);
	}

	// Walk every explicit path up front so unknown names fail even when their field is ignored.
	let mut paired = Vec::with_capacity(explicit.len());
	for entry in &explicit {
		let source_path = walker.walk(source_side, source, entry.source, Access::Read)?;
		let dest_path = walker.walk(dest_side, dest, entry.dest, Access::Write)?;
		paired.push((entry, source_path, dest_path));
	}

	let dest_fields = dest.fields().ok_or_else(|| not_a_record(unit, dest))?;
	let mut resolved = Vec::new();
	for field in dest_fields {
		if rules.is_ignored(dest_side, &field.name) {
			continue;
		}

		let named: Vec<usize> = (0..paired.len())
			.filter(|&i| paired[i].2.segments[0].name == field.name)
			.collect();
		let explicit_field = |i: usize| {
			let (entry, source_path, dest_path) = &paired[i];
			(!rules.is_ignored(dest_side, entry.dest)).then(|| ResolvedField {
				source: source_path.clone(),
				dest: dest_path.clone(),
				converter: entry.converter.map(str::to_string),
			})
		};
		if named.iter().any(|&i| paired[i].2.segments.len() == 1) {
			resolved.extend(named.into_iter().filter_map(explicit_field));
			continue;
		}

		// Nested entries refine the field; the field itself still maps by name when it can, and
		// its nested entries are written on top of that copy.
		let refined = !named.is_empty();
		if !rules.explicit_only && field.writable() {
			match source.field(&field.name, rules.ignore_case) {
				Some(source_field) if rules.is_ignored(source_side, &source_field.name) => {}
				Some(source_field) if source_field.readable() => resolved.push(ResolvedField {
					source: FieldPath {
						segments: vec![segment(source_field)],
						ty: source_field.ty.clone(),
					},
					dest: FieldPath {
						segments: vec![segment(field)],
						ty: field.ty.clone(),
					},
					converter: None,
				}),
				_ if refined || rules.allow_unmapped => {
					tracing::debug!(unit, field = %field.name, ty = %dest.name, "unmapped field skipped");
				}
				_ => {
					return Err(CompileError::UnmappedField {
						unit: unit.to_string(),
						field: field.name.clone(),
						ty: dest.name.to_string(),
					});
				}
			}
		}
		resolved.extend(named.into_iter().filter_map(explicit_field));
	}
	Ok(resolved)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Access {
	Read,
	Write,
}

struct Walker<'w> {
	unit: &'w str,
	ignore_case: bool,
	cache: &'w DescriptorCache<'w>,
}

impl Walker<'_> {
	/// Descends `path` from the record `root`, checking access on the last segment.
	fn walk(
		&self,
		side: Side,
		root: &TypeDescriptor,
		path: &str,
		access: Access,
	) -> Result<FieldPath, CompileError> {
		let names: Vec<&str> = path.split('.').collect();
		let mut record = std::sync::Arc::new(root.clone());
		let mut segments = Vec::with_capacity(names.len());

		for (i, name) in names.iter().enumerate() {
			let field = record
				.fields()
				.ok_or_else(|| not_a_record(self.unit, &record))?
				.iter()
				.find(|field| names_match(&field.name, name, self.ignore_case))
				.ok_or_else(|| CompileError::UnknownField {
					unit: self.unit.to_string(),
					side,
					path: path.to_string(),
				})?
				.clone();

			let last = i + 1 == names.len();
			if last {
				let allowed = match access {
					Access::Read => field.readable(),
					Access::Write => field.writable(),
				};
				if !allowed {
					return Err(self.unsupported(
						path,
						match access {
							Access::Read => "source field is not readable",
							Access::Write => "destination field is not writable",
						},
					));
				}
			} else {
				if field.access != FieldAccess::Direct {
					return Err(self.unsupported(path, "intermediate segments must be direct fields"));
				}
				let Some(next) = field.ty.strip_optional().as_named() else {
					return Err(self.unsupported(path, "intermediate segments must be records"));
				};
				record = self
					.cache
					.describe(next)
					.map_err(CompileError::provider(self.unit))?;
			}
			segments.push(segment(&field));
		}

		let ty = segments
			.last()
			.map(|segment: &Segment| segment.ty.clone())
			.ok_or_else(|| self.unsupported(path, "empty path"))?;
		Ok(FieldPath { segments, ty })
	}

	fn unsupported(&self, path: &str, reason: &'static str) -> CompileError {
		CompileError::UnsupportedPath {
			unit: self.unit.to_string(),
			path: path.to_string(),
			reason,
		}
	}
}

fn segment(field: &FieldDescriptor) -> Segment {
	Segment {
		name: field.name.clone(),
		access: field.access.clone(),
		ty: field.ty.clone(),
	}
}

fn not_a_record(unit: &str, descriptor: &TypeDescriptor) -> CompileError {
	CompileError::NotARecord {
		unit: unit.to_string(),
		ty: descriptor.name.to_string(),
	}
}

#[cfg(test)]
mod tests;

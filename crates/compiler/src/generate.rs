//! Compiler entry point: turns a [`Generation`] into generated files.

use std::collections::BTreeMap;
use std::path::PathBuf;

use rustc_hash::FxHashSet;

use crate::classify::ConversionCatalog;
use crate::error::CompileError;
use crate::provider::{DescriptorCache, TypeProvider};
use crate::spec::{Generation, MappingSpec, OutputTarget, Side};
use crate::synth::{self, UnitFile};

/// One file produced by a compiler run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
	pub path: PathBuf,
	/// Module path the file is expected to be included as.
	pub module: String,
	pub contents: String,
}

/// Mapping compiler bound to a type provider.
///
/// Every run is independent: descriptors are memoized for the duration of one
/// [`Compiler::generate`] call only.
pub struct Compiler<'p> {
	provider: &'p dyn TypeProvider,
}

impl<'p> Compiler<'p> {
	pub fn new(provider: &'p dyn TypeProvider) -> Self {
		Self { provider }
	}

	/// Generates one file per output path plus the bootstrap file, in path order.
	///
	/// Any error aborts the run; nothing is returned for the units that did succeed.
	pub fn generate(&self, generation: &Generation) -> Result<Vec<GeneratedFile>, CompileError> {
		let mut ids = FxHashSet::default();
		for unit in &generation.units {
			if !ids.insert(unit.spec.id.as_str()) {
				return Err(CompileError::DuplicateMappingId {
					id: unit.spec.id.clone(),
				});
			}
		}

		let cache = DescriptorCache::new(self.provider);
		let catalog = ConversionCatalog::from_decls(&generation.converters);

		let mut groups: BTreeMap<&PathBuf, (&OutputTarget, Vec<&MappingSpec>)> = BTreeMap::new();
		for unit in &generation.units {
			check_unit(&unit.spec, &cache)?;
			groups
				.entry(&unit.output.path)
				.or_insert_with(|| (&unit.output, Vec::new()))
				.1
				.push(&unit.spec);
		}

		let mut files = Vec::with_capacity(groups.len() + 1);
		for (path, (output, specs)) in groups {
			let mut file = UnitFile::new(&output.module, &generation.runtime, &cache, &catalog);
			for spec in &specs {
				file.add_unit(spec)?;
				tracing::info!(unit = %spec.id, file = %path.display(), "generated mapping unit");
			}
			tracing::info!(file = %path.display(), units = specs.len(), "generated file");
			files.push(GeneratedFile {
				path: path.clone(),
				module: output.module.clone(),
				contents: file.finish(),
			});
		}

		let units: Vec<_> = generation
			.units
			.iter()
			.map(|unit| (&unit.spec, &unit.output))
			.collect();
		let contents = synth::bootstrap(
			&units,
			&generation.converters,
			&generation.bootstrap,
			&generation.runtime,
			&cache,
		)?;
		tracing::info!(file = %generation.bootstrap.path.display(), "generated bootstrap");
		files.push(GeneratedFile {
			path: generation.bootstrap.path.clone(),
			module: generation.bootstrap.module.clone(),
			contents,
		});

		tracing::debug!(types = cache.len(), files = files.len(), "generation finished");
		Ok(files)
	}
}

/// Operand and method-name checks that do not need field resolution.
fn check_unit(spec: &MappingSpec, cache: &DescriptorCache<'_>) -> Result<(), CompileError> {
	for side in [Side::A, Side::B] {
		let name = spec.operand(side).qualified();
		let descriptor = cache
			.describe(&name)
			.map_err(CompileError::provider(&spec.id))?;
		if !descriptor.is_record() {
			return Err(CompileError::NotARecord {
				unit: spec.id.clone(),
				ty: name.to_string(),
			});
		}
	}

	let methods: Vec<String> = spec
		.directions()
		.into_iter()
		.map(|direction| spec.method_name(direction))
		.collect();
	if let [forward, backward] = methods.as_slice()
		&& forward == backward
	{
		return Err(CompileError::DuplicateMethod {
			unit: spec.id.clone(),
			method: forward.clone(),
		});
	}
	Ok(())
}

#[cfg(test)]
mod tests;

//! Function index: `(source type, dest type)` to the bindings registered for it.
//!
//! # Invariants
//!
//! - Entries for a pair keep insertion order. Unqualified lookups scan from the end, so later
//!   registrations (including merged ones) shadow earlier ones.
//! - Shadowed entries stay reachable through owner-qualified lookups.
//! - A kind-filtered unqualified lookup prefers the newest global entry of that kind, so a
//!   converter and a mapper for the same pair never shadow each other.

use rustc_hash::FxHashMap;

use crate::func::{Binder, Exports, FuncKind};

#[derive(Clone)]
pub(crate) struct IndexEntry {
	pub owner: String,
	pub operation: String,
	pub kind: FuncKind,
	pub global: bool,
	pub bind: Binder,
}

#[derive(Clone, Default)]
pub(crate) struct FunctionIndex {
	by_pair: FxHashMap<(String, String), Vec<IndexEntry>>,
}

impl FunctionIndex {
	pub fn insert(&mut self, owner: &str, exports: &Exports) {
		for decl in &exports.funcs {
			tracing::trace!(
				owner,
				source = %decl.source_type,
				dest = %decl.dest_type,
				operation = %decl.operation,
				global = exports.global,
				"indexing function"
			);
			self.by_pair
				.entry((decl.source_type.clone(), decl.dest_type.clone()))
				.or_default()
				.push(IndexEntry {
					owner: owner.to_string(),
					operation: decl.operation.clone(),
					kind: decl.kind,
					global: exports.global,
					bind: decl.bind.clone(),
				});
		}
	}

	/// Appends every entry of `other` after this index's entries for the same pair.
	pub fn extend(&mut self, other: FunctionIndex) {
		for (pair, entries) in other.by_pair {
			self.by_pair.entry(pair).or_default().extend(entries);
		}
	}

	/// Finds the binding for a pair.
	///
	/// With `owner`, only that owner's entry counts and `kind` is ignored; the caller reports a
	/// kind mismatch. Without `owner`, the newest global entry of `kind` wins, falling back to the
	/// newest global entry of any kind.
	pub fn lookup(
		&self,
		source_type: &str,
		dest_type: &str,
		owner: Option<&str>,
		kind: Option<FuncKind>,
	) -> Option<&IndexEntry> {
		let entries = self
			.by_pair
			.get(&(source_type.to_string(), dest_type.to_string()))?;
		if let Some(id) = owner {
			return entries.iter().rev().find(|entry| entry.owner == id);
		}
		let mut globals = entries.iter().rev().filter(|entry| entry.global);
		match kind {
			Some(kind) => globals
				.clone()
				.find(|entry| entry.kind == kind)
				.or_else(|| globals.next()),
			None => globals.next(),
		}
	}

	pub fn entries(&self, source_type: &str, dest_type: &str) -> &[IndexEntry] {
		self.by_pair
			.get(&(source_type.to_string(), dest_type.to_string()))
			.map(Vec::as_slice)
			.unwrap_or_default()
	}

	pub fn len(&self) -> usize {
		self.by_pair.values().map(Vec::len).sum()
	}
}

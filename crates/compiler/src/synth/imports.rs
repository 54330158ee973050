use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

/// Module aliases used by one generated file.
///
/// Every foreign location gets one alias, `pkg_<location>` with non-identifier characters folded
/// into `_`. Locations that fold to the same alias are numbered in order of first use.
#[derive(Debug)]
pub(crate) struct Imports {
	module: String,
	aliases: FxHashMap<String, String>,
	taken: FxHashMap<String, usize>,
}

impl Imports {
	pub fn new(module: &str) -> Self {
		Self {
			module: module.to_string(),
			aliases: FxHashMap::default(),
			taken: FxHashMap::default(),
		}
	}

	/// Path prefix for items of `location`, or `None` when it is the file's own module.
	pub fn qualify(&mut self, location: &str) -> Option<&str> {
		if location == self.module {
			return None;
		}
		if !self.aliases.contains_key(location) {
			let base = alias_for(location);
			let count = self.taken.entry(base.clone()).or_insert(0);
			*count += 1;
			let alias = match *count {
				1 => base,
				n => format!("{base}_{n}"),
			};
			self.aliases.insert(location.to_string(), alias);
		}
		self.aliases.get(location).map(String::as_str)
	}

	/// Rust path of item `name` declared at `location`.
	pub fn path(&mut self, location: &str, name: &str) -> String {
		match self.qualify(location) {
			Some(alias) => format!("{alias}::{name}"),
			None => name.to_string(),
		}
	}

	/// `use` lines sorted by location.
	pub fn lines(&self) -> Vec<String> {
		let sorted: BTreeMap<_, _> = self.aliases.iter().collect();
		sorted
			.into_iter()
			.map(|(location, alias)| format!("use {location} as {alias};"))
			.collect()
	}
}

fn alias_for(location: &str) -> String {
	let folded: Vec<&str> = location
		.split(|c: char| !c.is_ascii_alphanumeric())
		.filter(|part| !part.is_empty())
		.collect();
	format!("pkg_{}", folded.join("_"))
}


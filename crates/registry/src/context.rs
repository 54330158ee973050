use std::any::Any;
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

/// Request-scoped values handed to every mapping call.
///
/// Generated code only forwards the context; helpers and hand-written conversions read from it.
#[derive(Clone, Default)]
pub struct Context {
	values: FxHashMap<&'static str, Arc<dyn Any + Send + Sync>>,
}

impl Context {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns a copy of this context with `value` stored under `key`.
	pub fn with_value<T: Any + Send + Sync>(mut self, key: &'static str, value: T) -> Self {
		self.values.insert(key, Arc::new(value));
		self
	}

	pub fn value<T: Any>(&self, key: &str) -> Option<&T> {
		self.values.get(key)?.downcast_ref::<T>()
	}
}

impl fmt::Debug for Context {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut keys: Vec<_> = self.values.keys().collect();
		keys.sort();
		f.debug_struct("Context").field("keys", &keys).finish()
	}
}

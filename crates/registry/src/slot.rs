//! Per-id storage with exactly-once lazy resolution.
//!
//! # Role
//!
//! A slot is either born resolved (`add`) or holds a factory (`add_factory`) that runs on the
//! first `get`. Resolution is serialized per slot by [`OnceLock`]: concurrent first callers block
//! on that id only and all observe the single outcome, success or failure.

use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crate::func::Object;
use crate::{BoxError, Registry, RegistryError};

pub(crate) type Factory = Arc<dyn Fn(&Registry) -> Result<Object, BoxError> + Send + Sync>;

/// Observable lifecycle of a registry entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotState {
	/// Factory registered, not yet invoked.
	Registered,
	/// Factory running on some thread.
	Resolving,
	Resolved,
	/// Factory failed; the failure is cached.
	Failed,
}

pub(crate) struct Slot {
	factory: Option<Factory>,
	resolving: AtomicBool,
	cell: OnceLock<Result<Object, RegistryError>>,
}

impl Slot {
	pub fn resolved(object: Object) -> Self {
		let cell = OnceLock::new();
		let _ = cell.set(Ok(object));
		Self {
			factory: None,
			resolving: AtomicBool::new(false),
			cell,
		}
	}

	pub fn lazy(factory: Factory) -> Self {
		Self {
			factory: Some(factory),
			resolving: AtomicBool::new(false),
			cell: OnceLock::new(),
		}
	}

	pub fn state(&self) -> SlotState {
		match self.cell.get() {
			None if self.resolving.load(Ordering::Acquire) => SlotState::Resolving,
			None => SlotState::Registered,
			Some(Ok(_)) => SlotState::Resolved,
			Some(Err(_)) => SlotState::Failed,
		}
	}

	pub fn resolve(&self, id: &str, registry: &Registry) -> Result<Object, RegistryError> {
		if let Some(outcome) = self.cell.get() {
			return outcome.clone();
		}

		let _guard = ResolvingGuard::enter(registry, id)?;
		self.cell
			.get_or_init(|| {
				let Some(factory) = &self.factory else {
					return Err(RegistryError::NotFound { id: id.to_string() });
				};
				tracing::trace!(id, "resolving factory");
				self.resolving.store(true, Ordering::Release);
				let outcome = factory(registry).map_err(|err| {
					tracing::warn!(id, error = %err, "factory failed");
					RegistryError::Construction {
						id: id.to_string(),
						cause: Arc::from(err),
					}
				});
				self.resolving.store(false, Ordering::Release);
				outcome
			})
			.clone()
	}
}

thread_local! {
	static RESOLVING: RefCell<Vec<(usize, String)>> = const { RefCell::new(Vec::new()) };
}

/// Marks `(registry, id)` as resolving on this thread for the guard's lifetime.
struct ResolvingGuard {
	key: (usize, String),
}

impl ResolvingGuard {
	fn enter(registry: &Registry, id: &str) -> Result<Self, RegistryError> {
		let key = (registry as *const Registry as usize, id.to_string());
		RESOLVING.with(|stack| {
			let mut stack = stack.borrow_mut();
			if stack.contains(&key) {
				return Err(RegistryError::Cycle { id: id.to_string() });
			}
			stack.push(key.clone());
			Ok(Self { key })
		})
	}
}

impl Drop for ResolvingGuard {
	fn drop(&mut self) {
		RESOLVING.with(|stack| {
			let mut stack = stack.borrow_mut();
			if let Some(pos) = stack.iter().rposition(|key| *key == self.key) {
				stack.remove(pos);
			}
		});
	}
}

use std::sync::Arc;

/// Boxed error returned by factories and hand-written conversions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Registry lookup and resolution failures.
///
/// [`RegistryError::is_not_found`] separates "nothing registered" from "registered but
/// unusable", so generated units can fall back to their default strategy on the former and
/// fail hard on the latter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
	/// No object is registered under `id`.
	#[error("object {id} not found")]
	NotFound { id: String },

	/// The function index has no usable entry for the type pair.
	#[error("functions for {source_type} -> {dest_type} not found{}", owner_suffix(.owner))]
	FuncNotFound {
		source_type: String,
		dest_type: String,
		owner: Option<String>,
	},

	/// A factory failed while resolving `id`. Cached; every later `get` observes the same failure.
	#[error("failed to create {id}: {cause}")]
	Construction {
		id: String,
		#[source]
		cause: Arc<dyn std::error::Error + Send + Sync>,
	},

	/// The object or bound function is not of the requested type.
	#[error("object {id} is not a {expected}")]
	WrongType { id: String, expected: &'static str },

	/// The bound function exists but is of the other kind.
	#[error(
		"function for {source_type} -> {dest_type} is a {} function, not a {} function",
		kind_name(*.is_mapper),
		kind_name(!*.is_mapper)
	)]
	WrongKind {
		source_type: String,
		dest_type: String,
		is_mapper: bool,
		is_converter: bool,
	},

	/// `id` was requested again while its own factory was still running on this thread.
	#[error("cyclic resolution of {id}")]
	Cycle { id: String },
}

fn owner_suffix(owner: &Option<String>) -> String {
	owner.as_ref().map(|id| format!(" in {id}")).unwrap_or_default()
}

fn kind_name(is_mapper: bool) -> &'static str {
	if is_mapper { "mapper" } else { "converter" }
}

impl RegistryError {
	/// Returns true if nothing was registered for the lookup.
	pub fn is_not_found(&self) -> bool {
		matches!(self, Self::NotFound { .. } | Self::FuncNotFound { .. })
	}

	/// Returns true if the lookup hit a mapper function where a converter was requested.
	pub fn is_mapper(&self) -> bool {
		matches!(self, Self::WrongKind { is_mapper: true, .. })
	}

	/// Returns true if the lookup hit a converter function where a mapper was requested.
	pub fn is_converter(&self) -> bool {
		matches!(self, Self::WrongKind { is_converter: true, .. })
	}
}

/// Failure of a generated or hand-written mapping call.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
	/// A custom conversion was required but no delegate was bound and no fallback exists.
	#[error("no converter bound for {source_type} -> {dest_type}")]
	MissingConverter {
		source_type: &'static str,
		dest_type: &'static str,
	},

	#[error(transparent)]
	Registry(#[from] RegistryError),

	#[error("{0}")]
	Message(String),

	#[error(transparent)]
	Other(BoxError),
}

impl MapError {
	pub fn msg(message: impl Into<String>) -> Self {
		Self::Message(message.into())
	}

	pub fn other(err: impl Into<BoxError>) -> Self {
		Self::Other(err.into())
	}
}

/// Maps [`RegistryError::is_not_found`] failures to `Ok(None)`.
///
/// Used by generated constructors: a missing delegate is a valid state, anything else is not.
pub fn not_found_as_none<T>(result: Result<T, RegistryError>) -> Result<Option<T>, RegistryError> {
	match result {
		Ok(value) => Ok(Some(value)),
		Err(err) if err.is_not_found() => Ok(None),
		Err(err) => Err(err),
	}
}

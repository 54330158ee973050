use std::path::PathBuf;

use crate::provider::ProviderError;
use crate::spec::Side;

/// Generation failures. Any of these aborts the whole mapping unit; no partial code is emitted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
	#[error("{unit}: unmapped field `{field}` of {ty}")]
	UnmappedField { unit: String, field: String, ty: String },

	#[error("{unit}: side {side} has no field `{path}`")]
	UnknownField { unit: String, side: Side, path: String },

	#[error("{unit}: cannot map `{field}`: {source_type} is not compatible with {dest_type}")]
	TypeMismatch {
		unit: String,
		field: String,
		source_type: String,
		dest_type: String,
	},

	#[error("mapping id {id} is declared more than once")]
	DuplicateMappingId { id: String },

	#[error("{unit}: operation `{method}` is generated for both directions")]
	DuplicateMethod { unit: String, method: String },

	#[error("{unit}: cyclic type graph at `{field}` ({source_type} -> {dest_type})")]
	CyclicType {
		unit: String,
		field: String,
		source_type: String,
		dest_type: String,
	},

	#[error("{unit}: {cause}")]
	Provider {
		unit: String,
		#[source]
		cause: ProviderError,
	},

	#[error("{unit}: {ty} is not a record type")]
	NotARecord { unit: String, ty: String },

	#[error("{unit}: unsupported path `{path}`: {reason}")]
	UnsupportedPath {
		unit: String,
		path: String,
		reason: &'static str,
	},
}

impl CompileError {
	pub(crate) fn provider(unit: &str) -> impl FnOnce(ProviderError) -> Self + '_ {
		move |cause| Self::Provider {
			unit: unit.to_string(),
			cause,
		}
	}
}

/// Configuration and catalog loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("failed to read {path}")]
	Io {
		path: PathBuf,
		#[source]
		cause: std::io::Error,
	},

	#[error("failed to parse {path}")]
	Parse {
		path: PathBuf,
		#[source]
		cause: toml::de::Error,
	},

	#[error("invalid configuration {path}:{}", .problems.iter().map(|p| format!("\n  - {p}")).collect::<String>())]
	Invalid { path: PathBuf, problems: Vec<String> },
}

//! Error types for registry bookkeeping, configuration and request buffers.

use thiserror::Error;

/// Errors surfaced by name validation and configuration loading.
///
/// Invalidation, thread identity lookups and request execution never fail;
/// only inputs that would corrupt the composite mapping keys are rejected.
#[derive(Debug, Error)]
pub enum EventLoopError {
	/// A thread or role name was empty.
	#[error("thread/role name must not be empty")]
	EmptyName,

	/// A thread or role name contained the composite key separator.
	#[error("thread/role name {name:?} must not contain '/'")]
	InvalidName {
		/// The rejected name.
		name: String,
	},

	/// Configuration TOML could not be parsed.
	#[error("invalid event loop configuration: {0}")]
	Config(#[from] toml::de::Error),
}

/// Result type for event loop registry operations.
pub type Result<T> = std::result::Result<T, EventLoopError>;

/// Request buffer enqueue error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RequestBufferError {
	/// The buffer holds `capacity` pending requests already.
	#[error("request buffer full (capacity {capacity})")]
	Full {
		/// Buffer capacity.
		capacity: usize,
	},
	/// The buffer was closed by its consumer.
	#[error("request buffer closed")]
	Closed,
}

/// Checks that `name` can be used as one half of a composite mapping key.
pub(crate) fn validate_name(name: &str) -> Result<()> {
	if name.is_empty() {
		return Err(EventLoopError::EmptyName);
	}
	if name.contains('/') {
		return Err(EventLoopError::InvalidName { name: name.to_owned() });
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rejects_empty_and_separator_names() {
		assert!(matches!(validate_name(""), Err(EventLoopError::EmptyName)));
		assert!(matches!(validate_name("gui/audio"), Err(EventLoopError::InvalidName { name }) if name == "gui/audio"));
		assert!(validate_name("gui").is_ok());
	}
}

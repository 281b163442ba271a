//! Event loop configuration.

use serde::Deserialize;

use crate::error::Result;

/// Returns the default number of pending requests per pre-registered buffer.
fn default_request_capacity() -> u32 {
	256
}

fn default_reap_stale_on_claim() -> bool {
	true
}

/// Tunables for request buffer pre-registration and claiming.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EventLoopConfig {
	/// Capacity handed to every request buffer factory during pre-registration.
	#[serde(default = "default_request_capacity")]
	pub request_capacity: u32,
	/// Drop mappings whose emitting thread has exited when a consumer claims its buffers.
	#[serde(default = "default_reap_stale_on_claim")]
	pub reap_stale_on_claim: bool,
}

impl Default for EventLoopConfig {
	fn default() -> Self {
		Self {
			request_capacity: default_request_capacity(),
			reap_stale_on_claim: default_reap_stale_on_claim(),
		}
	}
}

impl EventLoopConfig {
	/// Parses a configuration from TOML. Missing keys take their defaults.
	pub fn from_toml(src: &str) -> Result<Self> {
		Ok(toml::from_str(src)?)
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::error::EventLoopError;

	#[test]
	fn empty_document_uses_defaults() {
		let config = EventLoopConfig::from_toml("").unwrap();
		assert_eq!(config, EventLoopConfig::default());
		assert_eq!(config.request_capacity, 256);
		assert!(config.reap_stale_on_claim);
	}

	#[test]
	fn overrides_are_applied() {
		let config = EventLoopConfig::from_toml(
			r#"
			request_capacity = 64
			reap_stale_on_claim = false
			"#,
		)
		.unwrap();
		assert_eq!(
			config,
			EventLoopConfig {
				request_capacity: 64,
				reap_stale_on_claim: false,
			}
		);
	}

	#[test]
	fn unknown_keys_are_rejected() {
		let err = EventLoopConfig::from_toml("request_size = 12").unwrap_err();
		assert!(matches!(err, EventLoopError::Config(_)));
	}
}

use std::env;

use tracing::warn;

use crate::constants::{DEBUG_ENV, MAX_CPUS, VERBOSITY_ENV};

/// Settings for a measurement session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerConfig {
	/// Snapshot capacity; more online processors than this is a fatal error
	pub max_cpus: usize,
	/// Detailed tables are written above `VERBOSE_REPORT_THRESHOLD`
	pub verbosity: u32,
	/// Logs the correction factor on each calculation
	pub debug: bool,
}

impl Default for SamplerConfig {
	fn default() -> Self {
		Self {
			max_cpus: MAX_CPUS,
			verbosity: 0,
			debug: false,
		}
	}
}

impl SamplerConfig {
	/// Default settings with `CPU_UTIL_VERBOSITY` / `CPU_UTIL_DEBUG` applied
	pub fn from_env() -> Self {
		Self::default().with_overrides(env::var(VERBOSITY_ENV).ok().as_deref(), env::var(DEBUG_ENV).ok().as_deref())
	}

	/// Applies raw override values; unparsable ones are ignored with a warning
	pub fn with_overrides(mut self, verbosity: Option<&str>, debug: Option<&str>) -> Self {
		if let Some(raw) = verbosity {
			match raw.trim().parse() {
				Ok(level) => self.verbosity = level,
				Err(_) => warn!("ignoring invalid {VERBOSITY_ENV}={raw:?}"),
			}
		}

		if let Some(raw) = debug {
			match raw.trim().to_ascii_lowercase().as_str() {
				"1" | "true" | "yes" | "on" => self.debug = true,
				"0" | "false" | "no" | "off" | "" => self.debug = false,
				_ => warn!("ignoring invalid {DEBUG_ENV}={raw:?}"),
			}
		}

		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults() {
		let config = SamplerConfig::default();
		assert_eq!(config.max_cpus, MAX_CPUS);
		assert_eq!(config.verbosity, 0);
		assert!(!config.debug);
	}

	#[test]
	fn overrides_apply() {
		let config = SamplerConfig::default().with_overrides(Some(" 2 "), Some("TRUE"));
		assert_eq!(config.verbosity, 2);
		assert!(config.debug);
	}

	#[test]
	fn invalid_overrides_are_ignored() {
		let base = SamplerConfig {
			verbosity: 3,
			debug: true,
			..Default::default()
		};
		let config = base.with_overrides(Some("loud"), Some("maybe"));
		assert_eq!(config, base);
	}
}

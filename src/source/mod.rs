pub mod fake;
#[cfg(target_os = "linux")]
pub mod linux;

use std::fmt::Debug;

use crate::error::Result;
use crate::time_in_state::TimeInState;

/// Supplier of per-processor time-in-state counters
///
/// Implementations wrap whatever the host offers. The sampler treats the
/// returned data as opaque apart from the size contract below.
pub trait CounterSource: Debug {
	/// Number of logical processors currently online
	///
	/// May change between calls as processors are hot-added or removed.
	fn processor_count(&mut self) -> Result<usize>;

	/// Writes one record per online processor into the front of `out`
	///
	/// Returns the number of bytes written, which must be a whole multiple of
	/// [`crate::time_in_state::RECORD_SIZE`]. Kernel time in each record
	/// includes idle time.
	fn read_counters(&mut self, out: &mut [TimeInState]) -> Result<usize>;
}

/// Monotonic high-resolution timestamp source
pub trait HighResClock: Debug {
	/// Ticks per second; queried once per session
	fn frequency(&mut self) -> Result<u64>;

	/// Current counter value, never decreasing
	fn now(&mut self) -> Result<u64>;
}

/// Factory function to create the counter source and clock for this host
#[cfg(target_os = "linux")]
pub fn create_counter_source() -> Result<(Box<dyn CounterSource>, Box<dyn HighResClock>)> {
	use crate::source::linux::{MonotonicClock, ProcStatSource};

	Ok((Box::new(ProcStatSource::new()?), Box::new(MonotonicClock)))
}

/// Factory function to create the counter source and clock for this host
#[cfg(not(target_os = "linux"))]
pub fn create_counter_source() -> Result<(Box<dyn CounterSource>, Box<dyn HighResClock>)> {
	Err(crate::error::CpuUtilError::Unsupported(format!(
		"no per-processor counter source for {}",
		std::env::consts::OS
	)))
}

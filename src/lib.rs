pub mod config;
pub mod constants;
pub mod correction;
pub mod display;
pub mod error;
pub mod report;
pub mod sampler;
pub mod session;
pub mod snapshot;
pub mod source;
pub mod time_in_state;

use std::thread;
use std::time::Duration;

use tracing::info;

pub use crate::config::SamplerConfig;
pub use crate::error::{CpuUtilError, Result};
pub use crate::report::{CpuBreakdown, UtilizationReport};
pub use crate::session::{CpuMethod, CpuUtilSession, CpuUtilStats};
pub use crate::snapshot::{SamplePair, Snapshot};
pub use crate::time_in_state::TimeInState;

/// Measures CPU utilization on this host over `window`
///
/// This is the main entry point for one-shot measurement: open a session,
/// sample at the start and end of the window, and report. Pass a non-zero
/// `requested_elapsed_secs` to rescale to a window other than the one measured.
pub fn measure_cpu_util(config: SamplerConfig, window: Duration, requested_elapsed_secs: f64) -> Result<CpuUtilStats> {
	let mut session = CpuUtilSession::open(config)?;

	info!(window_ms = window.as_millis() as u64, "measuring cpu utilization");

	session.start()?;
	thread::sleep(window);
	session.stop()?;

	let stats = session.calc_cpu_util(requested_elapsed_secs)?;
	session.terminate();

	Ok(stats)
}

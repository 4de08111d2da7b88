use std::fmt::Debug;
use std::io::{self, Write};

use tracing::{debug, info, warn};

use crate::config::SamplerConfig;
use crate::correction::{correct, correction_factor};
use crate::display::write_report;
use crate::error::{CpuUtilError, Result};
use crate::report::{UtilizationReport, compute};
use crate::sampler::advance;
use crate::snapshot::SamplePair;
use crate::source::{CounterSource, HighResClock, create_counter_source};

/// How CPU utilization is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuMethod {
	/// Deltas of per-processor time-in-state counters
	TimeInState,
}

impl CpuMethod {
	/// Returns a human-readable string representation of the method
	pub fn as_str(&self) -> &'static str {
		match self {
			CpuMethod::TimeInState => "per-processor time-in-state counters",
		}
	}
}

/// Result of one utilization calculation
#[derive(Debug, Clone, PartialEq)]
pub struct CpuUtilStats {
	/// Aggregate busy percentage after elapsed-time correction
	pub cpu_util: f64,
	pub correction_factor: f64,
	pub report: UtilizationReport,
}

/// Handles to the environment, held from init until terminate
#[derive(Debug)]
struct Handles {
	source: Box<dyn CounterSource>,
	clock: Box<dyn HighResClock>,
}

/// One measurement session: the sample pair plus the handles that feed it
///
/// Single-threaded by construction; every method takes `&mut self` or `&self`
/// and calls must follow start, stop, calculate.
pub struct CpuUtilSession {
	config: SamplerConfig,
	handles: Option<Handles>,
	tick_frequency: u64,
	pair: SamplePair,
}

impl Debug for CpuUtilSession {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CpuUtilSession")
			.field("config", &self.config)
			.field("active", &self.is_active())
			.field("tick_frequency", &self.tick_frequency)
			.finish()
	}
}

impl CpuUtilSession {
	/// Opens a session on this host's counter source
	pub fn open(config: SamplerConfig) -> Result<Self> {
		let (source, clock) = create_counter_source()?;
		Self::init(config, source, clock)
	}

	/// Opens a session on the given source and clock and takes a baseline sample
	pub fn init(config: SamplerConfig, source: Box<dyn CounterSource>, mut clock: Box<dyn HighResClock>) -> Result<Self> {
		let tick_frequency = clock.frequency()?;
		if tick_frequency == 0 {
			return Err(CpuUtilError::Unsupported(
				"high-resolution clock reports a zero frequency".to_string(),
			));
		}

		let mut session = Self {
			config,
			handles: Some(Handles { source, clock }),
			tick_frequency,
			pair: SamplePair::new(config.max_cpus)?,
		};
		session.restart()?;

		info!(
			max_cpus = config.max_cpus,
			tick_frequency,
			method = CpuMethod::TimeInState.as_str(),
			"cpu utilization session initialized"
		);

		Ok(session)
	}

	pub fn config(&self) -> &SamplerConfig {
		&self.config
	}

	pub fn tick_frequency(&self) -> u64 {
		self.tick_frequency
	}

	pub fn pair(&self) -> &SamplePair {
		&self.pair
	}

	/// Whether the session still holds its environment handles
	pub fn is_active(&self) -> bool {
		self.handles.is_some()
	}

	pub fn cpu_method(&self) -> CpuMethod {
		CpuMethod::TimeInState
	}

	/// Counter-based measurement has no idle rate to calibrate
	pub fn calibrate_idle_rate(&self, _iterations: u32, _interval_secs: u32) -> f32 {
		0.0
	}

	/// Marks the start of a measurement
	pub fn start(&mut self) -> Result<()> {
		self.restart()
	}

	/// Marks the end of a measurement
	pub fn stop(&mut self) -> Result<()> {
		self.restart()
	}

	/// Restarts the counters, opening a new window from now
	pub fn get_cpu_idle(&mut self) -> Result<()> {
		self.restart()
	}

	fn restart(&mut self) -> Result<()> {
		let handles = self.handles.as_mut().ok_or(CpuUtilError::NotInitialized)?;
		advance(&mut self.pair, handles.source.as_mut(), handles.clock.as_mut())
	}

	/// Utilization over the last window, without correction
	pub fn report(&self) -> Result<UtilizationReport> {
		if !self.is_active() {
			return Err(CpuUtilError::NotInitialized);
		}
		Ok(compute(&self.pair, self.tick_frequency))
	}

	/// Calculates utilization, writing the detailed table to stdout when verbose
	///
	/// `requested_elapsed_secs` is the window the caller meant to measure, or
	/// zero to take the measured window as is.
	pub fn calc_cpu_util(&self, requested_elapsed_secs: f64) -> Result<CpuUtilStats> {
		let stdout = io::stdout();
		let mut sink = stdout.lock();
		self.calc_cpu_util_with(requested_elapsed_secs, &mut sink)
	}

	/// Same as [`Self::calc_cpu_util`] with an explicit report sink
	pub fn calc_cpu_util_with<W: Write>(&self, requested_elapsed_secs: f64, sink: &mut W) -> Result<CpuUtilStats> {
		let report = self.report()?;
		write_report(sink, &report, self.config.verbosity)?;

		let actual = report.elapsed_secs();
		let factor = correction_factor(requested_elapsed_secs, actual);
		if self.config.debug {
			debug!(
				correction_factor = factor,
				requested_secs = requested_elapsed_secs,
				actual_secs = actual,
				"correction factor"
			);
		}

		let cpu_util = correct(report.busy(), requested_elapsed_secs, actual);
		if !(0.0..=100.0).contains(&cpu_util) {
			warn!(cpu_util, correction_factor = factor, "corrected utilization out of range");
		}

		Ok(CpuUtilStats {
			cpu_util,
			correction_factor: factor,
			report,
		})
	}

	/// Releases the environment handles; safe to call more than once
	pub fn terminate(&mut self) {
		if self.handles.take().is_some() {
			info!("cpu utilization session terminated");
		}
	}
}

impl Drop for CpuUtilSession {
	fn drop(&mut self) {
		self.terminate();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::source::fake::{ManualClock, ScriptedSource};
	use crate::time_in_state::TimeInState;

	fn session(clock: ManualClock) -> CpuUtilSession {
		let source = ScriptedSource::constant(vec![TimeInState::default()]);
		CpuUtilSession::init(SamplerConfig::default(), Box::new(source), Box::new(clock)).unwrap()
	}

	#[test]
	fn zero_frequency_is_unsupported() {
		let source = ScriptedSource::constant(vec![TimeInState::default()]);
		let err = CpuUtilSession::init(SamplerConfig::default(), Box::new(source), Box::new(ManualClock::new(0, [])))
			.unwrap_err();
		assert!(matches!(err, CpuUtilError::Unsupported(_)));
	}

	#[test]
	fn terminate_is_idempotent() {
		let mut session = session(ManualClock::stepping(1000, 1, 4));
		assert!(session.is_active());

		session.terminate();
		session.terminate();

		assert!(!session.is_active());
		assert!(matches!(session.start(), Err(CpuUtilError::NotInitialized)));
		assert!(matches!(session.report(), Err(CpuUtilError::NotInitialized)));
	}

	#[test]
	fn method_and_calibration() {
		let session = session(ManualClock::stepping(1000, 1, 1));
		assert_eq!(session.cpu_method(), CpuMethod::TimeInState);
		assert_eq!(session.calibrate_idle_rate(10, 1), 0.0);
	}
}

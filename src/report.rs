use tracing::warn;

use crate::constants::{MS_PER_SEC, PERCENT_SCALE, TENTHS_OF_MS_PER_SEC, TENTHS_PER_MS};
use crate::snapshot::SamplePair;
use crate::time_in_state::TimeInStateDelta;

/// Utilization of one processor (or the aggregate) over a sample window
///
/// Percentages share the same denominator, idle + kernel + user. Device and
/// interrupt time are part of kernel time, so the breakdown is informational
/// and the figures do not sum to 100.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuBreakdown {
	pub busy: f64,
	pub idle: f64,
	pub kernel: f64,
	pub user: f64,
	pub device: f64,
	pub interrupt: f64,
	/// Interrupts per second
	pub interrupt_rate: f64,
	pub delta: TimeInStateDelta,
}

impl CpuBreakdown {
	fn from_delta(delta: TimeInStateDelta, elapsed_ms: f64) -> Self {
		let total = delta.total();
		// Zero accounted time means no window for this processor; report 0%
		let share = |part: u64| {
			if total == 0 {
				0.0
			} else {
				PERCENT_SCALE * part as f64 / total as f64
			}
		};
		let busy = if total == 0 {
			0.0
		} else {
			PERCENT_SCALE * (1.0 - delta.idle as f64 / total as f64)
		};

		Self {
			busy,
			idle: share(delta.idle),
			kernel: share(delta.kernel),
			user: share(delta.user),
			device: share(delta.device),
			interrupt: share(delta.interrupt),
			interrupt_rate: interrupt_rate(delta.interrupt_count, elapsed_ms),
			delta,
		}
	}
}

/// Utilization derived from a [`SamplePair`]
#[derive(Debug, Clone, PartialEq)]
pub struct UtilizationReport {
	/// Measured window in milliseconds, at tenth-of-a-millisecond resolution
	pub elapsed_ms: f64,
	/// Processors online at the end of the window
	pub processors: usize,
	pub per_cpu: Vec<CpuBreakdown>,
	pub aggregate: CpuBreakdown,
	/// Counter fields that went backwards and were clamped to zero
	pub counter_resets: usize,
}

impl UtilizationReport {
	/// Aggregate busy percentage, the headline utilization figure
	pub fn busy(&self) -> f64 {
		self.aggregate.busy
	}

	/// Measured window in seconds
	pub fn elapsed_secs(&self) -> f64 {
		self.elapsed_ms / MS_PER_SEC
	}
}

/// Converts a clock delta to milliseconds through a 100 usec timebase
///
/// A zero frequency yields a zero-length window.
pub fn elapsed_ms(ticks: u64, tick_frequency: u64) -> f64 {
	if tick_frequency == 0 {
		return 0.0;
	}

	let tenths = u128::from(ticks) * TENTHS_OF_MS_PER_SEC / u128::from(tick_frequency);
	tenths as f64 / TENTHS_PER_MS
}

/// Interrupts per second; zero when no time elapsed
pub fn interrupt_rate(interrupt_count: u64, elapsed_ms: f64) -> f64 {
	if elapsed_ms <= 0.0 {
		0.0
	} else {
		interrupt_count as f64 * MS_PER_SEC / elapsed_ms
	}
}

/// Computes per-processor and aggregate utilization between `start` and `end`
///
/// Pure function of the pair; it never mutates the snapshots.
pub fn compute(pair: &SamplePair, tick_frequency: u64) -> UtilizationReport {
	let elapsed_ms = elapsed_ms(pair.elapsed_ticks(), tick_frequency);
	let processors = pair.end.active;
	let mut counter_resets = 0;

	let mut breakdown_for = |cpu: usize| {
		let (Some(end), Some(start)) = (pair.end.get(cpu), pair.start.get(cpu)) else {
			return CpuBreakdown::default();
		};

		let delta = end.delta_since(start);
		if delta.resets > 0 {
			warn!(cpu, resets = delta.resets, "non-monotonic counters, clamping delta to zero");
			counter_resets += delta.resets;
		}

		CpuBreakdown::from_delta(delta, elapsed_ms)
	};

	let per_cpu: Vec<CpuBreakdown> = (0..processors).map(&mut breakdown_for).collect();
	let aggregate = breakdown_for(pair.end.aggregate_index());

	UtilizationReport {
		elapsed_ms,
		processors,
		per_cpu,
		aggregate,
		counter_resets,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::sampler::advance;
	use crate::source::fake::{Frame, ManualClock, ScriptedSource};
	use crate::time_in_state::TimeInState;

	fn raw(idle: u64, kernel_with_idle: u64, user: u64, device: u64, interrupt: u64, count: u64) -> TimeInState {
		TimeInState {
			idle,
			kernel: kernel_with_idle,
			user,
			device,
			interrupt,
			interrupt_count: count,
		}
	}

	fn sampled(frames: Vec<Frame>, frequency: u64, ticks: Vec<u64>) -> SamplePair {
		let reads = frames.len();
		let mut pair = SamplePair::new(4).unwrap();
		let mut source = ScriptedSource::new(frames);
		let mut clock = ManualClock::new(frequency, ticks);
		for _ in 0..reads {
			advance(&mut pair, &mut source, &mut clock).unwrap();
		}
		pair
	}

	#[test]
	fn busy_percentage_from_known_deltas() {
		let pair = sampled(
			vec![
				Frame::new(vec![TimeInState::default()]),
				Frame::new(vec![raw(300, 500, 100, 50, 20, 40)]),
			],
			1000,
			vec![0, 2000],
		);

		let report = compute(&pair, 1000);
		let cpu0 = report.per_cpu[0];
		assert_eq!(cpu0.delta.kernel, 200);
		assert_eq!(cpu0.delta.total(), 600);
		assert!((cpu0.busy - 50.0).abs() < 1e-9);
		assert!((cpu0.idle - 50.0).abs() < 1e-9);
		assert!((cpu0.kernel - 100.0 * 200.0 / 600.0).abs() < 1e-9);
		assert!((cpu0.user - 100.0 * 100.0 / 600.0).abs() < 1e-9);
		assert!((cpu0.device - 100.0 * 50.0 / 600.0).abs() < 1e-9);
		assert!((cpu0.interrupt - 100.0 * 20.0 / 600.0).abs() < 1e-9);
		assert_eq!(report.elapsed_ms, 2000.0);
		assert_eq!(cpu0.interrupt_rate, 20.0);
		assert_eq!(report.busy(), cpu0.busy);
	}

	#[test]
	fn breakdown_does_not_partition_total() {
		let pair = sampled(
			vec![
				Frame::new(vec![TimeInState::default()]),
				Frame::new(vec![raw(300, 500, 100, 50, 20, 0)]),
			],
			1000,
			vec![0, 1000],
		);

		let cpu0 = compute(&pair, 1000).per_cpu[0];
		let sum = cpu0.idle + cpu0.kernel + cpu0.user + cpu0.device + cpu0.interrupt;
		assert!(sum > 100.0);
		assert!((cpu0.idle + cpu0.kernel + cpu0.user - 100.0).abs() < 1e-9);
	}

	#[test]
	fn aggregate_combines_processors() {
		let pair = sampled(
			vec![
				Frame::new(vec![TimeInState::default(), TimeInState::default()]),
				Frame::new(vec![raw(300, 500, 100, 0, 0, 10), raw(500, 600, 300, 0, 0, 30)]),
			],
			1000,
			vec![0, 1000],
		);

		let report = compute(&pair, 1000);
		assert_eq!(report.processors, 2);
		assert_eq!(report.per_cpu.len(), 2);
		// cpu1: idle 500, kernel 100, user 300 -> busy 44.4%
		assert!((report.per_cpu[1].busy - 100.0 * (1.0 - 500.0 / 900.0)).abs() < 1e-9);
		// aggregate: idle 800 of 1500
		assert!((report.busy() - 100.0 * (1.0 - 800.0 / 1500.0)).abs() < 1e-9);
		assert_eq!(report.aggregate.interrupt_rate, 40.0);
	}

	#[test]
	fn unchanged_counters_report_zero() {
		let frame = Frame::new(vec![raw(300, 500, 100, 50, 20, 40), raw(10, 20, 30, 0, 0, 1)]);
		let pair = sampled(vec![frame.clone(), frame], 1000, vec![5, 5]);

		let report = compute(&pair, 1000);
		assert_eq!(report.elapsed_ms, 0.0);
		for cpu in report.per_cpu.iter().chain([&report.aggregate]) {
			assert_eq!(cpu.busy, 0.0);
			assert_eq!(cpu.kernel, 0.0);
			assert_eq!(cpu.user, 0.0);
			assert_eq!(cpu.interrupt_rate, 0.0);
			assert!(!cpu.busy.is_nan());
		}
	}

	#[test]
	fn zero_elapsed_pair_is_defined() {
		let pair = SamplePair::new(2).unwrap();
		let report = compute(&pair, 0);
		assert_eq!(report.busy(), 0.0);
		assert_eq!(report.processors, 0);
		assert!(report.per_cpu.is_empty());
	}

	#[test]
	fn counter_reset_is_clamped_and_counted() {
		let pair = sampled(
			vec![
				Frame::new(vec![raw(500, 900, 200, 0, 0, 100)]),
				Frame::new(vec![raw(100, 300, 300, 0, 0, 50)]),
			],
			1000,
			vec![0, 1000],
		);

		let report = compute(&pair, 1000);
		let cpu0 = report.per_cpu[0];
		assert_eq!(cpu0.delta.idle, 0);
		assert_eq!(cpu0.delta.kernel, 0);
		assert_eq!(cpu0.delta.user, 100);
		assert_eq!(cpu0.busy, 100.0);
		// idle, kernel and interrupt count went backwards on cpu0 and on the aggregate
		assert_eq!(report.counter_resets, 6);
	}

	#[test]
	fn elapsed_rounds_through_tenths_of_a_millisecond() {
		assert_eq!(elapsed_ms(1_234_567, 1_000_000_000), 1.2);
		assert_eq!(elapsed_ms(3, 2), 1500.0);
		assert_eq!(elapsed_ms(10, 0), 0.0);
	}

	#[test]
	fn interrupt_rate_halves_when_window_doubles() {
		let short = interrupt_rate(500, 250.0);
		let long = interrupt_rate(500, 500.0);
		assert_eq!(short, 2000.0);
		assert_eq!(long, short / 2.0);
		assert_eq!(interrupt_rate(500, 0.0), 0.0);
	}
}

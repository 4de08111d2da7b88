use std::collections::VecDeque;

use crate::error::Result;
use crate::source::{CounterSource, HighResClock};
use crate::time_in_state::{RECORD_SIZE, TimeInState};

/// One scripted answer from a [`ScriptedSource`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
	/// Records written by the read; kernel time includes idle
	pub records: Vec<TimeInState>,
	/// Processor count to report ahead of the read; defaults to `records.len()`
	pub reported_cpus: Option<usize>,
	/// Bytes added to the reported byte count, to simulate a broken source
	pub extra_bytes: usize,
}

impl Frame {
	pub fn new(records: Vec<TimeInState>) -> Self {
		Self {
			records,
			..Default::default()
		}
	}

	pub fn with_reported_cpus(mut self, cpus: usize) -> Self {
		self.reported_cpus = Some(cpus);
		self
	}

	pub fn with_extra_bytes(mut self, bytes: usize) -> Self {
		self.extra_bytes = bytes;
		self
	}

	fn processor_count(&self) -> usize {
		self.reported_cpus.unwrap_or(self.records.len())
	}
}

/// Deterministic counter source replaying a fixed script
///
/// Each read consumes the next frame. Once the script runs out the last frame
/// is repeated, so counters stop moving.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
	frames: VecDeque<Frame>,
	current: Frame,
	reads: usize,
}

impl ScriptedSource {
	pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
		Self {
			frames: frames.into_iter().collect(),
			current: Frame::default(),
			reads: 0,
		}
	}

	/// Source that always returns the same records
	pub fn constant(records: Vec<TimeInState>) -> Self {
		Self::new([Frame::new(records)])
	}

	/// Number of reads served so far
	pub fn reads(&self) -> usize {
		self.reads
	}

	fn upcoming(&self) -> &Frame {
		self.frames.front().unwrap_or(&self.current)
	}
}

impl CounterSource for ScriptedSource {
	fn processor_count(&mut self) -> Result<usize> {
		Ok(self.upcoming().processor_count())
	}

	fn read_counters(&mut self, out: &mut [TimeInState]) -> Result<usize> {
		if let Some(frame) = self.frames.pop_front() {
			self.current = frame;
		}
		self.reads += 1;

		let count = self.current.records.len().min(out.len());
		out[..count].copy_from_slice(&self.current.records[..count]);

		Ok(self.current.records.len() * RECORD_SIZE + self.current.extra_bytes)
	}
}

/// Clock stepping through scripted timestamps
///
/// The last timestamp repeats once the script is exhausted.
#[derive(Debug, Clone)]
pub struct ManualClock {
	frequency: u64,
	ticks: VecDeque<u64>,
	last: u64,
}

impl ManualClock {
	pub fn new(frequency: u64, ticks: impl IntoIterator<Item = u64>) -> Self {
		Self {
			frequency,
			ticks: ticks.into_iter().collect(),
			last: 0,
		}
	}

	/// Clock advancing by `step` ticks per read, starting at `step`
	pub fn stepping(frequency: u64, step: u64, reads: usize) -> Self {
		Self::new(frequency, (1..=reads as u64).map(|i| i * step))
	}
}

impl HighResClock for ManualClock {
	fn frequency(&mut self) -> Result<u64> {
		Ok(self.frequency)
	}

	fn now(&mut self) -> Result<u64> {
		if let Some(tick) = self.ticks.pop_front() {
			self.last = tick;
		}
		Ok(self.last)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn record(idle: u64) -> TimeInState {
		TimeInState {
			idle,
			kernel: idle,
			..Default::default()
		}
	}

	#[test]
	fn scripted_source_repeats_last_frame() {
		let mut source = ScriptedSource::new([Frame::new(vec![record(1)]), Frame::new(vec![record(2), record(3)])]);
		let mut out = [TimeInState::default(); 4];

		assert_eq!(source.processor_count().unwrap(), 1);
		assert_eq!(source.read_counters(&mut out).unwrap(), RECORD_SIZE);
		assert_eq!(out[0].idle, 1);

		assert_eq!(source.processor_count().unwrap(), 2);
		assert_eq!(source.read_counters(&mut out).unwrap(), 2 * RECORD_SIZE);
		assert_eq!(source.read_counters(&mut out).unwrap(), 2 * RECORD_SIZE);
		assert_eq!(out[1].idle, 3);
		assert_eq!(source.reads(), 3);
	}

	#[test]
	fn frame_faults_are_reported() {
		let mut source = ScriptedSource::new([Frame::new(vec![record(1)]).with_reported_cpus(2).with_extra_bytes(3)]);
		let mut out = [TimeInState::default(); 2];

		assert_eq!(source.processor_count().unwrap(), 2);
		assert_eq!(source.read_counters(&mut out).unwrap(), RECORD_SIZE + 3);
	}

	#[test]
	fn manual_clock_steps() {
		let mut clock = ManualClock::stepping(1000, 250, 2);
		assert_eq!(clock.frequency().unwrap(), 1000);
		assert_eq!(clock.now().unwrap(), 250);
		assert_eq!(clock.now().unwrap(), 500);
		assert_eq!(clock.now().unwrap(), 500);
	}
}

use std::mem;

use crate::error::{CpuUtilError, Result};
use crate::time_in_state::TimeInState;

/// Time-stamped capture of per-processor counters plus an aggregate record
///
/// Holds `max_cpus + 1` records. Index `max_cpus` is the synthetic aggregate,
/// the sum over every active processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
	records: Vec<TimeInState>,
	/// High-resolution clock value at capture
	pub timestamp: u64,
	/// Processors that reported data for this capture
	pub active: usize,
}

impl Snapshot {
	/// Allocates a zeroed snapshot for up to `max_cpus` processors
	pub fn zeroed(max_cpus: usize) -> Result<Self> {
		let len = max_cpus
			.checked_add(1)
			.ok_or(CpuUtilError::ResourceExhausted { records: max_cpus })?;
		let mut records = Vec::new();
		records
			.try_reserve_exact(len)
			.map_err(|_| CpuUtilError::ResourceExhausted { records: len })?;
		records.resize(len, TimeInState::default());

		Ok(Self {
			records,
			timestamp: 0,
			active: 0,
		})
	}

	/// Maximum number of real processors
	pub fn max_cpus(&self) -> usize {
		self.records.len() - 1
	}

	/// Index of the aggregate record
	pub fn aggregate_index(&self) -> usize {
		self.max_cpus()
	}

	pub fn aggregate(&self) -> &TimeInState {
		&self.records[self.aggregate_index()]
	}

	/// Records of the processors active at capture time
	pub fn active_records(&self) -> &[TimeInState] {
		&self.records[..self.active]
	}

	/// Every slot, real processors first, aggregate last
	pub fn records(&self) -> &[TimeInState] {
		&self.records
	}

	pub fn get(&self, cpu: usize) -> Option<&TimeInState> {
		self.records.get(cpu)
	}

	pub(crate) fn records_mut(&mut self) -> &mut [TimeInState] {
		&mut self.records
	}
}

/// The two most recent snapshots of a measurement session
///
/// `end` is always the latest capture. New captures are written into a spare
/// buffer and committed only once complete, so a failed capture leaves both
/// snapshots untouched. Committing makes the old `end` the new `start`
/// without copying record buffers.
#[derive(Debug, Clone)]
pub struct SamplePair {
	pub start: Snapshot,
	pub end: Snapshot,
	spare: Snapshot,
}

impl SamplePair {
	/// Creates a zeroed pair; both timestamps start at zero
	pub fn new(max_cpus: usize) -> Result<Self> {
		Ok(Self {
			start: Snapshot::zeroed(max_cpus)?,
			end: Snapshot::zeroed(max_cpus)?,
			spare: Snapshot::zeroed(max_cpus)?,
		})
	}

	pub fn max_cpus(&self) -> usize {
		self.end.max_cpus()
	}

	/// Buffer for the next capture
	///
	/// Holds stale data from earlier captures; the caller must overwrite every
	/// slot before calling [`Self::commit`].
	pub(crate) fn spare_mut(&mut self) -> &mut Snapshot {
		&mut self.spare
	}

	/// Makes the spare buffer the new `end` and the old `end` the new `start`
	pub(crate) fn commit(&mut self) {
		mem::swap(&mut self.start, &mut self.end);
		mem::swap(&mut self.end, &mut self.spare);
	}

	/// Raw clock ticks between the two captures
	///
	/// Saturates at zero if the clock went backwards.
	pub fn elapsed_ticks(&self) -> u64 {
		self.end.timestamp.saturating_sub(self.start.timestamp)
	}
}

use tracing::{debug, warn};

use crate::error::{CpuUtilError, Result};
use crate::snapshot::SamplePair;
use crate::source::{CounterSource, HighResClock};
use crate::time_in_state::{RECORD_SIZE, TimeInState};

/// Advances the pair: the current `end` becomes `start` and a fresh `end` is captured
///
/// Called once to establish a baseline and again to capture the final state;
/// every further call opens a new window relative to the previous one.
///
/// After a successful return `end` holds corrected per-processor records for
/// the processors online at capture time, zeroes in every other slot, and the
/// recomputed aggregate. On error the pair is left exactly as it was.
pub fn advance(pair: &mut SamplePair, source: &mut dyn CounterSource, clock: &mut dyn HighResClock) -> Result<()> {
	let max_cpus = pair.max_cpus();
	let online = source.processor_count()?;
	if online > max_cpus {
		return Err(CpuUtilError::TooManyProcessors {
			reported: online,
			max: max_cpus,
		});
	}

	let capture = pair.spare_mut();

	let returned_bytes = source.read_counters(&mut capture.records_mut()[..max_cpus])?;
	// Stamp right after the read so the timestamp brackets the data
	capture.timestamp = clock.now()?;

	if returned_bytes % RECORD_SIZE != 0 {
		return Err(CpuUtilError::RecordSizeMismatch {
			returned_bytes,
			record_size: RECORD_SIZE,
		});
	}

	let returned = returned_bytes / RECORD_SIZE;
	if returned != online {
		return Err(CpuUtilError::ProcessorCountMismatch {
			expected: online,
			returned,
		});
	}

	let records = capture.records_mut();

	// Processors that went offline must not leave stale counters behind;
	// this also clears the aggregate slot.
	records[returned..].fill(TimeInState::default());

	let mut aggregate = TimeInState::default();
	for record in &mut records[..returned] {
		record.exclude_idle_from_kernel();
		aggregate.accumulate(record);
	}
	records[max_cpus] = aggregate;
	capture.active = returned;

	pair.commit();

	if pair.end.timestamp < pair.start.timestamp {
		warn!(
			start = pair.start.timestamp,
			end = pair.end.timestamp,
			"high-resolution clock went backwards"
		);
	}

	debug!(
		cpus = returned,
		start = pair.start.timestamp,
		end = pair.end.timestamp,
		"captured counter snapshot"
	);

	Ok(())
}

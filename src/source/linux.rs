use std::path::Path;
use std::{fs, io};

use tracing::debug;

use crate::constants::{NANOS_PER_SEC, PROC_INTERRUPTS_PATH, PROC_STAT_PATH};
use crate::error::{CpuUtilError, Result};
use crate::source::{CounterSource, HighResClock};
use crate::time_in_state::{RECORD_SIZE, TimeInState};

/// Counter source backed by `/proc/stat` and `/proc/interrupts`
///
/// Values are in USER_HZ ticks. The per-CPU fields map onto time-in-state as:
/// idle = idle + iowait, user = user + nice, device = softirq,
/// interrupt = irq, kernel = system + irq + softirq + idle.
/// Steal time is not time this kernel ran and is left out.
#[derive(Debug, Clone)]
pub struct ProcStatSource;

impl ProcStatSource {
	/// Checks that the procfs counters are present
	pub fn new() -> Result<Self> {
		if !Path::new(PROC_STAT_PATH).exists() {
			return Err(CpuUtilError::Unsupported(format!("{PROC_STAT_PATH} is not available")));
		}

		Ok(Self)
	}
}

impl CounterSource for ProcStatSource {
	fn processor_count(&mut self) -> Result<usize> {
		// SAFETY: sysconf has no memory-safety preconditions
		let online = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) };
		if online > 0 {
			return Ok(online as usize);
		}

		// /proc/stat lists exactly the online processors the read will return
		debug!("sysconf(_SC_NPROCESSORS_ONLN) failed, counting cpu lines in {PROC_STAT_PATH}");
		Ok(count_cpu_lines(&fs::read_to_string(PROC_STAT_PATH)?))
	}

	fn read_counters(&mut self, out: &mut [TimeInState]) -> Result<usize> {
		let stat = fs::read_to_string(PROC_STAT_PATH)?;
		let records = parse_proc_stat(&stat)?;

		if records.len() > out.len() {
			return Err(CpuUtilError::TooManyProcessors {
				reported: records.len(),
				max: out.len(),
			});
		}

		out[..records.len()].copy_from_slice(&records);

		match fs::read_to_string(PROC_INTERRUPTS_PATH) {
			Ok(content) => {
				let counts = parse_interrupts(&content);
				for (record, count) in out.iter_mut().zip(counts.into_iter().take(records.len())) {
					record.interrupt_count = count;
				}
			},
			Err(e) => debug!("interrupt counts unavailable: {e}"),
		}

		Ok(records.len() * RECORD_SIZE)
	}
}

fn is_cpu_line(line: &str) -> bool {
	line.strip_prefix("cpu").is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
}

/// Number of per-CPU `cpuN` lines in `/proc/stat` content
pub fn count_cpu_lines(content: &str) -> usize {
	content.lines().filter(|line| is_cpu_line(line)).count()
}

/// Parses the per-CPU `cpuN` lines of `/proc/stat`, in file order
///
/// The aggregate `cpu ` line is skipped.
pub fn parse_proc_stat(content: &str) -> Result<Vec<TimeInState>> {
	let mut records = Vec::new();

	for line in content.lines() {
		if !is_cpu_line(line) {
			continue;
		}

		let parts: Vec<&str> = line.split_whitespace().collect();

		// cpuN user nice system idle are always present; later fields depend on kernel version
		if parts.len() < 5 {
			return Err(CpuUtilError::Parse(format!(
				"cpu line too short: expected at least 5 fields, got {}",
				parts.len()
			)));
		}

		let field = |idx: usize| -> Result<u64> {
			match parts.get(idx) {
				Some(s) => s
					.parse()
					.map_err(|_| CpuUtilError::Parse(format!("invalid counter {s:?} in {:?}", parts[0]))),
				None => Ok(0),
			}
		};

		let user = field(1)?;
		let nice = field(2)?;
		let system = field(3)?;
		let idle = field(4)?;
		let iowait = field(5)?;
		let irq = field(6)?;
		let softirq = field(7)?;

		let idle = idle + iowait;
		records.push(TimeInState {
			idle,
			kernel: system + irq + softirq + idle,
			user: user + nice,
			device: softirq,
			interrupt: irq,
			interrupt_count: 0,
		});
	}

	if records.is_empty() {
		return Err(CpuUtilError::Parse(format!("no per-cpu lines found in {PROC_STAT_PATH}")));
	}

	Ok(records)
}

/// Sums the per-CPU columns of `/proc/interrupts`
///
/// Rows without one value per CPU column (ERR, MIS) are global and skipped.
pub fn parse_interrupts(content: &str) -> Vec<u64> {
	let mut lines = content.lines();
	let columns = match lines.next() {
		Some(header) => header.split_whitespace().filter(|h| h.starts_with("CPU")).count(),
		None => return Vec::new(),
	};

	let mut totals = vec![0u64; columns];
	for line in lines {
		let values: Vec<u64> = line
			.split_whitespace()
			.skip(1)
			.take(columns)
			.map_while(|v| v.parse().ok())
			.collect();

		if values.len() != columns {
			continue;
		}

		for (total, value) in totals.iter_mut().zip(values) {
			*total += value;
		}
	}

	totals
}

/// `CLOCK_MONOTONIC` in nanoseconds
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock;

impl HighResClock for MonotonicClock {
	fn frequency(&mut self) -> Result<u64> {
		let mut res = libc::timespec { tv_sec: 0, tv_nsec: 0 };
		// SAFETY: res is a valid, writable timespec for the duration of the call
		if unsafe { libc::clock_getres(libc::CLOCK_MONOTONIC, &mut res) } != 0 {
			return Err(CpuUtilError::Unsupported(format!(
				"CLOCK_MONOTONIC unavailable: {}",
				io::Error::last_os_error()
			)));
		}

		Ok(NANOS_PER_SEC)
	}

	fn now(&mut self) -> Result<u64> {
		let mut ts = libc::timespec { tv_sec: 0, tv_nsec: 0 };
		// SAFETY: ts is a valid, writable timespec for the duration of the call
		if unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) } != 0 {
			return Err(io::Error::last_os_error().into());
		}

		Ok(ts.tv_sec as u64 * NANOS_PER_SEC + ts.tv_nsec as u64)
	}
}

use std::io::{self, Write};

use crate::constants::VERBOSE_REPORT_THRESHOLD;
use crate::report::{CpuBreakdown, UtilizationReport};

/// Writes the per-processor breakdown when `verbosity` is above the threshold
///
/// Nothing is written, and the sink is not touched, at lower verbosity.
pub fn write_report<W: Write>(sink: &mut W, report: &UtilizationReport, verbosity: u32) -> io::Result<()> {
	if verbosity <= VERBOSE_REPORT_THRESHOLD {
		return Ok(());
	}

	writeln!(sink, "ActualDuration (ms): {}", report.elapsed_ms as u64)?;

	// Per-CPU columns only add information on multiprocessor hosts
	let per_cpu: &[CpuBreakdown] = if report.processors > 1 { &report.per_cpu } else { &[] };

	write!(sink, "% CPU    _Total")?;
	for i in 0..per_cpu.len() {
		write!(sink, "\t CPU {i}")?;
	}
	writeln!(sink)?;

	write_row(sink, "Busy     ", &report.aggregate, per_cpu, |c| c.busy)?;
	write_row(sink, "Kernel   ", &report.aggregate, per_cpu, |c| c.kernel)?;
	write_row(sink, "User     ", &report.aggregate, per_cpu, |c| c.user)?;
	write_row(sink, "Device   ", &report.aggregate, per_cpu, |c| c.device)?;
	write_row(sink, "Interrupt", &report.aggregate, per_cpu, |c| c.interrupt)?;
	writeln!(sink)?;

	write!(sink, "Interrupt/Sec. {:5.1}", report.aggregate.interrupt_rate)?;
	for cpu in per_cpu {
		write!(sink, "\t {:5.1}", cpu.interrupt_rate)?;
	}
	writeln!(sink)?;
	writeln!(sink)?;

	sink.flush()
}

/// Helper to write one percentage row, aggregate first
fn write_row<W: Write>(
	sink: &mut W,
	label: &str,
	aggregate: &CpuBreakdown,
	per_cpu: &[CpuBreakdown],
	field: impl Fn(&CpuBreakdown) -> f64,
) -> io::Result<()> {
	write!(sink, "{label} {:5.2}", field(aggregate))?;
	for cpu in per_cpu {
		write!(sink, "\t {:5.2}", field(cpu))?;
	}
	writeln!(sink)
}

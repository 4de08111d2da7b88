use std::io;

use thiserror::Error;

/// Errors raised while sampling or reporting CPU utilization
///
/// None of these are retried internally. They indicate the host cannot be
/// measured reliably and the caller is expected to abort the run.
#[derive(Error, Debug)]
pub enum CpuUtilError {
	/// A required OS facility is absent on this host
	#[error("environment unsupported: {0}")]
	Unsupported(String),

	/// The snapshot buffers could not be allocated
	#[error("unable to allocate snapshot buffers for {records} records")]
	ResourceExhausted { records: usize },

	/// The counter source wrote a byte count that is not a whole number of records
	#[error("counter source returned {returned_bytes} bytes, expected a multiple of {record_size}")]
	RecordSizeMismatch { returned_bytes: usize, record_size: usize },

	/// The counter source returned data for a different number of processors
	#[error("expected data for {expected} CPUs, counter source returned {returned}")]
	ProcessorCountMismatch { expected: usize, returned: usize },

	/// More processors are online than the snapshot can hold
	#[error("{reported} CPUs online but snapshots hold at most {max}")]
	TooManyProcessors { reported: usize, max: usize },

	/// Counter text could not be parsed
	#[error("failed to parse counters: {0}")]
	Parse(String),

	/// The session has been terminated or was never initialized
	#[error("cpu utilization session is not initialized")]
	NotInitialized,

	#[error(transparent)]
	Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, CpuUtilError>;

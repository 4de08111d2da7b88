// Snapshot capacity; the aggregate record lives at index MAX_CPUS
pub const MAX_CPUS: usize = 512;

// Percentages are scaled to 0..=100
pub const PERCENT_SCALE: f64 = 100.0;

// Timestamp deltas are converted to a 100 usec (tenth of a millisecond) timebase
// before being expressed in milliseconds
pub const TENTHS_OF_MS_PER_SEC: u128 = 10_000;
pub const TENTHS_PER_MS: f64 = 10.0;
pub const MS_PER_SEC: f64 = 1000.0;

// Detailed per-processor table is written only when verbosity exceeds this
pub const VERBOSE_REPORT_THRESHOLD: u32 = 1;

// Linux counter locations
pub const PROC_STAT_PATH: &str = "/proc/stat";
pub const PROC_INTERRUPTS_PATH: &str = "/proc/interrupts";

// CLOCK_MONOTONIC reports nanoseconds
pub const NANOS_PER_SEC: u64 = 1_000_000_000;

// Environment overrides for SamplerConfig
pub const VERBOSITY_ENV: &str = "CPU_UTIL_VERBOSITY";
pub const DEBUG_ENV: &str = "CPU_UTIL_DEBUG";

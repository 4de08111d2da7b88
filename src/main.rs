use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use cpu_util::{SamplerConfig, measure_cpu_util};
use tracing_subscriber::EnvFilter;

const DEFAULT_DURATION_MS: u64 = 1000;

const HELP: &str = concat!(
	"cpu-util - CPU utilization over a measurement window\n",
	"\n",
	"USAGE:\n",
	"  cpu-util [OPTIONS]\n",
	"\n",
	"OPTIONS:\n",
	"  --duration <ms>   Window to measure (default: 1000)\n",
	"  --requested <ms>  Window to rescale the result to (default: measured window)\n",
	"  --max-cpus <n>    Snapshot capacity (default: 512)\n",
	"  -v, --verbose     Increase verbosity; twice prints the per-CPU table\n",
	"  --debug           Debug logging, including the correction factor\n",
	"  -h, --help        Show this help\n",
	"  -V, --version     Show version\n",
);

#[derive(Debug, Clone, PartialEq)]
struct Options {
	duration: Duration,
	requested_elapsed_secs: f64,
	config: SamplerConfig,
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
	Run(Options),
	Help,
	Version,
}

fn parse_args(args: impl IntoIterator<Item = String>, base: SamplerConfig) -> anyhow::Result<Command> {
	let mut options = Options {
		duration: Duration::from_millis(DEFAULT_DURATION_MS),
		requested_elapsed_secs: 0.0,
		config: base,
	};

	let mut args = args.into_iter();
	while let Some(arg) = args.next() {
		match arg.as_str() {
			"-h" | "--help" => return Ok(Command::Help),
			"-V" | "--version" => return Ok(Command::Version),
			"--debug" => options.config.debug = true,
			"--verbose" => options.config.verbosity += 1,
			flag if flag.len() > 1 && flag.starts_with('-') && flag[1..].chars().all(|c| c == 'v') => {
				options.config.verbosity += (flag.len() - 1) as u32;
			},
			"--duration" => options.duration = Duration::from_millis(value(&mut args, "--duration")?),
			"--requested" => {
				let ms: u64 = value(&mut args, "--requested")?;
				options.requested_elapsed_secs = ms as f64 / 1000.0;
			},
			"--max-cpus" => {
				options.config.max_cpus = value(&mut args, "--max-cpus")?;
				if options.config.max_cpus == 0 {
					bail!("--max-cpus must be at least 1");
				}
			},
			other => bail!("unknown argument '{other}'\n\n{HELP}"),
		}
	}

	Ok(Command::Run(options))
}

fn value<T: std::str::FromStr>(args: &mut impl Iterator<Item = String>, flag: &str) -> anyhow::Result<T> {
	let raw = args.next().ok_or_else(|| anyhow!("{flag} requires a value"))?;
	raw.parse().map_err(|_| anyhow!("invalid value '{raw}' for {flag}"))
}

fn init_logging(debug: bool) {
	let default = if debug { "debug" } else { "info" };
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
	let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

fn main() -> anyhow::Result<()> {
	let options = match parse_args(std::env::args().skip(1), SamplerConfig::from_env())? {
		Command::Help => {
			print!("{HELP}");
			return Ok(());
		},
		Command::Version => {
			println!("cpu-util {}", env!("CARGO_PKG_VERSION"));
			return Ok(());
		},
		Command::Run(options) => options,
	};

	init_logging(options.config.debug);

	println!("Measuring CPU utilization for {} ms...", options.duration.as_millis());

	let stats = measure_cpu_util(options.config, options.duration, options.requested_elapsed_secs)
		.context("cpu utilization measurement failed")?;

	let report = &stats.report;
	println!("Processors:        {}", report.processors);
	println!("Measured window:   {:.1} ms", report.elapsed_ms);
	println!(
		"CPU utilization:   {:6.2} % (kernel {:.2} %, user {:.2} %)",
		stats.cpu_util, report.aggregate.kernel, report.aggregate.user
	);
	if stats.correction_factor != 1.0 {
		println!("Correction factor: {:.4}", stats.correction_factor);
	}
	if report.counter_resets > 0 {
		println!("Warning: {} counter(s) went backwards during the window", report.counter_resets);
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parse(args: &[&str]) -> anyhow::Result<Command> {
		parse_args(args.iter().map(|s| s.to_string()), SamplerConfig::default())
	}

	#[test]
	fn defaults_without_arguments() {
		let Command::Run(options) = parse(&[]).unwrap() else {
			panic!("expected run");
		};
		assert_eq!(options.duration, Duration::from_millis(DEFAULT_DURATION_MS));
		assert_eq!(options.requested_elapsed_secs, 0.0);
		assert_eq!(options.config, SamplerConfig::default());
	}

	#[test]
	fn flags_are_applied() {
		let Command::Run(options) =
			parse(&["-vv", "--verbose", "--debug", "--duration", "250", "--requested", "500", "--max-cpus", "8"]).unwrap()
		else {
			panic!("expected run");
		};
		assert_eq!(options.config.verbosity, 3);
		assert!(options.config.debug);
		assert_eq!(options.config.max_cpus, 8);
		assert_eq!(options.duration, Duration::from_millis(250));
		assert_eq!(options.requested_elapsed_secs, 0.5);
	}

	#[test]
	fn help_and_version() {
		assert_eq!(parse(&["--help"]).unwrap(), Command::Help);
		assert_eq!(parse(&["-V"]).unwrap(), Command::Version);
	}

	#[test]
	fn bad_arguments_are_rejected() {
		assert!(parse(&["--duration"]).is_err());
		assert!(parse(&["--duration", "soon"]).is_err());
		assert!(parse(&["--max-cpus", "0"]).is_err());
		assert!(parse(&["--bogus"]).is_err());
	}
}

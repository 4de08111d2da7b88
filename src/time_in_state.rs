use std::mem;

/// Cumulative time-in-state counters for one processor since boot
///
/// All durations are in the counter source's tick unit. As delivered by the
/// source, `kernel` includes `idle` as well as `device` and `interrupt` time;
/// the sampler removes the idle portion before aggregating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeInState {
	pub idle: u64,
	pub kernel: u64,
	pub user: u64,
	/// Deferred device work (DPC / softirq)
	pub device: u64,
	pub interrupt: u64,
	pub interrupt_count: u64,
}

/// Size of one record as exchanged with a counter source
pub const RECORD_SIZE: usize = mem::size_of::<TimeInState>();

/// Difference between two captures of the same processor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeInStateDelta {
	pub idle: u64,
	pub kernel: u64,
	pub user: u64,
	pub device: u64,
	pub interrupt: u64,
	pub interrupt_count: u64,
	/// Number of fields that went backwards and were clamped to zero
	pub resets: usize,
}

impl TimeInState {
	/// Removes the idle time the source folds into kernel time
	pub fn exclude_idle_from_kernel(&mut self) {
		self.kernel = self.kernel.saturating_sub(self.idle);
	}

	/// Adds every counter of `other` into `self`
	pub fn accumulate(&mut self, other: &TimeInState) {
		self.idle += other.idle;
		self.kernel += other.kernel;
		self.user += other.user;
		self.device += other.device;
		self.interrupt += other.interrupt;
		self.interrupt_count += other.interrupt_count;
	}

	/// Computes `self - earlier` field by field
	///
	/// A field that decreased (counter reset or wrap) yields zero and is
	/// counted in `resets`.
	pub fn delta_since(&self, earlier: &TimeInState) -> TimeInStateDelta {
		let mut resets = 0;
		let mut sub = |end: u64, start: u64| {
			end.checked_sub(start).unwrap_or_else(|| {
				resets += 1;
				0
			})
		};

		let idle = sub(self.idle, earlier.idle);
		let kernel = sub(self.kernel, earlier.kernel);
		let user = sub(self.user, earlier.user);
		let device = sub(self.device, earlier.device);
		let interrupt = sub(self.interrupt, earlier.interrupt);
		let interrupt_count = sub(self.interrupt_count, earlier.interrupt_count);

		TimeInStateDelta {
			idle,
			kernel,
			user,
			device,
			interrupt,
			interrupt_count,
			resets,
		}
	}
}

impl TimeInStateDelta {
	/// Total accounted time: idle + kernel + user
	///
	/// Device and interrupt time are already inside kernel time.
	pub fn total(&self) -> u64 {
		self.idle + self.kernel + self.user
	}
}

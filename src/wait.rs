// How the controller waits for a single-shot acquisition to finish

use std::thread;
use std::time::Duration;

use log::debug;

use crate::devices::infiniivision::run_bit_set;
use crate::error::{Error, Result};
use crate::instrument::Instrument;

pub trait Sleeper {
	fn sleep(&self, d:Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
	fn sleep(&self, d:Duration) { thread::sleep(d) }
}

pub trait WaitStrategy {
	// Called right after the single-shot trigger with the timebase window that was requested
	fn wait(&self, inst:&mut dyn Instrument, window:Duration) -> Result<()>;
}

/// Sleeps for the acquisition window plus one second without talking to the instrument.
///
/// If the acquisition actually takes longer, the following data read races it and can return a
/// stale or partial record.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedDelay<S: Sleeper = ThreadSleeper> {
	pub sleeper: S,
}

pub const FIXED_DELAY_MARGIN:Duration = Duration::from_secs(1);

impl<S: Sleeper> WaitStrategy for FixedDelay<S> {
	fn wait(&self, _inst:&mut dyn Instrument, window:Duration) -> Result<()> {
		let d = window + FIXED_DELAY_MARGIN;
		debug!("Waiting {:?} for acquisition", d);
		self.sleeper.sleep(d);
		Ok(())
	}
}

/// Polls the Run bit of the operation status condition register until the instrument stops.
///
/// Gives up once the time spent sleeping exceeds the acquisition window plus `slack`.
#[derive(Debug, Clone, Copy)]
pub struct PollUntilStopped<S: Sleeper = ThreadSleeper> {
	pub interval: Duration,
	pub slack: Duration,
	pub sleeper: S,
}

impl Default for PollUntilStopped {
	fn default() -> Self {
		Self{ interval: Duration::from_millis(100), slack: Duration::from_secs(5), sleeper: ThreadSleeper }
	}
}

impl<S: Sleeper> WaitStrategy for PollUntilStopped<S> {
	fn wait(&self, inst:&mut dyn Instrument, window:Duration) -> Result<()> {
		let limit = window + self.slack;
		let interval = self.interval.max(Duration::from_millis(1));
		let mut slept = Duration::from_secs(0);

		loop {
			self.sleeper.sleep(interval);
			slept += interval;

			if !run_bit_set(inst)? {
				debug!("Acquisition stopped after {:?}", slept);
				return Ok(());
			}
			if slept >= limit {
				return Err(Error::Timeout(format!("instrument still running after {:?}", slept)));
			}
		}
	}
}

#[cfg(test)]
pub(crate) mod fake {
	use std::cell::RefCell;

	use super::*;

	// Records requested sleeps instead of sleeping
	#[derive(Debug, Default)]
	pub struct FakeSleeper {
		pub slept: RefCell<Vec<Duration>>,
	}

	impl Sleeper for &FakeSleeper {
		fn sleep(&self, d:Duration) { self.slept.borrow_mut().push(d) }
	}
}

//! Blinking redraw schedule.
//!
//! Overlay texts are fire-and-forget: each one disappears on its own after
//! its duration. A flash is a text redrawn every `interval` with an
//! on-screen time shorter than the interval, which makes it blink.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Flasher {
	interval: Duration,
	on: Duration,
	next: Option<Instant>,
	until: Option<Instant>,
}

impl Flasher {
	/// `on` is capped just below `interval` so consecutive frames never touch.
	pub fn new(interval: Duration, on: Duration) -> Self {
		let interval = interval.max(Duration::from_millis(100));
		let on = on.min(interval.saturating_sub(Duration::from_millis(50)));
		Self {
			interval,
			on,
			next: None,
			until: None,
		}
	}

	/// Start flashing at `now`, for `total` or until stopped.
	/// Does nothing while already running.
	pub fn start(&mut self, now: Instant, total: Option<Duration>) {
		if self.is_running(now) {
			return;
		}
		self.next = Some(now);
		self.until = total.map(|t| now + t);
	}

	pub fn stop(&mut self) {
		self.next = None;
		self.until = None;
	}

	pub fn is_running(&self, now: Instant) -> bool {
		self.next.is_some() && self.until.is_none_or(|until| now < until)
	}

	/// How long to show the text if a frame is due at `now`.
	pub fn poll(&mut self, now: Instant) -> Option<Duration> {
		if let Some(until) = self.until
			&& now >= until
		{
			self.stop();
			return None;
		}

		let next = self.next?;
		if now < next {
			return None;
		}

		// Skip missed frames instead of bursting to catch up.
		let mut following = next + self.interval;
		if following <= now {
			following = now + self.interval;
		}
		self.next = Some(following);

		let on = match self.until {
			Some(until) => self.on.min(until - now),
			None => self.on,
		};
		Some(on)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn ms(v: u64) -> Duration {
		Duration::from_millis(v)
	}

	#[test]
	fn blinks_at_interval() {
		let t0 = Instant::now();
		let mut f = Flasher::new(ms(1000), ms(700));
		assert_eq!(f.poll(t0), None);

		f.start(t0, None);
		assert_eq!(f.poll(t0), Some(ms(700)));
		assert_eq!(f.poll(t0 + ms(500)), None);
		assert_eq!(f.poll(t0 + ms(1000)), Some(ms(700)));
		assert_eq!(f.poll(t0 + ms(1999)), None);
		assert_eq!(f.poll(t0 + ms(2000)), Some(ms(700)));
	}

	#[test]
	fn on_time_stays_below_interval() {
		let t0 = Instant::now();
		let mut f = Flasher::new(ms(2000), ms(2500));
		f.start(t0, None);
		let on = f.poll(t0).unwrap();
		assert!(on < ms(2000));
	}

	#[test]
	fn stops_after_total() {
		let t0 = Instant::now();
		let mut f = Flasher::new(ms(1000), ms(700));
		f.start(t0, Some(ms(2500)));
		assert!(f.poll(t0).is_some());
		assert!(f.poll(t0 + ms(1000)).is_some());
		// Last frame is cut short by the total.
		assert_eq!(f.poll(t0 + ms(2000)), Some(ms(500)));
		assert_eq!(f.poll(t0 + ms(3000)), None);
		assert!(!f.is_running(t0 + ms(3000)));
	}

	#[test]
	fn restart_is_ignored_while_running() {
		let t0 = Instant::now();
		let mut f = Flasher::new(ms(1000), ms(700));
		f.start(t0, Some(ms(10_000)));
		f.poll(t0);
		f.start(t0 + ms(300), Some(ms(10_000)));
		assert_eq!(f.poll(t0 + ms(300)), None);
		assert!(f.is_running(t0 + ms(9_999)));
		assert!(!f.is_running(t0 + ms(10_000)));
	}

	#[test]
	fn stop_is_immediate() {
		let t0 = Instant::now();
		let mut f = Flasher::new(ms(1000), ms(700));
		f.start(t0, None);
		f.poll(t0);
		f.stop();
		assert_eq!(f.poll(t0 + ms(1000)), None);
	}

	#[test]
	fn late_polls_do_not_burst() {
		let t0 = Instant::now();
		let mut f = Flasher::new(ms(1000), ms(700));
		f.start(t0, None);
		f.poll(t0);
		assert!(f.poll(t0 + ms(3500)).is_some());
		assert_eq!(f.poll(t0 + ms(3600)), None);
		assert!(f.poll(t0 + ms(4500)).is_some());
	}
}

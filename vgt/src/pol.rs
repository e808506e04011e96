//! Background scan worker.
//!
//! One thread owns the capture source and the screen reader. Each job has its
//! own schedule; a single frame is captured whenever any job is due and
//! shared between the jobs that are. Results go to the UI thread over a
//! channel; the only state shared with the UI is the wake-up time.

use std::{
	sync::{
		Arc, Condvar, Mutex,
		mpsc::{Receiver, Sender, TryRecvError},
	},
	time::{Duration, Instant},
};

use ie::screen::encounter::EncounterState;

use crate::host::Capture;

#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
	Encounter(EncounterState),
	/// Decoded chat lines, top to bottom. Never empty.
	ChatLines(Vec<String>),
	/// Sent once, the first time the player name is read off the chat.
	PlayerName(String),
	/// The game window stopped being capturable.
	CaptureLost,
}

#[derive(Debug, Clone, Copy)]
pub struct ScanIntervals {
	pub encounter: Duration,
	pub chat: Duration,
}

/// Scheduling and scanning, without the thread.
pub struct Scanner {
	ie: ie::Ie,
	capture: Box<dyn Capture>,
	intervals: ScanIntervals,
	next_encounter: Instant,
	next_chat: Instant,
	name_sent: bool,
	capturing: bool,
}

impl Scanner {
	pub fn new(ie: ie::Ie, capture: Box<dyn Capture>, intervals: ScanIntervals, now: Instant) -> Self {
		Self {
			ie,
			capture,
			intervals,
			next_encounter: now,
			next_chat: now,
			name_sent: false,
			capturing: true,
		}
	}

	pub fn next_due(&self) -> Instant {
		self.next_encounter.min(self.next_chat)
	}

	/// Make every job due at `now`.
	pub fn force(&mut self, now: Instant) {
		self.next_encounter = now;
		self.next_chat = now;
	}

	pub fn run_due(&mut self, now: Instant) -> Vec<ScanEvent> {
		let encounter_due = now >= self.next_encounter;
		let chat_due = now >= self.next_chat;
		if !encounter_due && !chat_due {
			return Vec::new();
		}
		if encounter_due {
			self.next_encounter = now + self.intervals.encounter;
		}
		if chat_due {
			self.next_chat = now + self.intervals.chat;
		}

		let mut events = Vec::new();
		let Some(frame) = self.capture.capture() else {
			tracing::debug!("capture unavailable; skipping this tick");
			if std::mem::replace(&mut self.capturing, false) {
				events.push(ScanEvent::CaptureLost);
			}
			return events;
		};
		self.capturing = true;
		let frame = frame.as_image();

		if encounter_due {
			events.push(ScanEvent::Encounter(self.ie.encounter_state(frame)));
		}

		if chat_due {
			let lines = self.ie.chat_lines(frame);
			if !self.name_sent
				&& let Some(name) = self.ie.player_name()
			{
				self.name_sent = true;
				events.push(ScanEvent::PlayerName(name.to_string()));
			}
			if !lines.is_empty() {
				events.push(ScanEvent::ChatLines(lines));
			}
		}

		events
	}
}

/// Receiving end of the worker. Dropping it stops the worker at its next
/// wake-up, whether or not it had anything to report.
pub struct ScanEvents {
	rx: Receiver<ScanEvent>,
	_alive: Arc<()>,
}

impl ScanEvents {
	pub fn try_recv(&self) -> Result<ScanEvent, TryRecvError> {
		self.rx.try_recv()
	}

	#[cfg(test)]
	pub fn recv_timeout(&self, timeout: Duration) -> Result<ScanEvent, std::sync::mpsc::RecvTimeoutError> {
		self.rx.recv_timeout(timeout)
	}
}

#[derive(Debug)]
struct Wake {
	at: Instant,
	forced: bool,
}

type Schedule = Arc<(Mutex<Wake>, Condvar)>;

#[derive(Clone)]
pub struct Pol {
	next_pol: Schedule,
}

impl Pol {
	/// Start the worker. It exits once the returned [`ScanEvents`] is dropped.
	pub fn spawn(mut scanner: Scanner) -> (Self, ScanEvents) {
		let (tx, rx) = std::sync::mpsc::channel();
		let events = ScanEvents {
			rx,
			_alive: Arc::new(()),
		};
		let alive = Arc::downgrade(&events._alive);
		let next_pol: Schedule = Arc::new((
			Mutex::new(Wake {
				at: scanner.next_due(),
				forced: false,
			}),
			Condvar::new(),
		));

		let next_pol_thread = next_pol.clone();
		std::thread::spawn(move || {
			loop {
				let forced = wait_until_due(&next_pol_thread);
				if alive.strong_count() == 0 {
					tracing::debug!("scan receiver dropped; stopping worker");
					return;
				}
				if forced {
					scanner.force(Instant::now());
				}

				if !send_all(&tx, scanner.run_due(Instant::now())) {
					tracing::debug!("scan receiver dropped; stopping worker");
					return;
				}

				let (lock, cv) = &*next_pol_thread;
				let mut wake = lock.lock().expect("next_pol lock poisoned");
				if !wake.forced {
					wake.at = scanner.next_due();
				}
				cv.notify_all();
			}
		});

		(Self { next_pol }, events)
	}

	/// Run every job as soon as possible.
	pub fn poll_now(&self) {
		let (lock, cv) = &*self.next_pol;
		let mut wake = lock.lock().expect("next_pol lock poisoned");
		wake.at = Instant::now();
		wake.forced = true;
		cv.notify_all();
	}

	pub fn secs_till_next_poll(&self) -> f32 {
		let (lock, _) = &*self.next_pol;
		let next = lock.lock().expect("next_pol lock poisoned").at;
		next.saturating_duration_since(Instant::now()).as_secs_f32()
	}
}

/// Blocks until the scheduled time; returns whether the wake was forced.
fn wait_until_due(schedule: &Schedule) -> bool {
	let (lock, cv) = &**schedule;
	let mut wake = lock.lock().expect("next_pol lock poisoned");
	loop {
		let now = Instant::now();
		if wake.at <= now {
			break;
		}
		let dur = wake.at.saturating_duration_since(now);
		let (guard, _timeout) = cv.wait_timeout(wake, dur).expect("next_pol lock poisoned during wait");
		wake = guard;
	}
	std::mem::replace(&mut wake.forced, false)
}

fn send_all(tx: &Sender<ScanEvent>, events: Vec<ScanEvent>) -> bool {
	events.into_iter().all(|event| tx.send(event).is_ok())
}

use std::rc::Rc;
use std::time::{Duration, Instant};

use ie::screen::encounter::EncounterState;

use crate::flash::Flasher;
use crate::host::{Overlay, OverlayText};
use crate::pol::ScanEvent;

const SLOT: &str = "reminder";

/// Blinks a reminder over the game while the encounter is on and the
/// condition icon is missing.
pub struct Reminder {
	overlay: Rc<dyn Overlay>,
	flasher: Flasher,
	text: OverlayText,
	enabled: bool,
	state: EncounterState,
	capturing: bool,
}

impl Reminder {
	pub fn new(overlay: Rc<dyn Overlay>, config: &crate::config::Config) -> Self {
		Self {
			overlay,
			flasher: flasher(config),
			text: config.reminder.clone(),
			enabled: config.reminder_enabled,
			state: EncounterState::Idle,
			capturing: true,
		}
	}

	fn apply(&mut self, state: EncounterState, now: Instant) {
		if state != self.state {
			tracing::debug!(?state, "encounter state changed");
		}
		self.state = state;

		if self.enabled && state.needs_reminder() {
			self.flasher.start(now, None);
		} else if self.flasher.is_running(now) {
			self.flasher.stop();
			self.overlay.clear(SLOT);
		}
	}
}

fn flasher(config: &crate::config::Config) -> Flasher {
	Flasher::new(
		Duration::from_secs_f32(config.reminder_interval_s),
		Duration::from_secs_f32(config.reminder_on_s),
	)
}

impl super::Module for Reminder {
	fn name(&self) -> String {
		crate::tr!("reminder-name")
	}

	fn ui(&mut self, ui: &mut egui::Ui) {
		self.ui_important(ui);
	}

	fn ui_settings(&mut self, ui: &mut egui::Ui, config: &mut crate::config::Config) -> bool {
		use crate::ui::UiExt;

		ui.label(self.name());
		let mut changed = ui.checkbox(&mut config.reminder_enabled, crate::tr!("reminder-enabled")).changed();
		changed |= ui.text_edit_labeled(&mut config.reminder.text, &crate::tr!("overlay-text")).changed();
		changed |= ui.num_edit_range(&mut config.reminder.size, &crate::tr!("overlay-size"), 10.0..=72.0).changed();
		changed |= ui
			.num_edit_range(&mut config.reminder_interval_s, &crate::tr!("flash-interval"), 0.5..=5.0)
			.changed();
		changed |= ui
			.num_edit_range(&mut config.reminder_on_s, &crate::tr!("flash-on"), 0.1..=5.0)
			.changed();

		if changed {
			self.text = config.reminder.clone();
			self.enabled = config.reminder_enabled;
			self.flasher = flasher(config);
			self.overlay.clear(SLOT);
		}
		changed
	}

	fn ui_important(&mut self, ui: &mut egui::Ui) -> bool {
		let label = if !self.capturing {
			crate::tr!("reminder-no-capture")
		} else {
			match self.state {
				EncounterState::Idle => crate::tr!("reminder-idle"),
				EncounterState::Active { condition_met: true } => crate::tr!("reminder-ok"),
				EncounterState::Active { condition_met: false } => crate::tr!("reminder-needed"),
			}
		};
		let text = egui::RichText::new(label);
		ui.label(if self.state.needs_reminder() { text.strong().color(egui::Color32::from_rgb(255, 165, 0)) } else { text });
		self.state.is_active()
	}

	fn on_scan(&mut self, event: &ScanEvent, now: Instant) {
		match event {
			ScanEvent::Encounter(state) => {
				self.capturing = true;
				self.apply(*state, now);
			}
			ScanEvent::CaptureLost => {
				self.capturing = false;
				self.apply(EncounterState::Idle, now);
			}
			_ => {}
		}
	}

	fn tick(&mut self, now: Instant) {
		if let Some(on) = self.flasher.poll(now) {
			self.overlay.draw_text(SLOT, &self.text, on);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::host::fake::RecordingOverlay;
	use crate::module::Module;

	fn setup() -> (Rc<RecordingOverlay>, Reminder) {
		let overlay = Rc::new(RecordingOverlay::default());
		let reminder = Reminder::new(overlay.clone(), &crate::config::Config::default());
		(overlay, reminder)
	}

	const NEEDED: EncounterState = EncounterState::Active { condition_met: false };

	#[test]
	fn flashes_while_needed() {
		let (overlay, mut r) = setup();
		let t0 = Instant::now();

		r.on_scan(&ScanEvent::Encounter(NEEDED), t0);
		r.tick(t0);
		r.tick(t0 + Duration::from_millis(500));
		r.tick(t0 + Duration::from_secs(2));
		assert_eq!(overlay.draw_count(), 2);

		let draws = overlay.draws.borrow();
		let (slot, text, on) = &draws[0];
		assert_eq!(*slot, SLOT);
		assert_eq!(text.text, "Command Ghost for Haunt");
		assert!(*on < Duration::from_secs(2));
	}

	#[test]
	fn stops_the_moment_condition_is_met() {
		let (overlay, mut r) = setup();
		let t0 = Instant::now();

		r.on_scan(&ScanEvent::Encounter(NEEDED), t0);
		r.tick(t0);
		r.on_scan(&ScanEvent::Encounter(EncounterState::Active { condition_met: true }), t0 + Duration::from_secs(1));
		assert_eq!(*overlay.clears.borrow(), vec![SLOT]);

		r.tick(t0 + Duration::from_secs(2));
		r.tick(t0 + Duration::from_secs(4));
		assert_eq!(overlay.draw_count(), 1);
	}

	#[test]
	fn idle_and_lost_capture_stay_quiet() {
		let (overlay, mut r) = setup();
		let t0 = Instant::now();

		r.on_scan(&ScanEvent::Encounter(EncounterState::Idle), t0);
		r.tick(t0);
		assert_eq!(overlay.draw_count(), 0);
		assert!(overlay.clears.borrow().is_empty());

		r.on_scan(&ScanEvent::Encounter(NEEDED), t0);
		r.on_scan(&ScanEvent::CaptureLost, t0 + Duration::from_millis(10));
		r.tick(t0 + Duration::from_millis(20));
		assert_eq!(overlay.draw_count(), 0);
	}

	#[test]
	fn repeated_needed_scans_keep_the_rhythm() {
		let (overlay, mut r) = setup();
		let t0 = Instant::now();

		for i in 0..4 {
			let now = t0 + Duration::from_secs(i);
			r.on_scan(&ScanEvent::Encounter(NEEDED), now);
			r.tick(now);
		}
		// t0, t0+2
		assert_eq!(overlay.draw_count(), 2);
	}
}

use std::rc::Rc;
use std::time::{Duration, Instant};

use ie::chat::KeywordTrigger;

use crate::config::Config;
use crate::flash::Flasher;
use crate::host::{Overlay, OverlayText};
use crate::pol::ScanEvent;

const SLOT: &str = "chat_alert";

/// Flashes a call-out when chat mentions one of the keywords.
pub struct ChatAlert {
	overlay: Rc<dyn Overlay>,
	trigger: KeywordTrigger,
	flasher: Flasher,
	text: OverlayText,
	total: Duration,
	enabled: bool,
	last_trigger: Option<(Instant, String)>,
	keywords_input: String,
}

impl ChatAlert {
	pub fn new(overlay: Rc<dyn Overlay>, config: &Config) -> Self {
		let mut alert = Self {
			overlay,
			trigger: KeywordTrigger::default(),
			flasher: Flasher::new(Duration::from_secs(1), Duration::from_millis(700)),
			text: config.chat_alert.clone(),
			total: Duration::ZERO,
			enabled: config.chat_alert_enabled,
			last_trigger: None,
			keywords_input: config.keywords.join(", "),
		};
		alert.configure(config);
		alert
	}

	fn configure(&mut self, config: &Config) {
		self.total = Duration::from_secs_f32(config.chat_alert_total_s);
		// A new alert is not accepted before the previous one has finished.
		self.trigger = KeywordTrigger::new(&config.keywords, self.total);
		self.flasher = Flasher::new(
			Duration::from_secs_f32(config.chat_alert_interval_s),
			Duration::from_secs_f32(config.chat_alert_on_s),
		);
		self.text = config.chat_alert.clone();
		self.enabled = config.chat_alert_enabled;
	}

	fn on_lines(&mut self, lines: &[String], now: Instant) {
		if !self.enabled || !self.trigger.feed_lines(lines, now) {
			return;
		}
		let line = lines
			.iter()
			.rev()
			.find(|l| self.trigger.matches(l))
			.cloned()
			.unwrap_or_default();
		tracing::info!(line = %line, "chat keyword alert");
		self.last_trigger = Some((now, line));
		self.flasher.start(now, Some(self.total));
	}
}

fn parse_keywords(input: &str) -> Vec<String> {
	input
		.split(',')
		.map(|k| k.trim().to_lowercase())
		.filter(|k| !k.is_empty())
		.collect()
}

impl super::Module for ChatAlert {
	fn name(&self) -> String {
		crate::tr!("chat-alert-name")
	}

	fn ui(&mut self, ui: &mut egui::Ui) {
		self.ui_important(ui);
	}

	fn ui_settings(&mut self, ui: &mut egui::Ui, config: &mut Config) -> bool {
		use crate::ui::UiExt;

		ui.label(self.name());
		let mut changed = ui.checkbox(&mut config.chat_alert_enabled, crate::tr!("chat-alert-enabled")).changed();
		if ui.text_edit_labeled(&mut self.keywords_input, &crate::tr!("chat-alert-keywords")).changed() {
			config.keywords = parse_keywords(&self.keywords_input);
			changed = true;
		}
		changed |= ui.text_edit_labeled(&mut config.chat_alert.text, &crate::tr!("overlay-text")).changed();
		changed |= ui.num_edit_range(&mut config.chat_alert.size, &crate::tr!("overlay-size"), 10.0..=72.0).changed();
		changed |= ui
			.num_edit_range(&mut config.chat_alert_total_s, &crate::tr!("flash-total"), 1.0..=60.0)
			.changed();

		if changed {
			self.configure(config);
		}
		changed
	}

	fn ui_important(&mut self, ui: &mut egui::Ui) -> bool {
		let now = Instant::now();
		if self.flasher.is_running(now) {
			ui.label(egui::RichText::new(crate::tr!("chat-alert-active")).strong().color(egui::Color32::RED));
		}
		if let Some((at, line)) = &self.last_trigger {
			let secs = now.saturating_duration_since(*at).as_secs().to_string();
			ui.label(crate::tr!("chat-alert-last", line = line.as_str(), secs = secs));
			return true;
		}
		false
	}

	fn on_scan(&mut self, event: &ScanEvent, now: Instant) {
		if let ScanEvent::ChatLines(lines) = event {
			self.on_lines(lines, now);
		}
	}

	fn tick(&mut self, now: Instant) {
		if let Some(on) = self.flasher.poll(now) {
			// Drawn twice, one pixel apart, for a bold look.
			self.overlay.draw_text(SLOT, &self.text, on);
			self.overlay.draw_text(SLOT, &self.text.nudged(1.0, 0.0), on);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::host::fake::RecordingOverlay;
	use crate::module::Module;

	fn setup() -> (Rc<RecordingOverlay>, ChatAlert) {
		let overlay = Rc::new(RecordingOverlay::default());
		let alert = ChatAlert::new(overlay.clone(), &Config::default());
		(overlay, alert)
	}

	fn lines(v: &[&str]) -> ScanEvent {
		ScanEvent::ChatLines(v.iter().map(|s| s.to_string()).collect())
	}

	#[test]
	fn keyword_starts_a_bold_flash() {
		let (overlay, mut a) = setup();
		let t0 = Instant::now();

		a.on_scan(&lines(&["Bob: [Clan] hi", "Vorkath: MOVE SOUTH now"]), t0);
		a.tick(t0);

		let draws = overlay.draws.borrow();
		assert_eq!(draws.len(), 2);
		assert_eq!(draws[0].1.text, "MOVE SOUTH");
		assert_eq!(draws[0].1.offset, [0.0, -55.0]);
		assert_eq!(draws[1].1.offset, [1.0, -55.0]);
		assert_eq!(draws[0].2, Duration::from_millis(700));
		assert_eq!(a.last_trigger.as_ref().map(|(_, l)| l.as_str()), Some("Vorkath: MOVE SOUTH now"));
	}

	#[test]
	fn flash_runs_for_ten_seconds() {
		let (overlay, mut a) = setup();
		let t0 = Instant::now();

		a.on_scan(&lines(&["go south"]), t0);
		for ms in (0..=12_000).step_by(100) {
			a.tick(t0 + Duration::from_millis(ms));
		}
		// One bold frame per second for ten seconds.
		assert_eq!(overlay.draw_count(), 20);
	}

	#[test]
	fn cooldown_swallows_repeats() {
		let (overlay, mut a) = setup();
		let t0 = Instant::now();

		a.on_scan(&lines(&["move"]), t0);
		a.tick(t0);
		a.on_scan(&lines(&["move"]), t0 + Duration::from_secs(3));
		a.tick(t0 + Duration::from_millis(3500));
		// The repeat is swallowed; only the first flash draws.
		assert!(a.flasher.is_running(t0 + Duration::from_secs(9)));
		assert!(!a.flasher.is_running(t0 + Duration::from_secs(10)));
		assert_eq!(overlay.draw_count(), 4);
	}

	#[test]
	fn unrelated_chat_is_ignored() {
		let (overlay, mut a) = setup();
		let t0 = Instant::now();
		a.on_scan(&lines(&["Bob: [Clan] nice drop"]), t0);
		a.tick(t0);
		assert_eq!(overlay.draw_count(), 0);
		assert!(a.last_trigger.is_none());
	}

	#[test]
	fn keyword_list_parsing() {
		assert_eq!(parse_keywords(" South, ,MOVE "), vec!["south".to_string(), "move".to_string()]);
	}
}

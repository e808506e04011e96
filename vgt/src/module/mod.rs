use std::time::Instant;

mod chat_alert;
pub use chat_alert::ChatAlert;

mod queue;
pub use queue::Queue;

mod reminder;
pub use reminder::Reminder;

use crate::pol::ScanEvent;

pub trait Module {
	fn name(&self) -> String;

	fn ui(&mut self, ui: &mut egui::Ui);

	#[allow(unused_variables)]
	fn ui_settings(&mut self, ui: &mut egui::Ui, config: &mut crate::config::Config) -> bool {false}

	#[allow(unused_variables)]
	fn ui_important(&mut self, ui: &mut egui::Ui) -> bool {false}

	/// Results of the background scan, in the order they were produced.
	#[allow(unused_variables)]
	fn on_scan(&mut self, event: &ScanEvent, now: Instant) {}

	#[allow(unused_variables)]
	fn tick(&mut self, now: Instant) {}
}

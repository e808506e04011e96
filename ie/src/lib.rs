mod image;
pub use self::image::*;
mod palette;
pub use palette::*;
pub mod util;

pub mod chat;
pub mod matcher;
pub mod ocr;
pub mod screen;

use chat::NameDetector;
use matcher::{Matcher, Reference};
use ocr::TextReader;
use screen::encounter::{EncounterRefs, EncounterState};

/// Everything one scan worker needs to read the game screen.
pub struct Ie {
	matcher: Box<dyn Matcher>,
	tolerance: u8,
	encounter: EncounterRefs,
	chat_anchor: Option<Reference>,
	chat: Box<dyn TextReader>,
	names: NameDetector,
}

impl Ie {
	pub fn new(
		matcher: Box<dyn Matcher>,
		tolerance: u8,
		encounter: EncounterRefs,
		chat_anchor: Option<Reference>,
		chat: Box<dyn TextReader>,
	) -> Self {
		Self {
			matcher,
			tolerance,
			encounter,
			chat_anchor,
			chat,
			names: NameDetector::default(),
		}
	}

	pub fn encounter_state(&self, frame: Image) -> EncounterState {
		screen::encounter::detect(frame, &self.encounter, self.matcher.as_ref(), self.tolerance)
	}

	pub fn chat_region(&self, frame: Image) -> util::Rect {
		chat::locate_chat_region(frame, self.chat_anchor.as_ref(), self.matcher.as_ref(), self.tolerance)
	}

	/// Decoded chat lines, top to bottom. Also feeds player name detection.
	pub fn chat_lines(&mut self, frame: Image) -> Vec<String> {
		let region = self.chat_region(frame).view(frame);
		let lines = self.chat.read_lines(region);
		self.names.observe(&lines, self.chat.input_line());
		lines
	}

	pub fn player_name(&self) -> Option<&str> {
		self.names.name()
	}
}

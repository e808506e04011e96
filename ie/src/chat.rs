//! Chat box reading.
//!
//! [`ChatReader`] decodes the chat box with bitmap fonts. The capture never
//! says which font or vertical alignment is in use, so the first read tries
//! every font and row offset, keeps the combination that decodes the most
//! text, and reuses it until it stops producing anything.
//!
//! On top of the raw lines sit two policies: [`NameDetector`] pulls the
//! player's own name out of the chat input line, and [`KeywordTrigger`]
//! raises an alert when a message mentions one of a few keywords.

use std::sync::LazyLock;
use std::time::{Duration, Instant};

use regex::Regex;

use crate::matcher::{Matcher, Reference};
use crate::ocr::{Font, TextReader};
use crate::util::{Rect, default_chat_region};
use crate::{ChatPalette, Image};

/// Regions whose brightest pixel is at or below this are treated as blank.
pub const DARK_THRESHOLD: u8 = 16;

pub const DEFAULT_KEYWORDS: &[&str] = &["south", "move"];
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(10);

const CHAT_W: u32 = 520;
const CHAT_H: u32 = 120;

static NAME_FALLBACK: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^[A-Za-z0-9 \-]{2,12}").expect("valid name regex"));

/// Find the chat box in a full game frame.
///
/// `anchor` is an image of the chat tab bar that sits directly above the
/// chat box. When it is missing or not on screen the default interface
/// layout is assumed.
pub fn locate_chat_region(frame: Image, anchor: Option<&Reference>, matcher: &dyn Matcher, tolerance: u8) -> Rect {
	if let Some(anchor) = anchor {
		if let Some(hit) = matcher.find(frame, anchor, tolerance) {
			return Rect::new(hit.x, hit.y + anchor.height(), CHAT_W, CHAT_H).clamped(frame.width(), frame.height());
		}
		log::debug!("chat anchor {:?} not found; using default layout", anchor.name());
	}
	default_chat_region(frame.width(), frame.height())
}

/// Font and row offset that last decoded the chat box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
	pub font: usize,
	pub offset: u32,
}

pub struct ChatReader {
	fonts: Vec<Font>,
	palette: ChatPalette,
	tolerance: u8,
	calibration: Option<Calibration>,
	input_line: Option<String>,
}

impl ChatReader {
	pub fn new(fonts: Vec<Font>, palette: ChatPalette, tolerance: u8) -> Self {
		Self {
			fonts,
			palette,
			tolerance,
			calibration: None,
			input_line: None,
		}
	}

	pub fn calibration(&self) -> Option<Calibration> {
		self.calibration
	}

	/// Decode every non-empty line for one font/offset combination.
	pub fn read_with(&self, region: Image, calibration: Calibration) -> Vec<String> {
		let mut rows = self.read_rows(region, calibration);
		rows.retain(|row| !row.is_empty());
		rows
	}

	/// Decode every row, blank ones included, so the last entry is always the
	/// bottom row of the region.
	fn read_rows(&self, region: Image, calibration: Calibration) -> Vec<String> {
		let Some(font) = self.fonts.get(calibration.font) else {
			return Vec::new();
		};

		let mut rows = Vec::new();
		let mut top = calibration.offset;
		while top + font.height() <= region.height() {
			rows.push(font.read_line(region, top, self.palette.colors(), self.tolerance));
			top += font.line_height();
		}
		rows
	}

	fn calibrate(&self, region: Image) -> Option<(Calibration, Vec<String>)> {
		let mut best: Option<(Calibration, Vec<String>, usize)> = None;
		for (font_idx, font) in self.fonts.iter().enumerate() {
			for offset in 0..font.line_height() {
				let calibration = Calibration { font: font_idx, offset };
				let rows = self.read_rows(region, calibration);
				let score = rows.iter().map(|l| l.chars().filter(|c| !c.is_whitespace()).count()).sum();
				if score > 0 && best.as_ref().is_none_or(|(_, _, best)| score > *best) {
					best = Some((calibration, rows, score));
				}
			}
		}
		best.map(|(calibration, rows, _)| (calibration, rows))
	}

	fn cached_rows(&self, region: Image) -> Option<Vec<String>> {
		let calibration = self.calibration?;
		let rows = self.read_rows(region, calibration);
		if rows.iter().any(|row| !row.is_empty()) {
			return Some(rows);
		}
		log::debug!("cached chat calibration {calibration:?} read nothing; recalibrating");
		None
	}

	fn recalibrate(&mut self, region: Image) -> Option<Vec<String>> {
		let (calibration, rows) = self.calibrate(region)?;
		log::debug!("chat calibrated to {calibration:?}");
		self.calibration = Some(calibration);
		Some(rows)
	}
}

impl TextReader for ChatReader {
	fn read_lines(&mut self, region: Image) -> Vec<String> {
		self.input_line = None;
		if region.is_dark(DARK_THRESHOLD) {
			log::debug!("chat region {}x{} is blank; skipping", region.width(), region.height());
			return Vec::new();
		}

		let Some(mut rows) = self.cached_rows(region).or_else(|| self.recalibrate(region)) else {
			return Vec::new();
		};
		self.input_line = rows.last().filter(|row| !row.is_empty()).cloned();
		rows.retain(|row| !row.is_empty());
		rows
	}

	fn input_line(&self) -> Option<&str> {
		self.input_line.as_deref()
	}
}

/// Pull the player's name out of a decoded chat input line.
///
/// The input line reads `"<Name><icon>: [<Channel> - Press Enter to Chat]"`.
/// The icon is not part of any font, so the decoded text is either
/// `"<Name>: [..."` or `"<Name> [..."`.
pub fn extract_name(decoded: &str) -> Option<String> {
	let text = decoded.trim();

	let anchor = [": [", " ["].iter().filter_map(|a| text.find(a)).min();
	if let Some(end) = anchor {
		let name = text[..end].trim().trim_end_matches(':').trim_end();
		if !name.is_empty() {
			return Some(name.to_string());
		}
	}

	let name = NAME_FALLBACK.find(text)?.as_str().trim();
	(name.chars().count() >= 2).then(|| name.to_string())
}

/// Looks for the player's name until it has been found once.
#[derive(Debug, Default)]
pub struct NameDetector {
	name: Option<String>,
	attempts: u32,
}

impl NameDetector {
	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	/// Detection stops for the rest of the session once a name is known.
	pub fn is_done(&self) -> bool {
		self.name.is_some()
	}

	pub fn attempts(&self) -> u32 {
		self.attempts
	}

	/// Feed the lines of one chat read (top to bottom) and the input line, if
	/// the reader can tell which row that is.
	///
	/// Lines carrying the channel bracket are preferred, newest first. Without
	/// one, only the input line may use the fallback rule; a chat message never
	/// names the player.
	pub fn observe(&mut self, lines: &[String], input: Option<&str>) -> Option<&str> {
		if self.name.is_none() && (!lines.is_empty() || input.is_some()) {
			self.attempts += 1;
			let anchored = input
				.into_iter()
				.chain(lines.iter().rev().map(String::as_str))
				.filter(|l| l.contains(": [") || l.contains(" ["))
				.find_map(extract_name);
			let found = anchored.or_else(|| input.and_then(extract_name));
			if let Some(name) = &found {
				log::info!("detected player name {name:?} after {} attempts", self.attempts);
			}
			self.name = found;
		}
		self.name.as_deref()
	}
}

/// Case-insensitive keyword alert with a re-trigger cooldown.
#[derive(Debug, Clone)]
pub struct KeywordTrigger {
	keywords: Vec<String>,
	cooldown: Duration,
	last: Option<Instant>,
}

impl Default for KeywordTrigger {
	fn default() -> Self {
		Self::new(DEFAULT_KEYWORDS.iter().copied(), DEFAULT_COOLDOWN)
	}
}

impl KeywordTrigger {
	pub fn new<S: AsRef<str>>(keywords: impl IntoIterator<Item = S>, cooldown: Duration) -> Self {
		Self {
			keywords: keywords
				.into_iter()
				.map(|k| k.as_ref().trim().to_lowercase())
				.filter(|k| !k.is_empty())
				.collect(),
			cooldown,
			last: None,
		}
	}

	pub fn matches(&self, segment: &str) -> bool {
		let segment = segment.to_lowercase();
		self.keywords.iter().any(|k| segment.contains(k.as_str()))
	}

	/// Returns true when this segment fires the alert.
	pub fn feed(&mut self, segment: &str, now: Instant) -> bool {
		if !self.matches(segment) {
			return false;
		}
		if self
			.last
			.is_some_and(|last| now.saturating_duration_since(last) < self.cooldown)
		{
			return false;
		}
		self.last = Some(now);
		true
	}

	/// Feed every line of one read; fires at most once.
	pub fn feed_lines(&mut self, lines: &[String], now: Instant) -> bool {
		lines.iter().any(|line| self.feed(line, now))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::matcher::KeypointMatcher;
	use crate::ocr::font::fixtures;
	use crate::{Color, OwnedImage, OwnedMask};

	const INPUT_LINE: &str = "BOB: [CLAN CHAT - PRESS ENTER TO CHAT]";

	fn chat_region(offset: u32) -> OwnedImage {
		let font = fixtures::font();
		let mut img = OwnedImage::filled(220, 20, Color::BLACK);
		font.render(&mut img, 1, offset, "MOVE SOUTH", Color::WHITE);
		font.render(&mut img, 1, offset + font.line_height(), INPUT_LINE, ChatPalette::NAME_BLUE);
		img
	}

	fn reader() -> ChatReader {
		ChatReader::new(vec![fixtures::font()], ChatPalette::default(), 20)
	}

	#[test]
	fn extracts_name_before_channel() {
		assert_eq!(extract_name("Saltea: [Public Chat - Press Enter to Chat]").as_deref(), Some("Saltea"));
		assert_eq!(extract_name("Sir Vance99 [Friends Chat - Press Enter").as_deref(), Some("Sir Vance99"));
	}

	#[test]
	fn name_fallback_takes_leading_run() {
		assert_eq!(extract_name("Zezima~~").as_deref(), Some("Zezima"));
		assert_eq!(extract_name("Averyverylongname").as_deref(), Some("Averyverylon"));
		assert_eq!(extract_name("x"), None);
		assert_eq!(extract_name("~~~"), None);
	}

	#[test]
	fn reads_and_calibrates() {
		let mut reader = reader();
		let img = chat_region(3);
		let lines = reader.read_lines(img.as_image());
		assert_eq!(lines, vec!["MOVE SOUTH".to_string(), INPUT_LINE.to_string()]);
		assert_eq!(reader.calibration(), Some(Calibration { font: 0, offset: 3 }));

		// Cached combination is reused as long as it reads.
		assert_eq!(reader.read_lines(img.as_image()), lines);

		// Text moved: the cached offset reads nothing and a new one is found.
		let moved = chat_region(5);
		assert_eq!(reader.read_lines(moved.as_image()), lines);
		assert_eq!(reader.calibration(), Some(Calibration { font: 0, offset: 5 }));
	}

	#[test]
	fn blank_region_short_circuits() {
		let mut reader = reader();
		let img = OwnedImage::filled(220, 30, Color::BLACK);
		assert!(reader.read_lines(img.as_image()).is_empty());
		assert_eq!(reader.calibration(), None);
	}

	#[test]
	fn bottom_row_is_the_input_line() {
		let mut reader = reader();
		reader.read_lines(chat_region(3).as_image());
		assert_eq!(reader.input_line(), Some(INPUT_LINE));

		let font = fixtures::font();
		let mut img = OwnedImage::filled(220, 20, Color::BLACK);
		font.render(&mut img, 1, 3, "MOVE SOUTH", Color::WHITE);
		assert_eq!(reader.read_lines(img.as_image()), vec!["MOVE SOUTH".to_string()]);
		assert_eq!(reader.input_line(), None);
	}

	#[test]
	fn name_detection_stops_once_found() {
		let mut detector = NameDetector::default();
		assert_eq!(detector.observe(&[], None), None);
		assert_eq!(detector.attempts(), 0);

		let mut reader = reader();
		let lines = reader.read_lines(chat_region(3).as_image());
		assert_eq!(detector.observe(&lines, reader.input_line()), Some("BOB"));
		assert!(detector.is_done());

		let other = vec!["ALICE: [PUBLIC CHAT]".to_string()];
		assert_eq!(detector.observe(&other, None), Some("BOB"));
		assert_eq!(detector.attempts(), 1);
	}

	#[test]
	fn name_detection_prefers_bracketed_lines() {
		let mut detector = NameDetector::default();
		let lines = vec!["Saltea: [Public Chat - Press Enter".to_string(), "Guide: hello".to_string()];
		assert_eq!(detector.observe(&lines, Some("Guide: hello")), Some("Saltea"));
	}

	#[test]
	fn chat_message_is_never_taken_for_the_player() {
		let mut detector = NameDetector::default();
		let lines = vec!["Guide: everyone move south".to_string()];
		assert_eq!(detector.observe(&lines, None), None);
		assert!(!detector.is_done());

		let lines = vec!["Saltea: [Public Chat - Press Enter to Chat]".to_string()];
		assert_eq!(detector.observe(&lines, None), Some("Saltea"));
	}

	#[test]
	fn typed_input_line_uses_the_fallback() {
		let mut detector = NameDetector::default();
		let lines = vec!["Guide: everyone move south".to_string(), "Zezima~~ hi*".to_string()];
		assert_eq!(detector.observe(&lines, Some("Zezima~~ hi*")), Some("Zezima"));
	}

	#[test]
	fn keyword_trigger_and_cooldown() {
		let mut trigger = KeywordTrigger::default();
		let t0 = Instant::now();
		assert!(!trigger.feed("nothing relevant here", t0));
		assert!(trigger.feed("Guide: everyone move south now", t0));
		assert!(!trigger.feed("MOVE!", t0 + Duration::from_secs(3)));
		assert!(trigger.feed("south again", t0 + DEFAULT_COOLDOWN));
	}

	#[test]
	fn keyword_lines_fire_once() {
		let mut trigger = KeywordTrigger::new(["South"], Duration::from_secs(10));
		let lines = vec!["go south".to_string(), "SOUTH!".to_string()];
		assert!(trigger.feed_lines(&lines, Instant::now()));
		assert!(!trigger.feed_lines(&lines, Instant::now()));
	}

	#[test]
	fn chat_region_falls_back_to_default_layout() {
		let frame = OwnedImage::filled(800, 600, Color::BLACK);
		let anchor = Reference::from_image(
			"chat-tabs",
			OwnedImage::filled(4, 2, Color::new(200, 10, 10)),
			OwnedMask::opaque(4, 2),
			30,
		);
		let region = locate_chat_region(frame.as_image(), Some(&anchor), &KeypointMatcher, 10);
		assert_eq!(region, default_chat_region(800, 600));

		let mut frame = frame;
		frame.blit(anchor.image(), 40, 300);
		let region = locate_chat_region(frame.as_image(), Some(&anchor), &KeypointMatcher, 10);
		assert_eq!(region, Rect::new(40, 302, 520, 120));
	}
}

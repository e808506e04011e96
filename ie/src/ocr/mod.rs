//! Text recognition.
//!
//! Two readers implement [`TextReader`]:
//! - [`font::Font`] driven decoding (see `crate::chat::ChatReader`), which
//!   knows the exact glyph bitmaps the game draws chat with.
//! - [`engine::PaddleOcr`], a general OCR engine used when no font definition
//!   is available for the current client.

pub mod engine;
pub mod font;

pub use engine::PaddleOcr;
pub use font::{Font, FontDef, GlyphDef};

/// Something that turns a captured region into text lines.
pub trait TextReader: Send {
	/// Decode every visible text line in `region`, top to bottom.
	///
	/// An empty result means nothing was readable this time; callers simply
	/// try again on the next poll.
	fn read_lines(&mut self, region: crate::Image) -> Vec<String>;

	/// The chat input row from the last read, when the reader knows where it
	/// sits and it held text.
	fn input_line(&self) -> Option<&str> {
		None
	}
}

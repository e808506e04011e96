//! What the game host offers the modules: frames in, overlay text out.

use std::time::Duration;

/// Source of game frames.
pub trait Capture: Send {
	/// A fresh frame of the game window, or `None` while it cannot be captured.
	fn capture(&mut self) -> Option<ie::OwnedImage>;
}

/// A line of text drawn over the game.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OverlayText {
	pub text: String,
	pub color: ie::Color,
	pub size: f32,
	/// Offset of the text centre from the game window centre, in points.
	pub offset: [f32; 2],
}

impl OverlayText {
	pub fn nudged(&self, dx: f32, dy: f32) -> Self {
		Self {
			offset: [self.offset[0] + dx, self.offset[1] + dy],
			..self.clone()
		}
	}
}

/// Fire-and-forget text drawing. Texts are grouped in named slots so a
/// module can take its own texts down early.
pub trait Overlay {
	fn draw_text(&self, slot: &'static str, text: &OverlayText, duration: Duration);

	fn clear(&self, slot: &'static str);
}

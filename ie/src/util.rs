use crate::Image;

/// Axis-aligned rectangle in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Rect {
	pub x: u32,
	pub y: u32,
	pub w: u32,
	pub h: u32,
}

impl Rect {
	pub const fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
		Self { x, y, w, h }
	}

	pub fn right(&self) -> u32 {
		self.x + self.w
	}

	pub fn bottom(&self) -> u32 {
		self.y + self.h
	}

	/// Clip to an image of the given size.
	pub fn clamped(&self, width: u32, height: u32) -> Self {
		let x = self.x.min(width);
		let y = self.y.min(height);
		Self {
			x,
			y,
			w: self.w.min(width - x),
			h: self.h.min(height - y),
		}
	}

	pub fn view<'a>(&self, image: Image<'a>) -> Image<'a> {
		image.sub_image(self.x, self.y, self.w, self.h)
	}
}

// Default chat box placement, relative to the game window's top-left corner.
const CHAT_X: u32 = 7;
const CHAT_Y_FROM_BOTTOM: u32 = 139;
const CHAT_W: u32 = 520;
const CHAT_H: u32 = 120;

/// Where the chat box sits with the default interface layout.
///
/// Used when the chat box cannot be located on screen.
pub fn default_chat_region(width: u32, height: u32) -> Rect {
	Rect::new(CHAT_X, height.saturating_sub(CHAT_Y_FROM_BOTTOM), CHAT_W, CHAT_H).clamped(width, height)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_region_on_1080p() {
		assert_eq!(default_chat_region(1920, 1080), Rect::new(7, 941, 520, 120));
	}

	#[test]
	fn default_region_on_tiny_window() {
		let r = default_chat_region(300, 100);
		assert_eq!(r, Rect::new(7, 0, 293, 100));
		assert!(r.right() <= 300 && r.bottom() <= 100);
	}
}

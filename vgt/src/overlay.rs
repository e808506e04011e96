//! Text overlay drawn over the game window.
//!
//! Modules post texts to the [`OverlayBoard`]; [`OverlayWindow`] paints
//! whatever is still live into a borderless, transparent, click-through egui
//! viewport that follows the game window.

use std::cell::RefCell;
use std::time::{Duration, Instant};

use crate::capture::WindowBounds;
use crate::host::{Overlay, OverlayText};

/// How often the game window position is looked up again.
const BOUNDS_REFRESH: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
struct Posted {
	slot: &'static str,
	text: OverlayText,
	expires: Instant,
}

/// Texts currently on screen, each with its own expiry.
#[derive(Debug, Default)]
pub struct OverlayBoard {
	posted: RefCell<Vec<Posted>>,
}

impl OverlayBoard {
	pub fn post(&self, slot: &'static str, text: &OverlayText, duration: Duration, now: Instant) {
		self.posted.borrow_mut().push(Posted {
			slot,
			text: text.clone(),
			expires: now + duration,
		});
	}

	/// Live texts in posting order; expired ones are dropped.
	pub fn live(&self, now: Instant) -> Vec<OverlayText> {
		let mut posted = self.posted.borrow_mut();
		posted.retain(|p| p.expires > now);
		posted.iter().map(|p| p.text.clone()).collect()
	}

	/// Earliest expiry among the live texts, for repaint scheduling.
	pub fn next_expiry(&self) -> Option<Instant> {
		self.posted.borrow().iter().map(|p| p.expires).min()
	}
}

impl Overlay for OverlayBoard {
	fn draw_text(&self, slot: &'static str, text: &OverlayText, duration: Duration) {
		self.post(slot, text, duration, Instant::now());
	}

	fn clear(&self, slot: &'static str) {
		self.posted.borrow_mut().retain(|p| p.slot != slot);
	}
}

/// Native window the board is painted into.
#[derive(Default)]
pub struct OverlayWindow {
	bounds: Option<WindowBounds>,
	checked_at: Option<Instant>,
}

impl OverlayWindow {
	fn refresh_bounds(&mut self, app_name: &str, now: Instant) {
		if self.checked_at.is_some_and(|at| now.duration_since(at) < BOUNDS_REFRESH) {
			return;
		}
		self.checked_at = Some(now);
		self.bounds = crate::capture::window_bounds(app_name);
	}

	pub fn show(&mut self, ctx: &egui::Context, board: &OverlayBoard, app_name: &str) {
		let now = Instant::now();
		let texts = board.live(now);
		if texts.is_empty() {
			return;
		}

		self.refresh_bounds(app_name, now);
		let Some(bounds) = self.bounds else {
			return;
		};
		let scale = bounds.scale_factor.max(0.1);

		let builder = egui::ViewportBuilder::default()
			.with_title("vgt overlay")
			.with_decorations(false)
			.with_transparent(true)
			.with_always_on_top()
			.with_mouse_passthrough(true)
			.with_taskbar(false)
			.with_resizable(false)
			.with_position(egui::pos2(bounds.x / scale, bounds.y / scale))
			.with_inner_size(egui::vec2(bounds.width / scale, bounds.height / scale));

		ctx.show_viewport_immediate(egui::ViewportId::from_hash_of("vgt_overlay"), builder, |ctx, _class| {
			egui::CentralPanel::default()
				.frame(egui::Frame::NONE)
				.show(ctx, |ui| {
					let center = ui.max_rect().center();
					let painter = ui.painter();
					for text in &texts {
						let color = egui::Color32::from_rgb(text.color.r, text.color.g, text.color.b);
						painter.text(
							center + egui::vec2(text.offset[0], text.offset[1]),
							egui::Align2::CENTER_CENTER,
							&text.text,
							egui::FontId::proportional(text.size),
							color,
						);
					}
				});
		});

		if let Some(expiry) = board.next_expiry() {
			ctx.request_repaint_after(expiry.saturating_duration_since(now));
		}
	}
}

//! Reference image matching.
//!
//! A [`Reference`] is a small PNG cut out of a game screenshot (an NPC
//! nameplate, a buff icon). Only opaque pixels take part in matching, and a
//! pixel matches when every channel is within the tolerance of the frame
//! pixel under it.
//!
//! Two strategies answer the same question:
//! - [`KeypointMatcher`] samples up to K evenly spaced opaque pixels and checks
//!   the first one before the rest, which rejects almost every window position
//!   after a single comparison. This is what the scan loop runs.
//! - [`ExactMatcher`] checks every opaque pixel. It is slower and serves as the
//!   ground truth the keypoint sampling is measured against.

use std::path::Path;

use anyhow::{Context, Result};

use crate::{Color, Image, OwnedImage, OwnedMask};

/// Default per-channel tolerance for screen matching.
pub const DEFAULT_TOLERANCE: u8 = 25;
/// Default number of sampled keypoints per reference.
pub const DEFAULT_MAX_KEYPOINTS: usize = 30;
/// Alpha at or above which a reference pixel is considered opaque.
pub const ALPHA_THRESHOLD: u8 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keypoint {
	pub x: u32,
	pub y: u32,
	pub color: Color,
}

/// Top-left corner of a matched reference window, in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Hit {
	pub x: u32,
	pub y: u32,
}

/// Immutable reference image with its opacity mask and sampled keypoints.
#[derive(Debug, Clone)]
pub struct Reference {
	name: String,
	image: OwnedImage,
	mask: OwnedMask,
	keypoints: Vec<Keypoint>,
}

impl Reference {
	pub fn from_image(name: impl Into<String>, image: OwnedImage, mask: OwnedMask, max_keypoints: usize) -> Self {
		let keypoints = sample_keypoints(&image, &mask, max_keypoints);
		Self {
			name: name.into(),
			image,
			mask,
			keypoints,
		}
	}

	pub fn from_png(name: impl Into<String>, bytes: &[u8], max_keypoints: usize) -> Result<Self> {
		let name = name.into();
		let (image, mask) = OwnedImage::from_png_mask(bytes, ALPHA_THRESHOLD)
			.with_context(|| format!("decode reference {name:?}"))?;
		Ok(Self::from_image(name, image, mask, max_keypoints))
	}

	pub fn load(name: impl Into<String>, path: impl AsRef<Path>, max_keypoints: usize) -> Result<Self> {
		let path = path.as_ref();
		let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
		Self::from_png(name, &bytes, max_keypoints)
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn width(&self) -> u32 {
		self.image.width()
	}

	pub fn height(&self) -> u32 {
		self.image.height()
	}

	pub fn keypoints(&self) -> &[Keypoint] {
		&self.keypoints
	}

	pub fn image(&self) -> Image<'_> {
		self.image.as_image()
	}

	/// Whether reference pixel `(x, y)` takes part in matching.
	#[inline]
	pub fn is_opaque(&self, x: u32, y: u32) -> bool {
		self.mask.get((x + y * self.width()) as usize)
	}

	/// A reference without a single opaque pixel can never match.
	pub fn is_matchable(&self) -> bool {
		!self.keypoints.is_empty()
	}
}

/// Pick up to `max` opaque pixels, evenly spaced in row-major order.
fn sample_keypoints(image: &OwnedImage, mask: &OwnedMask, max: usize) -> Vec<Keypoint> {
	let view = image.as_image();
	let mut all = Vec::new();
	for y in 0..image.height() {
		for x in 0..image.width() {
			if mask.get((x + y * image.width()) as usize) {
				all.push(Keypoint { x, y, color: view.get(x, y) });
			}
		}
	}

	if max == 0 || all.len() <= max {
		return all;
	}

	let step = all.len() / max;
	all.into_iter().step_by(step).take(max).collect()
}

/// Answers "is this reference visible in the frame, and where?".
pub trait Matcher: Send + Sync {
	/// Every window position where `reference` matches, in row-major order,
	/// stopping after `limit` hits when given.
	fn find_all(&self, frame: Image, reference: &Reference, tolerance: u8, limit: Option<usize>) -> Vec<Hit>;

	fn find(&self, frame: Image, reference: &Reference, tolerance: u8) -> Option<Hit> {
		self.find_all(frame, reference, tolerance, Some(1)).into_iter().next()
	}

	fn is_visible(&self, frame: Image, reference: &Reference, tolerance: u8) -> bool {
		self.find(frame, reference, tolerance).is_some()
	}
}

/// Window positions a reference can occupy, or `None` when it cannot fit.
fn search_range(frame: Image, reference: &Reference) -> Option<(u32, u32)> {
	if !reference.is_matchable() {
		log::trace!("reference {:?} has no opaque pixels", reference.name());
		return None;
	}
	if reference.width() > frame.width() || reference.height() > frame.height() {
		log::trace!(
			"reference {:?} ({}x{}) larger than frame ({}x{})",
			reference.name(),
			reference.width(),
			reference.height(),
			frame.width(),
			frame.height()
		);
		return None;
	}
	Some((frame.width() - reference.width(), frame.height() - reference.height()))
}

/// Sampled-keypoint scan with first-keypoint rejection.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeypointMatcher;

impl Matcher for KeypointMatcher {
	fn find_all(&self, frame: Image, reference: &Reference, tolerance: u8, limit: Option<usize>) -> Vec<Hit> {
		let mut hits = Vec::new();
		let Some((max_x, max_y)) = search_range(frame, reference) else {
			return hits;
		};
		let (first, rest) = match reference.keypoints().split_first() {
			Some(v) => v,
			None => return hits,
		};

		for y in 0..=max_y {
			for x in 0..=max_x {
				if !frame.get(x + first.x, y + first.y).within(first.color, tolerance) {
					continue;
				}
				let full = rest
					.iter()
					.all(|kp| frame.get(x + kp.x, y + kp.y).within(kp.color, tolerance));
				if full {
					hits.push(Hit { x, y });
					if limit.is_some_and(|limit| hits.len() >= limit) {
						return hits;
					}
				}
			}
		}
		hits
	}
}

/// Every-opaque-pixel scan.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatcher;

impl ExactMatcher {
	fn matches_at(frame: Image, reference: &Reference, x: u32, y: u32, tolerance: u8) -> bool {
		let needle = reference.image();
		for ry in 0..reference.height() {
			for rx in 0..reference.width() {
				if reference.is_opaque(rx, ry) && !frame.get(x + rx, y + ry).within(needle.get(rx, ry), tolerance) {
					return false;
				}
			}
		}
		true
	}
}

impl Matcher for ExactMatcher {
	fn find_all(&self, frame: Image, reference: &Reference, tolerance: u8, limit: Option<usize>) -> Vec<Hit> {
		let mut hits = Vec::new();
		let Some((max_x, max_y)) = search_range(frame, reference) else {
			return hits;
		};

		for y in 0..=max_y {
			for x in 0..=max_x {
				if Self::matches_at(frame, reference, x, y, tolerance) {
					hits.push(Hit { x, y });
					if limit.is_some_and(|limit| hits.len() >= limit) {
						return hits;
					}
				}
			}
		}
		hits
	}
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;

	use super::*;

	/// Deterministic reference with distinct, non-repeating pixels.
	fn reference(width: u32, height: u32, max_keypoints: usize) -> Reference {
		let mut img = OwnedImage::filled(width, height, Color::BLACK);
		for y in 0..height {
			for x in 0..width {
				img.put_pixel(x, y, Color::new(60 + (x * 13 % 120) as u8, 70 + (y * 17 % 120) as u8, 90 + ((x + y) * 7 % 100) as u8));
			}
		}
		Reference::from_image("test", img, OwnedMask::opaque(width, height), max_keypoints)
	}

	fn embed(frame_w: u32, frame_h: u32, reference: &Reference, x0: u32, y0: u32) -> OwnedImage {
		let mut frame = OwnedImage::filled(frame_w, frame_h, Color::BLACK);
		frame.blit(reference.image(), x0, y0);
		frame
	}

	#[test]
	fn keypoints_are_capped_and_spread() {
		let r = reference(10, 10, 30);
		assert_eq!(r.keypoints().len(), 30);
		// step = 100 / 30 = 3, so samples walk the whole image
		assert_eq!(r.keypoints()[0], Keypoint { x: 0, y: 0, color: r.image().get(0, 0) });
		assert_eq!((r.keypoints()[29].x, r.keypoints()[29].y), (7, 8));
	}

	#[test]
	fn small_reference_keeps_every_opaque_pixel() {
		let img = OwnedImage::filled(3, 2, Color::WHITE);
		let mut mask = OwnedMask::opaque(3, 2);
		mask.set(0, false);
		let r = Reference::from_image("tiny", img, mask, 30);
		assert_eq!(r.keypoints().len(), 5);
		assert!(!r.is_opaque(0, 0));
	}

	#[test]
	fn transparent_reference_never_matches() {
		let img = OwnedImage::filled(4, 4, Color::BLACK);
		let r = Reference::from_image("ghost", img.clone(), OwnedMask(vec![0; 3]), 30);
		assert!(!r.is_matchable());
		let frame = OwnedImage::filled(20, 20, Color::BLACK);
		assert!(!KeypointMatcher.is_visible(frame.as_image(), &r, 255));
		assert!(!ExactMatcher.is_visible(frame.as_image(), &r, 255));
	}

	#[test]
	fn reference_larger_than_frame_is_rejected() {
		let r = reference(12, 12, 30);
		let frame = OwnedImage::filled(11, 40, Color::BLACK);
		assert!(KeypointMatcher.find_all(frame.as_image(), &r, 255, None).is_empty());
		assert!(ExactMatcher.find_all(frame.as_image(), &r, 255, None).is_empty());
	}

	#[test]
	fn finds_reference_at_frame_edges() {
		let r = reference(6, 5, 30);
		let frame = embed(20, 15, &r, 14, 10);
		assert_eq!(KeypointMatcher.find(frame.as_image(), &r, 0), Some(Hit { x: 14, y: 10 }));
	}

	#[test]
	fn hits_are_relative_to_the_view() {
		let r = reference(6, 5, 30);
		let frame = embed(40, 30, &r, 20, 12);
		let view = frame.as_image().sub_image(10, 10, 30, 20);
		assert_eq!(KeypointMatcher.find(view, &r, 0), Some(Hit { x: 10, y: 2 }));
	}

	#[test]
	fn limit_stops_scan() {
		let r = reference(3, 3, 30);
		let mut frame = embed(30, 10, &r, 2, 2);
		frame.blit(r.image(), 20, 5);
		let all = KeypointMatcher.find_all(frame.as_image(), &r, 0, None);
		assert_eq!(all, vec![Hit { x: 2, y: 2 }, Hit { x: 20, y: 5 }]);
		assert_eq!(KeypointMatcher.find_all(frame.as_image(), &r, 0, Some(1)).len(), 1);
	}

	#[test]
	fn png_reference_keeps_raw_samples() {
		let mut png = image::RgbaImage::new(2, 1);
		png.put_pixel(0, 0, image::Rgba([200, 100, 50, 255]));
		png.put_pixel(1, 0, image::Rgba([1, 2, 3, 0]));
		let mut bytes = Vec::new();
		png.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
			.unwrap();

		let r = Reference::from_png("png", &bytes, 30).unwrap();
		assert_eq!(r.keypoints(), &[Keypoint { x: 0, y: 0, color: Color::new(200, 100, 50) }]);
	}

	#[test]
	fn broken_png_is_an_error() {
		assert!(Reference::from_png("broken", b"not a png", 30).is_err());
	}

	proptest! {
		#[test]
		fn exact_embed_has_single_hit(x0 in 0u32..30, y0 in 0u32..20, w in 2u32..8, h in 2u32..8) {
			let r = reference(w, h, 30);
			let frame = embed(40, 30, &r, x0, y0);
			let hits = KeypointMatcher.find_all(frame.as_image(), &r, 0, None);
			prop_assert_eq!(&hits, &vec![Hit { x: x0, y: y0 }]);
			prop_assert_eq!(ExactMatcher.find_all(frame.as_image(), &r, 0, None), hits);
		}

		#[test]
		fn perturbation_within_tolerance_still_hits(tol in 1u8..40, delta in 0u8..40, x0 in 0u32..20, y0 in 0u32..20) {
			let delta = delta.min(tol);
			let r = reference(5, 4, 30);
			let mut frame = embed(30, 30, &r, x0, y0);
			frame.map_pixels(|c| {
				if *c != Color::BLACK {
					*c = Color::new(c.r + delta, c.g - delta, c.b + delta);
				}
			});
			let hit = Hit { x: x0, y: y0 };
			let hits = KeypointMatcher.find_all(frame.as_image(), &r, tol, None);
			prop_assert!(hits.contains(&hit), "{:?} not in {:?}", hit, hits);
			prop_assert!(ExactMatcher.is_visible(frame.as_image(), &r, tol));
		}

		#[test]
		fn perturbation_beyond_tolerance_misses(tol in 0u8..40, extra in 1u8..20, x0 in 0u32..20, y0 in 0u32..20) {
			let delta = tol + extra;
			let r = reference(5, 4, 30);
			let mut frame = embed(30, 30, &r, x0, y0);
			frame.map_pixels(|c| {
				if *c != Color::BLACK {
					*c = Color::new(c.r, c.g, c.b.saturating_add(delta));
				}
			});
			prop_assert!(KeypointMatcher.find_all(frame.as_image(), &r, tol, None).is_empty());
		}

		#[test]
		fn matching_is_idempotent(x0 in 0u32..20, y0 in 0u32..20, tol in 0u8..60) {
			let r = reference(4, 4, 30);
			let frame = embed(30, 30, &r, x0, y0);
			let first = KeypointMatcher.find_all(frame.as_image(), &r, tol, None);
			let second = KeypointMatcher.find_all(frame.as_image(), &r, tol, None);
			prop_assert_eq!(first, second);
		}
	}
}

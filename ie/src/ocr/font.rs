//! Bitmap font decoding.
//!
//! Chat text is drawn with a fixed pixel font, so recognition is an exact
//! stencil test rather than a statistical guess: a glyph is read at a column
//! when all of its ink pixels carry one of the candidate text colours and
//! none of its blank pixels do.
//!
//! Fonts are described in JSON:
//!
//! ```json
//! {
//!   "name": "chat",
//!   "height": 5,
//!   "line_height": 7,
//!   "space_width": 3,
//!   "glyphs": [{ "ch": "T", "rows": ["###", ".#.", ".#.", ".#.", ".#."] }]
//! }
//! ```

use std::path::Path;

use anyhow::{Context, Result, bail, ensure};

use crate::{Color, Image};

#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct FontDef {
	pub name: String,
	/// Glyph cell height in pixels.
	pub height: u32,
	/// Distance between the tops of two consecutive chat lines.
	pub line_height: u32,
	/// Blank columns between two glyphs that make up a space.
	pub space_width: u32,
	pub glyphs: Vec<GlyphDef>,
}

#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct GlyphDef {
	pub ch: char,
	/// `#` for ink, `.` for background; one string per pixel row.
	pub rows: Vec<String>,
}

#[derive(Debug, Clone)]
struct Glyph {
	ch: char,
	width: u32,
	ink: Vec<(u32, u32)>,
	blank: Vec<(u32, u32)>,
}

/// Compiled bitmap font.
#[derive(Debug, Clone)]
pub struct Font {
	name: String,
	height: u32,
	line_height: u32,
	space_width: u32,
	/// Sorted by ink count, largest first, so a glyph is never shadowed by a
	/// smaller one that happens to fit inside it.
	glyphs: Vec<Glyph>,
}

impl Font {
	pub fn from_def(def: FontDef) -> Result<Self> {
		ensure!(def.height > 0, "font {:?}: height must be positive", def.name);
		ensure!(def.line_height >= def.height, "font {:?}: line_height smaller than height", def.name);
		ensure!(def.space_width > 0, "font {:?}: space_width must be positive", def.name);

		let mut glyphs = Vec::with_capacity(def.glyphs.len());
		for glyph in def.glyphs {
			glyphs.push(compile_glyph(&def.name, def.height, glyph)?);
		}
		glyphs.sort_by(|a, b| b.ink.len().cmp(&a.ink.len()));

		Ok(Self {
			name: def.name,
			height: def.height,
			line_height: def.line_height,
			space_width: def.space_width,
			glyphs,
		})
	}

	pub fn from_json(json: &str) -> Result<Self> {
		let def: FontDef = serde_json::from_str(json).context("parse font definition")?;
		Self::from_def(def)
	}

	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let json = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
		Self::from_json(&json).with_context(|| format!("load font {}", path.display()))
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn height(&self) -> u32 {
		self.height
	}

	pub fn line_height(&self) -> u32 {
		self.line_height
	}

	/// Decode the text line whose glyph cells start at row `top`.
	///
	/// Columns holding ink that no glyph explains (icons, clipped glyphs) are
	/// skipped without producing output.
	pub fn read_line(&self, image: Image, top: u32, colors: &[Color], tolerance: u8) -> String {
		let mut out = String::new();
		if top + self.height > image.height() {
			return out;
		}

		let mut gap = 0;
		let mut x = 0;
		while x < image.width() {
			if let Some(glyph) = self.glyphs.iter().find(|g| self.fits(image, g, x, top, colors, tolerance)) {
				if !out.is_empty() && gap >= self.space_width {
					out.push(' ');
				}
				out.push(glyph.ch);
				gap = 0;
				x += glyph.width;
				continue;
			}

			if self.column_has_ink(image, x, top, colors, tolerance) {
				gap = 0;
			} else {
				gap += 1;
			}
			x += 1;
		}
		out
	}

	fn fits(&self, image: Image, glyph: &Glyph, x: u32, top: u32, colors: &[Color], tolerance: u8) -> bool {
		if x + glyph.width > image.width() {
			return false;
		}
		let Some(&(fx, fy)) = glyph.ink.first() else {
			return false;
		};
		let first = image.get(x + fx, top + fy);
		let Some(&color) = colors.iter().find(|c| first.within(**c, tolerance)) else {
			return false;
		};

		glyph
			.ink
			.iter()
			.all(|&(gx, gy)| image.get(x + gx, top + gy).within(color, tolerance))
			&& !glyph
				.blank
				.iter()
				.any(|&(gx, gy)| image.get(x + gx, top + gy).within(color, tolerance))
	}

	fn column_has_ink(&self, image: Image, x: u32, top: u32, colors: &[Color], tolerance: u8) -> bool {
		(top..top + self.height).any(|y| {
			let px = image.get(x, y);
			colors.iter().any(|c| px.within(*c, tolerance))
		})
	}

	/// Draw `text` with its cells starting at `(x, top)`; glyphs are separated
	/// by one blank column. Returns the column after the last glyph.
	#[cfg(test)]
	pub(crate) fn render(&self, image: &mut crate::OwnedImage, mut x: u32, top: u32, text: &str, color: Color) -> u32 {
		for ch in text.chars() {
			if ch == ' ' {
				x += self.space_width;
				continue;
			}
			let Some(glyph) = self.glyphs.iter().find(|g| g.ch == ch) else {
				continue;
			};
			for &(gx, gy) in &glyph.ink {
				image.put_pixel(x + gx, top + gy, color);
			}
			x += glyph.width + 1;
		}
		x
	}
}

fn compile_glyph(font: &str, height: u32, def: GlyphDef) -> Result<Glyph> {
	ensure!(
		def.rows.len() == height as usize,
		"font {font:?}: glyph {:?} has {} rows, expected {height}",
		def.ch,
		def.rows.len()
	);
	let width = def.rows[0].chars().count() as u32;
	ensure!(width > 0, "font {font:?}: glyph {:?} is empty", def.ch);

	let mut ink = Vec::new();
	let mut blank = Vec::new();
	for (y, row) in def.rows.iter().enumerate() {
		ensure!(
			row.chars().count() as u32 == width,
			"font {font:?}: glyph {:?} row {y} is not {width} wide",
			def.ch
		);
		for (x, c) in row.chars().enumerate() {
			match c {
				'#' => ink.push((x as u32, y as u32)),
				'.' => blank.push((x as u32, y as u32)),
				other => bail!("font {font:?}: glyph {:?} has invalid pixel {other:?}", def.ch),
			}
		}
	}
	ensure!(!ink.is_empty(), "font {font:?}: glyph {:?} has no ink", def.ch);

	Ok(Glyph {
		ch: def.ch,
		width,
		ink,
		blank,
	})
}

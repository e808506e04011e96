//! Spreadsheet CSV export source.
//!
//! The queue sheet is public, so the visualization endpoint can export any
//! range as CSV without credentials.

use anyhow::{Context, Result};

use crate::{QueueSnapshot, QueueSource};

pub const BASE_URL: &str = "https://docs.google.com/spreadsheets/d/";

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SheetsSource {
	pub sheet_id: String,
	/// Sheet holding the queue, one name per row.
	pub sheet_name: String,
	pub range: String,
	/// Single cell holding `TRUE` while submissions are open.
	pub open_sheet: String,
	pub open_cell: String,
}

impl SheetsSource {
	pub fn new(sheet_id: impl Into<String>, sheet_name: impl Into<String>) -> Self {
		Self {
			sheet_id: sheet_id.into(),
			sheet_name: sheet_name.into(),
			range: "A2:A".to_string(),
			open_sheet: "Responses".to_string(),
			open_cell: "G947".to_string(),
		}
	}

	pub fn export_url(&self) -> String {
		format!("{BASE_URL}{}/gviz/tq", self.sheet_id)
	}

	fn fetch_csv(&self, sheet: &str, range: &str) -> Result<String> {
		let url = self.export_url();
		let mut res = ureq::get(&url)
			.query("tqx", "out:csv")
			.query("sheet", sheet)
			.query("range", range)
			.header("Cache-Control", "no-store")
			.call()
			.with_context(|| format!("GET {url} sheet={sheet} range={range}"))?;
		res.body_mut()
			.read_to_string()
			.with_context(|| format!("read CSV body of {sheet}!{range}"))
	}

	/// Submissions default to open when the flag cannot be read.
	fn fetch_open(&self) -> bool {
		match self.fetch_csv(&self.open_sheet, &self.open_cell) {
			Ok(text) => parse_flag(&text),
			Err(err) => {
				log::warn!("failed to fetch submissions flag: {err:#}");
				true
			}
		}
	}
}

impl QueueSource for SheetsSource {
	fn fetch(&self) -> Result<QueueSnapshot> {
		let csv = self.fetch_csv(&self.sheet_name, &self.range)?;
		Ok(QueueSnapshot {
			names: parse_csv(&csv),
			open: self.fetch_open(),
		})
	}
}

/// One value per row: split on newlines, strip the surrounding quotes, trim,
/// and drop empty rows.
pub fn parse_csv(text: &str) -> Vec<String> {
	text.lines()
		.map(|row| {
			let row = row.trim();
			let row = row.strip_prefix('"').unwrap_or(row);
			let row = row.strip_suffix('"').unwrap_or(row);
			row.trim().to_string()
		})
		.filter(|row| !row.is_empty())
		.collect()
}

pub fn parse_flag(text: &str) -> bool {
	text.replace('"', "").trim().eq_ignore_ascii_case("TRUE")
}

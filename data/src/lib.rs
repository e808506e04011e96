//! Queue store collaborator.
//!
//! The queue itself lives in a remote spreadsheet; this crate only mirrors it
//! as a read-only snapshot ("ordered list of names + a few flags") and knows
//! how to talk to the web-hook endpoint that mutates it.

use std::time::Instant;

use anyhow::Result;

pub mod rpc;
pub mod sheets;
pub mod status;

pub use sheets::SheetsSource;

/// Local copy of the remote queue. Rank is position + 1.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct QueueSnapshot {
	pub names: Vec<String>,
	/// Whether new players may join.
	pub open: bool,
}

impl QueueSnapshot {
	/// 0-based position of `name` (case-insensitive).
	///
	/// With `max_distance > 0`, a name read off the screen may also match the
	/// closest entry within that Levenshtein distance, as long as the closest
	/// entry is unambiguous.
	pub fn position_of(&self, name: &str, max_distance: usize) -> Option<usize> {
		let name = name.trim().to_lowercase();
		if name.is_empty() {
			return None;
		}
		if let Some(idx) = self.names.iter().position(|n| n.to_lowercase() == name) {
			return Some(idx);
		}
		if max_distance == 0 {
			return None;
		}

		let mut best: Option<(usize, usize)> = None;
		let mut tied = false;
		for (idx, entry) in self.names.iter().enumerate() {
			let dist = levenshtein::levenshtein(&name, &entry.to_lowercase());
			if dist > max_distance {
				continue;
			}
			match best {
				Some((_, best_dist)) if dist > best_dist => {}
				Some((_, best_dist)) if dist == best_dist => tied = true,
				_ => {
					best = Some((idx, dist));
					tied = false;
				}
			}
		}
		if tied {
			return None;
		}
		best.map(|(idx, _)| idx)
	}
}

/// Where queue snapshots come from.
pub trait QueueSource: Send {
	fn fetch(&self) -> Result<QueueSnapshot>;
}

/// Last good snapshot plus the outcome of the latest refresh.
///
/// A failed refresh keeps the previous snapshot around and only records the
/// error; the next scheduled refresh simply tries again.
#[derive(Debug, Default)]
pub struct QueueCache {
	snapshot: Option<QueueSnapshot>,
	last_error: Option<String>,
	updated_at: Option<Instant>,
}

impl QueueCache {
	pub fn refresh(&mut self, source: &dyn QueueSource) -> bool {
		match source.fetch() {
			Ok(snapshot) => {
				self.apply(snapshot);
				true
			}
			Err(err) => {
				self.fail(format!("{err:#}"));
				false
			}
		}
	}

	pub fn apply(&mut self, snapshot: QueueSnapshot) {
		self.snapshot = Some(snapshot);
		self.last_error = None;
		self.updated_at = Some(Instant::now());
	}

	pub fn fail(&mut self, error: String) {
		log::warn!("queue refresh failed: {error}");
		self.last_error = Some(error);
	}

	pub fn snapshot(&self) -> Option<&QueueSnapshot> {
		self.snapshot.as_ref()
	}

	pub fn last_error(&self) -> Option<&str> {
		self.last_error.as_deref()
	}

	pub fn updated_at(&self) -> Option<Instant> {
		self.updated_at
	}
}

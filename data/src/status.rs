//! Player-facing queue status.

use crate::QueueSnapshot;

/// Ranks 2 and 3 are told to get ready.
pub const SOON_RANK: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueStatus {
	/// No snapshot could be loaded.
	Error,
	/// The player has not entered (or been detected with) a name.
	NoName,
	NotInQueue { open: bool },
	Turn,
	Soon { rank: usize },
	Waiting { rank: usize },
}

impl QueueStatus {
	pub fn derive(snapshot: Option<&QueueSnapshot>, name: &str, max_distance: usize) -> Self {
		let Some(snapshot) = snapshot else {
			return Self::Error;
		};
		if name.trim().is_empty() {
			return Self::NoName;
		}

		match snapshot.position_of(name, max_distance) {
			None => Self::NotInQueue { open: snapshot.open },
			Some(0) => Self::Turn,
			Some(idx) if idx < SOON_RANK => Self::Soon { rank: idx + 1 },
			Some(idx) => Self::Waiting { rank: idx + 1 },
		}
	}

	/// 1-based rank when queued.
	pub fn rank(&self) -> Option<usize> {
		match self {
			Self::Turn => Some(1),
			Self::Soon { rank } | Self::Waiting { rank } => Some(*rank),
			_ => None,
		}
	}

	/// Visual state of the status card.
	pub fn kind(&self) -> StatusKind {
		match self {
			Self::Error => StatusKind::Error,
			Self::NoName => StatusKind::Warning,
			Self::NotInQueue { .. } => StatusKind::Neutral,
			Self::Turn => StatusKind::Turn,
			Self::Soon { .. } => StatusKind::Soon,
			Self::Waiting { .. } => StatusKind::Waiting,
		}
	}

	pub fn can_join(&self) -> bool {
		matches!(self, Self::NotInQueue { open: true })
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
	Error,
	Warning,
	Neutral,
	Waiting,
	Soon,
	Turn,
}

/// Badge shown next to a queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
	Now,
	Soon,
}

pub fn badge(rank: usize) -> Option<Badge> {
	match rank {
		1 => Some(Badge::Now),
		2..=SOON_RANK => Some(Badge::Soon),
		_ => None,
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alert {
	Turn,
	Soon,
}

/// Fires an alert once when the player becomes first, and once when they
/// enter the "soon" ranks.
#[derive(Debug, Default)]
pub struct AlertTracker {
	was_first: bool,
	was_top: bool,
}

impl AlertTracker {
	pub fn update(&mut self, status: &QueueStatus) -> Option<Alert> {
		match status {
			// Nothing known; keep the previous edges.
			QueueStatus::Error | QueueStatus::NoName => None,
			QueueStatus::Turn => {
				let alert = (!self.was_first).then_some(Alert::Turn);
				self.was_first = true;
				self.was_top = true;
				alert
			}
			QueueStatus::Soon { .. } => {
				let alert = (!self.was_top).then_some(Alert::Soon);
				self.was_top = true;
				self.was_first = false;
				alert
			}
			QueueStatus::NotInQueue { .. } | QueueStatus::Waiting { .. } => {
				self.was_first = false;
				self.was_top = false;
				None
			}
		}
	}
}

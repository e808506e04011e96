//! Encounter reminder detection.
//!
//! The encounter is on screen when any of its NPC references is visible. The
//! reminder is needed while the encounter is on screen and the condition icon
//! (the buff the player is supposed to keep up) is not. Nothing is
//! remembered between frames; every scan derives the state from scratch.

use crate::matcher::{Matcher, Reference};
use crate::Image;

/// Frames whose brightest pixel is at or below this are not scanned.
const DARK_THRESHOLD: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncounterState {
	#[default]
	Idle,
	Active {
		condition_met: bool,
	},
}

impl EncounterState {
	pub fn is_active(&self) -> bool {
		matches!(self, Self::Active { .. })
	}

	pub fn needs_reminder(&self) -> bool {
		matches!(self, Self::Active { condition_met: false })
	}
}

/// Reference images for one encounter.
///
/// A `None` entry failed to load and counts as never visible.
#[derive(Debug, Clone, Default)]
pub struct EncounterRefs {
	pub npcs: Vec<Option<Reference>>,
	pub condition: Option<Reference>,
}

impl EncounterRefs {
	pub fn usable(&self) -> usize {
		self.npcs.iter().flatten().count() + usize::from(self.condition.is_some())
	}

	pub fn total(&self) -> usize {
		self.npcs.len() + 1
	}
}

fn visible(frame: Image, reference: Option<&Reference>, matcher: &dyn Matcher, tolerance: u8) -> bool {
	reference.is_some_and(|r| matcher.is_visible(frame, r, tolerance))
}

pub fn detect(frame: Image, refs: &EncounterRefs, matcher: &dyn Matcher, tolerance: u8) -> EncounterState {
	if frame.is_dark(DARK_THRESHOLD) {
		log::debug!("frame {}x{} is blank; encounter scan skipped", frame.width(), frame.height());
		return EncounterState::Idle;
	}

	let active = refs
		.npcs
		.iter()
		.any(|npc| visible(frame, npc.as_ref(), matcher, tolerance));
	if !active {
		return EncounterState::Idle;
	}

	EncounterState::Active {
		condition_met: visible(frame, refs.condition.as_ref(), matcher, tolerance),
	}
}

//! Persistent application configuration.
//!
//! Stored as JSON in a platform-appropriate config directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::host::OverlayText;

/// Which matcher compares reference images against the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatcherKind {
	/// Sampled keypoints; fast enough to run every tick.
	Keypoint,
	/// Every opaque pixel.
	Exact,
}

/// Which reader decodes the chat box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatReaderKind {
	/// Bitmap font stencils from `fonts/`.
	Font,
	/// General OCR models from `ocr/`; falls back to `Font` when missing.
	Paddle,
}

/// On-disk configuration for the application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
	/// Target window application name (from `xcap::Window::app_name()`).
	///
	/// If multiple windows share the same app name, the first match is used.
	pub app_name: String,

	/// Seconds between encounter checks.
	pub encounter_delay_s: f32,
	/// Seconds between chat reads.
	pub chat_delay_s: f32,

	/// Per-channel colour tolerance for image and glyph matching.
	pub tolerance: u8,
	pub max_keypoints: usize,
	pub matcher: MatcherKind,
	pub chat_reader: ChatReaderKind,
	pub palette: ie::ChatPalette,

	/// Overrides asset discovery when set.
	pub assets_dir: Option<PathBuf>,
	/// Reference images under `refs/`; any of them visible starts the encounter.
	pub encounter_refs: Vec<String>,
	/// Visible while the condition the reminder asks for is met.
	pub condition_ref: String,
	/// Anchors the chat box; the default box is used when absent.
	pub chat_anchor_ref: Option<String>,

	pub reminder_enabled: bool,
	pub reminder: OverlayText,
	pub reminder_interval_s: f32,
	pub reminder_on_s: f32,

	pub chat_alert_enabled: bool,
	pub chat_alert: OverlayText,
	pub keywords: Vec<String>,
	pub chat_alert_interval_s: f32,
	pub chat_alert_on_s: f32,
	pub chat_alert_total_s: f32,

	pub queue_sheet_id: String,
	pub queue_sheet_name: String,
	pub queue_rpc_url: Option<String>,
	pub queue_refresh_s: f32,
	/// Name typed by the player; detected from chat when empty.
	pub player_name: String,

	/// Forced UI locale, system locale when unset.
	pub locale: Option<String>,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			app_name: "rs2client".to_string(),
			encounter_delay_s: 2.0,
			chat_delay_s: 1.0,
			tolerance: ie::matcher::DEFAULT_TOLERANCE,
			max_keypoints: ie::matcher::DEFAULT_MAX_KEYPOINTS,
			matcher: MatcherKind::Keypoint,
			chat_reader: ChatReaderKind::Font,
			palette: ie::ChatPalette::default(),
			assets_dir: None,
			encounter_refs: vec!["zemouregal.png".to_string(), "vorkath.png".to_string()],
			condition_ref: "ghost_haunt.png".to_string(),
			chat_anchor_ref: None,
			reminder_enabled: true,
			reminder: OverlayText {
				text: "Command Ghost for Haunt".to_string(),
				color: ie::Color::new(255, 165, 0),
				size: 28.0,
				offset: [0.0, 0.0],
			},
			reminder_interval_s: 2.0,
			reminder_on_s: 1.5,
			chat_alert_enabled: true,
			chat_alert: OverlayText {
				text: "MOVE SOUTH".to_string(),
				color: ie::Color::new(255, 0, 0),
				size: 32.0,
				offset: [0.0, -55.0],
			},
			keywords: ie::chat::DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
			chat_alert_interval_s: 1.0,
			chat_alert_on_s: 0.7,
			chat_alert_total_s: 10.0,
			queue_sheet_id: String::new(),
			queue_sheet_name: "List".to_string(),
			queue_rpc_url: None,
			queue_refresh_s: 10.0,
			player_name: String::new(),
			locale: None,
		}
	}
}

impl Config {
	/// Path to the config file.
	pub fn path() -> Result<PathBuf> {
		let base = dirs::config_dir().context("config_dir() unavailable")?;
		Ok(base.join("vgt.json"))
	}

	/// Load configuration from disk, falling back to defaults on failure.
	pub fn load_or_default() -> Self {
		match Self::path().and_then(|path| Self::load_from(&path)) {
			Ok(cfg) => cfg,
			Err(err) => {
				tracing::warn!(error = %err, "failed to load config; using defaults");
				Self::default()
			}
		}
	}

	/// Missing file means defaults; unknown or missing fields are tolerated.
	pub fn load_from(path: &Path) -> Result<Self> {
		if !path.exists() {
			return Ok(Self::default());
		}
		let json = fs::read_to_string(path).with_context(|| format!("read {path:?}"))?;
		let mut cfg: Self = serde_json::from_str(&json).with_context(|| format!("parse {path:?}"))?;
		cfg.sanitize();
		Ok(cfg)
	}

	pub fn save(&self) -> Result<()> {
		self.save_to(&Self::path()?)
	}

	pub fn save_to(&self, path: &Path) -> Result<()> {
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent).with_context(|| format!("create {parent:?}"))?;
		}
		let json = serde_json::to_string_pretty(self).context("serialize config")?;
		fs::write(path, json).with_context(|| format!("write {path:?}"))?;
		Ok(())
	}

	/// Clamp hand-edited values into the ranges the UI allows.
	pub fn sanitize(&mut self) {
		self.encounter_delay_s = self.encounter_delay_s.clamp(0.5, 2.5);
		self.chat_delay_s = self.chat_delay_s.clamp(0.5, 2.5);
		self.queue_refresh_s = self.queue_refresh_s.clamp(5.0, 15.0);
		self.max_keypoints = self.max_keypoints.clamp(1, 200);
		self.reminder.size = self.reminder.size.clamp(10.0, 72.0);
		self.reminder_interval_s = self.reminder_interval_s.clamp(0.5, 5.0);
		self.reminder_on_s = self.reminder_on_s.clamp(0.1, 5.0);
		self.chat_alert.size = self.chat_alert.size.clamp(10.0, 72.0);
		self.chat_alert_interval_s = self.chat_alert_interval_s.clamp(0.5, 5.0);
		self.chat_alert_on_s = self.chat_alert_on_s.clamp(0.1, 5.0);
		self.chat_alert_total_s = self.chat_alert_total_s.clamp(1.0, 60.0);
	}

	/// Asset directory: the configured one, or the discovered one.
	pub fn assets(&self) -> Option<PathBuf> {
		self.assets_dir.clone().or_else(crate::util::assets::resolve_assets_dir)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn missing_file_gives_defaults() {
		let dir = tempfile::tempdir().unwrap();
		let cfg = Config::load_from(&dir.path().join("vgt.json")).unwrap();
		assert_eq!(cfg.app_name, Config::default().app_name);
		assert_eq!(cfg.tolerance, 25);
	}

	#[test]
	fn round_trips_through_disk() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("nested").join("vgt.json");

		let mut cfg = Config::default();
		cfg.player_name = "Iron Bob".into();
		cfg.keywords = vec!["south".into()];
		cfg.matcher = MatcherKind::Exact;
		cfg.save_to(&path).unwrap();

		let loaded = Config::load_from(&path).unwrap();
		assert_eq!(loaded.player_name, "Iron Bob");
		assert_eq!(loaded.keywords, vec!["south".to_string()]);
		assert_eq!(loaded.matcher, MatcherKind::Exact);
		assert_eq!(loaded.reminder, cfg.reminder);
	}

	#[test]
	fn partial_file_fills_in_defaults_and_clamps() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("vgt.json");
		fs::write(&path, r#"{"app_name": "game", "queue_refresh_s": 60.0}"#).unwrap();

		let cfg = Config::load_from(&path).unwrap();
		assert_eq!(cfg.app_name, "game");
		assert_eq!(cfg.queue_refresh_s, 15.0);
		assert_eq!(cfg.chat_alert.text, "MOVE SOUTH");
	}

	#[test]
	fn out_of_range_timings_are_clamped() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("vgt.json");
		fs::write(
			&path,
			r#"{"reminder_on_s": -1.0, "reminder_interval_s": 1e30, "chat_alert_on_s": 1e30, "chat_alert_interval_s": -3.0, "chat_alert_total_s": -5.0}"#,
		)
		.unwrap();

		let cfg = Config::load_from(&path).unwrap();
		assert_eq!(cfg.reminder_on_s, 0.1);
		assert_eq!(cfg.reminder_interval_s, 5.0);
		assert_eq!(cfg.chat_alert_on_s, 5.0);
		assert_eq!(cfg.chat_alert_interval_s, 0.5);
		assert_eq!(cfg.chat_alert_total_s, 1.0);
		for secs in [
			cfg.reminder_on_s,
			cfg.reminder_interval_s,
			cfg.chat_alert_on_s,
			cfg.chat_alert_interval_s,
			cfg.chat_alert_total_s,
		] {
			assert!(std::time::Duration::try_from_secs_f32(secs).is_ok());
		}
	}

	#[test]
	fn broken_file_is_an_error() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("vgt.json");
		fs::write(&path, "{ nope").unwrap();
		assert!(Config::load_from(&path).is_err());
	}
}

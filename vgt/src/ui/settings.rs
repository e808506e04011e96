use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};

use crate::config::{ChatReaderKind, MatcherKind};
use crate::ui::ext::UiExt;

pub struct SettingsState {
	windows: Vec<String>,
	capture_message: Option<String>,
}

impl SettingsState {
	pub fn new() -> Self {
		Self {
			windows: crate::capture::window_names(),
			capture_message: None,
		}
	}
}

/// Writes the current frame as a PNG, as raw material for reference images.
fn save_capture(app_name: &str) -> Result<PathBuf> {
	let image = crate::capture::capture_specific(app_name).context("game window not found")?;
	let dir = dirs::picture_dir()
		.or_else(dirs::config_dir)
		.context("no directory to save captures in")?;
	let stamp = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_secs())
		.unwrap_or_default();
	let path = dir.join(format!("vgt-capture-{stamp}.png"));
	image.as_image().save_png(&path)?;
	Ok(path)
}

pub fn ui(ui: &mut egui::Ui, state: &mut SettingsState, modules: &mut [Box<dyn crate::module::Module>]) {
	let mut config = crate::config();
	let mut changed = false;

	ui.horizontal(|ui| {
		changed |= ui.combo_pick(&mut config.app_name, &crate::tr!("settings-window"), &state.windows);
		if ui.small_button("⟳").clicked() {
			state.windows = crate::capture::window_names();
		}
	});
	changed |= ui.text_edit_labeled(&mut config.app_name, &crate::tr!("settings-window-name")).changed();

	ui.horizontal(|ui| {
		if ui.button(crate::tr!("settings-save-capture")).clicked() {
			state.capture_message = Some(match save_capture(&config.app_name) {
				Ok(path) => crate::tr!("capture-saved", path = path.display().to_string()),
				Err(err) => crate::tr!("capture-failed", error = format!("{err:#}")),
			});
		}
		if let Some(message) = &state.capture_message {
			ui.small(message.as_str());
		}
	});

	ui.spacer();
	ui.label(crate::tr!("settings-scanning"));
	changed |= ui
		.num_edit_range(&mut config.encounter_delay_s, &crate::tr!("settings-encounter-delay"), 0.5..=2.5)
		.changed();
	changed |= ui
		.num_edit_range(&mut config.chat_delay_s, &crate::tr!("settings-chat-delay"), 0.5..=2.5)
		.changed();
	changed |= ui
		.num_edit_range(&mut config.tolerance, &crate::tr!("settings-tolerance"), 0..=128)
		.changed();
	changed |= ui
		.num_edit_range(&mut config.max_keypoints, &crate::tr!("settings-keypoints"), 1..=200)
		.changed();

	egui::ComboBox::from_label(crate::tr!("settings-matcher"))
		.selected_text(format!("{:?}", config.matcher))
		.show_ui(ui, |ui| {
			changed |= ui.selectable_value(&mut config.matcher, MatcherKind::Keypoint, "Keypoint").changed();
			changed |= ui.selectable_value(&mut config.matcher, MatcherKind::Exact, "Exact").changed();
		});
	egui::ComboBox::from_label(crate::tr!("settings-chat-reader"))
		.selected_text(format!("{:?}", config.chat_reader))
		.show_ui(ui, |ui| {
			changed |= ui.selectable_value(&mut config.chat_reader, ChatReaderKind::Font, "Font").changed();
			changed |= ui.selectable_value(&mut config.chat_reader, ChatReaderKind::Paddle, "Paddle").changed();
		});
	ui.small(crate::tr!("restart-required"));

	for module in modules {
		ui.spacer();
		changed |= module.ui_settings(ui, &mut config);
	}

	if changed {
		config.sanitize();
		if let Err(err) = config.save() {
			tracing::warn!(error = %format!("{err:#}"), "failed to save config");
		}
	}
}

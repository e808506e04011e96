//! Vorkath game tools.
//!
//! Watches the game window for the encounter and chat call-outs, flashes
//! reminders over it, and shows where the player stands in the shared queue.

use std::sync::{LazyLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

mod capture;
mod config;
mod flash;
mod host;
mod i18n;
mod module;
mod overlay;
mod pol;
mod ui;
mod util;

static CONFIG: LazyLock<RwLock<config::Config>> = LazyLock::new(|| RwLock::new(config::Config::load_or_default()));

pub fn config() -> RwLockWriteGuard<'static, config::Config> {
	CONFIG.write().expect("config lock poisoned")
}

pub fn config_read() -> RwLockReadGuard<'static, config::Config> {
	CONFIG.read().expect("config lock poisoned")
}

fn main() -> eframe::Result {
	// Structured logging. Use `RUST_LOG=info` etc.
	tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.init();

	let locale = config_read().locale.clone();
	i18n::init(locale.as_deref());

	let options = eframe::NativeOptions {
		viewport: egui::ViewportBuilder::default()
			.with_title(tr!("app-title"))
			.with_inner_size([460.0, 640.0]),
		..Default::default()
	};

	eframe::run_native("vgt", options, Box::new(|cc| Ok(Box::new(ui::Vgt::new(cc)))))
}

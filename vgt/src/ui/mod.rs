use std::rc::Rc;
use std::time::{Duration, Instant};

mod ext;
pub use ext::UiExt;

mod settings;

use crate::config::{ChatReaderKind, Config, MatcherKind};
use crate::overlay::{OverlayBoard, OverlayWindow};
use crate::pol::{Pol, ScanEvents, ScanIntervals, Scanner};

/// Modules are ticked at least this often so flashes keep their rhythm.
const TICK: Duration = Duration::from_millis(100);

pub struct Vgt {
	modules: Vec<Box<dyn crate::module::Module>>,
	pol: Pol,
	scans: ScanEvents,

	board: Rc<OverlayBoard>,
	overlay: OverlayWindow,

	settings: settings::SettingsState,
	/// Loaded references out of the configured ones.
	refs_loaded: (usize, usize),
	tab: Tab,
}

impl Vgt {
	pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
		let config = crate::config_read().clone();

		let (ie, refs_loaded) = build_ie(&config);
		let capture = crate::capture::WindowCapture::new(config.app_name.clone());
		let intervals = ScanIntervals {
			encounter: Duration::from_secs_f32(config.encounter_delay_s),
			chat: Duration::from_secs_f32(config.chat_delay_s),
		};
		let (pol, scans) = Pol::spawn(Scanner::new(ie, Box::new(capture), intervals, Instant::now()));

		let board = Rc::new(OverlayBoard::default());
		let modules: Vec<Box<dyn crate::module::Module>> = vec![
			Box::new(crate::module::Reminder::new(board.clone(), &config)),
			Box::new(crate::module::ChatAlert::new(board.clone(), &config)),
			Box::new(crate::module::Queue::new(board.clone(), &config)),
		];

		Self {
			modules,
			pol,
			scans,
			board,
			overlay: OverlayWindow::default(),
			settings: settings::SettingsState::new(),
			refs_loaded,
			tab: Tab::Home,
		}
	}

	fn ui_home(&mut self, ui: &mut egui::Ui) {
		let (loaded, total) = self.refs_loaded;
		if loaded < total {
			ui.group(|ui| {
				ui.label(egui::RichText::new(crate::tr!("refs-missing", loaded = loaded.to_string(), total = total.to_string())).strong());
			});
			ui.add_space(6.0);
		}

		ui.horizontal(|ui| {
			let secs = format!("{:.1}", self.pol.secs_till_next_poll());
			ui.small(crate::tr!("next-scan", secs = secs));
			if ui.small_button(crate::tr!("scan-now")).clicked() {
				self.pol.poll_now();
			}
		});

		for module in &mut self.modules {
			ui.spacer();
			ui.heading(module.name());
			module.ui_important(ui);
		}
	}

	fn ui_module(&mut self, ui: &mut egui::Ui, index: usize) {
		if let Some(module) = self.modules.get_mut(index) {
			ui.heading(module.name());
			module.ui(ui);
		}
	}
}

/// Loads references and fonts and picks the matcher and chat reader.
/// Missing assets only disable what depends on them.
fn build_ie(config: &Config) -> (ie::Ie, (usize, usize)) {
	use crate::util::assets;

	let assets_dir = config.assets();
	let load = |file: &str| {
		assets_dir
			.as_deref()
			.and_then(|dir| assets::load_reference(dir, file, config.max_keypoints))
	};

	let encounter = ie::screen::encounter::EncounterRefs {
		npcs: config.encounter_refs.iter().map(|f| load(f.as_str())).collect(),
		condition: load(&config.condition_ref),
	};
	let refs_loaded = (encounter.usable(), encounter.total());
	let chat_anchor = config.chat_anchor_ref.as_deref().and_then(load);

	let matcher: Box<dyn ie::matcher::Matcher> = match config.matcher {
		MatcherKind::Keypoint => Box::new(ie::matcher::KeypointMatcher),
		MatcherKind::Exact => Box::new(ie::matcher::ExactMatcher),
	};

	let font_reader = || -> Box<dyn ie::ocr::TextReader> {
		let fonts = assets_dir.as_deref().map(assets::load_fonts).unwrap_or_default();
		if fonts.is_empty() {
			tracing::warn!("no chat fonts loaded; chat alerts and name detection are off");
		}
		Box::new(ie::chat::ChatReader::new(fonts, config.palette.clone(), config.tolerance))
	};
	let chat: Box<dyn ie::ocr::TextReader> = match (config.chat_reader, assets_dir.as_deref()) {
		(ChatReaderKind::Paddle, Some(dir)) => {
			let paddle = assets::resolve_ocr_assets(dir).and_then(|m| {
				ie::ocr::PaddleOcr::try_new(m.detection, m.recognition, m.charset, config.palette.colors().to_vec())
			});
			match paddle {
				Ok(ocr) => Box::new(ocr) as Box<dyn ie::ocr::TextReader>,
				Err(err) => {
					tracing::warn!(error = %format!("{err:#}"), "OCR unavailable; using bitmap fonts");
					font_reader()
				}
			}
		}
		_ => font_reader(),
	};

	tracing::info!(loaded = refs_loaded.0, total = refs_loaded.1, "reference images loaded");
	let ie = ie::Ie::new(matcher, config.tolerance, encounter, chat_anchor, chat);
	(ie, refs_loaded)
}

impl eframe::App for Vgt {
	fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
		let now = Instant::now();
		while let Ok(event) = self.scans.try_recv() {
			for module in &mut self.modules {
				module.on_scan(&event, now);
			}
		}
		for module in &mut self.modules {
			module.tick(now);
		}

		egui::TopBottomPanel::top("tabs").show(ctx, |ui| {
			ui.horizontal(|ui| {
				ui.selectable_value(&mut self.tab, Tab::Home, crate::tr!("tab-home"));
				for index in 0..self.modules.len() {
					let name = self.modules[index].name();
					ui.selectable_value(&mut self.tab, Tab::Module(index), name);
				}
				ui.selectable_value(&mut self.tab, Tab::Settings, crate::tr!("tab-settings"));
			});
		});

		egui::CentralPanel::default().show(ctx, |ui| {
			egui::ScrollArea::vertical().show(ui, |ui| match self.tab {
				Tab::Home => self.ui_home(ui),
				Tab::Module(index) => self.ui_module(ui, index),
				Tab::Settings => settings::ui(ui, &mut self.settings, &mut self.modules),
			});
		});

		let app_name = crate::config_read().app_name.clone();
		self.overlay.show(ctx, &self.board, &app_name);

		ctx.request_repaint_after(TICK);
	}

	fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
		// The overlay viewport must stay see-through.
		[0.0; 4]
	}
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Tab {
	Home,
	Module(usize),
	Settings,
}

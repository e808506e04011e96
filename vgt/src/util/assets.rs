//! Runtime asset discovery and loading.
//!
//! Layout of the asset directory:
//!
//! ```text
//! assets/
//!   refs/    reference PNGs (encounter NPCs, condition icon, chat anchor)
//!   fonts/   bitmap chat fonts as JSON
//!   ocr/     optional PaddleOCR models
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

#[derive(Debug, Clone)]
pub struct OcrAssets {
	pub detection: PathBuf,
	pub recognition: PathBuf,
	pub charset: PathBuf,
}

fn normalize_assets_dir(dir: PathBuf) -> PathBuf {
	// Accept either the folder containing `assets/` or `assets/` itself.
	if dir.join("refs").is_dir() || dir.join("fonts").is_dir() {
		dir
	} else {
		dir.join("assets")
	}
}

/// Find the asset directory, in order: `VGT_ASSETS_DIR`, next to the
/// executable, the working directory, and (debug builds) the workspace.
pub fn resolve_assets_dir() -> Option<PathBuf> {
	let mut candidates: Vec<PathBuf> = Vec::new();
	if let Some(dir) = std::env::var_os("VGT_ASSETS_DIR") {
		candidates.push(PathBuf::from(dir));
	}
	if let Ok(exe) = std::env::current_exe()
		&& let Some(dir) = exe.parent()
	{
		candidates.push(dir.to_path_buf());
	}
	if let Ok(cwd) = std::env::current_dir() {
		candidates.push(cwd);
	}
	#[cfg(debug_assertions)]
	candidates.push(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(".."));

	let found = candidates.into_iter().map(normalize_assets_dir).find(|dir| dir.is_dir());
	if found.is_none() {
		tracing::warn!("asset directory not found; set VGT_ASSETS_DIR to the folder containing refs/ and fonts/");
	}
	found
}

/// A reference that fails to load stays unusable for the session; matching
/// against it is simply skipped.
pub fn load_reference(assets: &Path, file: &str, max_keypoints: usize) -> Option<ie::matcher::Reference> {
	let path = assets.join("refs").join(file);
	match ie::matcher::Reference::load(file, &path, max_keypoints) {
		Ok(reference) => {
			if !reference.is_matchable() {
				tracing::warn!(reference = file, "reference has no opaque pixels and will never match");
			}
			Some(reference)
		}
		Err(err) => {
			tracing::warn!(error = %format!("{err:#}"), reference = file, "reference unusable for this session");
			None
		}
	}
}

/// Every `*.json` font under `fonts/`, in file name order. Broken fonts are
/// logged and left out.
pub fn load_fonts(assets: &Path) -> Vec<ie::ocr::Font> {
	let dir = assets.join("fonts");
	let mut paths = match std::fs::read_dir(&dir) {
		Ok(entries) => entries
			.filter_map(|e| e.ok().map(|e| e.path()))
			.filter(|p| p.extension().is_some_and(|ext| ext == "json"))
			.collect::<Vec<_>>(),
		Err(err) => {
			tracing::warn!(error = %err, dir = %dir.display(), "no chat fonts");
			return Vec::new();
		}
	};
	paths.sort();

	paths
		.into_iter()
		.filter_map(|path| match ie::ocr::Font::load(&path) {
			Ok(font) => Some(font),
			Err(err) => {
				tracing::warn!(error = %format!("{err:#}"), "skipping font");
				None
			}
		})
		.collect()
}

pub fn resolve_ocr_assets(assets: &Path) -> Result<OcrAssets> {
	let dir = assets.join("ocr");
	let detection = dir.join("detection.mnn");
	let recognition = dir.join("latin_recognition.mnn");
	let charset = dir.join("latin_charset.txt");

	if detection.is_file() && recognition.is_file() && charset.is_file() {
		return Ok(OcrAssets { detection, recognition, charset });
	}
	bail!(
		"OCR model files not found in {}. Expected detection.mnn, latin_recognition.mnn and latin_charset.txt",
		dir.display()
	)
}

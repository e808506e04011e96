use xcap::image::EncodableLayout;

/// Geometry information for the captured application window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowBounds {
	pub x: f32,
	pub y: f32,
	pub width: f32,
	pub height: f32,
	/// Monitor scale factor (physical pixels per logical point).
	pub scale_factor: f32,
}

pub fn find_window(app_name: &str) -> Option<xcap::Window> {
	let windows = xcap::Window::all().ok()?;
	windows
		.into_iter()
		.find(|window| window.app_name().ok().as_deref() == Some(app_name))
}

/// Application names of all windows currently open, for the settings picker.
pub fn window_names() -> Vec<String> {
	let mut names = match xcap::Window::all() {
		Ok(windows) => windows
			.into_iter()
			.filter_map(|w| w.app_name().ok())
			.filter(|n| !n.is_empty())
			.collect::<Vec<_>>(),
		Err(err) => {
			tracing::warn!(error = %err, "failed to enumerate windows");
			Vec::new()
		}
	};
	names.sort();
	names.dedup();
	names
}

pub fn window_bounds(app_name: &str) -> Option<WindowBounds> {
	let window = find_window(app_name)?;
	let scale_factor = window
		.current_monitor()
		.ok()
		.and_then(|m| m.scale_factor().ok())
		.unwrap_or(1.0);

	Some(WindowBounds {
		x: window.x().ok()? as f32,
		y: window.y().ok()? as f32,
		width: window.width().ok()? as f32,
		height: window.height().ok()? as f32,
		scale_factor,
	})
}

pub fn capture_specific(app_name: &str) -> Option<ie::OwnedImage> {
	let window = find_window(app_name)?;
	let img = match window.capture_image() {
		Ok(img) => img,
		Err(err) => {
			tracing::debug!(error = %err, app_name, "window capture failed");
			return None;
		}
	};
	Some(ie::OwnedImage::from_rgba(img.width() as usize, img.as_bytes()))
}

/// Captures the game window by its application name.
pub struct WindowCapture {
	app_name: String,
}

impl WindowCapture {
	pub fn new(app_name: impl Into<String>) -> Self {
		Self { app_name: app_name.into() }
	}
}

impl crate::host::Capture for WindowCapture {
	fn capture(&mut self) -> Option<ie::OwnedImage> {
		capture_specific(&self.app_name)
	}
}

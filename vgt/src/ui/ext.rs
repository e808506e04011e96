use std::ops::RangeInclusive;

pub trait UiExt {
	fn num_edit_range<T: egui::emath::Numeric>(&mut self, value: &mut T, label: &str, range: RangeInclusive<T>) -> egui::Response;

	fn text_edit_labeled(&mut self, value: &mut String, label: &str) -> egui::Response;

	/// Pick one of `options`, or keep the current value if it is not listed.
	fn combo_pick(&mut self, value: &mut String, label: &str, options: &[String]) -> bool;

	fn spacer(&mut self);
}

impl UiExt for egui::Ui {
	fn num_edit_range<T: egui::emath::Numeric>(&mut self, value: &mut T, label: &str, range: RangeInclusive<T>) -> egui::Response {
		self.horizontal(|ui| {
			let resp = ui.add(egui::DragValue::new(value).range(range).speed(0.05));
			ui.label(label);
			resp
		})
		.inner
	}

	fn text_edit_labeled(&mut self, value: &mut String, label: &str) -> egui::Response {
		self.horizontal(|ui| {
			ui.label(label);
			ui.text_edit_singleline(value)
		})
		.inner
	}

	fn combo_pick(&mut self, value: &mut String, label: &str, options: &[String]) -> bool {
		let mut changed = false;
		egui::ComboBox::from_label(label)
			.selected_text(value.as_str())
			.show_ui(self, |ui| {
				for option in options {
					changed |= ui.selectable_value(value, option.clone(), option).changed();
				}
			});
		changed
	}

	fn spacer(&mut self) {
		self.add_space(8.0);
		self.separator();
		self.add_space(4.0);
	}
}

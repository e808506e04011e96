//! General OCR engine wrapper.
//!
//! Relies on `ocr-rs` (Rust PaddleOCR bindings). OCR engines are sensitive to
//! input quality, so each read runs a few preprocessing candidates and keeps
//! the most plausible result.

use std::path::Path;

use anyhow::{Context, Result};

use crate::{Color, Image, OwnedImage};

/// Crops shorter than this are upscaled before recognition.
const MIN_HEIGHT: u32 = 80;

pub struct PaddleOcr {
    engine: ocr_rs::OcrEngine,
    /// Text colours used by the palette-guided candidate.
    palette: Vec<Color>,
    tolerance: u8,
}

impl PaddleOcr {
    /// Initialize the OCR engine with the given model paths.
    pub fn try_new(
        detection: impl AsRef<Path>,
        recognition: impl AsRef<Path>,
        charset: impl AsRef<Path>,
        palette: Vec<Color>,
    ) -> Result<Self> {
        let thread_count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        let engine = ocr_rs::OcrEngine::new(
            detection,
            recognition,
            charset,
            Some(ocr_rs::OcrEngineConfig {
                backend: ocr_rs::Backend::CPU,
                thread_count: thread_count as i32,
                precision_mode: ocr_rs::PrecisionMode::High,
                enable_parallel: thread_count > 1,
                min_result_confidence: 0.5,
                ..Default::default()
            }),
        )
        .context("failed to initialize OCR engine")?;

        Ok(Self {
            engine,
            palette,
            tolerance: 40,
        })
    }

    fn recognize(&self, image: Image) -> Vec<String> {
        let image = ocr_rs::preprocess::rgb_to_image(&image.get_bytes(), image.width(), image.height());

        match self.engine.recognize(&image) {
            Ok(results) => results
                .into_iter()
                .map(|v| v.text.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect(),
            Err(err) => {
                log::debug!("ocr recognize failed: {err}");
                Vec::new()
            }
        }
    }

    /// Preprocessing candidates: adaptive threshold, global Otsu, and a
    /// palette-guided binarisation.
    fn candidates(&self, region: Image) -> Vec<OwnedImage> {
        use imageproc::contrast::{ThresholdType, adaptive_threshold, equalize_histogram, otsu_level, threshold};

        let mut base = region.to_owned_image();
        if base.height() < MIN_HEIGHT {
            if let Err(err) = base.resize_h(MIN_HEIGHT) {
                log::debug!("upscale before ocr failed: {err:#}");
            }
        }

        let gray = equalize_histogram(&base.to_gray_image());

        let adaptive = OwnedImage::from_gray_as_rgb(&ensure_dark_text_on_light(adaptive_threshold(&gray, 7, 10)));

        let level = otsu_level(&gray);
        let otsu = OwnedImage::from_gray_as_rgb(&ensure_dark_text_on_light(threshold(
            &gray,
            level,
            ThresholdType::Binary,
        )));

        let mut guided = base;
        let palette = &self.palette;
        let tolerance = self.tolerance;
        guided.map_pixels(|v| {
            let ink = palette.iter().any(|c| v.within(*c, tolerance));
            *v = if ink { Color::BLACK } else { Color::WHITE };
        });

        vec![adaptive, otsu, guided]
    }
}

impl super::TextReader for PaddleOcr {
    fn read_lines(&mut self, region: Image) -> Vec<String> {
        if region.width() == 0 || region.height() == 0 {
            return Vec::new();
        }

        let mut best = Vec::new();
        let mut best_score = i64::MIN;
        for cand in self.candidates(region) {
            let lines = self.recognize(cand.as_image());
            let score = lines.iter().map(|l| score_ocr_text(l)).sum::<i64>();
            if score > best_score {
                best_score = score;
                best = lines;
            }
        }
        best
    }
}

fn ensure_dark_text_on_light(mut bin: image::GrayImage) -> image::GrayImage {
    // If the image is mostly black, invert it so background becomes light.
    let white = bin.pixels().filter(|p| p.0[0] > 0).count();
    let black = bin.pixels().count() - white;
    if black > white {
        for p in bin.pixels_mut() {
            p.0[0] = 255u8.saturating_sub(p.0[0]);
        }
    }
    bin
}

/// Prefer strings with more alphanumerics (less noise) and slightly longer length.
fn score_ocr_text(text: &str) -> i64 {
    let mut score = 0i64;
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            score += 3;
        } else if !ch.is_whitespace() {
            score += 1;
        }
    }
    score + text.len() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoring_prefers_clean_text() {
        assert!(score_ocr_text("move south") > score_ocr_text("~~|'. ,;"));
        assert_eq!(score_ocr_text(""), 0);
    }

    #[test]
    fn inverts_mostly_dark_binaries() {
        let mut bin = image::GrayImage::new(4, 1);
        bin.put_pixel(0, 0, image::Luma([255]));
        let out = ensure_dark_text_on_light(bin);
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
        assert_eq!(out.get_pixel(3, 0).0[0], 255);
    }
}

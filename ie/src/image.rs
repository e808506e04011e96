//! Image primitives.
//!
//! Captures and reference images share one lightweight owned RGB type
//! (`OwnedImage`). Scans mostly borrow a view (`Image<'a>`) so cropping the
//! chat box or sliding a reference window never copies pixels.
//!
//! Reference PNGs are decoded with the `image` crate, which hands back the
//! raw stored samples. No gamma or sRGB conversion happens on the way in,
//! which matters: the matcher compares exact channel values against what the
//! game draws.

use anyhow::{Context, Result};

/// Packed opacity bitset (row-major), one bit per pixel.
#[derive(Clone, Debug)]
pub struct OwnedMask(pub Vec<u8>);

impl OwnedMask {
    /// Mask with every pixel of a `width * height` image set.
    pub fn opaque(width: u32, height: u32) -> Self {
        let len = (width * height) as usize;
        let mut mask = vec![0u8; len / 8 + 1];
        for i in 0..len {
            mask[i / 8] |= 1 << (i % 8);
        }
        Self(mask)
    }

    #[inline]
    pub fn get(&self, i: usize) -> bool {
        self.0
            .get(i / 8)
            .is_some_and(|byte| (byte >> (i % 8)) & 1 == 1)
    }

    #[inline]
    pub fn set(&mut self, i: usize, value: bool) {
        if let Some(byte) = self.0.get_mut(i / 8) {
            if value {
                *byte |= 1 << (i % 8);
            } else {
                *byte &= !(1 << (i % 8));
            }
        }
    }
}

/// Owned RGB image (no alpha).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnedImage {
    width: u32,
    height: u32,
    data: Vec<Color>,
}

impl OwnedImage {
    /// Build an image from row-major pixels. Returns `None` if the pixel count
    /// does not match the dimensions.
    pub fn new(width: u32, height: u32, data: Vec<Color>) -> Option<Self> {
        ((width * height) as usize == data.len()).then_some(Self {
            width,
            height,
            data,
        })
    }

    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        Self {
            width,
            height,
            data: vec![color; (width * height) as usize],
        }
    }

    /// Build an `OwnedImage` from RGBA bytes (alpha is discarded).
    ///
    /// The buffer is expected to be tightly packed: `width * height * 4` bytes.
    pub fn from_rgba(width: usize, bytes: &[u8]) -> Self {
        let height = bytes.len() / width.max(1) / 4;
        let data = bytes
            .chunks_exact(4)
            .take(width * height)
            .map(|v| Color::new(v[0], v[1], v[2]))
            .collect::<Vec<_>>();

        Self {
            width: width as u32,
            height: height as u32,
            data,
        }
    }

    /// Load an RGBA PNG and return an `(OwnedImage, OwnedMask)` pair.
    ///
    /// The mask bit is set where the original alpha value was >= `alpha_threshold`.
    pub fn from_png_mask(bytes: &[u8], alpha_threshold: u8) -> Result<(Self, OwnedMask)> {
        let img = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
            .context("decode png (with alpha)")?
            .to_rgba8();
        let (width, height) = img.dimensions();
        let mut data = Vec::with_capacity((width * height) as usize);
        let mut mask = vec![0u8; (width * height) as usize / 8 + 1];

        for (i, p) in img.pixels().enumerate() {
            let [r, g, b, a] = p.0;
            data.push(Color::new(r, g, b));
            if a >= alpha_threshold {
                mask[i / 8] |= 1 << (i % 8);
            }
        }

        Ok((
            Self {
                width,
                height,
                data,
            },
            OwnedMask(mask),
        ))
    }

    #[inline(always)]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline(always)]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Overwrite a pixel. Out-of-bounds writes are ignored.
    pub fn put_pixel(&mut self, x: u32, y: u32, color: Color) {
        if x < self.width && y < self.height {
            self.data[(x + y * self.width) as usize] = color;
        }
    }

    /// Copy `other` into this image with its top-left corner at `(x, y)`,
    /// clipping whatever falls outside.
    pub fn blit(&mut self, other: Image, x: u32, y: u32) {
        for oy in 0..other.height() {
            for ox in 0..other.width() {
                self.put_pixel(x + ox, y + oy, other.get(ox, oy));
            }
        }
    }

    /// Resize this image to the given height (preserving aspect ratio).
    ///
    /// Uses `fast_image_resize` (SIMD-optimized) and keeps output in `Vec<Color>`.
    pub fn resize_h(&mut self, height: u32) -> Result<()> {
        if self.height == height || self.width == 0 || self.height == 0 {
            return Ok(());
        }

        let height = height.max(1);
        let width = ((self.width as u64 * height as u64 / self.height as u64) as u32).max(1);

        let src_bytes = self.as_image().get_bytes();
        let src = fast_image_resize::images::ImageRef::new(
            self.width,
            self.height,
            &src_bytes,
            fast_image_resize::PixelType::U8x3,
        )
        .context("fast_image_resize: ImageRef::new failed")?;

        let mut dst = fast_image_resize::images::Image::new(width, height, fast_image_resize::PixelType::U8x3);

        let mut resizer = fast_image_resize::Resizer::new();
        let options = fast_image_resize::ResizeOptions::new().resize_alg(
            fast_image_resize::ResizeAlg::Interpolation(fast_image_resize::FilterType::CatmullRom),
        );

        resizer
            .resize(&src, &mut dst, &options)
            .context("fast_image_resize: resize failed")?;

        self.data = dst
            .into_vec()
            .chunks_exact(3)
            .map(|px| Color::new(px[0], px[1], px[2]))
            .collect();
        self.width = width;
        self.height = height;
        Ok(())
    }

    pub fn map_pixels(&mut self, f: impl Fn(&mut Color)) {
        for v in &mut self.data {
            f(v);
        }
    }

    /// Create a borrowed view of this entire image.
    pub fn as_image(&self) -> Image<'_> {
        Image {
            x1: 0,
            y1: 0,
            x2: self.width,
            y2: self.height,
            true_width: self.width,
            data: &self.data,
        }
    }

    /// Convert to a grayscale `GrayImage` (luma).
    pub fn to_gray_image(&self) -> image::GrayImage {
        image::GrayImage::from_fn(self.width, self.height, |x, y| {
            image::Luma([self.data[(x + y * self.width) as usize].luma()])
        })
    }

    /// Create an RGB `OwnedImage` from a grayscale image (each pixel repeated into RGB).
    pub fn from_gray_as_rgb(gray: &image::GrayImage) -> Self {
        let (w, h) = gray.dimensions();
        let data = gray
            .pixels()
            .map(|p| Color::new(p.0[0], p.0[0], p.0[0]))
            .collect();
        Self {
            width: w,
            height: h,
            data,
        }
    }
}

// ----------

/// Borrowed image view into an `OwnedImage`.
#[derive(Clone, Copy)]
pub struct Image<'a> {
    x1: u32,
    y1: u32,
    x2: u32,
    y2: u32,
    true_width: u32,
    data: &'a [Color],
}

impl<'a> Image<'a> {
    #[inline(always)]
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    #[inline(always)]
    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    /// Pixel at view-relative coordinates. Callers must stay in bounds.
    #[inline(always)]
    pub fn get(&self, x: u32, y: u32) -> Color {
        self.data[(self.x1 + x + (self.y1 + y) * self.true_width) as usize]
    }

    pub fn to_owned_image(self) -> OwnedImage {
        let mut data = Vec::with_capacity((self.width() * self.height()) as usize);
        for y in 0..self.height() {
            for x in 0..self.width() {
                data.push(self.get(x, y));
            }
        }

        OwnedImage {
            width: self.width(),
            height: self.height(),
            data,
        }
    }

    /// Packed RGB bytes, row-major.
    pub fn get_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity((self.width() * self.height() * 3) as usize);
        for y in 0..self.height() {
            for x in 0..self.width() {
                let clr = self.get(x, y);
                bytes.extend_from_slice(&[clr.r, clr.g, clr.b]);
            }
        }
        bytes
    }

    pub fn save_png<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let img = image::RgbImage::from_raw(self.width(), self.height(), self.get_bytes())
            .context("RgbImage::from_raw failed")?;
        img.save_with_format(path, image::ImageFormat::Png)
            .context("save png")?;
        Ok(())
    }

    /// Create an arbitrary subimage (relative coordinates), clamped to this view.
    pub fn sub_image(&self, x: u32, y: u32, width: u32, height: u32) -> Self {
        let x = x.min(self.width());
        let y = y.min(self.height());
        let width = width.min(self.width() - x);
        let height = height.min(self.height() - y);

        Self {
            x1: self.x1 + x,
            y1: self.y1 + y,
            x2: self.x1 + x + width,
            y2: self.y1 + y + height,
            true_width: self.true_width,
            data: self.data,
        }
    }

    /// Brightest luma value in the view (0 for an empty view).
    pub fn max_luma(&self) -> u8 {
        let mut max = 0;
        for y in 0..self.height() {
            for x in 0..self.width() {
                max = max.max(self.get(x, y).luma());
                if max == u8::MAX {
                    return max;
                }
            }
        }
        max
    }

    /// True when no pixel is brighter than `threshold`.
    ///
    /// A black capture usually means the game is minimized or the capture
    /// backend lost the window; scans bail out early on it.
    pub fn is_dark(&self, threshold: u8) -> bool {
        self.max_luma() <= threshold
    }
}

// ----------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[repr(C)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Self = Self::new(255, 255, 255);
    pub const BLACK: Self = Self::new(0, 0, 0);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Largest per-channel absolute difference.
    #[inline]
    pub fn max_channel_diff(&self, other: Color) -> u8 {
        self.r
            .abs_diff(other.r)
            .max(self.g.abs_diff(other.g))
            .max(self.b.abs_diff(other.b))
    }

    /// Per-channel tolerance test used by every matcher in the crate.
    #[inline]
    pub fn within(&self, other: Color, tolerance: u8) -> bool {
        self.max_channel_diff(other) <= tolerance
    }

    /// Compute luma (grayscale intensity).
    pub fn luma(&self) -> u8 {
        let r = self.r as u32;
        let g = self.g as u32;
        let b = self.b as u32;
        ((299 * r + 587 * g + 114 * b) / 1000) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_image_is_clamped() {
        let img = OwnedImage::filled(10, 5, Color::WHITE);
        let view = img.as_image().sub_image(8, 3, 10, 10);
        assert_eq!((view.width(), view.height()), (2, 2));
    }

    #[test]
    fn dark_detection() {
        let mut img = OwnedImage::filled(4, 4, Color::BLACK);
        assert!(img.as_image().is_dark(8));
        img.put_pixel(3, 3, Color::new(200, 200, 200));
        assert!(!img.as_image().is_dark(8));
        assert!(img.as_image().sub_image(0, 0, 3, 3).is_dark(8));
    }

    #[test]
    fn tolerance_is_per_channel() {
        let a = Color::new(100, 100, 100);
        assert!(a.within(Color::new(110, 90, 100), 10));
        assert!(!a.within(Color::new(111, 100, 100), 10));
    }

    #[test]
    fn mask_bits() {
        let mut mask = OwnedMask::opaque(3, 3);
        assert!(mask.get(8));
        mask.set(4, false);
        assert!(!mask.get(4));
        assert!(!mask.get(1000));
    }
}

//! OCR input preparation.
//!
//! Event text is light on a dark banner. The recognizer does best on dark,
//! slightly enlarged glyphs on a white page, so the capture is upscaled,
//! converted to luma, inverted and hard-thresholded.

use anyhow::Result;
use image::GrayImage;
use imageproc::contrast::{threshold, ThresholdType};
use serde::{Deserialize, Serialize};

use crate::OwnedImage;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessOptions {
	/// Uniform upscale before recognition; 1.0 disables resizing.
	pub resize_factor: f32,
	/// Contrast multiplier applied after inversion; 1.0 leaves the image unchanged.
	pub contrast: f32,
	/// Inverted pixels darker than this become black, the rest white.
	pub threshold: u8,
}

impl Default for PreprocessOptions {
	fn default() -> Self {
		Self {
			resize_factor: 1.2,
			contrast: 1.0,
			threshold: 50,
		}
	}
}

/// resize → grayscale → invert → contrast → threshold.
pub fn binarize_for_ocr(image: crate::Image, options: &PreprocessOptions) -> Result<GrayImage> {
	let scaled = image.to_owned_image().scaled(options.resize_factor)?;
	Ok(binarize_gray(scaled.to_gray_image(), options))
}

fn binarize_gray(mut gray: GrayImage, options: &PreprocessOptions) -> GrayImage {
	image::imageops::invert(&mut gray);

	if (options.contrast - 1.0).abs() > f32::EPSILON {
		gray = adjust_contrast(&gray, options.contrast);
	}

	// `Binary` keeps pixels strictly above the level.
	threshold(&gray, options.threshold.saturating_sub(1), ThresholdType::Binary)
}

/// Scale pixel distance from the mean luma by `factor`.
fn adjust_contrast(gray: &GrayImage, factor: f32) -> GrayImage {
	let count = (gray.width() as u64 * gray.height() as u64).max(1);
	let mean = gray.pixels().map(|p| p.0[0] as u64).sum::<u64>() as f32 / count as f32;

	let mut out = gray.clone();
	for p in out.pixels_mut() {
		let v = mean + (p.0[0] as f32 - mean) * factor;
		p.0[0] = v.round().clamp(0.0, 255.0) as u8;
	}
	out
}

/// Keep a copy of what the recognizer saw.
pub fn debug_snapshot(binarized: &GrayImage, path: impl AsRef<std::path::Path>) -> Result<()> {
	OwnedImage::from(binarized).save_png(path)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn light_text_becomes_black() {
		// Left pixel: bright text, right pixel: dark background.
		let img = OwnedImage::from_rgb(2, 1, &[240, 240, 240, 20, 20, 20]);
		let options = PreprocessOptions {
			resize_factor: 1.0,
			..Default::default()
		};
		let out = binarize_for_ocr(img.as_image(), &options).unwrap();
		assert_eq!(out.get_pixel(0, 0).0[0], 0);
		assert_eq!(out.get_pixel(1, 0).0[0], 255);
	}

	#[test]
	fn threshold_boundary_matches_cutoff() {
		// Inverted values 49 and 50.
		let img = OwnedImage::from_rgb(2, 1, &[206, 206, 206, 205, 205, 205]);
		let options = PreprocessOptions {
			resize_factor: 1.0,
			..Default::default()
		};
		let out = binarize_for_ocr(img.as_image(), &options).unwrap();
		assert_eq!(out.get_pixel(0, 0).0[0], 0);
		assert_eq!(out.get_pixel(1, 0).0[0], 255);
	}

	#[test]
	fn upscales_before_thresholding() {
		let img = OwnedImage::from_rgb(10, 10, &[0u8; 300]);
		let out = binarize_for_ocr(img.as_image(), &PreprocessOptions::default()).unwrap();
		assert_eq!(out.dimensions(), (12, 12));
	}
}

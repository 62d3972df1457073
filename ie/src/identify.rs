//! Character identification by template matching.
//!
//! The portrait crop is equalized like the stored templates and compared
//! against each of them with zero-mean normalized cross-correlation (the `TM_CCOEFF_NORMED` score).
//! The best position of the best template wins.

use anyhow::{Context, Result};
use image::GrayImage;
use imageproc::contrast::equalize_histogram;

use crate::portrait::Templates;

/// Outcome of one identification pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Identification {
	/// Best template name, only set when its score cleared the threshold.
	pub name: Option<String>,
	/// Best score observed over all templates, in `[-1, 1]`.
	pub score: f32,
}

impl Identification {
	pub fn miss(score: f32) -> Self {
		Self { name: None, score }
	}

	pub fn is_hit(&self) -> bool {
		self.name.is_some()
	}
}

pub fn identify(roi: crate::Image, templates: &Templates, min_score: f32) -> Identification {
	if templates.is_empty() || roi.width() == 0 || roi.height() == 0 {
		return Identification::miss(0.0);
	}

	let roi = equalize_histogram(&roi.to_gray_image());

	let mut best_name: Option<&str> = None;
	let mut best_score = -1.0f32;

	for (name, template) in templates {
		let score = match score_template(&roi, &template.image) {
			Ok(score) => score,
			Err(err) => {
				tracing::debug!(template = %name, error = %format!("{err:#}"), "template skipped");
				continue;
			}
		};
		// Name order breaks exact ties so the result does not depend on map order.
		if score > best_score || (score == best_score && best_name.is_some_and(|b| name.as_str() < b)) {
			best_score = score;
			best_name = Some(name.as_str());
		}
	}

	match best_name {
		Some(name) if best_score >= min_score => Identification {
			name: Some(name.to_string()),
			score: best_score,
		},
		Some(_) => Identification::miss(best_score),
		None => Identification::miss(0.0),
	}
}

/// Best correlation of `template` anywhere inside `roi`, upscaling `roi` first
/// if it is too small for the template to fit.
fn score_template(roi: &GrayImage, template: &GrayImage) -> Result<f32> {
	let (tw, th) = template.dimensions();
	if tw == 0 || th == 0 {
		anyhow::bail!("empty template");
	}

	let (rw, rh) = roi.dimensions();
	if rw >= tw && rh >= th {
		return Ok(max_correlation(roi, template));
	}

	let scale = (th as f64 / rh.max(1) as f64).max(tw as f64 / rw.max(1) as f64);
	let width = ((rw as f64 * scale).round() as u32).max(tw);
	let height = ((rh as f64 * scale).round() as u32).max(th);
	let upscaled = resize_gray(roi, width, height)?;
	Ok(max_correlation(&upscaled, template))
}

fn resize_gray(image: &GrayImage, width: u32, height: u32) -> Result<GrayImage> {
	use fast_image_resize::{images, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};

	let src = images::ImageRef::new(image.width(), image.height(), image.as_raw(), PixelType::U8)
		.context("fast_image_resize: ImageRef::new failed")?;
	let mut dst = images::Image::new(width, height, PixelType::U8);

	let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));
	Resizer::new()
		.resize(&src, &mut dst, &options)
		.context("fast_image_resize: resize failed")?;

	GrayImage::from_raw(width, height, dst.into_vec()).context("GrayImage::from_raw failed")
}

/// Maximum of the normalized correlation coefficient over every placement of
/// `template` inside `image`. Windows with no variance score 0.
///
/// `image` must be at least as large as `template` in both dimensions.
fn max_correlation(image: &GrayImage, template: &GrayImage) -> f32 {
	let (iw, ih) = image.dimensions();
	let (tw, th) = template.dimensions();
	let n = (tw * th) as f64;

	let template_mean = template.pixels().map(|p| p.0[0] as f64).sum::<f64>() / n;
	let centered = template
		.pixels()
		.map(|p| p.0[0] as f64 - template_mean)
		.collect::<Vec<_>>();
	let template_norm = centered.iter().map(|v| v * v).sum::<f64>().sqrt();
	if template_norm <= f64::EPSILON {
		return 0.0;
	}

	let integral = Integral::new(image);
	let pixels = image.as_raw();

	let mut best = f64::MIN;
	for y in 0..=(ih - th) {
		for x in 0..=(iw - tw) {
			// The template is zero-mean, so the patch mean drops out of the numerator.
			let mut cross = 0.0f64;
			for ty in 0..th {
				let row = ((y + ty) * iw + x) as usize;
				let trow = (ty * tw) as usize;
				for tx in 0..tw as usize {
					cross += centered[trow + tx] * pixels[row + tx] as f64;
				}
			}

			let (sum, sum_sq) = integral.window(x, y, tw, th);
			let variance = sum_sq - sum * sum / n;
			let score = if variance <= 1e-9 {
				0.0
			} else {
				cross / (template_norm * variance.sqrt())
			};
			best = best.max(score);
		}
	}

	best.clamp(-1.0, 1.0) as f32
}

/// Summed-area tables of pixel values and squared pixel values.
struct Integral {
	stride: usize,
	sum: Vec<f64>,
	sum_sq: Vec<f64>,
}

impl Integral {
	fn new(image: &GrayImage) -> Self {
		let (w, h) = image.dimensions();
		let stride = w as usize + 1;
		let mut sum = vec![0.0; stride * (h as usize + 1)];
		let mut sum_sq = vec![0.0; stride * (h as usize + 1)];

		for y in 0..h as usize {
			let mut row = 0.0;
			let mut row_sq = 0.0;
			for x in 0..w as usize {
				let v = image.as_raw()[y * w as usize + x] as f64;
				row += v;
				row_sq += v * v;
				sum[(y + 1) * stride + x + 1] = sum[y * stride + x + 1] + row;
				sum_sq[(y + 1) * stride + x + 1] = sum_sq[y * stride + x + 1] + row_sq;
			}
		}

		Self { stride, sum, sum_sq }
	}

	fn window(&self, x: u32, y: u32, w: u32, h: u32) -> (f64, f64) {
		let (x0, y0) = (x as usize, y as usize);
		let (x1, y1) = (x0 + w as usize, y0 + h as usize);
		let at = |table: &[f64], x: usize, y: usize| table[y * self.stride + x];
		let area = |table: &[f64]| at(table, x1, y1) - at(table, x0, y1) - at(table, x1, y0) + at(table, x0, y0);
		(area(&self.sum), area(&self.sum_sq))
	}
}

//! OCR seam and recognizer adapters.
//!
//! The engine only needs "binarized image in, raw text out". Preprocessing
//! happens in [`crate::preprocess`] before calling into this module, and line
//! splitting in [`crate::text`] afterwards.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use image::GrayImage;
use tempfile::NamedTempFile;

/// Recognition mode requested from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OcrOptions {
	/// Tesseract page segmentation mode (6 = single uniform block of text).
	pub page_segmentation: u8,
	/// Tesseract engine mode (3 = default, based on what is available).
	pub engine_mode: u8,
	/// Keep runs of spaces between words; gap trimming depends on them.
	pub preserve_interword_spaces: bool,
}

impl Default for OcrOptions {
	fn default() -> Self {
		Self {
			page_segmentation: 6,
			engine_mode: 3,
			preserve_interword_spaces: true,
		}
	}
}

pub trait TextRecognizer: Send + Sync {
	fn recognize(&self, image: &GrayImage, options: &OcrOptions) -> Result<String>;
}

/// Runs the `tesseract` executable on a temporary PNG.
#[derive(Debug, Clone)]
pub struct TesseractCli {
	executable: PathBuf,
	tessdata_dir: Option<PathBuf>,
	language: String,
}

impl Default for TesseractCli {
	fn default() -> Self {
		Self {
			executable: PathBuf::from("tesseract"),
			tessdata_dir: None,
			language: "eng".to_string(),
		}
	}
}

impl TesseractCli {
	pub fn new(executable: impl Into<PathBuf>) -> Self {
		Self {
			executable: executable.into(),
			..Default::default()
		}
	}

	pub fn with_tessdata_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.tessdata_dir = Some(dir.into());
		self
	}

	fn args(&self, input: &Path, options: &OcrOptions) -> Vec<String> {
		let mut args = vec![
			input.to_string_lossy().into_owned(),
			"stdout".to_string(),
			"-l".to_string(),
			self.language.clone(),
			"--psm".to_string(),
			options.page_segmentation.to_string(),
			"--oem".to_string(),
			options.engine_mode.to_string(),
		];
		if let Some(dir) = &self.tessdata_dir {
			args.push("--tessdata-dir".to_string());
			args.push(dir.to_string_lossy().into_owned());
		}
		if options.preserve_interword_spaces {
			args.push("-c".to_string());
			args.push("preserve_interword_spaces=1".to_string());
		}
		args
	}
}

impl TextRecognizer for TesseractCli {
	fn recognize(&self, image: &GrayImage, options: &OcrOptions) -> Result<String> {
		let input = NamedTempFile::with_suffix(".png").context("create temp png")?;
		image
			.save_with_format(input.path(), image::ImageFormat::Png)
			.context("write temp png")?;

		let output = Command::new(&self.executable)
			.args(self.args(input.path(), options))
			.output()
			.with_context(|| format!("spawn {}", self.executable.display()))?;

		if !output.status.success() {
			let stderr = String::from_utf8_lossy(&output.stderr);
			bail!("tesseract failed: {}", stderr.trim());
		}

		Ok(String::from_utf8_lossy(&output.stdout).into_owned())
	}
}

#[cfg(feature = "paddle")]
pub use paddle::PaddleOcr;

#[cfg(feature = "paddle")]
mod paddle {
	use std::path::Path;

	use anyhow::{Context, Result};
	use image::GrayImage;

	/// PaddleOCR via `ocr-rs`. Each detected text box becomes one output line.
	pub struct PaddleOcr {
		engine: ocr_rs::OcrEngine,
	}

	impl PaddleOcr {
		pub fn try_new(
			detection: impl AsRef<Path>,
			recognition: impl AsRef<Path>,
			charsset: impl AsRef<Path>,
		) -> Result<Self> {
			let thread_count = std::thread::available_parallelism()
				.map(|n| n.get())
				.unwrap_or(1);

			let engine = ocr_rs::OcrEngine::new(
				detection,
				recognition,
				charsset,
				Some(ocr_rs::OcrEngineConfig {
					backend: ocr_rs::Backend::CPU,
					thread_count,
					precision_mode: ocr_rs::PrecisionMode::High,
					enable_parallel: thread_count > 1,
					min_result_confidence: 0.5,
					..Default::default()
				}),
			)
			.context("failed to initialize OCR engine")?;

			Ok(Self { engine })
		}
	}

	impl super::TextRecognizer for PaddleOcr {
		fn recognize(&self, image: &GrayImage, _options: &super::OcrOptions) -> Result<String> {
			let rgb = crate::OwnedImage::from(image);
			let bytes = rgb.as_image().get_bytes();
			let image = ocr_rs::preprocess::rgb_to_image(&bytes, rgb.width(), rgb.height());

			let results = self
				.engine
				.recognize(&image)
				.map_err(|err| anyhow::anyhow!("paddle recognize: {err}"))?;

			Ok(results
				.into_iter()
				.map(|v| v.text)
				.collect::<Vec<_>>()
				.join("\n"))
		}
	}
}

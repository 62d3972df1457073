mod image;
pub use image::*;
pub mod identify;
pub mod ocr;
pub mod portrait;
pub mod preprocess;
pub mod region;
pub mod text;

pub use identify::Identification;
pub use ocr::{OcrOptions, TextRecognizer};
pub use portrait::TemplateStore;
pub use preprocess::PreprocessOptions;
pub use region::Rect;

use std::sync::Arc;

/// Recognition front-end: portrait matching plus the OCR pipeline.
pub struct Ie {
	templates: Arc<TemplateStore>,
	ocr: Box<dyn TextRecognizer>,
	ocr_options: OcrOptions,
	preprocess: PreprocessOptions,
}

/// Text read from the header region, with the image the recognizer was given.
pub struct TextRead {
	pub lines: Vec<String>,
	pub binarized: ::image::GrayImage,
}

impl Ie {
	pub fn new(templates: Arc<TemplateStore>, ocr: Box<dyn TextRecognizer>, preprocess: PreprocessOptions) -> Self {
		Self {
			templates,
			ocr,
			ocr_options: OcrOptions::default(),
			preprocess,
		}
	}

	pub fn with_ocr_options(mut self, options: OcrOptions) -> Self {
		self.ocr_options = options;
		self
	}

	pub fn templates(&self) -> &Arc<TemplateStore> {
		&self.templates
	}

	/// Best portrait match for `roi`. An empty template cache is rescanned from
	/// disk before matching.
	pub fn identify_portrait(&self, roi: Image, min_score: f32) -> Identification {
		let templates = self.templates.snapshot_or_reload();
		identify::identify(roi, &templates, min_score)
	}

	/// Binarize, recognize and split the text half of the capture.
	pub fn read_text(&self, image: Image) -> anyhow::Result<TextRead> {
		let binarized = preprocess::binarize_for_ocr(image, &self.preprocess)?;
		let raw = self.ocr.recognize(&binarized, &self.ocr_options)?;
		Ok(TextRead {
			lines: text::split_lines(&raw),
			binarized,
		})
	}

	pub fn read_lines(&self, image: Image) -> anyhow::Result<Vec<String>> {
		Ok(self.read_text(image)?.lines)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Mutex;

	struct Scripted {
		output: String,
		seen: Mutex<Vec<(u32, u32)>>,
	}

	impl TextRecognizer for Scripted {
		fn recognize(&self, image: &::image::GrayImage, _options: &OcrOptions) -> anyhow::Result<String> {
			self.seen.lock().unwrap().push(image.dimensions());
			Ok(self.output.clone())
		}
	}

	#[test]
	fn read_lines_runs_the_whole_pipeline() {
		let dir = tempfile::tempdir().unwrap();
		let recognizer = Scripted {
			output: "Trainee Event\n\nSpring Has Come     +10\n".to_string(),
			seen: Mutex::new(Vec::new()),
		};
		let ie = Ie::new(
			Arc::new(TemplateStore::new(dir.path())),
			Box::new(recognizer),
			PreprocessOptions::default(),
		);

		let capture = OwnedImage::from_rgb(20, 10, &[30u8; 600]);
		let read = ie.read_text(capture.as_image()).unwrap();
		assert_eq!(read.lines, vec!["Trainee Event".to_string(), "Spring Has Come     +10".to_string()]);
		assert_eq!(read.binarized.dimensions(), (24, 12));
	}

	#[test]
	fn identify_without_templates_is_a_miss() {
		let dir = tempfile::tempdir().unwrap();
		let ie = Ie::new(
			Arc::new(TemplateStore::new(dir.path())),
			Box::new(Scripted {
				output: String::new(),
				seen: Mutex::new(Vec::new()),
			}),
			PreprocessOptions::default(),
		);
		let roi = OwnedImage::from_rgb(8, 8, &[0u8; 192]);
		let result = ie.identify_portrait(roi.as_image(), 0.7);
		assert_eq!(result, Identification::miss(0.0));
	}
}

//! Capture region geometry.
//!
//! The user configures one rectangle around the event header. Its left square
//! holds the character portrait, the remainder holds the two OCR lines.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in screen (or window) pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
	pub x: i32,
	pub y: i32,
	pub width: u32,
	pub height: u32,
}

impl Rect {
	pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
		Self { x, y, width, height }
	}

	pub fn is_empty(&self) -> bool {
		self.width == 0 || self.height == 0
	}

	pub fn offset(self, dx: i32, dy: i32) -> Self {
		Self {
			x: self.x + dx,
			y: self.y + dy,
			..self
		}
	}
}

/// Split the full selector into `(portrait, text)`.
///
/// The portrait side is a square of the full height, clamped to the width when
/// the region is narrower than it is tall. The text side takes what remains.
pub fn split_region(full: Rect) -> (Rect, Rect) {
	let side = full.height.min(full.width);
	let portrait = Rect::new(full.x, full.y, side, full.height);
	let text = Rect::new(
		full.x + side as i32,
		full.y,
		full.width.saturating_sub(side),
		full.height,
	);
	(portrait, text)
}

/// Same split applied to an already captured image of the full region.
pub fn split_image<'a>(image: crate::Image<'a>) -> (crate::Image<'a>, crate::Image<'a>) {
	let side = image.height().min(image.width());
	let portrait = image.sub_image(0, 0, side, image.height());
	let text = image.sub_image(side, 0, image.width() - side, image.height());
	(portrait, text)
}

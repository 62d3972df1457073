//! Image primitives and utilities.
//!
//! Captures are kept as a lightweight owned RGB image (`OwnedImage`). Most
//! consumers borrow a view (`Image<'a>`) so the capture region can be split
//! into the portrait and text halves without copying pixels.
//!
//! Grayscale conversion always goes through [`Color::luma`] (BT.601) so that
//! templates loaded from disk and portraits cropped from the screen are
//! directly comparable.

use std::path::Path;

use anyhow::{Context, Result};

/// Owned RGB image (no alpha).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnedImage {
	width: u32,
	height: u32,
	data: Vec<Color>,
}

impl OwnedImage {
	/// Build an `OwnedImage` from RGBA bytes (alpha is discarded).
	///
	/// The buffer is expected to be tightly packed: `width * height * 4` bytes.
	pub fn from_rgba(width: usize, bytes: &[u8]) -> Self {
		let height = if width == 0 { 0 } else { bytes.len() / width / 4 };
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

	/// Build an `OwnedImage` from tightly packed RGB bytes.
	pub fn from_rgb(width: u32, height: u32, bytes: &[u8]) -> Self {
		let data = bytes
			.chunks_exact(3)
			.take((width * height) as usize)
			.map(|v| Color::new(v[0], v[1], v[2]))
			.collect::<Vec<_>>();

		Self { width, height, data }
	}

	pub fn from_dynamic(image: &image::DynamicImage) -> Self {
		let rgba = image.to_rgba8();
		Self::from_rgba(rgba.width() as usize, rgba.as_raw())
	}

	/// Decode an image file (any format enabled in `image`).
	pub fn open(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let image = image::open(path).with_context(|| format!("decode {}", path.display()))?;
		Ok(Self::from_dynamic(&image))
	}

	#[inline]
	pub fn width(&self) -> u32 {
		self.width
	}

	#[inline]
	pub fn height(&self) -> u32 {
		self.height
	}

	/// Resize to exactly `width` x `height`.
	///
	/// Uses `fast_image_resize` (SIMD-optimized, CatmullRom) and keeps output in `Vec<Color>`.
	pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
		let width = width.max(1);
		let height = height.max(1);
		if self.width == width && self.height == height {
			return Ok(());
		}
		if self.width == 0 || self.height == 0 {
			anyhow::bail!("cannot resize an empty image");
		}

		let bytes = self.as_image().get_bytes();
		let src = fast_image_resize::images::ImageRef::new(
			self.width,
			self.height,
			&bytes,
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

		*self = Self::from_rgb(width, height, &dst.into_vec());
		Ok(())
	}

	/// Uniformly scale by `factor` (1.0 is a no-op).
	pub fn scaled(mut self, factor: f32) -> Result<Self> {
		if factor <= 0.0 || (factor - 1.0).abs() < f32::EPSILON {
			return Ok(self);
		}
		let width = ((self.width as f32) * factor).round() as u32;
		let height = ((self.height as f32) * factor).round() as u32;
		self.resize(width, height)?;
		Ok(self)
	}

	/// Create a borrowed view of this entire image.
	pub fn as_image<'a>(&'a self) -> Image<'a> {
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
		self.as_image().to_gray_image()
	}

	pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
		self.as_image().save_png(path)
	}
}

impl From<&image::RgbImage> for OwnedImage {
	fn from(image: &image::RgbImage) -> Self {
		Self::from_rgb(image.width(), image.height(), image.as_raw())
	}
}

impl From<&image::GrayImage> for OwnedImage {
	fn from(gray: &image::GrayImage) -> Self {
		let data = gray.pixels().map(|p| Color::new(p.0[0], p.0[0], p.0[0])).collect();
		Self {
			width: gray.width(),
			height: gray.height(),
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

	#[inline(always)]
	fn pixel(&self, x: u32, y: u32) -> &Color {
		&self.data[(x + y * self.true_width) as usize]
	}

	pub fn to_owned_image(self) -> OwnedImage {
		let mut data = Vec::with_capacity((self.width() * self.height()) as usize);
		for y in self.y1..self.y2 {
			for x in self.x1..self.x2 {
				data.push(*self.pixel(x, y));
			}
		}

		OwnedImage {
			width: self.width(),
			height: self.height(),
			data,
		}
	}

	pub fn get_bytes(&self) -> Vec<u8> {
		let mut bytes = vec![0; (self.width() * self.height() * 3) as usize];
		let mut i = 0;
		for y in self.y1..self.y2 {
			for x in self.x1..self.x2 {
				let clr = self.pixel(x, y);
				bytes[i] = clr.r;
				bytes[i + 1] = clr.g;
				bytes[i + 2] = clr.b;
				i += 3;
			}
		}
		bytes
	}

	pub fn to_gray_image(&self) -> image::GrayImage {
		let (x1, y1) = (self.x1, self.y1);
		image::GrayImage::from_fn(self.width(), self.height(), |x, y| {
			image::Luma([self.pixel(x1 + x, y1 + y).luma()])
		})
	}

	pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
		let bytes = self.get_bytes();
		let img = image::RgbImage::from_raw(self.width(), self.height(), bytes)
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
}

// ----------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
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
	fn from_rgba_discards_alpha() {
		let bytes = [10, 20, 30, 255, 40, 50, 60, 0];
		let img = OwnedImage::from_rgba(2, &bytes);
		assert_eq!((img.width(), img.height()), (2, 1));
		assert_eq!(img.as_image().get_bytes(), vec![10, 20, 30, 40, 50, 60]);
	}

	#[test]
	fn sub_image_is_clamped() {
		let img = OwnedImage::from_rgb(4, 4, &[0u8; 48]);
		let view = img.as_image().sub_image(3, 3, 10, 10);
		assert_eq!((view.width(), view.height()), (1, 1));
	}

	#[test]
	fn gray_pixels_keep_their_value() {
		let gray = image::GrayImage::from_fn(3, 2, |x, y| image::Luma([(x * 40 + y * 7) as u8]));
		let owned = OwnedImage::from(&gray);
		assert_eq!(owned.to_gray_image(), gray);
	}

	#[test]
	fn scaled_changes_dimensions() {
		let img = OwnedImage::from_rgb(10, 5, &[128u8; 150]);
		let img = img.scaled(2.0).unwrap();
		assert_eq!((img.width(), img.height()), (20, 10));
	}
}

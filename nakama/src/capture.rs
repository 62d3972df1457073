use anyhow::Result;

/// Source of screen pixels.
pub trait ScreenCapture: Send {
	/// Capture `rect`, given relative to the game window when one is found.
	fn capture(&mut self, rect: ie::Rect) -> Result<ie::OwnedImage>;
}

/// Cut `rect` out of a full capture whose top-left sits at `(origin_x, origin_y)`.
pub fn crop(full: &ie::OwnedImage, origin_x: i32, origin_y: i32, rect: ie::Rect) -> Result<ie::OwnedImage> {
	let local = rect.offset(-origin_x, -origin_y);
	let (x, y) = (local.x, local.y);
	// Parts left of or above the capture are cut off.
	let width = rect.width.saturating_sub(x.min(0).unsigned_abs());
	let height = rect.height.saturating_sub(y.min(0).unsigned_abs());
	let view = full
		.as_image()
		.sub_image(x.max(0) as u32, y.max(0) as u32, width, height);
	if view.width() == 0 || view.height() == 0 {
		anyhow::bail!("region {rect:?} is outside the {}x{} capture", full.width(), full.height());
	}
	Ok(view.to_owned_image())
}

#[cfg(feature = "capture")]
pub use xcap_capture::XcapCapture;

#[cfg(feature = "capture")]
mod xcap_capture {
	use anyhow::{Context, Result};
	use xcap::image::EncodableLayout;

	/// Captures the game window, or the primary monitor when the window is
	/// not found (the region is then taken as absolute screen coordinates).
	pub struct XcapCapture {
		window_title: String,
	}

	impl Default for XcapCapture {
		fn default() -> Self {
			Self::new("Umamusume")
		}
	}

	impl XcapCapture {
		pub fn new(window_title: impl Into<String>) -> Self {
			Self {
				window_title: window_title.into(),
			}
		}

		fn find_window(&self) -> Option<xcap::Window> {
			let windows = xcap::Window::all().ok()?;
			windows.into_iter().find(|window| {
				window.title().is_ok_and(|t| t.contains(&self.window_title))
					&& !window.is_minimized().unwrap_or(false)
			})
		}
	}

	impl super::ScreenCapture for XcapCapture {
		fn capture(&mut self, rect: ie::Rect) -> Result<ie::OwnedImage> {
			if let Some(window) = self.find_window() {
				let img = window.capture_image().context("capture game window")?;
				let full = ie::OwnedImage::from_rgba(img.width() as usize, img.as_bytes());
				return super::crop(&full, 0, 0, rect);
			}

			let monitor = xcap::Monitor::all()
				.context("list monitors")?
				.into_iter()
				.find(|m| m.is_primary().unwrap_or(false))
				.context("no primary monitor")?;
			let img = monitor.capture_image().context("capture monitor")?;
			let full = ie::OwnedImage::from_rgba(img.width() as usize, img.as_bytes());
			super::crop(&full, monitor.x().unwrap_or(0), monitor.y().unwrap_or(0), rect)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn numbered(width: u32, height: u32) -> ie::OwnedImage {
		let bytes = (0..width * height)
			.flat_map(|i| {
				let v = i as u8;
				[v, v, v]
			})
			.collect::<Vec<_>>();
		ie::OwnedImage::from_rgb(width, height, &bytes)
	}

	#[test]
	fn crop_inside() {
		let full = numbered(10, 10);
		let out = crop(&full, 0, 0, ie::Rect::new(2, 3, 4, 2)).unwrap();
		assert_eq!((out.width(), out.height()), (4, 2));
		assert_eq!(out.as_image().get_bytes()[0], 32);
	}

	#[test]
	fn crop_respects_origin_and_edges() {
		let full = numbered(10, 10);
		let out = crop(&full, 100, 100, ie::Rect::new(98, 108, 5, 5)).unwrap();
		assert_eq!((out.width(), out.height()), (3, 2));
	}

	#[test]
	fn crop_outside_is_an_error() {
		let full = numbered(10, 10);
		assert!(crop(&full, 0, 0, ie::Rect::new(20, 0, 5, 5)).is_err());
	}
}

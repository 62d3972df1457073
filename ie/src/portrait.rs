//! Portrait templates.
//!
//! One image per character lives in the portrait directory; the file stem is
//! the character name and doubles as the key into the per-character event
//! index. The in-memory cache is copy-on-write: readers take an `Arc`
//! snapshot, writers build a new map and swap it in.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::{Context, Result};
use image::GrayImage;
use imageproc::contrast::equalize_histogram;

use crate::OwnedImage;

const EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];
const FORBIDDEN: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

#[derive(Debug, Clone)]
pub struct PortraitTemplate {
	pub name: String,
	/// Equalized grayscale, normalized the same way as the crops it is matched against.
	pub image: GrayImage,
}

impl PortraitTemplate {
	pub fn new(name: impl Into<String>, image: &OwnedImage) -> Self {
		Self {
			name: name.into(),
			image: equalize_histogram(&image.to_gray_image()),
		}
	}

	pub fn width(&self) -> u32 {
		self.image.width()
	}

	pub fn height(&self) -> u32 {
		self.image.height()
	}
}

pub type Templates = HashMap<String, PortraitTemplate>;

pub struct TemplateStore {
	dir: PathBuf,
	templates: RwLock<Arc<Templates>>,
}

impl TemplateStore {
	/// Create an empty store backed by `dir`. Nothing is read until [`Self::reload`]
	/// or the first [`Self::snapshot_or_reload`].
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self {
			dir: dir.into(),
			templates: RwLock::new(Arc::new(Templates::new())),
		}
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	/// Rescan the backing directory.
	pub fn reload(&self) -> Result<usize> {
		self.load(&self.dir)
	}

	/// Replace the whole cache with the images found in `dir`.
	///
	/// Files that fail to decode are skipped.
	pub fn load(&self, dir: &Path) -> Result<usize> {
		std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;

		let mut loaded = Templates::new();
		for entry in std::fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))? {
			let Ok(entry) = entry else { continue };
			let path = entry.path();
			let Some(name) = template_name(&path) else { continue };

			match OwnedImage::open(&path) {
				Ok(image) => {
					loaded.insert(name.clone(), PortraitTemplate::new(name, &image));
				}
				Err(err) => {
					tracing::warn!(path = %path.display(), error = %format!("{err:#}"), "skipping unreadable portrait");
				}
			}
		}

		let count = loaded.len();
		*self.templates.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(loaded);
		tracing::info!(count, dir = %dir.display(), "loaded portrait templates");
		Ok(count)
	}

	/// Point-in-time view of every template.
	pub fn snapshot(&self) -> Arc<Templates> {
		self.templates
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.clone()
	}

	/// Like [`Self::snapshot`], but an empty cache triggers one rescan of the
	/// directory first.
	pub fn snapshot_or_reload(&self) -> Arc<Templates> {
		let snapshot = self.snapshot();
		if !snapshot.is_empty() {
			return snapshot;
		}
		if let Err(err) = self.reload() {
			tracing::warn!(error = %format!("{err:#}"), "portrait reload failed");
		}
		self.snapshot()
	}

	/// Add or replace a single template in memory.
	pub fn insert(&self, name: impl Into<String>, image: &OwnedImage) {
		let template = PortraitTemplate::new(name, image);
		let mut guard = self.templates.write().unwrap_or_else(PoisonError::into_inner);
		Arc::make_mut(&mut guard).insert(template.name.clone(), template);
	}

	/// Persist a labeled portrait as `<dir>/<sanitized name>.png` and make it
	/// available for matching immediately.
	///
	/// Returns the sanitized name, or `None` if nothing usable was left of `name`.
	/// The in-memory insert happens even if writing the file fails.
	pub fn save(&self, name: &str, image: &OwnedImage) -> Result<Option<String>> {
		let Some(safe) = sanitize_name(name) else {
			return Ok(None);
		};

		self.insert(safe.clone(), image);

		std::fs::create_dir_all(&self.dir).with_context(|| format!("create {}", self.dir.display()))?;
		let path = self.dir.join(format!("{safe}.png"));
		image.save_png(&path).with_context(|| format!("save {}", path.display()))?;
		tracing::info!(path = %path.display(), "saved portrait");
		Ok(Some(safe))
	}

	/// Sorted template names.
	pub fn names(&self) -> Vec<String> {
		let mut names = self.snapshot().keys().cloned().collect::<Vec<_>>();
		names.sort();
		names
	}

	pub fn len(&self) -> usize {
		self.snapshot().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// Strip characters that are invalid in file names on Windows.
pub fn sanitize_name(name: &str) -> Option<String> {
	let safe = name
		.trim()
		.chars()
		.filter(|c| !FORBIDDEN.contains(c))
		.collect::<String>()
		.trim()
		.to_string();
	(!safe.is_empty()).then_some(safe)
}

fn template_name(path: &Path) -> Option<String> {
	let ext = path.extension()?.to_str()?.to_ascii_lowercase();
	if !EXTENSIONS.contains(&ext.as_str()) {
		return None;
	}
	Some(path.file_stem()?.to_str()?.to_string())
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::tempdir;

	fn pattern(seed: u32) -> OwnedImage {
		let rgb = image::RgbImage::from_fn(16, 16, |x, y| {
			let v = ((x * 13 + y * 7 + seed * 31) % 256) as u8;
			image::Rgb([v, v, v])
		});
		OwnedImage::from(&rgb)
	}

	#[test]
	fn sanitize_strips_forbidden_characters() {
		assert_eq!(sanitize_name("  Special Week "), Some("Special Week".to_string()));
		assert_eq!(sanitize_name("Air/Groove?"), Some("AirGroove".to_string()));
		assert_eq!(sanitize_name(" :*? "), None);
	}

	#[test]
	fn load_skips_unreadable_and_foreign_files() {
		let dir = tempdir().unwrap();
		pattern(1).save_png(dir.path().join("Alpha.png")).unwrap();
		pattern(2).save_png(dir.path().join("Beta.PNG")).unwrap();
		std::fs::write(dir.path().join("Broken.png"), b"not an image").unwrap();
		std::fs::write(dir.path().join("notes.txt"), b"hello").unwrap();

		let store = TemplateStore::new(dir.path());
		assert_eq!(store.reload().unwrap(), 2);
		assert_eq!(store.names(), vec!["Alpha".to_string(), "Beta".to_string()]);
	}

	#[test]
	fn snapshot_is_isolated_from_later_inserts() {
		let dir = tempdir().unwrap();
		let store = TemplateStore::new(dir.path());
		store.insert("Alpha", &pattern(1));

		let before = store.snapshot();
		store.insert("Beta", &pattern(2));

		assert_eq!(before.len(), 1);
		assert_eq!(store.snapshot().len(), 2);
	}

	#[test]
	fn reload_replaces_the_whole_map() {
		let dir = tempdir().unwrap();
		let store = TemplateStore::new(dir.path());
		store.insert("OnlyInMemory", &pattern(1));
		pattern(2).save_png(dir.path().join("OnDisk.png")).unwrap();

		store.reload().unwrap();
		assert_eq!(store.names(), vec!["OnDisk".to_string()]);
	}

	#[test]
	fn empty_store_reloads_on_first_use() {
		let dir = tempdir().unwrap();
		pattern(3).save_png(dir.path().join("Gamma.png")).unwrap();

		let store = TemplateStore::new(dir.path());
		assert!(store.snapshot().is_empty());
		assert!(store.snapshot_or_reload().contains_key("Gamma"));
	}

	#[test]
	fn save_writes_file_and_inserts() {
		let dir = tempdir().unwrap();
		let store = TemplateStore::new(dir.path().join("portraits"));

		let saved = store.save("Delta?", &pattern(4)).unwrap();
		assert_eq!(saved.as_deref(), Some("Delta"));
		assert!(dir.path().join("portraits").join("Delta.png").is_file());
		assert!(store.snapshot().contains_key("Delta"));

		assert_eq!(store.save("???", &pattern(4)).unwrap(), None);
	}

	#[test]
	fn disk_and_memory_templates_agree() {
		let dir = tempdir().unwrap();
		let store = TemplateStore::new(dir.path());
		let image = pattern(5);
		store.save("Echo", &image).unwrap();
		let in_memory = store.snapshot()["Echo"].image.clone();

		store.reload().unwrap();
		assert_eq!(store.snapshot()["Echo"].image, in_memory);
	}

	#[test]
	fn concurrent_readers_see_whole_maps() {
		let dir = tempdir().unwrap();
		let store = Arc::new(TemplateStore::new(dir.path()));

		let reader = {
			let store = store.clone();
			std::thread::spawn(move || {
				for _ in 0..200 {
					let snapshot = store.snapshot();
					for (name, template) in snapshot.iter() {
						assert_eq!(name, &template.name);
					}
				}
			})
		};

		for i in 0..50 {
			store.insert(format!("T{i}"), &pattern(i));
		}
		reader.join().unwrap();
		assert_eq!(store.len(), 50);
	}
}

use std::path::{Path, PathBuf};

/// Places a relative data directory may live in, most specific first:
/// `NAKAMA_ASSETS_DIR`, next to the executable, the working directory.
fn search_bases() -> Vec<PathBuf> {
	let mut candidates: Vec<PathBuf> = Vec::new();
	if let Some(dir) = std::env::var_os("NAKAMA_ASSETS_DIR") {
		candidates.push(PathBuf::from(dir));
	}
	if let Ok(exe) = std::env::current_exe()
		&& let Some(dir) = exe.parent()
	{
		candidates.push(dir.to_path_buf());
	}
	if let Ok(cwd) = std::env::current_dir() {
		candidates.push(cwd);
	}
	// Compile-time path to the workspace. Useful during local dev if the app is launched with a different CWD.
	#[cfg(debug_assertions)]
	candidates.push(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(".."));
	candidates
}

/// Resolve a configured directory.
///
/// Absolute paths are used as they are. A relative path is looked up under
/// each search base and the first existing directory wins; if none exists
/// the path is left relative to the working directory (and created on
/// first write).
pub fn resolve_dir(dir: &Path) -> PathBuf {
	resolve_dir_in(dir, &search_bases())
}

fn resolve_dir_in(dir: &Path, bases: &[PathBuf]) -> PathBuf {
	if dir.is_absolute() {
		return dir.to_path_buf();
	}
	for base in bases {
		let candidate = base.join(dir);
		if candidate.is_dir() {
			tracing::debug!(path = %candidate.display(), "resolved data directory");
			return candidate;
		}
	}
	dir.to_path_buf()
}

#[cfg(feature = "paddle")]
#[derive(Debug, Clone)]
pub struct OcrAssets {
	pub detection: PathBuf,
	pub recognition: PathBuf,
	pub charset: PathBuf,
}

/// Find the PaddleOCR model files in an `ocr/` folder under one of the search bases.
#[cfg(feature = "paddle")]
pub fn resolve_ocr_assets() -> anyhow::Result<OcrAssets> {
	let mut tried = Vec::new();
	for base in search_bases() {
		let ocr_dir = if base.join("detection.mnn").is_file() { base } else { base.join("ocr") };
		let detection = ocr_dir.join("detection.mnn");
		let recognition = ocr_dir.join("latin_recognition.mnn");
		let charset = ocr_dir.join("latin_charset.txt");

		if detection.is_file() && recognition.is_file() && charset.is_file() {
			return Ok(OcrAssets { detection, recognition, charset });
		}
		tried.push(ocr_dir);
	}

	anyhow::bail!(
		"OCR model files not found. Searched in:\n{}\n\nSet NAKAMA_ASSETS_DIR to the folder that contains 'ocr/'.",
		tried
			.into_iter()
			.map(|p| format!("  - {}", p.display()))
			.collect::<Vec<_>>()
			.join("\n")
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::tempdir;

	#[test]
	fn first_existing_base_wins() {
		let a = tempdir().unwrap();
		let b = tempdir().unwrap();
		std::fs::create_dir_all(b.path().join("events")).unwrap();

		let bases = [a.path().to_path_buf(), b.path().to_path_buf()];
		assert_eq!(resolve_dir_in(Path::new("events"), &bases), b.path().join("events"));
	}

	#[test]
	fn unresolved_stays_relative() {
		let a = tempdir().unwrap();
		let bases = [a.path().to_path_buf()];
		assert_eq!(resolve_dir_in(Path::new("assets/portraits"), &bases), PathBuf::from("assets/portraits"));
	}

	#[test]
	fn absolute_is_untouched() {
		let a = tempdir().unwrap();
		assert_eq!(resolve_dir_in(a.path(), &[]), a.path().to_path_buf());
	}
}

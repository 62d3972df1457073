use std::{
	collections::HashMap,
	fs::File,
	io::BufReader,
	path::{Path, PathBuf},
	sync::{Arc, Mutex, OnceLock, PoisonError},
};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use crate::{Category, EventMap};

/// Per-character trainee events. Keys are the same names the portrait
/// templates are saved under.
pub type CharacterIndex = HashMap<String, Arc<EventMap>>;

const BY_CHARACTER_FILES: [&str; 2] = ["trainee_events_by_character.json", "trainee_by_character.json"];
const TRAINEE_NAMES_FILE: &str = "trainee_names.json";

/// Read-only event data from the events directory, cached for the lifetime
/// of the catalog.
pub struct EventCatalog {
	base: PathBuf,
	categories: Mutex<HashMap<Category, Arc<EventMap>>>,
	by_character: OnceLock<Arc<CharacterIndex>>,
}

impl EventCatalog {
	pub fn new(base: impl Into<PathBuf>) -> Self {
		Self {
			base: base.into(),
			categories: Mutex::new(HashMap::new()),
			by_character: OnceLock::new(),
		}
	}

	pub fn base_dir(&self) -> &Path {
		&self.base
	}

	/// Every event of `category`. A missing or malformed file yields an empty map.
	pub fn load_category(&self, category: Category) -> Arc<EventMap> {
		let mut cache = self.categories.lock().unwrap_or_else(PoisonError::into_inner);
		cache
			.entry(category)
			.or_insert_with(|| {
				let path = self.base.join(category.events_file());
				match read_json::<EventMap>(&path) {
					Ok(events) => {
						tracing::info!(category = %category, count = events.len(), "loaded events");
						Arc::new(events)
					}
					Err(err) => {
						tracing::warn!(path = %path.display(), error = %format!("{err:#}"), "failed to load events");
						Arc::new(EventMap::new())
					}
				}
			})
			.clone()
	}

	/// Trainee events keyed by character. The first file that parses wins.
	pub fn load_by_character(&self) -> Arc<CharacterIndex> {
		self.by_character
			.get_or_init(|| {
				for file in BY_CHARACTER_FILES {
					let path = self.base.join(file);
					if !path.is_file() {
						continue;
					}
					match read_json::<HashMap<String, EventMap>>(&path) {
						Ok(index) => {
							tracing::info!(file, trainees = index.len(), "loaded per-character events");
							return Arc::new(
								index
									.into_iter()
									.map(|(character, events)| (character, Arc::new(events)))
									.collect(),
							);
						}
						Err(err) => {
							tracing::warn!(path = %path.display(), error = %format!("{err:#}"), "failed to load per-character events");
						}
					}
				}
				tracing::info!("no per-character event file; trainee events use the global list");
				Arc::new(CharacterIndex::new())
			})
			.clone()
	}

	/// Candidate events for one lookup. A trainee lookup with a known character
	/// is narrowed to that character's events.
	pub fn events_for(&self, category: Category, character: Option<&str>) -> Arc<EventMap> {
		let character = character.filter(|c| !c.trim().is_empty());
		if let (Category::Trainee, Some(character)) = (category, character) {
			let index = self.load_by_character();
			if let Some(events) = index.get(character).or_else(|| index.get(character.trim())) {
				tracing::debug!(character, count = events.len(), "matching within character events");
				return events.clone();
			}
		}
		self.load_category(category)
	}

	/// Names offered when asking a human to label a portrait.
	///
	/// Reads `trainee_names.json` (a list, or an object with a `names` list),
	/// falling back to the sorted keys of the per-character index.
	pub fn load_trainee_names(&self) -> Vec<String> {
		let path = self.base.join(TRAINEE_NAMES_FILE);
		if path.is_file() {
			match read_json::<TraineeNames>(&path) {
				Ok(names) => return names.into_vec(),
				Err(err) => {
					tracing::warn!(path = %path.display(), error = %format!("{err:#}"), "failed to load trainee names");
				}
			}
		}

		let mut names = self.load_by_character().keys().cloned().collect::<Vec<_>>();
		names.sort();
		names
	}

	/// Map a typed label onto a per-character key so templates and event
	/// scoping share the same name.
	///
	/// A small typo snaps to the one key within reach; with no key or several
	/// keys that close, the name is kept as typed.
	pub fn canonical_character(&self, name: &str) -> String {
		let name = name.trim();
		let index = self.load_by_character();
		if index.contains_key(name) {
			return name.to_string();
		}

		let reach = (name.chars().count() / 4).max(1);
		let mut close = index
			.keys()
			.filter(|key| levenshtein::levenshtein(name, key) <= reach);
		match (close.next(), close.next()) {
			(Some(key), None) => {
				tracing::info!(typed = name, character = key.as_str(), "label snapped to known character");
				key.clone()
			}
			(Some(_), Some(_)) => {
				tracing::info!(typed = name, "label close to several characters; kept as typed");
				name.to_string()
			}
			_ => name.to_string(),
		}
	}
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum TraineeNames {
	List(Vec<String>),
	Wrapped { names: Vec<String> },
}

impl TraineeNames {
	fn into_vec(self) -> Vec<String> {
		match self {
			Self::List(names) | Self::Wrapped { names } => names,
		}
	}
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
	let file = File::open(path).with_context(|| format!("Open {}", path.display()))?;
	let reader = BufReader::new(file);
	serde_json::from_reader(reader).with_context(|| format!("Parse {}", path.display()))
}

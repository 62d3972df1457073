//! Skill and condition reference data.
//!
//! `parsed_skills.json` maps a skill name to its scraped details;
//! `conditions.json` maps a condition keyword to a free-form description.

use std::path::Path;

use indexmap::IndexMap;

use crate::catalog::read_json;

const SKILLS_FILE: &str = "parsed_skills.json";
const CONDITIONS_FILE: &str = "conditions.json";

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct SkillInfo {
	pub img_src: String,
	pub description_game: String,
	pub description_detailed: String,
	pub rarity: String,
	pub activation: String,
	pub base_cost: serde_json::Value,
	// The scraped data spells it this way.
	#[serde(rename = "conditons", alias = "conditions")]
	pub conditions: String,
	pub base_duration: serde_json::Value,
	pub effect: String,
}

#[derive(Debug, Clone, Default)]
pub struct SkillIndex {
	skills: IndexMap<String, SkillInfo>,
	conditions: IndexMap<String, serde_json::Value>,
	// Lowercased skill names, same order as `skills`.
	needles: Vec<String>,
}

impl SkillIndex {
	pub fn new(skills: IndexMap<String, SkillInfo>, conditions: IndexMap<String, serde_json::Value>) -> Self {
		let needles = skills.keys().map(|k| k.to_lowercase()).collect();
		Self {
			skills,
			conditions,
			needles,
		}
	}

	/// Load both files from `dir`. Either one missing leaves that half empty.
	pub fn load(dir: &Path) -> Self {
		let skills = read_json(&dir.join(SKILLS_FILE)).unwrap_or_else(|err: anyhow::Error| {
			tracing::warn!(error = %format!("{err:#}"), "skills unavailable");
			IndexMap::new()
		});
		let conditions = read_json(&dir.join(CONDITIONS_FILE)).unwrap_or_else(|err: anyhow::Error| {
			tracing::warn!(error = %format!("{err:#}"), "conditions unavailable");
			IndexMap::new()
		});
		let index = Self::new(skills, conditions);
		tracing::info!(skills = index.skills.len(), conditions = index.conditions.len(), "loaded skill index");
		index
	}

	pub fn get(&self, name: &str) -> Option<&SkillInfo> {
		self.skills.get(name)
	}

	pub fn condition(&self, keyword: &str) -> Option<&serde_json::Value> {
		self.conditions.get(keyword)
	}

	pub fn is_empty(&self) -> bool {
		self.skills.is_empty()
	}

	/// Skills whose name appears in any of `texts`, ignoring case.
	///
	/// Each skill is reported once, in index order.
	pub fn skill_refs<'a>(&self, texts: impl IntoIterator<Item = &'a str>) -> Vec<String> {
		let haystack = texts.into_iter().map(str::to_lowercase).collect::<Vec<_>>();
		self.skills
			.keys()
			.zip(&self.needles)
			.filter(|(_, needle)| !needle.is_empty() && haystack.iter().any(|text| text.contains(needle.as_str())))
			.map(|(name, _)| name.clone())
			.collect()
	}

	/// Condition keywords mentioned in the activation conditions of `skills`.
	pub fn condition_refs(&self, skills: &[String]) -> Vec<String> {
		let mut found = Vec::new();
		for skill in skills.iter().filter_map(|name| self.skills.get(name)) {
			let text = skill.conditions.to_lowercase();
			for keyword in self.conditions.keys() {
				if text.contains(&keyword.to_lowercase()) && !found.contains(keyword) {
					found.push(keyword.clone());
				}
			}
		}
		found
	}
}

//! Per-tick scan: OCR lines and a portrait crop in, an overlay-ready result out.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use data::{Category, EventCatalog, EventOptions, FuzzyEventMatcher, SkillIndex};

use crate::gate::{self, GateDecision, GateSettings, IdentificationGate};
use crate::prompt::HumanLabelPrompt;

#[derive(Debug, Clone)]
pub struct ScanSettings {
	pub text_match_confidence: f64,
	pub portrait_match_threshold: f32,
	pub prompt_timeout: Duration,
	pub gate: GateSettings,
	pub matcher: FuzzyEventMatcher,
}

impl Default for ScanSettings {
	fn default() -> Self {
		Self::from(&crate::config::Config::default())
	}
}

impl From<&crate::config::Config> for ScanSettings {
	fn from(config: &crate::config::Config) -> Self {
		Self {
			text_match_confidence: config.text_match_confidence,
			portrait_match_threshold: config.portrait_match_threshold,
			prompt_timeout: config.prompt_timeout(),
			gate: config.gate_settings(),
			matcher: config.matcher(),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult {
	pub category: Category,
	/// Event line after gap trimming.
	pub event_line: String,
	pub event_name: Option<String>,
	pub event_options: Option<EventOptions>,
	pub confirmed_character: Option<String>,
	pub matched_skill_refs: Vec<String>,
	pub matched_condition_refs: Vec<String>,
}

impl ScanResult {
	pub fn is_resolved(&self) -> bool {
		self.event_name.is_some()
	}

	/// Title, then `"option: first effect line"` per option followed by the
	/// rest of that effect's lines. Empty when unresolved.
	pub fn overlay_lines(&self) -> Vec<String> {
		match (&self.event_name, &self.event_options) {
			(Some(name), Some(options)) => overlay_lines(name, options),
			_ => Vec::new(),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
	/// Nothing recognizable on screen.
	Hide,
	Show(ScanResult),
}

fn overlay_lines(name: &str, options: &EventOptions) -> Vec<String> {
	let mut lines = vec![name.to_string()];
	for (option, effect) in options {
		let mut effect_lines = effect.split('\n');
		lines.push(format!("{option}: {}", effect_lines.next().unwrap_or_default()));
		lines.extend(effect_lines.map(str::to_string));
	}
	lines
}

/// Owns the identification gate; lives on the scan worker thread.
pub struct Scanner {
	ie: Arc<ie::Ie>,
	catalog: Arc<EventCatalog>,
	skills: Arc<SkillIndex>,
	prompt: Option<Arc<dyn HumanLabelPrompt>>,
	settings: ScanSettings,
	gate: IdentificationGate,
}

impl Scanner {
	pub fn new(ie: Arc<ie::Ie>, catalog: Arc<EventCatalog>, skills: Arc<SkillIndex>, settings: ScanSettings) -> Self {
		Self {
			ie,
			catalog,
			skills,
			prompt: None,
			gate: IdentificationGate::new(settings.gate),
			settings,
		}
	}

	pub fn with_prompt(mut self, prompt: Arc<dyn HumanLabelPrompt>) -> Self {
		self.prompt = Some(prompt);
		self
	}

	pub fn gate(&self) -> &IdentificationGate {
		&self.gate
	}

	/// Process one tick. `portrait` is only called for trainee events.
	pub fn scan<F>(&mut self, lines: &[String], portrait: F, now: Instant) -> ScanOutcome
	where
		F: FnOnce() -> Result<ie::OwnedImage>,
	{
		let [header, event_line, ..] = lines else {
			return ScanOutcome::Hide;
		};
		let event_line = ie::text::trim_after_big_gap(event_line);

		let Some(category) = Category::classify(header) else {
			if self.gate.is_tracking() {
				tracing::debug!(header = header.as_str(), "unknown header; gate reset");
				self.gate.reset();
			}
			return ScanOutcome::Hide;
		};

		let confirmed = match category {
			Category::Trainee => self.identify_trainee(header, &event_line, portrait, now),
			Category::Support => {
				self.gate.reset();
				None
			}
		};
		tracing::debug!(category = %category, line = event_line.as_str(), character = ?confirmed, "scan");

		let events = self.catalog.events_for(category, confirmed.as_deref());
		let found = self
			.settings
			.matcher
			.match_event(&event_line, &events, self.settings.text_match_confidence);

		let mut result = ScanResult {
			category,
			event_line,
			event_name: None,
			event_options: None,
			confirmed_character: confirmed,
			matched_skill_refs: Vec::new(),
			matched_condition_refs: Vec::new(),
		};
		if let Some(found) = found {
			let lines = overlay_lines(&found.name, &found.options);
			result.matched_skill_refs = self.skills.skill_refs(lines.iter().map(String::as_str));
			result.matched_condition_refs = self.skills.condition_refs(&result.matched_skill_refs);
			result.event_name = Some(found.name);
			result.event_options = Some(found.options);
		}
		ScanOutcome::Show(result)
	}

	fn identify_trainee<F>(&mut self, header: &str, event_line: &str, portrait: F, now: Instant) -> Option<String>
	where
		F: FnOnce() -> Result<ie::OwnedImage>,
	{
		let crop = match portrait() {
			Ok(crop) => crop,
			Err(err) => {
				tracing::warn!(error = %format!("{err:#}"), "portrait capture failed");
				return None;
			}
		};

		let identification = self
			.ie
			.identify_portrait(crop.as_image(), self.settings.portrait_match_threshold);
		let key = gate::event_key(Category::Trainee, event_line);

		let decision = match &identification.name {
			Some(name) => self.gate.on_hit(name, &key),
			None => self
				.gate
				.on_miss(&key, Category::is_trainee_event_header(header), now),
		};
		tracing::debug!(score = identification.score, decision = ?decision, "portrait");

		match decision {
			GateDecision::Pending => None,
			GateDecision::Confirmed(name) => Some(name),
			GateDecision::RequestLabel => self.request_label(&crop),
		}
	}

	fn request_label(&mut self, crop: &ie::OwnedImage) -> Option<String> {
		let prompt = self.prompt.clone()?;

		let mut candidates = self.catalog.load_trainee_names();
		if candidates.is_empty() {
			candidates = self.ie.templates().names();
		}

		let answer = prompt.request(&candidates, crop, self.settings.prompt_timeout)?;
		let name = self.catalog.canonical_character(&answer);

		// The label counts even when the portrait cannot be kept.
		let label = match self.ie.templates().save(&name, crop) {
			Ok(Some(saved)) => saved,
			Ok(None) => {
				tracing::warn!(character = name.as_str(), "label is not a usable file name; portrait not saved");
				name
			}
			Err(err) => {
				// Already usable in memory.
				tracing::warn!(error = %format!("{err:#}"), "failed to write portrait");
				ie::portrait::sanitize_name(&name).unwrap_or(name)
			}
		};
		tracing::info!(character = label.as_str(), "portrait labeled");

		match self.gate.on_label(&label) {
			GateDecision::Confirmed(name) => Some(name),
			_ => None,
		}
	}
}

use crate::{similarity, EventMap, EventOptions};

/// Shortest event line worth matching.
pub const MIN_LINE_CHARS: usize = 4;

/// Closest known event for one OCR line.
#[derive(Debug, Clone, PartialEq)]
pub struct EventMatch {
	pub name: String,
	pub options: EventOptions,
	pub score: f64,
}

/// Resolves noisy event titles against a set of known event names.
///
/// Some titles are shared by many events and differ only by a word; lines
/// containing one of the `ambiguous_phrases` must clear `ambiguous_cutoff`
/// instead of the caller's base confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyEventMatcher {
	pub ambiguous_phrases: Vec<String>,
	pub ambiguous_cutoff: f64,
}

impl Default for FuzzyEventMatcher {
	fn default() -> Self {
		Self {
			ambiguous_phrases: vec!["inspiration".to_string(), "summer camp".to_string()],
			ambiguous_cutoff: 0.95,
		}
	}
}

impl FuzzyEventMatcher {
	pub fn new(ambiguous_phrases: Vec<String>, ambiguous_cutoff: f64) -> Self {
		Self {
			ambiguous_phrases: ambiguous_phrases.into_iter().map(|p| p.to_lowercase()).collect(),
			ambiguous_cutoff,
		}
	}

	/// Cutoff applied to `line`.
	pub fn cutoff(&self, line: &str, base_confidence: f64) -> f64 {
		let lower = line.to_lowercase();
		if self
			.ambiguous_phrases
			.iter()
			.any(|p| !p.is_empty() && lower.contains(&p.to_lowercase()))
		{
			base_confidence.max(self.ambiguous_cutoff)
		} else {
			base_confidence
		}
	}

	pub fn match_event(&self, event_line: &str, events: &EventMap, base_confidence: f64) -> Option<EventMatch> {
		if event_line.chars().count() < MIN_LINE_CHARS || events.is_empty() {
			return None;
		}

		let cutoff = self.cutoff(event_line, base_confidence);
		let (name, score) = similarity::get_close_match(event_line, events.keys().map(String::as_str), cutoff)?;
		tracing::debug!(line = event_line, event = name, score, cutoff, "event matched");

		Some(EventMatch {
			name: name.to_string(),
			options: events.get(name)?.clone(),
			score,
		})
	}
}

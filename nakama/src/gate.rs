//! Portrait identification gate.
//!
//! Single-frame template matches flicker around UI transitions, so a name is
//! only trusted after the same character wins several scans in a row. A run
//! of misses on the same event asks a human instead, at most once per
//! cooldown.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateSettings {
	pub require_hits: u32,
	pub require_misses: u32,
	pub cooldown: Duration,
}

impl Default for GateSettings {
	fn default() -> Self {
		Self {
			require_hits: 2,
			require_misses: 2,
			cooldown: Duration::from_secs(15),
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateState {
	pub current_candidate: Option<String>,
	pub hit_count: u32,
	pub miss_count: u32,
	pub last_event_key: String,
	/// Kept across resets; the cooldown is global.
	pub last_prompt_at: Option<Instant>,
}

/// What the scanner should do with this tick's identification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
	/// Nothing trusted yet.
	Pending,
	/// The streak is long enough to scope events by this character.
	Confirmed(String),
	/// Ask a human who this is. The prompt time has already been recorded.
	RequestLabel,
}

#[derive(Debug, Clone, Default)]
pub struct IdentificationGate {
	settings: GateSettings,
	state: GateState,
}

impl IdentificationGate {
	pub fn new(settings: GateSettings) -> Self {
		Self {
			settings,
			state: GateState::default(),
		}
	}

	pub fn state(&self) -> &GateState {
		&self.state
	}

	pub fn settings(&self) -> &GateSettings {
		&self.settings
	}

	/// Whether any streak is in progress.
	pub fn is_tracking(&self) -> bool {
		self.state.current_candidate.is_some() || self.state.hit_count > 0 || self.state.miss_count > 0
	}

	pub fn on_hit(&mut self, name: &str, event_key: &str) -> GateDecision {
		let state = &mut self.state;
		if state.current_candidate.as_deref() == Some(name) {
			state.hit_count += 1;
		} else {
			state.current_candidate = Some(name.to_string());
			state.hit_count = 1;
		}
		tracing::debug!(candidate = name, streak = state.hit_count, "portrait hit");

		if state.hit_count < self.settings.require_hits {
			return GateDecision::Pending;
		}
		state.miss_count = 0;
		state.last_event_key = event_key.to_string();
		GateDecision::Confirmed(name.to_string())
	}

	/// Record a miss. Only misses seen on a trainee event line count; any other
	/// trainee frame resets the gate.
	pub fn on_miss(&mut self, event_key: &str, is_event_line: bool, now: Instant) -> GateDecision {
		if !is_event_line {
			if self.state.miss_count > 0 {
				tracing::debug!("not an event line; miss streak reset");
			}
			self.reset();
			return GateDecision::Pending;
		}

		let state = &mut self.state;
		if state.last_event_key != event_key {
			state.miss_count = 1;
			state.last_event_key = event_key.to_string();
		} else {
			state.miss_count += 1;
		}
		tracing::debug!(streak = state.miss_count, key = event_key, "portrait miss");

		if state.miss_count < self.settings.require_misses {
			return GateDecision::Pending;
		}
		let cooled_down = state
			.last_prompt_at
			.is_none_or(|at| now.saturating_duration_since(at) > self.settings.cooldown);
		if !cooled_down {
			return GateDecision::Pending;
		}
		state.last_prompt_at = Some(now);
		GateDecision::RequestLabel
	}

	/// A human named the character; the next identification starts fresh.
	pub fn on_label(&mut self, name: &str) -> GateDecision {
		self.reset();
		GateDecision::Confirmed(name.to_string())
	}

	pub fn reset(&mut self) {
		let last_prompt_at = self.state.last_prompt_at;
		self.state = GateState {
			last_prompt_at,
			..GateState::default()
		};
	}
}

/// Key identifying one on-screen event for miss counting.
pub fn event_key(category: data::Category, event_line: &str) -> String {
	format!("{category}|{}", event_line.trim())
}

#[cfg(test)]
mod tests {
	use super::*;
	use data::Category;

	fn gate() -> IdentificationGate {
		IdentificationGate::new(GateSettings::default())
	}

	#[test]
	fn confirmation_needs_full_streak() {
		let mut gate = gate();
		let key = event_key(Category::Trainee, "Dream Big");
		assert_eq!(gate.on_hit("Alpha", &key), GateDecision::Pending);
		assert_eq!(gate.on_hit("Alpha", &key), GateDecision::Confirmed("Alpha".to_string()));
		assert_eq!(gate.on_hit("Alpha", &key), GateDecision::Confirmed("Alpha".to_string()));
		assert_eq!(gate.state().hit_count, 3);
	}

	#[test]
	fn alternating_hits_restart_streak() {
		let mut gate = gate();
		let key = event_key(Category::Trainee, "Dream Big");
		assert_eq!(gate.on_hit("Beta", &key), GateDecision::Pending);
		assert_eq!(gate.on_hit("Gamma", &key), GateDecision::Pending);
		assert_eq!(gate.state().current_candidate.as_deref(), Some("Gamma"));
		assert_eq!(gate.state().hit_count, 1);
	}

	#[test]
	fn confirmation_clears_misses() {
		let mut gate = gate();
		let now = Instant::now();
		gate.on_miss("trainee|A", true, now);
		gate.on_hit("Alpha", "trainee|A");
		gate.on_hit("Alpha", "trainee|A");
		assert_eq!(gate.state().miss_count, 0);
		assert_eq!(gate.state().last_event_key, "trainee|A");
	}

	#[test]
	fn prompt_after_repeated_misses_on_same_event() {
		let mut gate = gate();
		let now = Instant::now();
		assert_eq!(gate.on_miss("trainee|A", true, now), GateDecision::Pending);
		assert_eq!(gate.on_miss("trainee|A", true, now), GateDecision::RequestLabel);
		assert_eq!(gate.state().last_prompt_at, Some(now));
	}

	#[test]
	fn new_event_restarts_miss_count() {
		let mut gate = gate();
		let now = Instant::now();
		gate.on_miss("trainee|A", true, now);
		assert_eq!(gate.on_miss("trainee|B", true, now), GateDecision::Pending);
		assert_eq!(gate.state().miss_count, 1);
		assert_eq!(gate.state().last_event_key, "trainee|B");
	}

	#[test]
	fn prompt_at_most_once_per_cooldown() {
		let mut gate = gate();
		let start = Instant::now();
		gate.on_miss("trainee|A", true, start);
		assert_eq!(gate.on_miss("trainee|A", true, start), GateDecision::RequestLabel);

		for secs in [1, 5, 10, 15] {
			let at = start + Duration::from_secs(secs);
			assert_eq!(gate.on_miss("trainee|A", true, at), GateDecision::Pending, "at {secs}s");
		}

		let later = start + Duration::from_secs(16);
		assert_eq!(gate.on_miss("trainee|A", true, later), GateDecision::RequestLabel);
	}

	#[test]
	fn non_event_frame_resets_without_counting() {
		let mut gate = gate();
		let now = Instant::now();
		gate.on_hit("Alpha", "trainee|A");
		gate.on_miss("trainee|A", true, now);
		assert_eq!(gate.on_miss("trainee|A", false, now), GateDecision::Pending);
		assert!(!gate.is_tracking());
		assert_eq!(gate.state().last_event_key, "");
	}

	#[test]
	fn reset_keeps_prompt_time() {
		let mut gate = gate();
		let now = Instant::now();
		gate.on_miss("trainee|A", true, now);
		gate.on_miss("trainee|A", true, now);
		gate.reset();

		assert_eq!(gate.state().current_candidate, None);
		assert_eq!(gate.state().hit_count, 0);
		assert_eq!(gate.state().miss_count, 0);
		assert_eq!(gate.state().last_prompt_at, Some(now));

		// Still inside the cooldown after the reset.
		gate.on_miss("trainee|A", true, now);
		assert_eq!(gate.on_miss("trainee|A", true, now), GateDecision::Pending);
	}

	#[test]
	fn label_confirms_and_resets() {
		let mut gate = gate();
		gate.on_hit("Beta", "trainee|A");
		assert_eq!(gate.on_label("Alpha"), GateDecision::Confirmed("Alpha".to_string()));
		assert!(!gate.is_tracking());
	}

	#[test]
	fn event_key_trims_line() {
		assert_eq!(event_key(Category::Trainee, " Dream Big "), "trainee|Dream Big");
	}
}

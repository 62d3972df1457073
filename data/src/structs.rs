/// Event source shown in the header line above the event title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
	Trainee,
	Support,
}

impl Category {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Trainee => "trainee",
			Self::Support => "support",
		}
	}

	/// File holding every event of this category.
	pub fn events_file(&self) -> String {
		format!("{}_events.json", self.as_str())
	}

	/// Classify an OCR header line by case-insensitive containment.
	///
	/// "Trainee" wins over "Support" when both appear.
	pub fn classify(header: &str) -> Option<Self> {
		let header = header.to_lowercase();
		if header.contains("trainee") {
			Some(Self::Trainee)
		} else if header.contains("support") {
			Some(Self::Support)
		} else {
			None
		}
	}

	/// Only a trainee *event* header counts towards portrait misses; other
	/// trainee headers show up on transition frames.
	pub fn is_trainee_event_header(header: &str) -> bool {
		header.to_lowercase().contains("trainee event")
	}
}

impl std::fmt::Display for Category {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

//! Line commands for the console front end.

/// What one line of stdin means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
	Quit,
	Start,
	Stop,
	/// Reply to the open label request. Empty skips it.
	Answer(String),
	Empty,
	Unknown(String),
}

/// Interpret `line`. Commands are recognized even while a label is being
/// asked for; any other line answers the open request.
pub fn parse(line: &str, answering: bool) -> Input {
	match line.trim() {
		"quit" => Input::Quit,
		"start" => Input::Start,
		"stop" => Input::Stop,
		other if answering => Input::Answer(other.to_string()),
		"" => Input::Empty,
		other => Input::Unknown(other.to_string()),
	}
}

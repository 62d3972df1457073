//! Post-OCR text cleanup.

use std::sync::LazyLock;

use regex::Regex;

/// Minimum run of space-like characters treated as a UI gap.
pub const GAP_RUN: usize = 4;

static SPACE_SEPARATOR: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\p{Zs}").expect("space separator regex"));

static BIG_GAP: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(&format!(r"[\t\p{{Zs}}]{{{GAP_RUN},}}.*$")).expect("gap regex")
});

/// Map every Unicode space separator (NBSP, ideographic space, ...) to ASCII space.
pub fn normalize_spaces(s: &str) -> String {
	SPACE_SEPARATOR.replace_all(s, " ").into_owned()
}

/// Split raw recognizer output into non-empty lines.
///
/// Table borders (`|`) are dropped, spacing inside a line is preserved so that
/// [`trim_after_big_gap`] can still see the gaps.
pub fn split_lines(raw: &str) -> Vec<String> {
	raw.lines()
		.map(|line| normalize_spaces(&line.replace('|', "")))
		.filter(|line| !line.trim().is_empty())
		.collect()
}

/// Remove everything from the first run of [`GAP_RUN`] or more space-like
/// characters to the end, plus zero-width characters.
///
/// OCR keeps reading across large gaps in the game UI; whatever follows such a
/// gap is never part of the event title.
pub fn trim_after_big_gap(s: &str) -> String {
	let s = s.replace(['\u{200B}', '\u{FEFF}'], "");
	BIG_GAP.replace(&s, "").trim_end().to_string()
}

//! Gestalt pattern matching (Ratcliff/Obershelp).
//!
//! Scores agree with Python's `difflib.SequenceMatcher` with autojunk off, so
//! thresholds tuned against it carry over unchanged.

use std::collections::HashMap;

/// `2 * M / T`, where `M` counts matched characters and `T` is the combined length.
/// Two empty strings are identical.
pub fn ratio(a: &str, b: &str) -> f64 {
	let a = a.chars().collect::<Vec<_>>();
	let b = b.chars().collect::<Vec<_>>();
	score(matching_characters(&a, &b), a.len() + b.len())
}

/// Upper bound on [`ratio`] from character multisets alone.
pub fn quick_ratio(a: &str, b: &str) -> f64 {
	let mut counts = HashMap::<char, isize>::new();
	for c in b.chars() {
		*counts.entry(c).or_default() += 1;
	}

	let mut matches = 0;
	let mut len_a = 0;
	for c in a.chars() {
		len_a += 1;
		let count = counts.entry(c).or_default();
		if *count > 0 {
			matches += 1;
		}
		*count -= 1;
	}

	score(matches, len_a + b.chars().count())
}

/// Upper bound on [`ratio`] from lengths alone.
pub fn real_quick_ratio(a: &str, b: &str) -> f64 {
	let (la, lb) = (a.chars().count(), b.chars().count());
	score(la.min(lb), la + lb)
}

/// Best candidate scoring at least `cutoff`.
///
/// Equal scores are broken towards the lexicographically greater candidate.
pub fn get_close_match<'a, I>(word: &str, candidates: I, cutoff: f64) -> Option<(&'a str, f64)>
where
	I: IntoIterator<Item = &'a str>,
{
	let mut best: Option<(&'a str, f64)> = None;
	for candidate in candidates {
		if real_quick_ratio(candidate, word) < cutoff || quick_ratio(candidate, word) < cutoff {
			continue;
		}
		let score = ratio(candidate, word);
		if score < cutoff {
			continue;
		}
		let better = match best {
			None => true,
			Some((name, best_score)) => score > best_score || (score == best_score && candidate > name),
		};
		if better {
			best = Some((candidate, score));
		}
	}
	best
}

fn score(matches: usize, total: usize) -> f64 {
	if total == 0 {
		1.0
	} else {
		2.0 * matches as f64 / total as f64
	}
}

/// Sum of the sizes of all matching blocks.
fn matching_characters(a: &[char], b: &[char]) -> usize {
	let mut b2j = HashMap::<char, Vec<usize>>::new();
	for (j, c) in b.iter().enumerate() {
		b2j.entry(*c).or_default().push(j);
	}

	let mut total = 0;
	let mut queue = vec![(0, a.len(), 0, b.len())];
	while let Some((alo, ahi, blo, bhi)) = queue.pop() {
		let (i, j, k) = longest_match(a, &b2j, alo, ahi, blo, bhi);
		if k == 0 {
			continue;
		}
		total += k;
		if alo < i && blo < j {
			queue.push((alo, i, blo, j));
		}
		if i + k < ahi && j + k < bhi {
			queue.push((i + k, ahi, j + k, bhi));
		}
	}
	total
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]`.
///
/// Of all maximal blocks, returns the one starting earliest in `a`, and of
/// those the one starting earliest in `b`.
fn longest_match(
	a: &[char],
	b2j: &HashMap<char, Vec<usize>>,
	alo: usize,
	ahi: usize,
	blo: usize,
	bhi: usize,
) -> (usize, usize, usize) {
	let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);
	// Length of the match ending at a[i - 1], b[j], keyed by j.
	let mut lengths = HashMap::<usize, usize>::new();

	for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
		let mut next = HashMap::new();
		if let Some(indices) = b2j.get(c) {
			for &j in indices {
				if j < blo {
					continue;
				}
				if j >= bhi {
					break;
				}
				let k = j.checked_sub(1).and_then(|p| lengths.get(&p)).copied().unwrap_or(0) + 1;
				next.insert(j, k);
				if k > best_k {
					best_i = i + 1 - k;
					best_j = j + 1 - k;
					best_k = k;
				}
			}
		}
		lengths = next;
	}

	(best_i, best_j, best_k)
}

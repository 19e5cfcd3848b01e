//! Conflict resolution between keyword occurrences.
//!
//! Every occurrence of every keyword is a candidate interval. Candidates are
//! ranked by [`precedence`] and accepted greedily: a candidate wins unless it
//! overlaps one already accepted or its rule has used up its quota.

use std::cmp::Ordering;
use std::collections::BTreeMap;

/// One possible link placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
	/// Byte offset where the occurrence starts.
	pub start: usize,

	/// Byte offset one past the end of the occurrence.
	pub end: usize,

	/// Index of the rule in the ordered rule list.
	pub rule: usize,

	pub priority: i32,

	/// Keyword length in characters.
	pub keyword_len: usize,
}

/// Total order deciding which of two candidates is placed first.
///
/// Higher priority, then longer keyword, then earlier rule, then leftmost
/// occurrence.
pub fn precedence(a: &Candidate, b: &Candidate) -> Ordering {
	b.priority
		.cmp(&a.priority)
		.then_with(|| b.keyword_len.cmp(&a.keyword_len))
		.then_with(|| a.rule.cmp(&b.rule))
		.then_with(|| a.start.cmp(&b.start))
		.then_with(|| a.end.cmp(&b.end))
}

/// Greedy interval scheduling.
///
/// `limits[rule]` caps how many candidates of a rule are accepted (`None` is
/// unlimited; rules past the end of `limits` are unlimited too). Returns the
/// accepted candidates in document order.
pub fn schedule<F>(
	mut candidates: Vec<Candidate>,
	limits: &[Option<usize>],
	order: F,
) -> Vec<Candidate>
where
	F: Fn(&Candidate, &Candidate) -> Ordering,
{
	candidates.sort_by(|a, b| order(a, b));

	let mut used = vec![0usize; limits.len()];
	// start -> end of accepted intervals; they never overlap each other.
	let mut taken: BTreeMap<usize, usize> = BTreeMap::new();
	let mut accepted = Vec::new();

	for candidate in candidates {
		if candidate.start >= candidate.end {
			continue;
		}
		let limit = limits.get(candidate.rule).copied().flatten();
		if let Some(limit) = limit
			&& used[candidate.rule] >= limit
		{
			continue;
		}
		if overlaps(&taken, &candidate) {
			continue;
		}

		taken.insert(candidate.start, candidate.end);
		if let Some(count) = used.get_mut(candidate.rule) {
			*count += 1;
		}
		accepted.push(candidate);
	}

	accepted.sort_by_key(|c| c.start);
	accepted
}

fn overlaps(taken: &BTreeMap<usize, usize>, candidate: &Candidate) -> bool {
	taken
		.range(..candidate.end)
		.next_back()
		.is_some_and(|(_, &end)| end > candidate.start)
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	fn candidate(start: usize, end: usize, rule: usize, priority: i32) -> Candidate {
		Candidate {
			start,
			end,
			rule,
			priority,
			keyword_len: end - start,
		}
	}

	fn spans(accepted: &[Candidate]) -> Vec<(usize, usize, usize)> {
		accepted.iter().map(|c| (c.start, c.end, c.rule)).collect()
	}

	#[test]
	fn test_precedence_priority_first() {
		let low = candidate(0, 10, 0, 1);
		let high = candidate(20, 22, 1, 5);
		assert_eq!(precedence(&high, &low), Ordering::Less);
		assert_eq!(precedence(&low, &high), Ordering::Greater);
	}

	#[test]
	fn test_precedence_longer_keyword_then_rule_order() {
		let short = candidate(0, 4, 0, 0);
		let long = candidate(0, 8, 1, 0);
		assert_eq!(precedence(&long, &short), Ordering::Less);

		let first = candidate(10, 14, 0, 0);
		let second = candidate(0, 4, 1, 0);
		assert_eq!(precedence(&first, &second), Ordering::Less);
	}

	#[test]
	fn test_precedence_leftmost_within_rule() {
		let left = candidate(0, 4, 0, 0);
		let right = candidate(10, 14, 0, 0);
		assert_eq!(precedence(&left, &right), Ordering::Less);
		assert_eq!(precedence(&left, &left), Ordering::Equal);
	}

	#[test]
	fn test_schedule_no_overlap() {
		// "new york city": "new york" (rule 0) vs "york city" (rule 1).
		let candidates = vec![candidate(0, 8, 0, 0), candidate(4, 13, 1, 0)];
		let accepted = schedule(candidates, &[None, None], precedence);
		assert_eq!(spans(&accepted), vec![(4, 13, 1)]);
	}

	#[test]
	fn test_schedule_priority_beats_length() {
		let candidates = vec![
			candidate(0, 8, 0, 0),
			candidate(4, 13, 1, 0),
			candidate(0, 3, 2, 9),
		];
		let accepted = schedule(candidates, &[None, None, None], precedence);
		assert_eq!(spans(&accepted), vec![(0, 3, 2), (4, 13, 1)]);
	}

	#[test]
	fn test_schedule_quota() {
		let candidates = vec![
			candidate(20, 24, 0, 0),
			candidate(0, 4, 0, 0),
			candidate(10, 14, 0, 0),
		];
		let accepted = schedule(candidates.clone(), &[Some(2)], precedence);
		assert_eq!(spans(&accepted), vec![(0, 4, 0), (10, 14, 0)]);

		assert!(schedule(candidates.clone(), &[Some(0)], precedence).is_empty());
		assert_eq!(schedule(candidates, &[None], precedence).len(), 3);
	}

	#[test]
	fn test_schedule_quota_is_per_rule() {
		let candidates = vec![
			candidate(0, 4, 0, 0),
			candidate(10, 14, 0, 0),
			candidate(20, 24, 1, 0),
		];
		let accepted = schedule(candidates, &[Some(1), Some(1)], precedence);
		assert_eq!(spans(&accepted), vec![(0, 4, 0), (20, 24, 1)]);
	}

	#[test]
	fn test_schedule_touching_intervals_do_not_overlap() {
		let candidates = vec![candidate(0, 4, 0, 0), candidate(4, 8, 1, 0)];
		let accepted = schedule(candidates, &[None, None], precedence);
		assert_eq!(accepted.len(), 2);
	}

	#[test]
	fn test_schedule_blocked_by_later_interval() {
		// Accepted [10, 20) must block a candidate [5, 12) that starts before it.
		let candidates = vec![candidate(10, 20, 0, 5), candidate(5, 12, 1, 0)];
		let accepted = schedule(candidates, &[None, None], precedence);
		assert_eq!(spans(&accepted), vec![(10, 20, 0)]);
	}

	#[test]
	fn test_schedule_ignores_empty_candidates() {
		let accepted = schedule(vec![candidate(3, 3, 0, 0)], &[None], precedence);
		assert!(accepted.is_empty());
	}
}

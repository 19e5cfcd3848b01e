use crate::catalog::{LinkId, RuleStore};
use crate::tracking::ClickEvent;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Default length of the daily click chart.
pub const STATS_WINDOW_DAYS: u32 = 28;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
	pub date: NaiveDate,
	pub clicks: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkClicks {
	pub link_id: LinkId,
	pub title: String,
	pub clicks: usize,
}

/// Clicks per UTC day for the `days` days ending with `today`, oldest first.
/// Days without clicks are included with a zero count.
pub fn daily_counts(events: &[ClickEvent], today: NaiveDate, days: u32) -> Vec<DailyCount> {
	if days == 0 {
		return Vec::new();
	}
	let start = today
		.checked_sub_days(chrono::Days::new(u64::from(days - 1)))
		.unwrap_or(NaiveDate::MIN);

	let mut counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
	for event in events {
		let date = event.created_at.date_naive();
		if (start..=today).contains(&date) {
			*counts.entry(date).or_default() += 1;
		}
	}

	start
		.iter_days()
		.take_while(|date| *date <= today)
		.map(|date| DailyCount {
			date,
			clicks: counts.get(&date).copied().unwrap_or(0),
		})
		.collect()
}

/// Links ranked by total clicks, most clicked first.
///
/// Clicks on links no longer in the catalog are left out.
pub fn top_links<S: RuleStore + ?Sized>(events: &[ClickEvent], store: &S) -> Vec<LinkClicks> {
	let mut totals: BTreeMap<LinkId, usize> = BTreeMap::new();
	for event in events {
		*totals.entry(event.link_id).or_default() += 1;
	}

	let mut ranked: Vec<LinkClicks> = totals
		.into_iter()
		.filter_map(|(link_id, clicks)| {
			store.get(link_id).map(|rule| LinkClicks {
				link_id,
				title: rule.title.clone(),
				clicks,
			})
		})
		.collect();
	// Stable: equal counts stay in id order.
	ranked.sort_by(|a, b| b.clicks.cmp(&a.clicks));
	ranked
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog::{Catalog, LinkRule};
	use chrono::{TimeZone, Utc};
	use pretty_assertions::assert_eq;

	fn click(link_id: LinkId, y: i32, m: u32, d: u32) -> ClickEvent {
		ClickEvent {
			link_id,
			title: String::new(),
			source_url: "/".to_string(),
			destination_url: "/x/".to_string(),
			created_at: Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap(),
		}
	}

	fn date(y: i32, m: u32, d: u32) -> NaiveDate {
		NaiveDate::from_ymd_opt(y, m, d).unwrap()
	}

	#[test]
	fn test_daily_counts_window() {
		let events = vec![
			click(1, 2024, 3, 1),
			click(1, 2024, 3, 1),
			click(2, 2024, 3, 3),
			click(2, 2024, 2, 1),
			click(2, 2024, 3, 4),
		];
		let counts = daily_counts(&events, date(2024, 3, 3), 3);
		assert_eq!(
			counts,
			vec![
				DailyCount {
					date: date(2024, 3, 1),
					clicks: 2,
				},
				DailyCount {
					date: date(2024, 3, 2),
					clicks: 0,
				},
				DailyCount {
					date: date(2024, 3, 3),
					clicks: 1,
				},
			]
		);
	}

	#[test]
	fn test_daily_counts_default_window_is_zero_filled() {
		let counts = daily_counts(&[], date(2024, 3, 28), STATS_WINDOW_DAYS);
		assert_eq!(counts.len(), 28);
		assert_eq!(counts[0].date, date(2024, 3, 1));
		assert!(counts.iter().all(|c| c.clicks == 0));
		assert!(daily_counts(&[], date(2024, 3, 28), 0).is_empty());
	}

	#[test]
	fn test_top_links() {
		let catalog = Catalog::from_rules([
			LinkRule {
				id: 1,
				title: "Shop".to_string(),
				..Default::default()
			},
			LinkRule {
				id: 2,
				title: "About".to_string(),
				..Default::default()
			},
			LinkRule {
				id: 3,
				title: "Blog".to_string(),
				..Default::default()
			},
		]);
		let events = vec![
			click(3, 2024, 1, 1),
			click(2, 2024, 1, 1),
			click(2, 2024, 1, 2),
			click(9, 2024, 1, 2),
			click(1, 2024, 1, 3),
		];
		let ranked = top_links(&events, &catalog);
		let summary: Vec<(LinkId, &str, usize)> = ranked
			.iter()
			.map(|l| (l.link_id, l.title.as_str(), l.clicks))
			.collect();
		assert_eq!(summary, vec![(2, "About", 2), (1, "Shop", 1), (3, "Blog", 1)]);
	}
}

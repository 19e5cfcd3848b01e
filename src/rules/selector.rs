use crate::catalog::{Destination, LinkRule, PageId};
use crate::rules::page::{PageContext, page_path};
use crate::rules::pattern::{UrlPattern, parse_location};
use tracing::debug;

/// Select the rules that may fire on the current page.
///
/// Drops inactive rules and rules that would link the page to itself, then
/// orders the rest by priority, highest first. Equal priorities keep their
/// catalog order.
pub fn select<'a>(
	rules: &'a [LinkRule],
	current_page_id: Option<PageId>,
	current_page_url: &str,
	current_hostname: &str,
) -> Vec<&'a LinkRule> {
	let current_path = page_path(current_page_url);
	let candidates: Vec<&str> = current_path.as_deref().into_iter().collect();
	select_matching(rules, current_page_id, &candidates, current_hostname)
}

/// Like [`select`], checking self-links against every URL of the page.
pub fn select_for_page<'a>(rules: &'a [LinkRule], page: &PageContext) -> Vec<&'a LinkRule> {
	let candidates = page.candidate_urls();
	let candidates: Vec<&str> = candidates.iter().map(String::as_str).collect();
	select_matching(rules, page.page_id, &candidates, &page.hostname)
}

fn select_matching<'a>(
	rules: &'a [LinkRule],
	current_page_id: Option<PageId>,
	candidate_urls: &[&str],
	hostname: &str,
) -> Vec<&'a LinkRule> {
	let mut selected: Vec<&LinkRule> = rules
		.iter()
		.filter(|rule| rule.active)
		.filter(|rule| !is_self_link(rule, current_page_id, candidate_urls, hostname))
		.collect();
	selected.sort_by(|a, b| b.priority.cmp(&a.priority));

	debug!(
		total = rules.len(),
		selected = selected.len(),
		"selected link rules for page"
	);
	selected
}

fn is_self_link(
	rule: &LinkRule,
	current_page_id: Option<PageId>,
	candidate_urls: &[&str],
	hostname: &str,
) -> bool {
	match rule.destination {
		Destination::Page(page_id) => current_page_id == Some(page_id),
		Destination::Url(ref url) => {
			let Some((host, path)) = host_and_path(url, hostname) else {
				return false;
			};
			if !host.eq_ignore_ascii_case(hostname) {
				return false;
			}
			let pattern = UrlPattern::compile(&path);
			candidate_urls
				.iter()
				.filter(|candidate| !candidate.is_empty())
				.any(|candidate| pattern.matches(candidate))
		}
	}
}

/// Host and path of a destination URL. Relative URLs belong to `hostname`.
///
/// A bare host links the whole site, never a single page.
fn host_and_path(url: &str, hostname: &str) -> Option<(String, String)> {
	let parsed = parse_location(url, &format!("http://{hostname}/"))?;
	let host = parsed.host_str()?.to_string();
	Some((host, parsed.path().to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn url_rule(id: u64, priority: i32, url: &str) -> LinkRule {
		LinkRule {
			id,
			keywords: vec![format!("kw{id}")],
			destination: Destination::Url(url.to_string()),
			priority,
			..Default::default()
		}
	}

	fn page_rule(id: u64, priority: i32, page_id: PageId) -> LinkRule {
		LinkRule {
			id,
			keywords: vec![format!("kw{id}")],
			destination: Destination::Page(page_id),
			priority,
			..Default::default()
		}
	}

	fn ids(rules: &[&LinkRule]) -> Vec<u64> {
		rules.iter().map(|r| r.id).collect()
	}

	#[test]
	fn test_drops_inactive() {
		let mut inactive = url_rule(1, 0, "https://other.com/");
		inactive.active = false;
		let rules = vec![inactive, url_rule(2, 0, "https://other.com/")];
		let selected = select(&rules, None, "/blog/", "example.com");
		assert_eq!(ids(&selected), vec![2]);
	}

	#[test]
	fn test_orders_by_priority_stable() {
		let rules = vec![
			url_rule(1, 0, "/a/"),
			url_rule(2, 10, "/b/"),
			url_rule(3, 0, "/c/"),
			url_rule(4, 10, "/d/"),
		];
		let selected = select(&rules, None, "/blog/", "example.com");
		assert_eq!(ids(&selected), vec![2, 4, 1, 3]);
	}

	#[test]
	fn test_suppresses_self_link_by_page_id() {
		let rules = vec![page_rule(1, 100, 42), page_rule(2, 0, 7)];
		let selected = select(&rules, Some(42), "/about/", "example.com");
		assert_eq!(ids(&selected), vec![2]);

		let selected = select(&rules, None, "/about/", "example.com");
		assert_eq!(ids(&selected), vec![1, 2]);
	}

	#[test]
	fn test_suppresses_self_link_by_url() {
		let rules = vec![
			url_rule(1, 0, "https://Example.com/About/"),
			url_rule(2, 0, "https://other.com/about/"),
			url_rule(3, 0, "/about"),
			url_rule(4, 0, "https://example.com/contact/"),
		];
		let selected = select(&rules, None, "/about/", "example.com");
		assert_eq!(ids(&selected), vec![2, 4]);
	}

	#[test]
	fn test_url_destination_with_wildcards() {
		let rules = vec![url_rule(1, 0, "https://example.com/blog/*")];
		assert!(select(&rules, None, "/blog/post", "example.com").is_empty());
		assert_eq!(
			select(&rules, None, "/shop/post", "example.com").len(),
			1
		);
	}

	#[test]
	fn test_non_http_destinations_are_kept() {
		let rules = vec![
			url_rule(1, 0, "mailto:info@example.com"),
			url_rule(2, 0, ""),
		];
		let selected = select(&rules, None, "/", "example.com");
		assert_eq!(ids(&selected), vec![1, 2]);
	}

	#[test]
	fn test_destinations_without_path_are_kept() {
		let rules = vec![
			url_rule(1, 0, "https://example.com"),
			url_rule(2, 0, "https://example.com/"),
		];
		let selected = select(&rules, None, "/", "example.com");
		assert_eq!(ids(&selected), vec![1]);
	}

	#[test]
	fn test_select_for_page_checks_all_candidates() {
		let rules = vec![url_rule(1, 0, "/hello-world/"), url_rule(2, 0, "/other/")];
		let page = PageContext {
			canonical_url: Some("https://example.com/?p=5".to_string()),
			permalink: Some("https://example.com/hello-world/".to_string()),
			request_path: Some("/?p=5".to_string()),
			hostname: "example.com".to_string(),
			..Default::default()
		};
		let selected = select_for_page(&rules, &page);
		assert_eq!(ids(&selected), vec![2]);
	}

	#[test]
	fn test_select_reduces_full_page_url() {
		let rules = vec![url_rule(1, 0, "https://example.com/about/")];
		assert!(select(&rules, None, "https://example.com/about/", "example.com").is_empty());
		assert!(select(&rules, None, "/about/", "example.com").is_empty());
		assert_eq!(
			select(&rules, None, "https://example.com/team/", "example.com").len(),
			1
		);
	}

	#[test]
	fn test_suppresses_self_link_with_non_ascii_path() {
		let rules = vec![
			url_rule(1, 0, "https://example.com/café/"),
			url_rule(2, 0, "https://example.com/my page/"),
		];
		let cafe = PageContext {
			canonical_url: Some("https://example.com/café/".to_string()),
			hostname: "example.com".to_string(),
			..Default::default()
		};
		assert_eq!(ids(&select_for_page(&rules, &cafe)), vec![2]);

		let spaced = PageContext {
			request_path: Some("/my page/".to_string()),
			hostname: "example.com".to_string(),
			..Default::default()
		};
		assert_eq!(ids(&select_for_page(&rules, &spaced)), vec![1]);
	}
}

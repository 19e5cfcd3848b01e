//! Keyword-to-anchor rewriting.
//!
//! [`segment`] splits a document into markup, text and excluded regions,
//! [`resolver`] decides which keyword occurrences win, and this module stitches
//! the anchors back into the source.

pub mod anchor;
pub mod exclude;
pub mod resolver;
pub mod segment;

use crate::catalog::{Destination, LinkId, LinkRule, PageId};
use anchor::build_anchor;
use exclude::ExcludeSelectors;
use regex::{Regex, RegexBuilder};
use resolver::{Candidate, precedence, schedule};
use segment::{Segment, segment_html};
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use tracing::{debug, warn};

/// Resolves page ids to URLs at render time.
pub trait PageResolver {
	fn page_url(&self, page_id: PageId) -> Option<String>;
}

impl PageResolver for BTreeMap<PageId, String> {
	fn page_url(&self, page_id: PageId) -> Option<String> {
		self.get(&page_id).cloned()
	}
}

impl PageResolver for HashMap<PageId, String> {
	fn page_url(&self, page_id: PageId) -> Option<String> {
		self.get(&page_id).cloned()
	}
}

/// Resolver that knows no pages; page-destination rules are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPages;

impl PageResolver for NoPages {
	fn page_url(&self, _page_id: PageId) -> Option<String> {
		None
	}
}

/// A link inserted by a rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedLink {
	pub rule_id: LinkId,

	/// Byte range of the linked text in the input document.
	pub range: Range<usize>,

	pub href: String,
}

/// Output of [`Rewriter::rewrite_detailed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
	pub html: String,
	pub links: Vec<PlacedLink>,
}

/// Rewriting engine configured with exclusions and page resolution.
pub struct Rewriter<'a> {
	exclude: ExcludeSelectors,
	pages: &'a (dyn PageResolver + Sync),
}

impl Default for Rewriter<'_> {
	fn default() -> Self {
		Rewriter {
			exclude: ExcludeSelectors::default(),
			pages: &NoPages,
		}
	}
}

impl<'a> Rewriter<'a> {
	pub fn new(pages: &'a (dyn PageResolver + Sync)) -> Self {
		Rewriter {
			exclude: ExcludeSelectors::default(),
			pages,
		}
	}

	/// Never place links inside elements matching these selectors.
	pub fn with_exclusions<S: AsRef<str>>(mut self, selectors: &[S]) -> Self {
		self.exclude = ExcludeSelectors::parse(selectors);
		self
	}

	/// Rewrite `html`, trying `rules` in the given order.
	pub fn rewrite<'r>(
		&self,
		html: &str,
		rules: impl IntoIterator<Item = &'r LinkRule>,
	) -> String {
		self.rewrite_detailed(html, rules).html
	}

	/// Like [`Rewriter::rewrite`], also reporting every placed link.
	pub fn rewrite_detailed<'r>(
		&self,
		html: &str,
		rules: impl IntoIterator<Item = &'r LinkRule>,
	) -> Rewritten {
		let rules: Vec<&LinkRule> = rules.into_iter().collect();
		if rules.is_empty() {
			return Rewritten {
				html: html.to_string(),
				links: Vec::new(),
			};
		}
		let segments = segment_html(html, &self.exclude);
		rewrite_segments(html, &segments, &rules, self.pages)
	}
}

/// Rewrite `html` with no exclusions; page-destination rules are skipped.
pub fn rewrite<'r>(html: &str, rules: impl IntoIterator<Item = &'r LinkRule>) -> String {
	Rewriter::default().rewrite(html, rules)
}

struct CompiledRule<'r> {
	rule: &'r LinkRule,
	href: String,
	/// Keyword matcher and keyword length in characters.
	keywords: Vec<(Regex, usize)>,
}

fn compile_rule<'r>(rule: &'r LinkRule, pages: &dyn PageResolver) -> Option<CompiledRule<'r>> {
	if !rule.active || rule.quota() == Some(0) {
		return None;
	}

	let href = match &rule.destination {
		Destination::Page(page_id) => match pages.page_url(*page_id) {
			Some(url) => url,
			None => {
				debug!(rule = rule.id, page_id, "skipping rule with unresolved page");
				return None;
			}
		},
		Destination::Url(url) => url.trim().to_string(),
	};
	if href.is_empty() {
		return None;
	}

	let mut keywords = Vec::new();
	for keyword in rule.match_keywords() {
		match RegexBuilder::new(&regex::escape(keyword))
			.case_insensitive(!rule.case_sensitive)
			.build()
		{
			Ok(regex) => keywords.push((regex, keyword.chars().count())),
			Err(e) => warn!(rule = rule.id, keyword, error = %e, "skipping keyword"),
		}
	}
	if keywords.is_empty() {
		return None;
	}

	Some(CompiledRule {
		rule,
		href,
		keywords,
	})
}

/// Rewrite an already segmented document.
///
/// Only [`segment::SegmentKind::Text`] segments are scanned. Rules are taken
/// in the given order, which breaks ties between equally ranked occurrences.
pub fn rewrite_segments(
	source: &str,
	segments: &[Segment],
	rules: &[&LinkRule],
	pages: &dyn PageResolver,
) -> Rewritten {
	let compiled: Vec<CompiledRule> = rules
		.iter()
		.filter_map(|rule| compile_rule(rule, pages))
		.collect();

	let mut candidates = Vec::new();
	for segment in segments.iter().filter(|s| s.is_text()) {
		for (index, rule) in compiled.iter().enumerate() {
			for (regex, keyword_len) in &rule.keywords {
				let partly_match = rule.rule.partly_match;
				collect_occurrences(source, segment, regex, partly_match, |range| {
					candidates.push(Candidate {
						start: range.start,
						end: range.end,
						rule: index,
						priority: rule.rule.priority,
						keyword_len: *keyword_len,
					});
				});
			}
		}
	}

	let total = candidates.len();
	let limits: Vec<Option<usize>> = compiled.iter().map(|c| c.rule.quota()).collect();
	let accepted = schedule(candidates, &limits, precedence);

	debug!(
		rules = compiled.len(),
		candidates = total,
		placed = accepted.len(),
		"rewrote content"
	);

	if accepted.is_empty() {
		return Rewritten {
			html: source.to_string(),
			links: Vec::new(),
		};
	}

	let mut html = String::with_capacity(source.len() + accepted.len() * 64);
	let mut links = Vec::with_capacity(accepted.len());
	let mut last = 0;
	for candidate in accepted {
		let rule = &compiled[candidate.rule];
		html.push_str(&source[last..candidate.start]);
		html.push_str(&build_anchor(
			rule.rule,
			&rule.href,
			&source[candidate.start..candidate.end],
		));
		links.push(PlacedLink {
			rule_id: rule.rule.id,
			range: candidate.start..candidate.end,
			href: rule.href.clone(),
		});
		last = candidate.end;
	}
	html.push_str(&source[last..]);

	Rewritten { html, links }
}

/// Report every valid occurrence of `regex` inside a text segment.
fn collect_occurrences(
	source: &str,
	segment: &Segment,
	regex: &Regex,
	partly_match: bool,
	mut found: impl FnMut(Range<usize>),
) {
	let haystack = &source[..segment.range.end];
	let mut pos = segment.range.start;

	while pos < segment.range.end {
		let Some(m) = regex.find_at(haystack, pos) else {
			break;
		};
		if partly_match || on_word_boundaries(source, m.range()) {
			found(m.range());
			pos = m.end();
		} else {
			// Retry one character in; occurrences may overlap.
			pos = m.start() + source[m.start()..].chars().next().map_or(1, char::len_utf8);
		}
	}
}

fn is_word_char(c: char) -> bool {
	c.is_alphanumeric() || c == '_'
}

/// Longest character reference looked at next to an occurrence.
const MAX_CHAR_REF_LEN: usize = 32;

fn on_word_boundaries(source: &str, range: Range<usize>) -> bool {
	let before = char_before(source, range.start);
	let after = char_after(source, range.end);
	!before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

/// The rendered character ending at `at`, decoding a character reference.
fn char_before(source: &str, at: usize) -> Option<char> {
	let head = &source[..at];
	if let Some(body) = head.strip_suffix(';')
		&& let Some(amp) = body.rfind('&')
		&& let Some(decoded) = decode_char_ref(&head[amp..])
	{
		return decoded.chars().next_back();
	}
	head.chars().next_back()
}

/// The rendered character starting at `at`, decoding a character reference.
fn char_after(source: &str, at: usize) -> Option<char> {
	let tail = &source[at..];
	if tail.starts_with('&')
		&& let Some(semi) = tail.find(';')
		&& let Some(decoded) = decode_char_ref(&tail[..=semi])
	{
		return decoded.chars().next();
	}
	tail.chars().next()
}

/// Decode a single `&name;`, `&#d;` or `&#xh;` reference.
fn decode_char_ref(reference: &str) -> Option<String> {
	let body = reference.strip_prefix('&')?.strip_suffix(';')?;
	if body.is_empty()
		|| reference.len() > MAX_CHAR_REF_LEN
		|| !body.chars().all(|c| c.is_ascii_alphanumeric() || c == '#')
	{
		return None;
	}
	let decoded = html_escape::decode_html_entities(reference);
	(decoded != reference).then(|| decoded.into_owned())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog::Target;
	use pretty_assertions::assert_eq;

	fn rule(id: LinkId, keywords: &[&str], url: &str) -> LinkRule {
		LinkRule {
			id,
			title: format!("Rule {id}"),
			keywords: keywords.iter().map(|k| k.to_string()).collect(),
			destination: Destination::Url(url.to_string()),
			notitle: true,
			..Default::default()
		}
	}

	fn anchor(url: &str, text: &str) -> String {
		format!(r#"<a href="{url}" target="_self">{text}</a>"#)
	}

	fn count_anchors(html: &str) -> usize {
		html.matches("<a ").count()
	}

	#[test]
	fn test_rewriter_is_shareable_across_threads() {
		fn assert_send_sync<T: Send + Sync>(_: &T) {}

		let pages: BTreeMap<PageId, String> = BTreeMap::from([(8, "/team/".to_string())]);
		let rewriter = Rewriter::new(&pages).with_exclusions(&["nav"]);
		assert_send_sync(&rewriter);

		let rules = vec![LinkRule {
			destination: Destination::Page(8),
			..rule(1, &["team"], "")
		}];
		let rendered: Vec<String> = std::thread::scope(|scope| {
			let handles: Vec<_> = (0..2)
				.map(|_| scope.spawn(|| rewriter.rewrite("our team", &rules)))
				.collect();
			handles.into_iter().map(|h| h.join().unwrap()).collect()
		});
		assert_eq!(rendered[0], format!("our {}", anchor("/team/", "team")));
		assert_eq!(rendered[0], rendered[1]);
	}

	#[test]
	fn test_basic_rewrite() {
		let rules = vec![rule(1, &["shop"], "/shop/")];
		assert_eq!(
			rewrite("<p>Visit our shop today.</p>", &rules),
			format!("<p>Visit our {} today.</p>", anchor("/shop/", "shop"))
		);
	}

	#[test]
	fn test_no_rules_returns_input_verbatim() {
		let html = "<p>Visit our  shop &amp; more</p>";
		assert_eq!(rewrite(html, &Vec::<LinkRule>::new()), html);
		let unmatched = vec![rule(1, &["garden"], "/garden/")];
		assert_eq!(rewrite(html, &unmatched), html);
		assert_eq!(rewrite("", &unmatched), "");
	}

	#[test]
	fn test_default_quota_is_one() {
		let rules = vec![rule(1, &["shop"], "/shop/")];
		let html = rewrite("shop shop shop", &rules);
		assert_eq!(count_anchors(&html), 1);
		assert!(html.ends_with(" shop shop"));
	}

	#[test]
	fn test_quota_respected() {
		let mut limited = rule(1, &["shop"], "/shop/");
		limited.num = 2;
		assert_eq!(count_anchors(&rewrite("shop shop shop", [&limited])), 2);

		limited.num = -1;
		assert_eq!(count_anchors(&rewrite("shop shop shop", [&limited])), 3);

		limited.num = 0;
		assert_eq!(rewrite("shop shop shop", [&limited]), "shop shop shop");
	}

	#[test]
	fn test_case_sensitivity() {
		let insensitive = rule(1, &["example"], "/ex/");
		assert_eq!(
			rewrite("An Example here", [&insensitive]),
			format!("An {} here", anchor("/ex/", "Example"))
		);

		let sensitive = LinkRule {
			case_sensitive: true,
			..insensitive
		};
		assert_eq!(rewrite("An Example here", [&sensitive]), "An Example here");
	}

	#[test]
	fn test_word_boundaries() {
		let whole = rule(1, &["cat"], "/cat/");
		assert_eq!(rewrite("a category", [&whole]), "a category");
		assert_eq!(
			rewrite("category, cat.", [&whole]),
			format!("category, {}.", anchor("/cat/", "cat"))
		);
		assert_eq!(rewrite("cat_food", [&whole]), "cat_food");

		let partial = LinkRule {
			partly_match: true,
			..whole
		};
		assert_eq!(
			rewrite("a category", [&partial]),
			format!("a {}egory", anchor("/cat/", "cat"))
		);
	}

	#[test]
	fn test_unicode_word_boundaries() {
		let rule = rule(1, &["café"], "/cafe/");
		assert_eq!(rewrite("cafés", [&rule]), "cafés");
		assert_eq!(
			rewrite("Le CAFÉ!", [&rule]),
			format!("Le {}!", anchor("/cafe/", "CAFÉ"))
		);
	}

	#[test]
	fn test_character_references_are_word_characters() {
		let cafe = rule(1, &["caf"], "/c/");
		assert_eq!(rewrite("Le caf&eacute; ouvert", [&cafe]), "Le caf&eacute; ouvert");
		assert_eq!(rewrite("Le caf&#233; ouvert", [&cafe]), "Le caf&#233; ouvert");
		assert_eq!(rewrite("Le caf&#xE9; ouvert", [&cafe]), "Le caf&#xE9; ouvert");

		let school = rule(2, &["cole"], "/cole/");
		assert_eq!(rewrite("l&eacute;cole", [&school]), "l&eacute;cole");
	}

	#[test]
	fn test_punctuation_references_are_boundaries() {
		let cafe = rule(1, &["caf"], "/c/");
		assert_eq!(
			rewrite("caf&amp;bar", [&cafe]),
			format!("{}&amp;bar", anchor("/c/", "caf"))
		);
		assert_eq!(
			rewrite("&quot;caf&quot;", [&cafe]),
			format!("&quot;{}&quot;", anchor("/c/", "caf"))
		);
		assert_eq!(
			rewrite("caf&unknown; x", [&cafe]),
			format!("{}&unknown; x", anchor("/c/", "caf"))
		);
	}

	#[test]
	fn test_retry_after_boundary_failure() {
		let rule = rule(1, &["aa"], "/aa/");
		assert_eq!(
			rewrite("aaa aa", [&rule]),
			format!("aaa {}", anchor("/aa/", "aa"))
		);
	}

	#[test]
	fn test_longer_keyword_wins_tie() {
		let short = rule(1, &["new york"], "/ny/");
		let long = rule(2, &["new york city"], "/nyc/");
		assert_eq!(
			rewrite("I love new york city.", [&short, &long]),
			format!("I love {}.", anchor("/nyc/", "new york city"))
		);
	}

	#[test]
	fn test_catalog_order_breaks_equal_length_tie() {
		let first = rule(1, &["apple"], "/first/");
		let second = rule(2, &["apple"], "/second/");
		assert_eq!(
			rewrite("apple", [&first, &second]),
			anchor("/first/", "apple")
		);
		assert_eq!(
			rewrite("apple", [&second, &first]),
			anchor("/second/", "apple")
		);
	}

	#[test]
	fn test_priority_beats_length() {
		let long = rule(1, &["new york city"], "/nyc/");
		let mut urgent = rule(2, &["york"], "/york/");
		urgent.priority = 10;
		assert_eq!(
			rewrite("new york city", [&long, &urgent]),
			format!("new {} city", anchor("/york/", "york"))
		);
	}

	#[test]
	fn test_existing_links_are_not_relinked() {
		let rules = vec![rule(1, &["shop"], "/shop/")];
		let html = r#"<a href="/x">shop</a> and <img alt="shop">"#;
		assert_eq!(rewrite(html, &rules), html);
	}

	#[test]
	fn test_no_nested_or_overlapping_anchors() {
		let mut a = rule(1, &["big red", "red"], "/a/");
		a.num = -1;
		let mut b = rule(2, &["red ball", "ball"], "/b/");
		b.num = -1;
		let source = "big red ball, red ball, ball";
		let html = rewrite(source, [&a, &b]);
		let detailed = Rewriter::default().rewrite_detailed(source, [&a, &b]);
		assert_eq!(html, detailed.html);

		let mut last_end = 0;
		for link in &detailed.links {
			assert!(link.range.start >= last_end);
			last_end = link.range.end;
		}
		assert_eq!(count_anchors(&html), html.matches("</a>").count());
		assert_eq!(count_anchors(&html), detailed.links.len());
	}

	#[test]
	fn test_empty_keywords_contribute_nothing() {
		let empty = rule(1, &[], "/x/");
		let blank = rule(2, &[""], "/y/");
		assert_eq!(rewrite("anything", [&empty, &blank]), "anything");
	}

	#[test]
	fn test_inactive_rules_are_skipped() {
		let mut inactive = rule(1, &["shop"], "/shop/");
		inactive.active = false;
		assert_eq!(rewrite("shop", [&inactive]), "shop");
	}

	#[test]
	fn test_anchor_attributes() {
		let rule = LinkRule {
			id: 7,
			title: "Our shop".to_string(),
			keywords: vec!["shop".to_string()],
			destination: Destination::Url("/shop/?a=1&b=2".to_string()),
			target: Target::NewTab,
			nofollow: true,
			..Default::default()
		};
		assert_eq!(
			rewrite("shop", [&rule]),
			r#"<a href="/shop/?a=1&amp;b=2" target="_blank" rel="nofollow" title="Our shop">shop</a>"#
		);
	}

	#[test]
	fn test_page_destinations() {
		let rule = LinkRule {
			id: 1,
			keywords: vec!["about".to_string()],
			destination: Destination::Page(42),
			notitle: true,
			..Default::default()
		};

		assert_eq!(rewrite("about us", [&rule]), "about us");

		let pages: BTreeMap<PageId, String> = BTreeMap::from([(42, "/about/".to_string())]);
		let rewriter = Rewriter::new(&pages);
		assert_eq!(
			rewriter.rewrite("about us", [&rule]),
			format!("{} us", anchor("/about/", "about"))
		);
	}

	#[test]
	fn test_exclusions() {
		let rules = vec![rule(1, &["shop"], "/shop/")];
		let rewriter = Rewriter::default().with_exclusions(&["nav"]);
		assert_eq!(
			rewriter.rewrite("<nav>shop</nav><p>shop</p>", &rules),
			format!("<nav>shop</nav><p>{}</p>", anchor("/shop/", "shop"))
		);
	}

	#[test]
	fn test_matches_do_not_span_markup() {
		let rules = vec![rule(1, &["big shop"], "/shop/")];
		assert_eq!(rewrite("big <b>shop</b>", &rules), "big <b>shop</b>");
		assert_eq!(rewrite("big&nbsp;shop", &rules), "big&nbsp;shop");
	}

	#[test]
	fn test_unclosed_markup_is_left_alone() {
		let rules = vec![rule(1, &["shop"], "/shop/")];
		assert_eq!(
			rewrite(r#"<p>text</p><div title="shop"#, &rules),
			r#"<p>text</p><div title="shop"#
		);
	}

	#[test]
	fn test_placed_links_report_source_ranges() {
		let rules = vec![rule(9, &["shop"], "/shop/")];
		let result = Rewriter::default().rewrite_detailed("<p>a shop</p>", &rules);
		assert_eq!(
			result.links,
			vec![PlacedLink {
				rule_id: 9,
				range: 5..9,
				href: "/shop/".to_string(),
			}]
		);
	}
}

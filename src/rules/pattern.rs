//! Glob-style URL patterns.
//!
//! `*` matches within a single path segment, `**` matches across segments.
//! Patterns and candidates are both normalized (ASCII lower-case, exactly one
//! trailing slash) and the compiled pattern must cover the whole candidate.

use regex::Regex;
use tracing::warn;
use url::Url;

/// A compiled wildcard URL pattern.
///
/// A malformed pattern compiles to a matcher that never matches.
#[derive(Debug, Clone)]
pub struct UrlPattern {
	source: String,
	regex: Option<Regex>,
}

impl UrlPattern {
	/// Compile a pattern. Malformed patterns are logged and never match.
	pub fn compile(pattern: &str) -> Self {
		let regex = match compile_regex(pattern) {
			Ok(regex) => Some(regex),
			Err(reason) => {
				warn!(pattern, reason, "ignoring malformed url pattern");
				None
			}
		};
		UrlPattern {
			source: pattern.to_string(),
			regex,
		}
	}

	/// Test the pattern against a candidate URL path.
	pub fn matches(&self, candidate: &str) -> bool {
		match self.regex {
			Some(ref regex) => regex.is_match(&normalize(candidate)),
			None => false,
		}
	}

	/// Whether the pattern compiled.
	pub fn is_valid(&self) -> bool {
		self.regex.is_some()
	}

	/// The pattern as written.
	pub fn as_str(&self) -> &str {
		&self.source
	}
}

/// Test `pattern` against `candidate` in one go.
pub fn matches(pattern: &str, candidate: &str) -> bool {
	UrlPattern::compile(pattern).matches(candidate)
}

/// Lower-case a URL path and make it end in exactly one slash.
pub fn normalize(url: &str) -> String {
	let mut normalized = url
		.trim_end_matches(['/', '\\'])
		.to_ascii_lowercase();
	normalized.push('/');
	normalized
}

/// Host that relative references are resolved against when none is known.
const RELATIVE_BASE: &str = "http://localhost/";

/// Parse `url`, resolving relative references against `base`.
///
/// Returns `None` for empty input, unparsable URLs and URLs that name no
/// path, e.g. a bare `https://example.com`. Paths come back percent-encoded.
pub fn parse_location(url: &str, base: &str) -> Option<Url> {
	let url = url.trim();
	let location = url.split(['?', '#']).next().unwrap_or_default();
	if location.is_empty() {
		return None;
	}

	let parsed = match Url::parse(url) {
		Ok(parsed) => parsed,
		Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(base).ok()?.join(url).ok()?,
		Err(_) => return None,
	};
	// `https://example.com` and `https://example.com/` parse alike.
	if parsed.path() == "/" && !location.ends_with(['/', '\\']) {
		return None;
	}
	Some(parsed)
}

/// Reduce a URL to its percent-encoded `path[?query]` part.
///
/// Full URLs lose their scheme and authority. Returns `None` when nothing
/// path-like remains, e.g. for a bare `https://example.com`.
pub fn url_path(url: &str) -> Option<String> {
	let parsed = parse_location(url, RELATIVE_BASE)?;
	Some(match parsed.query() {
		Some(query) => format!("{}?{query}", parsed.path()),
		None => parsed.path().to_string(),
	})
}

fn compile_regex(pattern: &str) -> Result<Regex, &'static str> {
	if pattern.trim().is_empty() {
		return Err("empty pattern");
	}
	if pattern.contains("***") {
		return Err("unbalanced wildcard");
	}

	let normalized = normalize(pattern.trim());
	let mut regex = String::with_capacity(normalized.len() * 2 + 2);
	regex.push('^');
	let mut chars = normalized.chars().peekable();
	while let Some(c) = chars.next() {
		if c == '*' {
			if chars.peek() == Some(&'*') {
				chars.next();
				regex.push_str(".*");
			} else {
				regex.push_str("[^/]*");
			}
		} else {
			let mut buf = [0u8; 4];
			regex.push_str(&regex::escape(c.encode_utf8(&mut buf)));
		}
	}
	regex.push('$');

	Regex::new(&regex).map_err(|_| "pattern does not compile")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_normalize() {
		assert_eq!(normalize("/Blog/Post"), "/blog/post/");
		assert_eq!(normalize("/blog/post/"), "/blog/post/");
		assert_eq!(normalize("/blog/post//"), "/blog/post/");
		assert_eq!(normalize(""), "/");
	}

	#[test]
	fn test_literal_pattern() {
		assert!(matches("/about", "/about/"));
		assert!(matches("/About/", "/about"));
		assert!(!matches("/about", "/about/team"));
		assert!(!matches("/about", "/x/about"));
	}

	#[test]
	fn test_single_segment_wildcard() {
		assert!(matches("/blog/*/comments", "/blog/123/comments"));
		assert!(!matches("/blog/*/comments", "/blog/123/456/comments"));
		assert!(matches("/blog/*", "/blog/hello-world"));
		assert!(!matches("/blog/*", "/blog/2024/hello-world"));
	}

	#[test]
	fn test_multi_segment_wildcard() {
		assert!(matches("/blog/**", "/blog/123/456/comments"));
		assert!(matches("/blog/**", "/blog/123"));
		assert!(matches("/**/comments", "/blog/123/456/comments"));
		assert!(!matches("/blog/**", "/shop/123"));
	}

	#[test]
	fn test_metacharacters_are_literal() {
		assert!(matches("/page?id=1", "/page?id=1"));
		assert!(!matches("/page?id=1", "/pag?id=1"));
		assert!(matches("/a.b", "/a.b"));
		assert!(!matches("/a.b", "/axb"));
		assert!(matches("/(draft)", "/(draft)"));
	}

	#[test]
	fn test_malformed_patterns_fail_closed() {
		let pattern = UrlPattern::compile("/blog/***");
		assert!(!pattern.is_valid());
		assert!(!pattern.matches("/blog/anything"));

		assert!(!matches("", "/"));
		assert!(!matches("   ", "/"));
	}

	#[test]
	fn test_deterministic() {
		let pattern = UrlPattern::compile("/shop/*");
		let first = pattern.matches("/shop/shoes");
		for _ in 0..10 {
			assert_eq!(pattern.matches("/shop/shoes"), first);
		}
	}

	#[test]
	fn test_url_path() {
		assert_eq!(url_path("/shop/*"), Some("/shop/*".to_string()));
		assert_eq!(
			url_path("https://example.com/shop/?a=1#top"),
			Some("/shop/?a=1".to_string())
		);
		assert_eq!(
			url_path("//example.com/blog/**"),
			Some("/blog/**".to_string())
		);
		assert_eq!(url_path("https://example.com"), None);
		assert_eq!(url_path("https://example.com?x=1"), None);
		assert_eq!(url_path("https://example.com/"), Some("/".to_string()));
		assert_eq!(url_path(""), None);
	}

	#[test]
	fn test_url_path_encodes_raw_and_full_urls_alike() {
		let from_full = url_path("https://example.com/café/my page/");
		let from_path = url_path("/café/my page/");
		assert_eq!(from_full, Some("/caf%C3%A9/my%20page/".to_string()));
		assert_eq!(from_full, from_path);
		assert_eq!(
			url_path("/caf%C3%A9/my%20page/"),
			Some("/caf%C3%A9/my%20page/".to_string())
		);
	}

	#[test]
	fn test_non_ascii_pattern_matches_encoded_candidate() {
		let pattern = url_path("https://example.com/café/*").unwrap();
		assert!(matches(&pattern, &url_path("/Café/menu").unwrap()));
		assert!(!matches(&pattern, &url_path("/cafe/menu").unwrap()));
	}
}

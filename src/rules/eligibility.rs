use crate::config::Settings;
use crate::rules::page::page_path;
use crate::rules::pattern::{UrlPattern, url_path};
use tracing::debug;

/// Page-level gate compiled from [`Settings`].
///
/// Decides whether rewriting runs at all for a page, before any rule is
/// considered.
#[derive(Debug, Clone, Default)]
pub struct Eligibility {
	/// Whitelist patterns; `None` when no whitelist is configured.
	whitelist: Option<Vec<UrlPattern>>,

	blacklist: Vec<UrlPattern>,

	posttypes: Vec<String>,
}

impl Eligibility {
	/// Compile the whitelist and blacklist of `settings`.
	///
	/// Entries may be full URLs; only their path and query are kept.
	/// Entries without a path are skipped.
	pub fn compile(settings: &Settings) -> Self {
		let compile_list = |entries: &[String]| -> Vec<UrlPattern> {
			entries
				.iter()
				.filter_map(|entry| url_path(entry))
				.map(|path| UrlPattern::compile(&path))
				.collect()
		};

		let has_whitelist = settings.whitelist.iter().any(|e| !e.trim().is_empty());
		Eligibility {
			whitelist: has_whitelist.then(|| compile_list(&settings.whitelist)),
			blacklist: compile_list(&settings.blacklist),
			posttypes: settings
				.posttypes
				.iter()
				.map(|t| t.trim().to_string())
				.filter(|t| !t.is_empty())
				.collect(),
		}
	}

	/// Whether a page known under `candidate_urls` with content type
	/// `post_type` should be rewritten.
	pub fn should_rewrite<S: AsRef<str>>(&self, candidate_urls: &[S], post_type: &str) -> bool {
		let candidates: Vec<String> = candidate_urls
			.iter()
			.filter_map(|url| page_path(url.as_ref()))
			.collect();
		let any_match = |patterns: &[UrlPattern]| {
			patterns
				.iter()
				.any(|pattern| candidates.iter().any(|url| pattern.matches(url)))
		};

		// A configured whitelist is exclusive.
		if let Some(ref whitelist) = self.whitelist
			&& !any_match(whitelist.as_slice())
		{
			debug!(?candidates, "page not in whitelist");
			return false;
		}

		if any_match(self.blacklist.as_slice()) {
			debug!(?candidates, "page is blacklisted");
			return false;
		}

		if !self.posttypes.is_empty() && !self.posttypes.iter().any(|t| t == post_type) {
			debug!(post_type, "post type not enabled");
			return false;
		}

		true
	}
}

/// Decide whether a page should be rewritten.
pub fn should_rewrite<S: AsRef<str>>(
	settings: &Settings,
	candidate_urls: &[S],
	post_type: &str,
) -> bool {
	Eligibility::compile(settings).should_rewrite(candidate_urls, post_type)
}

use crate::catalog::PageId;
use crate::rules::pattern::url_path;

/// Identity of the page being rendered.
///
/// A page may be reachable under several URLs; eligibility and self-link
/// checks try every one of them.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
	/// Canonical URL of the page.
	pub canonical_url: Option<String>,

	/// Permalink of the queried object.
	pub permalink: Option<String>,

	/// Raw request path, including any query string.
	pub request_path: Option<String>,

	/// Host name the page is served under.
	pub hostname: String,

	/// Content-type identifier (e.g. `post`, `page`).
	pub post_type: String,

	/// Stable identifier of the page, if it has one.
	pub page_id: Option<PageId>,
}

impl PageContext {
	/// All non-empty URL paths the page is known under.
	pub fn candidate_urls(&self) -> Vec<String> {
		let canonical = self.canonical_url.as_deref().and_then(page_path);
		let permalink = self.permalink.as_deref().and_then(page_path);
		let request = self.request_path.as_deref().and_then(page_path);

		let mut urls: Vec<String> = Vec::with_capacity(3);
		for url in [canonical, permalink, request].into_iter().flatten() {
			if !url.is_empty() && !urls.contains(&url) {
				urls.push(url);
			}
		}
		urls
	}
}

/// Path of a page URL. A bare host is the site root.
pub(crate) fn page_path(url: &str) -> Option<String> {
	if url.trim().is_empty() {
		return None;
	}
	url_path(url).or_else(|| Some("/".to_string()))
}

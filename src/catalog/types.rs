use crate::catalog::record::LinkRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a link rule in the catalog.
pub type LinkId = u64;

/// Identifier of a page known to the host site.
pub type PageId = u64;

/// Where an inserted anchor points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
	/// A page resolved to its URL at render time.
	Page(PageId),

	/// An explicit URL, used as-is.
	Url(String),
}

/// Browsing context the anchor opens in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
	#[default]
	#[serde(rename = "_self", alias = "same-tab")]
	SameTab,

	#[serde(rename = "_blank", alias = "new-tab")]
	NewTab,
}

impl Target {
	/// Value of the anchor's `target` attribute.
	pub fn as_str(&self) -> &'static str {
		match self {
			Target::SameTab => "_self",
			Target::NewTab => "_blank",
		}
	}
}

impl fmt::Display for Target {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Target {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim() {
			"_self" | "same-tab" | "" => Ok(Target::SameTab),
			"_blank" | "new-tab" => Ok(Target::NewTab),
			other => Err(other.to_string()),
		}
	}
}

/// One catalog entry: a set of keywords mapped to a destination.
///
/// Rules are immutable snapshots for the duration of a render pass. On the
/// wire they travel as flat [`LinkRecord`] rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LinkRecord", into = "LinkRecord")]
pub struct LinkRule {
	/// Stable unique identifier.
	pub id: LinkId,

	/// Internal label. Doubles as the anchor title unless overridden.
	pub title: String,

	/// Distinct phrases to match, in catalog order.
	pub keywords: Vec<String>,

	/// Where the anchor points.
	pub destination: Destination,

	/// Maximum insertions per render. Negative means unlimited.
	pub num: i32,

	/// Higher fires first when keywords overlap.
	pub priority: i32,

	pub target: Target,

	/// Adds `rel="nofollow"` to the anchor.
	pub nofollow: bool,

	/// Suppresses the anchor's title attribute.
	pub notitle: bool,

	/// Explicit anchor title text.
	pub titleattr: Option<String>,

	/// Allow matches inside larger words.
	pub partly_match: bool,

	pub case_sensitive: bool,

	/// Inactive rules never take part in rewriting.
	pub active: bool,
}

impl Default for LinkRule {
	fn default() -> Self {
		LinkRule {
			id: 0,
			title: String::new(),
			keywords: Vec::new(),
			destination: Destination::Url(String::new()),
			num: 1,
			priority: 0,
			target: Target::SameTab,
			nofollow: false,
			notitle: false,
			titleattr: None,
			partly_match: false,
			case_sensitive: false,
			active: true,
		}
	}
}

impl LinkRule {
	/// Number of insertions allowed per render, `None` when unlimited.
	pub fn quota(&self) -> Option<usize> {
		usize::try_from(self.num).ok()
	}

	/// Keywords that can actually match (non-empty).
	pub fn match_keywords(&self) -> impl Iterator<Item = &str> {
		self.keywords
			.iter()
			.map(String::as_str)
			.filter(|k| !k.is_empty())
	}

	/// Text for the anchor's title attribute, if one should be emitted.
	pub fn title_attribute(&self) -> Option<&str> {
		if self.notitle {
			return None;
		}
		match self.titleattr.as_deref() {
			Some(text) if !text.is_empty() => Some(text),
			_ => Some(self.title.as_str()),
		}
	}

	/// The page this rule links to, if it targets a page id.
	pub fn page_id(&self) -> Option<PageId> {
		match self.destination {
			Destination::Page(id) => Some(id),
			Destination::Url(_) => None,
		}
	}
}

use crate::catalog::types::{LinkId, LinkRule, PageId};
use crate::error::{InterlinkError, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// Filters for listing rules out of a store.
#[derive(Debug, Clone, Default)]
pub struct RuleQuery {
	/// Only return active rules.
	pub active_only: bool,

	/// Only return rules pointing at this page.
	pub page_id: Option<PageId>,

	/// Case-insensitive substring over title and keywords.
	pub search: Option<String>,
}

impl RuleQuery {
	/// The query used at render time.
	pub fn active() -> Self {
		RuleQuery {
			active_only: true,
			..Default::default()
		}
	}

	fn accepts(&self, rule: &LinkRule) -> bool {
		if self.active_only && !rule.active {
			return false;
		}
		if let Some(page_id) = self.page_id
			&& rule.page_id() != Some(page_id)
		{
			return false;
		}
		if let Some(ref needle) = self.search {
			let needle = needle.to_lowercase();
			let hit = rule.title.to_lowercase().contains(&needle)
				|| rule
					.keywords
					.iter()
					.any(|k| k.to_lowercase().contains(&needle));
			if !hit {
				return false;
			}
		}
		true
	}
}

/// Persistence for the link catalog.
pub trait RuleStore {
	/// Look up a rule by id.
	fn get(&self, id: LinkId) -> Option<&LinkRule>;

	/// Insert a rule under a freshly assigned id, ignoring `rule.id`.
	fn create(&mut self, rule: LinkRule) -> LinkId;

	/// Insert or replace the rule stored under `rule.id`.
	fn put(&mut self, rule: LinkRule);

	/// Delete a rule, returning it if it existed.
	fn remove(&mut self, id: LinkId) -> Option<LinkRule>;

	/// Rules matching `query`, highest priority first, then by id.
	fn list(&self, query: &RuleQuery) -> Vec<LinkRule>;
}

/// In-memory catalog backed by a JSON file.
///
/// The file format is the JSON export format: an array of link records.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
	rules: BTreeMap<LinkId, LinkRule>,
	next_id: LinkId,
}

impl Catalog {
	/// Build a catalog from rules. Rules with id 0 get a fresh id.
	pub fn from_rules(rules: impl IntoIterator<Item = LinkRule>) -> Self {
		let mut catalog = Catalog::default();
		let mut unassigned = Vec::new();
		for rule in rules {
			if rule.id == 0 {
				unassigned.push(rule);
			} else {
				catalog.put(rule);
			}
		}
		for rule in unassigned {
			catalog.create(rule);
		}
		catalog
	}

	/// Load a catalog file. A missing file yields an empty catalog.
	pub fn load(path: &Path) -> Result<Self> {
		let content = match std::fs::read(path) {
			Ok(content) => content,
			Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
				return Ok(Catalog::default());
			}
			Err(source) => {
				return Err(InterlinkError::CatalogReadError {
					path: path.to_path_buf(),
					source,
				});
			}
		};
		let content = content
			.strip_prefix(crate::transfer::UTF8_BOM)
			.unwrap_or(&content[..]);
		let rules: Vec<LinkRule> = serde_json::from_slice(content)?;
		Ok(Catalog::from_rules(rules))
	}

	/// Write the catalog to `path` as pretty-printed JSON.
	pub fn save(&self, path: &Path) -> Result<()> {
		let rules: Vec<&LinkRule> = self.rules.values().collect();
		let json = serde_json::to_string_pretty(&rules)?;
		std::fs::write(path, json).map_err(|source| InterlinkError::CatalogWriteError {
			path: path.to_path_buf(),
			source,
		})
	}

	/// All rules in catalog (id) order.
	pub fn rules(&self) -> impl Iterator<Item = &LinkRule> {
		self.rules.values()
	}

	pub fn len(&self) -> usize {
		self.rules.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rules.is_empty()
	}
}

impl RuleStore for Catalog {
	fn get(&self, id: LinkId) -> Option<&LinkRule> {
		self.rules.get(&id)
	}

	fn create(&mut self, mut rule: LinkRule) -> LinkId {
		let id = self.next_id.max(1);
		self.next_id = id + 1;
		rule.id = id;
		self.rules.insert(id, rule);
		id
	}

	fn put(&mut self, rule: LinkRule) {
		self.next_id = self.next_id.max(rule.id + 1);
		self.rules.insert(rule.id, rule);
	}

	fn remove(&mut self, id: LinkId) -> Option<LinkRule> {
		self.rules.remove(&id)
	}

	fn list(&self, query: &RuleQuery) -> Vec<LinkRule> {
		let mut rules: Vec<LinkRule> = self
			.rules
			.values()
			.filter(|rule| query.accepts(rule))
			.cloned()
			.collect();
		// BTreeMap iteration is already id-ordered; the sort is stable.
		rules.sort_by(|a, b| b.priority.cmp(&a.priority));
		rules
	}
}

use crate::catalog::PageId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Top-level configuration from a `.interlink.toml` file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
	/// If true, stop the directory cascade here and only add ~/.interlink.toml.
	#[serde(default)]
	pub root: bool,

	/// Path of the JSON link catalog, relative to this file.
	#[serde(default)]
	pub catalog: Option<PathBuf>,

	/// Path of the JSON-lines click log, relative to this file.
	#[serde(default)]
	pub click_log: Option<PathBuf>,

	/// Page eligibility and exclusion settings.
	#[serde(default)]
	pub settings: Settings,

	/// Page id to URL mapping used to resolve page destinations.
	/// TOML keys are strings, so ids are validated after parsing.
	#[serde(default)]
	pub pages: BTreeMap<String, String>,
}

/// Process-wide rewriting settings.
///
/// Read once per render pass and treated as immutable input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Settings {
	/// URL patterns of the only pages that may be rewritten. Optional.
	pub whitelist: Vec<String>,

	/// URL patterns of pages that must never be rewritten.
	pub blacklist: Vec<String>,

	/// Content types to rewrite. Empty means all.
	pub posttypes: Vec<String>,

	/// HTML selectors of regions that must never be rewritten.
	pub exclude: Vec<String>,

	/// Turn off click tracking entirely.
	pub disable_statistics: bool,

	/// Don't track clicks made by logged-in users.
	pub disable_admin_tracking: bool,
}

impl Settings {
	/// Trim every entry and drop blank ones.
	pub fn normalized(mut self) -> Self {
		for list in [
			&mut self.whitelist,
			&mut self.blacklist,
			&mut self.posttypes,
			&mut self.exclude,
		] {
			*list = list
				.iter()
				.map(|entry| entry.trim().to_string())
				.filter(|entry| !entry.is_empty())
				.collect();
		}
		self
	}
}

/// A loaded configuration with its source path for debugging/display.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
	/// The parsed configuration.
	pub config: Config,

	/// The path this config was loaded from.
	pub path: PathBuf,
}

impl LoadedConfig {
	/// Resolve a path from this config relative to the file's directory.
	pub fn resolve(&self, path: &std::path::Path) -> PathBuf {
		match self.path.parent() {
			Some(dir) if path.is_relative() => dir.join(path),
			_ => path.to_path_buf(),
		}
	}
}

/// Merged configuration from multiple config files in the cascade.
#[derive(Debug, Clone, Default)]
pub struct MergedConfig {
	/// Settings from all configs; lists in cascade order, flags OR'd.
	pub settings: Settings,

	/// Catalog path from the most specific config defining one.
	pub catalog: Option<PathBuf>,

	/// Click log path from the most specific config defining one.
	pub click_log: Option<PathBuf>,

	/// Page URLs; the most specific config wins per id.
	pub pages: BTreeMap<PageId, String>,

	/// Config files that contributed, most specific first.
	pub sources: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::path::Path;

	#[test]
	fn test_settings_normalized() {
		let settings = Settings {
			whitelist: vec!["  /shop/*  ".to_string(), "".to_string()],
			exclude: vec!["nav".to_string(), "   ".to_string()],
			..Default::default()
		}
		.normalized();
		assert_eq!(settings.whitelist, vec!["/shop/*"]);
		assert_eq!(settings.exclude, vec!["nav"]);
	}

	#[test]
	fn test_resolve_relative_to_config_file() {
		let loaded = LoadedConfig {
			config: Config::default(),
			path: PathBuf::from("/site/.interlink.toml"),
		};
		assert_eq!(
			loaded.resolve(Path::new("links.json")),
			PathBuf::from("/site/links.json")
		);
		assert_eq!(
			loaded.resolve(Path::new("/data/links.json")),
			PathBuf::from("/data/links.json")
		);
	}
}

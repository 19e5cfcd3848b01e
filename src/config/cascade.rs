use crate::config::parser::{CONFIG_FILE_NAME, parse_config_file};
use crate::config::types::{LoadedConfig, MergedConfig};
use crate::error::{InterlinkError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Discover and load all config files in the cascade.
///
/// The cascade order is:
/// 1. Start from `start_dir` and look for `.interlink.toml`
/// 2. If found and `root = true`, stop walking up
/// 3. Otherwise, continue up the directory tree
/// 4. Finally, check ~/.interlink.toml
///
/// Returns configs in cascade order (most specific first).
pub fn discover_configs(start_dir: &Path) -> Result<Vec<LoadedConfig>> {
	let mut configs = Vec::new();
	let mut current_dir = start_dir.to_path_buf();

	// Walk up the directory tree
	loop {
		let config_path = current_dir.join(CONFIG_FILE_NAME);

		if config_path.exists() {
			let config = parse_config_file(&config_path)?;
			debug!(path = %config_path.display(), "loaded config");
			let is_root = config.root;

			configs.push(LoadedConfig {
				config,
				path: config_path,
			});

			if is_root {
				break;
			}
		}

		// Move to parent directory
		if let Some(parent) = current_dir.parent() {
			current_dir = parent.to_path_buf();
		} else {
			break;
		}
	}

	if let Some(user_config) = load_user_config(&configs)? {
		configs.push(user_config);
	}

	Ok(configs)
}

/// Load ~/.interlink.toml if it exists and wasn't already found by the walk.
fn load_user_config(existing_configs: &[LoadedConfig]) -> Result<Option<LoadedConfig>> {
	let user_config_path = user_config_path()?;

	if existing_configs.iter().any(|c| c.path == user_config_path) {
		return Ok(None);
	}

	if user_config_path.exists() {
		let config = parse_config_file(&user_config_path)?;
		Ok(Some(LoadedConfig {
			config,
			path: user_config_path,
		}))
	} else {
		Ok(None)
	}
}

/// Merge multiple configs into a single effective config.
///
/// Settings lists are concatenated in cascade order and flags are OR'd.
/// File paths and page URLs come from the most specific config that sets them.
pub fn merge_configs(configs: &[LoadedConfig]) -> MergedConfig {
	let mut merged = MergedConfig::default();

	for loaded in configs {
		let settings = &loaded.config.settings;
		merged.settings.whitelist.extend(settings.whitelist.iter().cloned());
		merged.settings.blacklist.extend(settings.blacklist.iter().cloned());
		merged.settings.posttypes.extend(settings.posttypes.iter().cloned());
		merged.settings.exclude.extend(settings.exclude.iter().cloned());
		merged.settings.disable_statistics |= settings.disable_statistics;
		merged.settings.disable_admin_tracking |= settings.disable_admin_tracking;

		if merged.catalog.is_none()
			&& let Some(ref catalog) = loaded.config.catalog
		{
			merged.catalog = Some(loaded.resolve(catalog));
		}
		if merged.click_log.is_none()
			&& let Some(ref click_log) = loaded.config.click_log
		{
			merged.click_log = Some(loaded.resolve(click_log));
		}

		for (key, url) in &loaded.config.pages {
			// Keys were validated when the file was parsed.
			if let Ok(page_id) = key.trim().parse() {
				merged.pages.entry(page_id).or_insert_with(|| url.clone());
			}
		}

		merged.sources.push(loaded.path.clone());
	}

	merged
}

/// Convenience function to discover, load, and merge configs from a directory.
pub fn load_merged_config(start_dir: &Path) -> Result<MergedConfig> {
	let configs = discover_configs(start_dir)?;
	Ok(merge_configs(&configs))
}

/// Load a single explicit config file, bypassing discovery.
pub fn load_config_file(path: &Path) -> Result<MergedConfig> {
	let config = parse_config_file(path)?;
	Ok(merge_configs(&[LoadedConfig {
		config,
		path: path.to_path_buf(),
	}]))
}

/// Get the path to the user's config file.
pub fn user_config_path() -> Result<PathBuf> {
	let home_dir = dirs::home_dir().ok_or(InterlinkError::HomeDirectoryNotFound)?;
	Ok(home_dir.join(CONFIG_FILE_NAME))
}

use crate::config::types::Config;
use crate::error::{InterlinkError, Result};
use std::path::Path;

/// Name of the per-directory config file.
pub const CONFIG_FILE_NAME: &str = ".interlink.toml";

/// Parse a config file from the given path.
pub fn parse_config_file(path: &Path) -> Result<Config> {
	let content = std::fs::read_to_string(path).map_err(|source| {
		if source.kind() == std::io::ErrorKind::NotFound {
			InterlinkError::ConfigNotFound {
				path: path.to_path_buf(),
			}
		} else {
			InterlinkError::ConfigReadError {
				path: path.to_path_buf(),
				source,
			}
		}
	})?;

	parse_config_str(&content, path)
}

/// Parse a config from a string (useful for testing).
pub fn parse_config_str(content: &str, path: &Path) -> Result<Config> {
	let mut config: Config =
		toml::from_str(content).map_err(|source| InterlinkError::ConfigParseError {
			path: path.to_path_buf(),
			source,
		})?;

	// Page ids are TOML keys, so they arrive as strings.
	if let Some(key) = config.pages.keys().find(|k| k.trim().parse::<u64>().is_err()) {
		return Err(InterlinkError::InvalidPageId {
			path: path.to_path_buf(),
			key: key.clone(),
		});
	}

	config.settings = config.settings.normalized();
	Ok(config)
}

/// Template written by `interlink --init`.
pub fn generate_init_template() -> String {
	r#"# interlink configuration
#
# Files are discovered from the working directory upwards. `root = true`
# stops the walk; ~/.interlink.toml is always consulted last.
root = true

# JSON link catalog and click log, relative to this file.
catalog = "links.json"
click-log = "clicks.jsonl"

[settings]
# Only rewrite these pages (glob patterns, `*` = one segment, `**` = any).
whitelist = []
# Never rewrite these pages.
blacklist = []
# Content types to rewrite; empty means all.
posttypes = []
# HTML regions that never receive links.
exclude = ["nav", "header", "footer"]
disable-statistics = false
disable-admin-tracking = false

# Page id to URL mapping for rules that link to a page.
[pages]
# 42 = "https://example.com/about/"
"#
	.to_string()
}

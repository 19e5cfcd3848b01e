//! Configuration loading and parsing for interlink.
//!
//! This module handles:
//! - TOML config file parsing
//! - Directory cascade discovery
//! - Config merging into effective `Settings`

pub mod cascade;
pub mod parser;
pub mod types;

pub use cascade::{
	discover_configs, load_config_file, load_merged_config, merge_configs, user_config_path,
};
pub use parser::{CONFIG_FILE_NAME, generate_init_template, parse_config_file, parse_config_str};
pub use types::{Config, LoadedConfig, MergedConfig, Settings};

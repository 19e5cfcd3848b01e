use std::path::PathBuf;

/// Library-level structured errors for interlink.
///
/// Use `thiserror` for structured errors that library consumers can match on.
/// The CLI binary wraps these with `anyhow` for rich context chains.
#[derive(Debug, thiserror::Error)]
pub enum InterlinkError {
	#[error("Config file not found: {path}")]
	ConfigNotFound { path: PathBuf },

	#[error("Failed to read config file: {path}")]
	ConfigReadError {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to parse config file: {path}")]
	ConfigParseError {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("Invalid page id in [pages] table of {path}: {key}")]
	InvalidPageId { path: PathBuf, key: String },

	#[error("Failed to read link catalog: {path}")]
	CatalogReadError {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to write link catalog: {path}")]
	CatalogWriteError {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Invalid JSON link data: {0}")]
	Json(#[from] serde_json::Error),

	#[error("Invalid CSV link data: {0}")]
	Csv(#[from] csv::Error),

	#[error("Import file is not valid UTF-8")]
	InvalidEncoding,

	#[error("Unknown column: {column}")]
	UnknownColumn { column: String },

	#[error("Import header has no `id` column")]
	MissingIdColumn,

	#[error("Invalid value for `{field}`: {value}")]
	InvalidField { field: String, value: String },

	#[error("Failed to write click log: {path}")]
	ClickLogError {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to resolve home directory")]
	HomeDirectoryNotFound,
}

/// Result type alias using InterlinkError.
pub type Result<T> = std::result::Result<T, InterlinkError>;

//! Click tracking.
//!
//! Clicks on inserted links are recorded as [`ClickEvent`]s through a
//! [`ClickSink`]. Recording is best effort: [`track_click`] logs failures
//! and carries on, so a broken sink never affects page rendering.

pub mod stats;

pub use stats::{DailyCount, LinkClicks, STATS_WINDOW_DAYS, daily_counts, top_links};

use crate::catalog::LinkId;
use crate::config::Settings;
use crate::error::{InterlinkError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One click on an inserted link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickEvent {
	pub link_id: LinkId,
	pub title: String,
	pub source_url: String,
	pub destination_url: String,
	pub created_at: DateTime<Utc>,
}

impl ClickEvent {
	/// A click happening now.
	pub fn new(
		link_id: LinkId,
		title: impl Into<String>,
		source_url: impl Into<String>,
		destination_url: impl Into<String>,
	) -> Self {
		ClickEvent {
			link_id,
			title: title.into().trim().to_string(),
			source_url: source_url.into().trim().to_string(),
			destination_url: destination_url.into().trim().to_string(),
			created_at: Utc::now(),
		}
	}
}

/// Destination for click events.
pub trait ClickSink {
	fn record(&self, event: &ClickEvent) -> Result<()>;
}

/// Append-only click log, one JSON object per line.
#[derive(Debug, Clone)]
pub struct ClickLog {
	path: PathBuf,
}

impl ClickLog {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		ClickLog { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Read every recorded event. A missing log is empty; unreadable lines
	/// are skipped.
	pub fn load(&self) -> Result<Vec<ClickEvent>> {
		let content = match std::fs::read_to_string(&self.path) {
			Ok(content) => content,
			Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
				return Ok(Vec::new());
			}
			Err(source) => {
				return Err(InterlinkError::ClickLogError {
					path: self.path.clone(),
					source,
				});
			}
		};

		let mut events = Vec::new();
		for (index, line) in content.lines().enumerate() {
			if line.trim().is_empty() {
				continue;
			}
			match serde_json::from_str(line) {
				Ok(event) => events.push(event),
				Err(e) => warn!(
					path = %self.path.display(),
					line = index + 1,
					error = %e,
					"skipping malformed click record"
				),
			}
		}
		Ok(events)
	}
}

impl ClickSink for ClickLog {
	fn record(&self, event: &ClickEvent) -> Result<()> {
		let mut line = serde_json::to_string(event)?;
		line.push('\n');

		let io_error = |source| InterlinkError::ClickLogError {
			path: self.path.clone(),
			source,
		};
		let mut file = OpenOptions::new()
			.create(true)
			.append(true)
			.open(&self.path)
			.map_err(io_error)?;
		file.write_all(line.as_bytes()).map_err(io_error)
	}
}

/// Record a click, swallowing failures. Returns whether the event was stored.
///
/// Events without a link id are dropped.
pub fn track_click(sink: &dyn ClickSink, event: &ClickEvent) -> bool {
	if event.link_id == 0 {
		debug!("ignoring click without link id");
		return false;
	}
	match sink.record(event) {
		Ok(()) => true,
		Err(e) => {
			warn!(link_id = event.link_id, error = %e, "failed to record click");
			false
		}
	}
}

/// Whether clicks should be tracked for the current visitor.
pub fn tracking_enabled(settings: &Settings, is_logged_in: bool) -> bool {
	!(settings.disable_statistics || (is_logged_in && settings.disable_admin_tracking))
}

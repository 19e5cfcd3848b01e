//! Bulk import and export of the link catalog.
//!
//! Both formats carry [`LinkRecord`] rows. Imports never abort on a bad row:
//! each data row gets a [`RowOutcome`] in the returned [`ImportReport`]. Only
//! problems with the document as a whole (unreadable header, unknown
//! columns, malformed JSON) fail the import.

pub mod delimited;
pub mod json;

pub use delimited::{DEFAULT_SEPARATOR, detect_separator, export_csv, import_csv};
pub use json::{export_json, import_json};

use crate::catalog::{LinkId, LinkRecord, RuleStore};
use crate::error::Result;
use std::fmt;
use std::str::FromStr;

/// Byte order mark some spreadsheet tools prepend to UTF-8 files.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub(crate) fn strip_bom(data: &[u8]) -> &[u8] {
	data.strip_prefix(UTF8_BOM).unwrap_or(data)
}

/// How imported rows are reconciled with existing rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImportMode {
	/// Insert every row under a new id.
	#[default]
	Add,

	/// Insert rows whose id is not in the catalog, keeping that id. Rows
	/// matching an existing rule are skipped.
	AddMissing,

	/// Like `AddMissing`, but rows matching an existing rule overwrite the
	/// columns they carry.
	AddMissingAndUpdate,
}

impl ImportMode {
	pub fn as_str(&self) -> &'static str {
		match self {
			ImportMode::Add => "add",
			ImportMode::AddMissing => "add-missing",
			ImportMode::AddMissingAndUpdate => "add-missing-and-update",
		}
	}
}

impl fmt::Display for ImportMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for ImportMode {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
			"add" => Ok(ImportMode::Add),
			"add-missing" => Ok(ImportMode::AddMissing),
			"add-missing-and-update" | "update" => Ok(ImportMode::AddMissingAndUpdate),
			other => Err(format!(
				"unknown import mode `{other}` (expected add, add-missing or add-missing-and-update)"
			)),
		}
	}
}

/// What happened to one imported row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowStatus {
	Inserted(LinkId),
	Updated(LinkId),
	/// Already present and left untouched.
	Skipped(LinkId),
	Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowOutcome {
	/// Line number in a CSV file, entry number (from 1) in a JSON array.
	pub line: usize,
	pub status: RowStatus,
}

/// Per-row results of an import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
	pub rows: Vec<RowOutcome>,
}

impl ImportReport {
	fn push(&mut self, line: usize, status: RowStatus) {
		self.rows.push(RowOutcome { line, status });
	}

	fn count(&self, pred: impl Fn(&RowStatus) -> bool) -> usize {
		self.rows.iter().filter(|row| pred(&row.status)).count()
	}

	pub fn inserted(&self) -> usize {
		self.count(|s| matches!(s, RowStatus::Inserted(_)))
	}

	pub fn updated(&self) -> usize {
		self.count(|s| matches!(s, RowStatus::Updated(_)))
	}

	pub fn skipped(&self) -> usize {
		self.count(|s| matches!(s, RowStatus::Skipped(_)))
	}

	pub fn failed(&self) -> usize {
		self.count(|s| matches!(s, RowStatus::Failed(_)))
	}

	/// Rows that did not fail.
	pub fn succeeded(&self) -> usize {
		self.rows.len() - self.failed()
	}

	/// Failed rows with their messages.
	pub fn errors(&self) -> impl Iterator<Item = (usize, &str)> {
		self.rows.iter().filter_map(|row| match row.status {
			RowStatus::Failed(ref message) => Some((row.line, message.as_str())),
			_ => None,
		})
	}
}

/// Reconcile one row with the store.
///
/// `fill` receives the record to start from (the existing rule when
/// updating, defaults otherwise) and applies the row's values to it.
pub(crate) fn import_record<S, F>(
	store: &mut S,
	mode: ImportMode,
	id: LinkId,
	fill: F,
) -> Result<RowStatus>
where
	S: RuleStore + ?Sized,
	F: FnOnce(LinkRecord) -> Result<LinkRecord>,
{
	if mode == ImportMode::Add {
		let record = fill(LinkRecord::default())?;
		return Ok(RowStatus::Inserted(store.create(record.into())));
	}

	if id != 0
		&& let Some(existing) = store.get(id)
	{
		if mode == ImportMode::AddMissing {
			return Ok(RowStatus::Skipped(id));
		}
		let mut record = fill(LinkRecord::from(existing.clone()))?;
		record.id = id;
		store.put(record.into());
		return Ok(RowStatus::Updated(id));
	}

	let mut record = fill(LinkRecord::default())?;
	if id == 0 {
		return Ok(RowStatus::Inserted(store.create(record.into())));
	}
	record.id = id;
	store.put(record.into());
	Ok(RowStatus::Inserted(id))
}

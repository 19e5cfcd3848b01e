//! JSON import and export: an array of objects, one per rule.

use crate::catalog::record::parse_id;
use crate::catalog::{COLUMNS, LinkId, LinkRecord, LinkRule, RuleStore};
use crate::error::{InterlinkError, Result};
use crate::transfer::{ImportMode, ImportReport, RowStatus, import_record, strip_bom};
use serde_json::{Map, Value};
use tracing::debug;

/// Import a JSON array of link objects into `store`.
///
/// Keys missing from an object keep their default (or, when updating, their
/// current) value. Unknown keys fail that entry.
pub fn import_json<S: RuleStore + ?Sized>(
	data: &[u8],
	mode: ImportMode,
	store: &mut S,
) -> Result<ImportReport> {
	let data = strip_bom(data);
	if data.trim_ascii().is_empty() {
		return Ok(ImportReport::default());
	}
	let entries: Vec<Value> = serde_json::from_slice(data)?;

	let mut report = ImportReport::default();
	for (index, entry) in entries.into_iter().enumerate() {
		let status = import_entry(entry, mode, store)
			.unwrap_or_else(|e| RowStatus::Failed(e.to_string()));
		report.push(index + 1, status);
	}

	debug!(
		mode = %mode,
		rows = report.rows.len(),
		failed = report.failed(),
		"imported json"
	);
	Ok(report)
}

fn import_entry<S: RuleStore + ?Sized>(
	entry: Value,
	mode: ImportMode,
	store: &mut S,
) -> Result<RowStatus> {
	let fields = match entry {
		Value::Object(fields) => fields,
		other => {
			return Err(InterlinkError::InvalidField {
				field: "entry".to_string(),
				value: other.to_string(),
			});
		}
	};

	let id = match fields.get("id") {
		Some(value) => entry_id(value).ok_or_else(|| InterlinkError::InvalidField {
			field: "id".to_string(),
			value: value.to_string(),
		})?,
		None => 0,
	};

	import_record(store, mode, id, |base| {
		let base = serde_json::to_value(&base)?;
		overlay(base.clone(), fields.clone()).map_err(|e| culprit(&base, &fields).unwrap_or(e))
	})
}

fn overlay(mut base: Value, fields: Map<String, Value>) -> Result<LinkRecord> {
	if let Value::Object(ref mut object) = base {
		object.extend(fields);
	}
	Ok(serde_json::from_value(base)?)
}

/// The first key of `fields` that fails on its own.
fn culprit(base: &Value, fields: &Map<String, Value>) -> Option<InterlinkError> {
	fields.iter().find_map(|(key, value)| {
		if !COLUMNS.contains(&key.as_str()) {
			return Some(InterlinkError::UnknownColumn {
				column: key.clone(),
			});
		}
		let single = Map::from_iter([(key.clone(), value.clone())]);
		overlay(base.clone(), single)
			.err()
			.map(|_| InterlinkError::InvalidField {
				field: key.clone(),
				value: value.to_string(),
			})
	})
}

fn entry_id(value: &Value) -> Option<LinkId> {
	match value {
		Value::Null => Some(0),
		Value::Number(n) => n.as_u64(),
		Value::String(s) => parse_id(s),
		_ => None,
	}
}

/// Export rules as a pretty-printed JSON array.
pub fn export_json<'a>(rules: impl IntoIterator<Item = &'a LinkRule>) -> Result<String> {
	let rules: Vec<&LinkRule> = rules.into_iter().collect();
	Ok(serde_json::to_string_pretty(&rules)?)
}

//! CSV import and export.

use crate::catalog::record::{COLUMNS, is_column, parse_id};
use crate::catalog::{LinkId, LinkRecord, LinkRule, RuleStore};
use crate::error::{InterlinkError, Result};
use crate::transfer::{ImportMode, ImportReport, RowStatus, import_record, strip_bom};
use csv::{ByteRecord, ReaderBuilder, WriterBuilder};
use tracing::debug;

/// Separator used for exports unless told otherwise.
pub const DEFAULT_SEPARATOR: u8 = b';';

/// Pick the separator from the header line: `,` if it appears, else `;`.
pub fn detect_separator(data: &[u8]) -> u8 {
	let data = strip_bom(data);
	let header = data.split(|&b| b == b'\n').next().unwrap_or_default();
	if header.contains(&b',') { b',' } else { b';' }
}

/// Import CSV rows into `store`.
///
/// The first non-blank line is the header and decides which columns each
/// row carries; columns not present keep their default (or, when updating,
/// their current) value.
pub fn import_csv<S: RuleStore + ?Sized>(
	data: &[u8],
	mode: ImportMode,
	store: &mut S,
) -> Result<ImportReport> {
	let data = strip_bom(data);
	let separator = detect_separator(data);
	let mut reader = ReaderBuilder::new()
		.delimiter(separator)
		.has_headers(false)
		.flexible(true)
		.from_reader(data);
	let mut records = reader.byte_records();

	let header = loop {
		match records.next() {
			None => return Ok(ImportReport::default()),
			Some(record) => {
				let record = record?;
				if !is_blank(&record) {
					break record;
				}
			}
		}
	};

	let columns = header
		.iter()
		.map(|cell| {
			std::str::from_utf8(cell)
				.map(|name| name.trim().to_ascii_lowercase())
				.map_err(|_| InterlinkError::InvalidEncoding)
		})
		.collect::<Result<Vec<String>>>()?;
	if let Some(column) = columns.iter().find(|c| !is_column(c)) {
		return Err(InterlinkError::UnknownColumn {
			column: column.clone(),
		});
	}
	let id_index = columns.iter().position(|c| c == "id");
	if mode != ImportMode::Add && id_index.is_none() {
		return Err(InterlinkError::MissingIdColumn);
	}

	let mut report = ImportReport::default();
	for result in records {
		let record = match result {
			Ok(record) => record,
			Err(e) => {
				let line = e.position().map_or(0, |p| p.line() as usize);
				report.push(line, RowStatus::Failed(e.to_string()));
				continue;
			}
		};
		if is_blank(&record) {
			continue;
		}

		let line = record.position().map_or(0, |p| p.line() as usize);
		let status = import_row(&columns, id_index, &record, mode, store)
			.unwrap_or_else(|e| RowStatus::Failed(e.to_string()));
		report.push(line, status);
	}

	debug!(
		mode = %mode,
		rows = report.rows.len(),
		failed = report.failed(),
		"imported csv"
	);
	Ok(report)
}

fn import_row<S: RuleStore + ?Sized>(
	columns: &[String],
	id_index: Option<usize>,
	record: &ByteRecord,
	mode: ImportMode,
	store: &mut S,
) -> Result<RowStatus> {
	let cells = record
		.iter()
		.map(std::str::from_utf8)
		.collect::<std::result::Result<Vec<&str>, _>>()
		.map_err(|_| InterlinkError::InvalidEncoding)?;

	let id: LinkId = match id_index.and_then(|i| cells.get(i)) {
		Some(cell) => parse_id(cell).ok_or_else(|| InterlinkError::InvalidField {
			field: "id".to_string(),
			value: cell.to_string(),
		})?,
		None => 0,
	};

	import_record(store, mode, id, |mut base| {
		for (column, cell) in columns.iter().zip(&cells) {
			base.set(column, cell)?;
		}
		Ok(base)
	})
}

fn is_blank(record: &ByteRecord) -> bool {
	record.iter().all(|cell| cell.trim_ascii().is_empty())
}

/// Export rules as CSV with a header row of every column.
pub fn export_csv<'a>(
	rules: impl IntoIterator<Item = &'a LinkRule>,
	separator: u8,
) -> Result<String> {
	let mut writer = WriterBuilder::new()
		.delimiter(separator)
		.from_writer(Vec::new());

	writer.write_record(COLUMNS)?;
	for rule in rules {
		writer.write_record(LinkRecord::from(rule.clone()).cells())?;
	}

	let bytes = writer
		.into_inner()
		.map_err(|e| InterlinkError::Csv(e.into_error().into()))?;
	String::from_utf8(bytes).map_err(|_| InterlinkError::InvalidEncoding)
}

//! Flat storage row for link rules.
//!
//! A [`LinkRecord`] mirrors the catalog table one column per field. It is the
//! shape used by the JSON catalog file and by CSV/JSON import and export.
//! Deserialization is lenient so that exports of older catalogs, where every
//! value was a string and keywords were a comma separated list, still load.

use crate::catalog::types::{Destination, LinkId, LinkRule, PageId, Target};
use crate::error::{InterlinkError, Result};
use serde::{Deserialize, Serialize};

/// Column names in export order.
pub const COLUMNS: [&str; 14] = [
	"id",
	"page_id",
	"title",
	"keywords",
	"url",
	"num",
	"target",
	"nofollow",
	"notitle",
	"active",
	"partly_match",
	"case_sensitive",
	"titleattr",
	"priority",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkRecord {
	#[serde(default, deserialize_with = "lenient::id")]
	pub id: LinkId,

	#[serde(default, deserialize_with = "lenient::page_id")]
	pub page_id: Option<PageId>,

	#[serde(default, deserialize_with = "lenient::text")]
	pub title: String,

	#[serde(default, deserialize_with = "lenient::keywords")]
	pub keywords: Vec<String>,

	#[serde(default, deserialize_with = "lenient::text")]
	pub url: String,

	#[serde(default = "default_num", deserialize_with = "lenient::int")]
	pub num: i32,

	#[serde(default, deserialize_with = "lenient::target")]
	pub target: Target,

	#[serde(default, deserialize_with = "lenient::flag")]
	pub nofollow: bool,

	#[serde(default, deserialize_with = "lenient::flag")]
	pub notitle: bool,

	#[serde(default = "default_active", deserialize_with = "lenient::flag")]
	pub active: bool,

	#[serde(default, deserialize_with = "lenient::flag")]
	pub partly_match: bool,

	#[serde(default, deserialize_with = "lenient::flag")]
	pub case_sensitive: bool,

	#[serde(default, deserialize_with = "lenient::optional_text")]
	pub titleattr: Option<String>,

	#[serde(default, deserialize_with = "lenient::int")]
	pub priority: i32,
}

fn default_num() -> i32 {
	1
}

fn default_active() -> bool {
	true
}

impl Default for LinkRecord {
	fn default() -> Self {
		LinkRule::default().into()
	}
}

impl From<LinkRule> for LinkRecord {
	fn from(rule: LinkRule) -> Self {
		let (page_id, url) = match rule.destination {
			Destination::Page(id) => (Some(id), String::new()),
			Destination::Url(url) => (None, url),
		};
		LinkRecord {
			id: rule.id,
			page_id,
			title: rule.title,
			keywords: rule.keywords,
			url,
			num: rule.num,
			target: rule.target,
			nofollow: rule.nofollow,
			notitle: rule.notitle,
			active: rule.active,
			partly_match: rule.partly_match,
			case_sensitive: rule.case_sensitive,
			titleattr: rule.titleattr,
			priority: rule.priority,
		}
	}
}

impl From<LinkRecord> for LinkRule {
	fn from(record: LinkRecord) -> Self {
		let destination = match record.page_id {
			Some(id) if id > 0 => Destination::Page(id),
			_ => Destination::Url(record.url),
		};

		let mut keywords: Vec<String> = Vec::with_capacity(record.keywords.len());
		for keyword in record.keywords {
			let keyword = keyword.trim();
			if !keyword.is_empty() && !keywords.iter().any(|k| k == keyword) {
				keywords.push(keyword.to_string());
			}
		}

		LinkRule {
			id: record.id,
			title: record.title,
			keywords,
			destination,
			num: record.num,
			priority: record.priority,
			target: record.target,
			nofollow: record.nofollow,
			notitle: record.notitle,
			titleattr: record.titleattr.filter(|t| !t.is_empty()),
			partly_match: record.partly_match,
			case_sensitive: record.case_sensitive,
			active: record.active,
		}
	}
}

impl LinkRecord {
	/// Overwrite one column from its textual (CSV cell) form.
	pub fn set(&mut self, column: &str, value: &str) -> Result<()> {
		let invalid = || InterlinkError::InvalidField {
			field: column.to_string(),
			value: value.to_string(),
		};

		match column {
			"id" => self.id = parse_id(value).ok_or_else(invalid)?,
			"page_id" => self.page_id = parse_page_id(value).ok_or_else(invalid)?,
			"title" => self.title = value.trim().to_string(),
			"keywords" => self.keywords = parse_keywords(value).ok_or_else(invalid)?,
			"url" => self.url = value.trim().to_string(),
			"num" => self.num = value.trim().parse().map_err(|_| invalid())?,
			"target" => self.target = value.parse().map_err(|_| invalid())?,
			"nofollow" => self.nofollow = parse_flag(value).ok_or_else(invalid)?,
			"notitle" => self.notitle = parse_flag(value).ok_or_else(invalid)?,
			"active" => self.active = parse_flag(value).ok_or_else(invalid)?,
			"partly_match" => self.partly_match = parse_flag(value).ok_or_else(invalid)?,
			"case_sensitive" => self.case_sensitive = parse_flag(value).ok_or_else(invalid)?,
			"titleattr" => {
				let value = value.trim();
				self.titleattr = (!value.is_empty()).then(|| value.to_string());
			}
			"priority" => self.priority = value.trim().parse().map_err(|_| invalid())?,
			other => {
				return Err(InterlinkError::UnknownColumn {
					column: other.to_string(),
				});
			}
		}
		Ok(())
	}

	/// Cells in [`COLUMNS`] order.
	pub fn cells(&self) -> Vec<String> {
		let flag = |b: bool| if b { "1" } else { "0" }.to_string();
		vec![
			self.id.to_string(),
			self.page_id.map(|id| id.to_string()).unwrap_or_default(),
			self.title.clone(),
			serde_json::to_string(&self.keywords).unwrap_or_else(|_| "[]".to_string()),
			self.url.clone(),
			self.num.to_string(),
			self.target.to_string(),
			flag(self.nofollow),
			flag(self.notitle),
			flag(self.active),
			flag(self.partly_match),
			flag(self.case_sensitive),
			self.titleattr.clone().unwrap_or_default(),
			self.priority.to_string(),
		]
	}
}

/// Whether `column` names a record field.
pub fn is_column(column: &str) -> bool {
	COLUMNS.contains(&column)
}

pub(crate) fn parse_flag(value: &str) -> Option<bool> {
	match value.trim().to_ascii_lowercase().as_str() {
		"1" | "true" | "on" | "yes" => Some(true),
		"0" | "false" | "off" | "no" | "" => Some(false),
		_ => None,
	}
}

pub(crate) fn parse_id(value: &str) -> Option<LinkId> {
	let value = value.trim();
	if value.is_empty() {
		return Some(0);
	}
	value.parse().ok()
}

pub(crate) fn parse_page_id(value: &str) -> Option<Option<PageId>> {
	match parse_id(value)? {
		0 => Some(None),
		id => Some(Some(id)),
	}
}

/// Keywords are stored as a JSON array. Older catalogs used a comma
/// separated list, which is still accepted.
pub(crate) fn parse_keywords(value: &str) -> Option<Vec<String>> {
	let value = value.trim();
	if value.is_empty() {
		return Some(Vec::new());
	}
	if value.starts_with('[') {
		return serde_json::from_str(value).ok();
	}
	Some(value.split(',').map(|k| k.trim().to_string()).collect())
}

mod lenient {
	use super::{parse_flag, parse_id, parse_keywords, parse_page_id};
	use crate::catalog::types::{LinkId, PageId, Target};
	use serde::de::{Deserializer, Error};
	use serde::Deserialize;

	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Scalar {
		Bool(bool),
		Int(i64),
		Text(String),
	}

	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Keywords {
		List(Vec<String>),
		Text(String),
	}

	pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
		match Option::<Scalar>::deserialize(d)? {
			None => Ok(false),
			Some(Scalar::Bool(b)) => Ok(b),
			Some(Scalar::Int(i)) => Ok(i != 0),
			Some(Scalar::Text(s)) => {
				parse_flag(&s).ok_or_else(|| D::Error::custom(format!("invalid flag: {s}")))
			}
		}
	}

	pub fn int<'de, D: Deserializer<'de>>(d: D) -> Result<i32, D::Error> {
		match Scalar::deserialize(d)? {
			Scalar::Int(i) => i32::try_from(i).map_err(D::Error::custom),
			Scalar::Text(s) => s
				.trim()
				.parse()
				.map_err(|_| D::Error::custom(format!("invalid number: {s}"))),
			Scalar::Bool(b) => Err(D::Error::custom(format!("invalid number: {b}"))),
		}
	}

	pub fn id<'de, D: Deserializer<'de>>(d: D) -> Result<LinkId, D::Error> {
		match Option::<Scalar>::deserialize(d)? {
			None => Ok(0),
			Some(Scalar::Int(i)) => LinkId::try_from(i).map_err(D::Error::custom),
			Some(Scalar::Text(s)) => {
				parse_id(&s).ok_or_else(|| D::Error::custom(format!("invalid id: {s}")))
			}
			Some(Scalar::Bool(b)) => Err(D::Error::custom(format!("invalid id: {b}"))),
		}
	}

	pub fn page_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<PageId>, D::Error> {
		match Option::<Scalar>::deserialize(d)? {
			None | Some(Scalar::Int(0)) => Ok(None),
			Some(Scalar::Int(i)) => PageId::try_from(i).map(Some).map_err(D::Error::custom),
			Some(Scalar::Text(s)) => {
				parse_page_id(&s).ok_or_else(|| D::Error::custom(format!("invalid page id: {s}")))
			}
			Some(Scalar::Bool(b)) => Err(D::Error::custom(format!("invalid page id: {b}"))),
		}
	}

	pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
		Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
	}

	pub fn optional_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
		Ok(Option::<String>::deserialize(d)?.filter(|s| !s.is_empty()))
	}

	pub fn keywords<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
		match Option::<Keywords>::deserialize(d)? {
			None => Ok(Vec::new()),
			Some(Keywords::List(list)) => Ok(list),
			Some(Keywords::Text(s)) => {
				parse_keywords(&s).ok_or_else(|| D::Error::custom(format!("invalid keywords: {s}")))
			}
		}
	}

	pub fn target<'de, D: Deserializer<'de>>(d: D) -> Result<Target, D::Error> {
		match Option::<String>::deserialize(d)? {
			None => Ok(Target::default()),
			Some(s) => s
				.parse()
				.map_err(|v| D::Error::custom(format!("invalid target: {v}"))),
		}
	}
}

//! Exclusion selectors.
//!
//! A deliberately small selector dialect: comma separated lists of compound
//! selectors (`tag`, `*`, `#id`, `.class` and combinations such as
//! `div.note#intro`) joined by descendant combinators. Anything else is
//! rejected with a warning and excludes nothing.

use tracing::warn;

/// The parts of an element that selectors can match on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementInfo {
	/// Lower-cased tag name.
	pub tag: String,

	pub id: Option<String>,

	pub classes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
	/// `None` matches any tag.
	tag: Option<String>,
	id: Option<String>,
	classes: Vec<String>,
}

impl Compound {
	fn matches(&self, element: &ElementInfo) -> bool {
		if let Some(ref tag) = self.tag
			&& *tag != element.tag
		{
			return false;
		}
		if let Some(ref id) = self.id
			&& element.id.as_ref() != Some(id)
		{
			return false;
		}
		self.classes
			.iter()
			.all(|class| element.classes.iter().any(|c| c == class))
	}
}

/// A descendant chain; the last compound is the subject.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Selector {
	compounds: Vec<Compound>,
}

impl Selector {
	fn matches(&self, element: &ElementInfo, ancestors: &[ElementInfo]) -> bool {
		let Some((subject, rest)) = self.compounds.split_last() else {
			return false;
		};
		if !subject.matches(element) {
			return false;
		}

		// Greedy right-to-left match over the ancestor chain.
		let mut remaining = rest.iter().rev();
		let mut next = remaining.next();
		for ancestor in ancestors.iter().rev() {
			match next {
				Some(compound) if compound.matches(ancestor) => next = remaining.next(),
				Some(_) => {}
				None => break,
			}
		}
		next.is_none()
	}
}

/// Compiled set of exclusion selectors.
#[derive(Debug, Clone, Default)]
pub struct ExcludeSelectors {
	selectors: Vec<Selector>,
}

impl ExcludeSelectors {
	/// Parse selector strings. Unsupported selectors are logged and dropped.
	pub fn parse<S: AsRef<str>>(selectors: &[S]) -> Self {
		let mut parsed = Vec::new();
		for entry in selectors {
			for selector in entry.as_ref().split(',') {
				let selector = selector.trim();
				if selector.is_empty() {
					continue;
				}
				match parse_selector(selector) {
					Ok(s) => parsed.push(s),
					Err(reason) => warn!(selector, reason, "ignoring exclusion selector"),
				}
			}
		}
		ExcludeSelectors { selectors: parsed }
	}

	pub fn is_empty(&self) -> bool {
		self.selectors.is_empty()
	}

	/// Number of usable selectors.
	pub fn len(&self) -> usize {
		self.selectors.len()
	}

	/// Whether `element`, nested inside `ancestors` (outermost first), is
	/// excluded.
	pub fn matches(&self, element: &ElementInfo, ancestors: &[ElementInfo]) -> bool {
		self.selectors
			.iter()
			.any(|selector| selector.matches(element, ancestors))
	}
}

fn parse_selector(selector: &str) -> Result<Selector, &'static str> {
	if selector.contains(['>', '+', '~']) {
		return Err("only descendant combinators are supported");
	}
	let compounds = selector
		.split_whitespace()
		.map(parse_compound)
		.collect::<Result<Vec<_>, _>>()?;
	if compounds.is_empty() {
		return Err("empty selector");
	}
	Ok(Selector { compounds })
}

fn parse_compound(token: &str) -> Result<Compound, &'static str> {
	let mut compound = Compound::default();
	let mut rest = token;

	let tag_len = rest
		.find(|c: char| !is_ident_char(c) && c != '*')
		.unwrap_or(rest.len());
	let tag = &rest[..tag_len];
	match tag {
		"" | "*" => {}
		tag if tag.contains('*') => return Err("invalid universal selector"),
		tag => compound.tag = Some(tag.to_ascii_lowercase()),
	}
	rest = &rest[tag_len..];

	while let Some(sigil) = rest.chars().next() {
		let body = &rest[sigil.len_utf8()..];
		let len = body.find(|c: char| !is_ident_char(c)).unwrap_or(body.len());
		if len == 0 {
			return Err("empty id or class name");
		}
		let name = body[..len].to_string();
		match sigil {
			'#' if compound.id.is_none() => compound.id = Some(name),
			'#' => return Err("more than one id"),
			'.' => compound.classes.push(name),
			_ => return Err("unsupported selector syntax"),
		}
		rest = &body[len..];
	}

	Ok(compound)
}

fn is_ident_char(c: char) -> bool {
	c.is_alphanumeric() || c == '-' || c == '_'
}

//! Structural view of an HTML document.
//!
//! The segmenter is not an HTML parser. It knows just enough about tags to
//! tell linkable text apart from everything else: tags, comments, character
//! references, the inside of existing anchors and raw-text elements, and the
//! contents of excluded elements. Malformed markup (an unclosed tag or
//! comment) turns the rest of the document into markup.
//!
//! Segments keep byte ranges into the source instead of copying text out,
//! so the rewriter can splice anchors in and pass every markup byte through
//! unchanged.

use crate::rewrite::exclude::{ElementInfo, ExcludeSelectors};
use std::ops::Range;

/// What a segment of the document is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
	/// Tags, comments, entities, existing link text. Never scanned.
	Markup,

	/// Text eligible for linking.
	Text,

	/// Contents of an excluded element. Never scanned.
	Excluded,
}

/// A byte range of the document tagged with its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
	pub kind: SegmentKind,
	pub range: Range<usize>,
}

impl Segment {
	pub fn is_text(&self) -> bool {
		self.kind == SegmentKind::Text
	}
}

/// Elements whose contents are never text, whatever they contain.
const RAW_TEXT_ELEMENTS: [&str; 6] = ["script", "style", "textarea", "title", "xmp", "iframe"];

const VOID_ELEMENTS: [&str; 14] = [
	"area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
	"track", "wbr",
];

#[derive(Debug)]
struct OpenElement {
	info: ElementInfo,
	excluded: bool,
}

/// Split `html` into segments. The segments cover the whole input in order.
pub fn segment_html(html: &str, exclude: &ExcludeSelectors) -> Vec<Segment> {
	Segmenter {
		html,
		exclude,
		stack: Vec::new(),
		segments: Vec::new(),
	}
	.run()
}

struct Segmenter<'a> {
	html: &'a str,
	exclude: &'a ExcludeSelectors,
	stack: Vec<OpenElement>,
	segments: Vec<Segment>,
}

impl Segmenter<'_> {
	fn run(mut self) -> Vec<Segment> {
		let html = self.html;
		let bytes = html.as_bytes();
		let len = bytes.len();
		let mut text_start = 0;
		let mut pos = 0;

		while let Some(offset) = html[pos..].find('<') {
			let lt = pos + offset;
			let Some(tag) = classify_tag_start(&bytes[lt..]) else {
				// A bare `<` in text, e.g. "a < b".
				pos = lt + 1;
				continue;
			};

			self.push_text(text_start..lt);

			let Some(end) = self.tag_end(lt, tag) else {
				// Unclosed markup: leave everything from here untouched.
				self.push(SegmentKind::Markup, lt..len);
				return self.segments;
			};
			self.push(SegmentKind::Markup, lt..end);

			pos = end;
			if let TagStart::Open = tag {
				pos = match self.open_element(lt, end) {
					Some(next) => next,
					None => return self.segments,
				};
			} else if let TagStart::Close = tag {
				self.close_element(lt, end);
			}
			text_start = pos;
		}

		self.push_text(text_start..len);
		self.segments
	}

	/// End (exclusive) of the tag or comment starting at `lt`.
	fn tag_end(&self, lt: usize, tag: TagStart) -> Option<usize> {
		match tag {
			TagStart::Comment => self.html[lt + 4..].find("-->").map(|i| lt + 4 + i + 3),
			TagStart::Declaration => self.html[lt..].find('>').map(|i| lt + i + 1),
			TagStart::Open | TagStart::Close => find_tag_close(self.html, lt),
		}
	}

	/// Handle an opening tag spanning `lt..end`. Returns where scanning
	/// resumes, or `None` when the rest of the document was consumed.
	fn open_element(&mut self, lt: usize, end: usize) -> Option<usize> {
		let html = self.html;
		let (info, self_closing) = parse_open_tag(&html[lt + 1..end - 1]);

		if RAW_TEXT_ELEMENTS.contains(&info.tag.as_str()) {
			let Some(close) = find_closing_tag(html, end, &info.tag) else {
				self.push(SegmentKind::Markup, end..html.len());
				return None;
			};
			self.push(SegmentKind::Markup, end..close);
			return Some(close);
		}

		if self_closing || VOID_ELEMENTS.contains(&info.tag.as_str()) {
			return Some(end);
		}

		let ancestors: Vec<ElementInfo> = self.stack.iter().map(|e| e.info.clone()).collect();
		let excluded = !self.exclude.is_empty() && self.exclude.matches(&info, &ancestors);
		self.stack.push(OpenElement { info, excluded });
		Some(end)
	}

	fn close_element(&mut self, lt: usize, end: usize) {
		let name = tag_name(&self.html[lt + 2..end - 1]);
		if let Some(idx) = self.stack.iter().rposition(|e| e.info.tag == name) {
			self.stack.truncate(idx);
		}
	}

	/// Kind of character data at the current nesting level.
	fn text_kind(&self) -> SegmentKind {
		if self.stack.iter().any(|e| e.excluded) {
			SegmentKind::Excluded
		} else if self.stack.iter().any(|e| e.info.tag == "a") {
			SegmentKind::Markup
		} else {
			SegmentKind::Text
		}
	}

	/// Push character data, carving character references out as markup.
	fn push_text(&mut self, range: Range<usize>) {
		let kind = self.text_kind();
		if kind != SegmentKind::Text {
			self.push(kind, range);
			return;
		}

		let html = self.html;
		let mut start = range.start;
		let mut pos = range.start;
		while let Some(offset) = html[pos..range.end].find('&') {
			let amp = pos + offset;
			match char_ref_len(&html[amp..range.end]) {
				Some(ref_len) => {
					self.push(SegmentKind::Text, start..amp);
					self.push(SegmentKind::Markup, amp..amp + ref_len);
					start = amp + ref_len;
					pos = start;
				}
				None => pos = amp + 1,
			}
		}
		self.push(SegmentKind::Text, start..range.end);
	}

	fn push(&mut self, kind: SegmentKind, range: Range<usize>) {
		if range.is_empty() {
			return;
		}
		if let Some(last) = self.segments.last_mut()
			&& last.kind == kind
			&& last.range.end == range.start
		{
			last.range.end = range.end;
			return;
		}
		self.segments.push(Segment { kind, range });
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagStart {
	Open,
	Close,
	Comment,
	Declaration,
}

fn classify_tag_start(bytes: &[u8]) -> Option<TagStart> {
	match bytes.get(1)? {
		b'!' if bytes.starts_with(b"<!--") => Some(TagStart::Comment),
		b'!' | b'?' => Some(TagStart::Declaration),
		b'/' if bytes.get(2).is_some_and(u8::is_ascii_alphabetic) => Some(TagStart::Close),
		c if c.is_ascii_alphabetic() => Some(TagStart::Open),
		_ => None,
	}
}

/// Find the `>` closing a tag that starts at `lt`, skipping quoted
/// attribute values.
fn find_tag_close(html: &str, lt: usize) -> Option<usize> {
	let mut quote: Option<u8> = None;
	for (i, &b) in html.as_bytes()[lt + 1..].iter().enumerate() {
		match quote {
			Some(q) if b == q => quote = None,
			Some(_) => {}
			None => match b {
				b'"' | b'\'' => quote = Some(b),
				b'>' => return Some(lt + 1 + i + 1),
				b'<' => return None,
				_ => {}
			},
		}
	}
	None
}

/// Start of `</name` at or after `from`, ASCII case-insensitively.
fn find_closing_tag(html: &str, from: usize, name: &str) -> Option<usize> {
	let needle = format!("</{name}");
	let haystack = &html.as_bytes()[from..];
	haystack
		.windows(needle.len())
		.position(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
		.map(|i| from + i)
}

fn tag_name(tag_source: &str) -> String {
	tag_source
		.split(|c: char| c.is_ascii_whitespace() || c == '/' || c == '>')
		.next()
		.unwrap_or_default()
		.to_ascii_lowercase()
}

/// Parse the inside of an opening tag (between `<` and `>`).
fn parse_open_tag(tag_source: &str) -> (ElementInfo, bool) {
	let self_closing = tag_source.trim_end().ends_with('/');
	let name = tag_name(tag_source);
	let mut info = ElementInfo {
		tag: name.clone(),
		..Default::default()
	};

	for (attr, value) in parse_attributes(&tag_source[name.len()..]) {
		match attr.as_str() {
			"id" if !value.is_empty() => info.id = Some(value),
			"class" => info.classes = value.split_whitespace().map(str::to_string).collect(),
			_ => {}
		}
	}

	(info, self_closing)
}

/// Attribute names (lower-cased) and raw values.
fn parse_attributes(source: &str) -> Vec<(String, String)> {
	let mut attributes = Vec::new();
	let mut rest = source;

	loop {
		rest = rest.trim_start_matches(|c: char| c.is_ascii_whitespace() || c == '/');
		if rest.is_empty() {
			break;
		}

		let name_len = rest
			.find(|c: char| c.is_ascii_whitespace() || c == '=' || c == '/')
			.unwrap_or(rest.len());
		if name_len == 0 {
			// Stray `=`; skip it.
			rest = &rest[1..];
			continue;
		}
		let name = rest[..name_len].to_ascii_lowercase();
		rest = rest[name_len..].trim_start();

		let Some(after_eq) = rest.strip_prefix('=') else {
			attributes.push((name, String::new()));
			continue;
		};
		rest = after_eq.trim_start();

		let value;
		if let Some(q) = rest.chars().next().filter(|c| *c == '"' || *c == '\'') {
			let body = &rest[1..];
			let value_len = body.find(q).unwrap_or(body.len());
			value = body[..value_len].to_string();
			rest = body.get(value_len + 1..).unwrap_or_default();
		} else {
			let value_len = rest
				.find(|c: char| c.is_ascii_whitespace())
				.unwrap_or(rest.len());
			value = rest[..value_len].to_string();
			rest = &rest[value_len..];
		}
		attributes.push((name, value));
	}

	attributes
}

/// Length of the character reference at the start of `s`, if it is one
/// (`&amp;`, `&#39;`, `&#x27;`).
fn char_ref_len(s: &str) -> Option<usize> {
	let bytes = s.as_bytes();
	let body = bytes.get(1..)?;
	let (digits, skip): (fn(&u8) -> bool, usize) = match body {
		[b'#', b'x' | b'X', ..] => (u8::is_ascii_hexdigit, 2),
		[b'#', ..] => (u8::is_ascii_digit, 1),
		[c, ..] if c.is_ascii_alphabetic() => (u8::is_ascii_alphanumeric, 0),
		_ => return None,
	};
	let name_len = body[skip..].iter().take_while(|&b| digits(b)).count();
	if name_len == 0 || name_len > 32 || body.get(skip + name_len) != Some(&b';') {
		return None;
	}
	Some(1 + skip + name_len + 1)
}

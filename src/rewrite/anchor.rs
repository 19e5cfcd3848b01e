use crate::catalog::LinkRule;
use html_escape::encode_double_quoted_attribute;

/// Build the anchor element wrapping `text` (already HTML, copied verbatim).
pub fn build_anchor(rule: &LinkRule, href: &str, text: &str) -> String {
	let mut anchor = String::with_capacity(href.len() + text.len() + 48);

	anchor.push_str("<a href=\"");
	anchor.push_str(&encode_double_quoted_attribute(href));
	anchor.push_str("\" target=\"");
	anchor.push_str(rule.target.as_str());
	anchor.push('"');

	if rule.nofollow {
		anchor.push_str(" rel=\"nofollow\"");
	}

	if let Some(title) = rule.title_attribute().filter(|t| !t.is_empty()) {
		anchor.push_str(" title=\"");
		anchor.push_str(&encode_double_quoted_attribute(title));
		anchor.push('"');
	}

	anchor.push('>');
	anchor.push_str(text);
	anchor.push_str("</a>");
	anchor
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog::Target;
	use pretty_assertions::assert_eq;

	fn rule() -> LinkRule {
		LinkRule {
			id: 1,
			title: "Shop".to_string(),
			..Default::default()
		}
	}

	#[test]
	fn test_basic_anchor() {
		assert_eq!(
			build_anchor(&rule(), "/shop/", "the Shop"),
			r#"<a href="/shop/" target="_self" title="Shop">the Shop</a>"#
		);
	}

	#[test]
	fn test_new_tab_and_nofollow() {
		let rule = LinkRule {
			target: Target::NewTab,
			nofollow: true,
			..rule()
		};
		assert_eq!(
			build_anchor(&rule, "https://example.com/", "x"),
			r#"<a href="https://example.com/" target="_blank" rel="nofollow" title="Shop">x</a>"#
		);
	}

	#[test]
	fn test_title_override_and_suppression() {
		let custom = LinkRule {
			titleattr: Some("Our shop".to_string()),
			..rule()
		};
		assert!(build_anchor(&custom, "/", "x").contains(r#"title="Our shop""#));

		let hidden = LinkRule {
			notitle: true,
			..custom
		};
		assert!(!build_anchor(&hidden, "/", "x").contains("title="));

		let untitled = LinkRule {
			title: String::new(),
			..rule()
		};
		assert!(!build_anchor(&untitled, "/", "x").contains("title="));
	}

	#[test]
	fn test_attribute_values_are_escaped() {
		let rule = LinkRule {
			title: r#"Tom "&" Jerry"#.to_string(),
			..rule()
		};
		let anchor = build_anchor(&rule, "/search?a=1&b=\"2\"", "x");
		assert!(anchor.contains(r#"href="/search?a=1&amp;b=&quot;2&quot;""#));
		assert!(anchor.contains(r#"title="Tom &quot;&amp;&quot; Jerry""#));
	}
}

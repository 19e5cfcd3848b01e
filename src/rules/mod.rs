//! Page and rule selection for interlink.
//!
//! This module handles:
//! - Glob-style URL pattern matching
//! - Deciding whether a page is eligible for rewriting at all
//! - Picking and ordering the link rules that may fire on a page

pub mod eligibility;
pub mod page;
pub mod pattern;
pub mod selector;

pub use eligibility::{Eligibility, should_rewrite};
pub use page::PageContext;
pub use pattern::{UrlPattern, url_path};
pub use selector::{select, select_for_page};

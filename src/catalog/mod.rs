//! The link rule catalog.
//!
//! This module handles:
//! - The `LinkRule` model and its flat `LinkRecord` storage row
//! - The `RuleStore` persistence seam
//! - A JSON-file backed `Catalog` implementation

pub mod record;
pub mod store;
pub mod types;

pub use record::{COLUMNS, LinkRecord};
pub use store::{Catalog, RuleQuery, RuleStore};
pub use types::{Destination, LinkId, LinkRule, PageId, Target};

//! Interlink - turn keywords in rendered pages into internal links.
//!
//! This library provides the core functionality for interlink, including:
//! - Configuration file parsing and cascade discovery
//! - The link catalog and its CSV/JSON interchange formats
//! - Page eligibility, rule selection and HTML rewriting
//! - Click tracking and statistics
//!
//! # Example
//!
//! ```no_run
//! use interlink_cli::catalog::{Catalog, RuleQuery, RuleStore};
//! use interlink_cli::config::load_merged_config;
//! use interlink_cli::rewrite::Rewriter;
//! use interlink_cli::rules::{Eligibility, PageContext, select_for_page};
//!
//! let cwd = std::env::current_dir().unwrap();
//! let config = load_merged_config(&cwd).unwrap();
//! let catalog = Catalog::load(config.catalog.as_deref().unwrap()).unwrap();
//!
//! let page = PageContext {
//!     canonical_url: Some("https://example.com/blog/hello/".to_string()),
//!     hostname: "example.com".to_string(),
//!     post_type: "post".to_string(),
//!     ..Default::default()
//! };
//!
//! let html = "<p>Our shop sells shoes.</p>";
//! if Eligibility::compile(&config.settings).should_rewrite(&page.candidate_urls(), &page.post_type) {
//!     let rules = catalog.list(&RuleQuery::active());
//!     let rewriter = Rewriter::new(&config.pages).with_exclusions(&config.settings.exclude);
//!     println!("{}", rewriter.rewrite(html, select_for_page(&rules, &page)));
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod rewrite;
pub mod rules;
pub mod tracking;
pub mod transfer;

pub use error::{InterlinkError, Result};

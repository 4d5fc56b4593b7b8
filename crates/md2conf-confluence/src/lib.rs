//! Confluence integration for md2conf.
//!
//! Provides a sync REST client for Confluence Server/Cloud, the
//! content-equivalence comparison used to decide whether a page needs
//! republishing, and the create-or-update publisher built on top of
//! both.

mod api;
mod client;
mod compare;
mod error;
mod publisher;
mod types;

pub use api::ConfluenceApi;
pub use client::ConfluenceClient;
pub use compare::{content_changed, strip_leading_whitespace, strip_macro_ids};
pub use error::ConfluenceError;
pub use publisher::{PagePublisher, PublishOptions, PublishOutcome};
pub use types::{Links, Page, SearchResults, Version};

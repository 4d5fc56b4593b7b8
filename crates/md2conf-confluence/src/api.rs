//! API trait for the Confluence operations the publisher depends on.

use crate::error::ConfluenceError;
use crate::types::Page;

/// The Confluence REST surface consumed by the publish workflow.
///
/// [`ConfluenceClient`](crate::ConfluenceClient) implements this against
/// a live instance; tests use an in-memory mock so the publish decision
/// can be exercised without network access.
pub trait ConfluenceApi {
    /// Find the page matching title, and optionally space and ancestor.
    ///
    /// Title uniqueness within a space/ancestor scope is by convention;
    /// the first search result wins. Returns `None` when nothing matches.
    fn exists(
        &self,
        space: Option<&str>,
        title: &str,
        ancestor_id: Option<&str>,
    ) -> Result<Option<Page>, ConfluenceError>;

    /// Fetch a page's current storage-format body.
    ///
    /// Returns an empty string when the page has no storage body.
    fn get_page_contents(&self, post_id: &str) -> Result<String, ConfluenceError>;

    /// Round-trip HTML through the remote storage-format converter.
    ///
    /// Only the remote converter is authoritative for how equivalent
    /// markup is normalized, so both locally generated and live content
    /// pass through it before comparison.
    fn convert_to_storage(&self, html: &str) -> Result<String, ConfluenceError>;

    /// Create a new page. Returns false when the response carries no
    /// link metadata (non-fatal anomaly), true on success.
    fn create(
        &self,
        content: &str,
        space: &str,
        title: &str,
        ancestor_id: Option<&str>,
    ) -> Result<bool, ConfluenceError>;

    /// Update an existing page, bumping the version to
    /// `page.version.number + 1`. The page record must come from the
    /// same run to avoid a stale version. Same link-metadata contract
    /// as [`create`](Self::create).
    #[allow(clippy::too_many_arguments)]
    fn update(
        &self,
        post_id: &str,
        content: &str,
        space: &str,
        title: &str,
        ancestor_id: Option<&str>,
        page: &Page,
    ) -> Result<bool, ConfluenceError>;
}

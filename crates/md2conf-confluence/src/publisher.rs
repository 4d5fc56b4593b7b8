//! Create-or-update publish workflow.
//!
//! Looks the page up by title/space/ancestor, decides via the
//! comparison core whether a write is needed, and issues at most one
//! create or update call per run.

use tracing::info;

use crate::api::ConfluenceApi;
use crate::compare::content_changed;
use crate::error::ConfluenceError;

/// Options controlling a publish run.
#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    /// Confluence space key.
    pub space: String,
    /// Parent page ID for new pages.
    pub ancestor_id: Option<String>,
    /// Skip the comparison and always update an existing page.
    pub force_update: bool,
    /// Persist both compared bodies to local files for manual diffing.
    pub debug_artifacts: bool,
}

/// What a publish run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// No matching page existed; one was created.
    Created,
    /// The page existed and differed (or the update was forced).
    Updated,
    /// The page existed and the content was equivalent; nothing written.
    Unchanged,
}

/// Publishes rendered content to Confluence, creating or updating as needed.
pub struct PagePublisher<'a> {
    api: &'a dyn ConfluenceApi,
    options: PublishOptions,
}

impl<'a> PagePublisher<'a> {
    /// Create a new publisher.
    #[must_use]
    pub fn new(api: &'a dyn ConfluenceApi, options: PublishOptions) -> Self {
        Self { api, options }
    }

    /// Publish `content` under `title`.
    ///
    /// An existing equivalent page results in zero write calls unless
    /// `force_update` is set. The version sent on update is the one
    /// fetched in this same run, incremented once.
    pub fn publish(&self, title: &str, content: &str) -> Result<PublishOutcome, ConfluenceError> {
        let space = &self.options.space;
        let ancestor = self.options.ancestor_id.as_deref();

        let Some(page) = self.api.exists(Some(space), title, ancestor)? else {
            self.api.create(content, space, title, ancestor)?;
            return Ok(PublishOutcome::Created);
        };

        let changed = if self.options.force_update {
            info!("Forcing page update, skipping content comparison");
            true
        } else {
            content_changed(self.api, &page.id, content, self.options.debug_artifacts)?
        };

        if !changed {
            info!("No changes detected, page update skipped");
            return Ok(PublishOutcome::Unchanged);
        }

        info!("Found changes against the page published in Confluence");
        self.api
            .update(&page.id, content, space, title, ancestor, &page)?;
        Ok(PublishOutcome::Updated)
    }
}

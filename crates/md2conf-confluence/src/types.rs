//! Confluence page types.

use serde::{Deserialize, Serialize};

/// Confluence page record.
///
/// A read-only snapshot owned by the remote system, valid for the
/// duration of one run. The version number is incremented by the server
/// exactly once per successful update.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Page {
    /// Page ID.
    pub id: String,
    /// Page title.
    pub title: String,
    /// Version information.
    pub version: Version,
    /// Hypermedia links.
    #[serde(rename = "_links", default)]
    pub links: Option<Links>,
}

/// Page version.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Version {
    /// Version number.
    pub number: u32,
}

/// Hypermedia links.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Links {
    /// Instance base URL.
    #[serde(default)]
    pub base: Option<String>,
    /// Short link to the page.
    #[serde(default)]
    pub tinyui: Option<String>,
}

/// CQL search response.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResults {
    /// Matching pages.
    #[serde(default)]
    pub results: Vec<Page>,
    /// Number of results.
    #[serde(default)]
    pub size: u32,
}

/// Response for a content fetch with `expand=body.storage`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PageBody {
    #[serde(default)]
    pub body: Option<Body>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Body {
    #[serde(default)]
    pub storage: Option<Storage>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Storage {
    pub value: String,
}

/// Response from the storage-format conversion endpoint.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ConvertedBody {
    pub value: String,
}

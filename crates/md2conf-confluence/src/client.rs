//! Confluence REST API client.
//!
//! Sync HTTP client for the Confluence REST API with Basic
//! authentication. Every non-success status is surfaced as a typed
//! [`ConfluenceError::HttpResponse`]; the caller decides whether that
//! terminates the run.

use std::time::Duration;

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, error, info};
use ureq::Agent;

use crate::api::ConfluenceApi;
use crate::error::ConfluenceError;
use crate::types::{ConvertedBody, Page, PageBody, SearchResults};

/// Default HTTP timeout in seconds.
const DEFAULT_TIMEOUT: u64 = 30;

/// User agent attached to every request.
const USER_AGENT: &str = "md2conf";

/// Confluence REST API client.
pub struct ConfluenceClient {
    agent: Agent,
    api_url: String,
    auth_header: String,
}

impl ConfluenceClient {
    /// Create a client for the given API root with Basic authentication.
    ///
    /// The URL is normalized to end in `/rest/api`, so both
    /// `https://confluence.example.com/wiki` and the full API root are
    /// accepted.
    #[must_use]
    pub fn new(api_url: &str, username: &str, password: &str) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT)))
            .http_status_as_error(false)
            .build()
            .into();

        let api_url = normalize_api_url(api_url);
        info!("API URL: {api_url}");

        let credentials = BASE64_STANDARD.encode(format!("{username}:{password}"));

        Self {
            agent,
            api_url,
            auth_header: format!("Basic {credentials}"),
        }
    }

    /// Issue a GET request and deserialize the JSON response.
    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ConfluenceError> {
        let url = format!("{}/{path}", self.api_url);
        debug!("GET {url} params: {query:?}");

        let mut request = self
            .agent
            .get(&url)
            .header("Authorization", &self.auth_header)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/json");
        for (key, value) in query {
            request = request.query(*key, *value);
        }

        let response = request.call()?;
        parse_response("GET", &url, response)
    }

    /// Issue a POST or PUT request with a JSON payload.
    fn send_json<T: DeserializeOwned>(
        &self,
        method: &'static str,
        path: &str,
        payload: &Value,
    ) -> Result<T, ConfluenceError> {
        let url = format!("{}/{path}", self.api_url);
        debug!("{method} {url}");

        let body = serde_json::to_vec(payload)?;
        let request = match method {
            "PUT" => self.agent.put(&url),
            _ => self.agent.post(&url),
        };
        let response = request
            .header("Authorization", &self.auth_header)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .send(&body[..])?;

        parse_response(method, &url, response)
    }

    /// Build the create/update payload, canonicalizing the content
    /// through the remote storage-format converter first.
    fn page_payload(
        &self,
        content: &str,
        space: &str,
        title: &str,
        ancestor_id: Option<&str>,
    ) -> Result<Value, ConfluenceError> {
        let storage = self.convert_to_storage(content)?;

        let mut payload = json!({
            "type": "page",
            "title": title,
            "space": {"key": space},
            "body": {"storage": {"representation": "storage", "value": storage}},
        });
        if let Some(ancestor) = ancestor_id {
            payload["ancestors"] = json!([{"id": ancestor}]);
        }
        Ok(payload)
    }
}

impl ConfluenceApi for ConfluenceClient {
    fn exists(
        &self,
        space: Option<&str>,
        title: &str,
        ancestor_id: Option<&str>,
    ) -> Result<Option<Page>, ConfluenceError> {
        if title.is_empty() {
            return Err(ConfluenceError::MissingArgument("title"));
        }

        let cql = build_cql(space, title, ancestor_id);
        debug!("CQL query: {cql}");

        let results: SearchResults =
            self.get_json("content/search", &[("expand", "version"), ("cql", &cql)])?;

        if results.size == 0 {
            info!("No page satisfied the query, assuming this is a new page");
            return Ok(None);
        }
        Ok(results.results.into_iter().next())
    }

    fn get_page_contents(&self, post_id: &str) -> Result<String, ConfluenceError> {
        if post_id.is_empty() {
            return Err(ConfluenceError::MissingArgument("post_id"));
        }

        let page: PageBody = self.get_json(
            &format!("content/{post_id}"),
            &[("expand", "body.storage")],
        )?;

        Ok(page
            .body
            .and_then(|body| body.storage)
            .map(|storage| storage.value)
            .unwrap_or_default())
    }

    fn convert_to_storage(&self, html: &str) -> Result<String, ConfluenceError> {
        if html.is_empty() {
            return Err(ConfluenceError::MissingArgument("html"));
        }

        let payload = json!({"value": html, "representation": "storage"});
        let converted: ConvertedBody =
            self.send_json("POST", "contentbody/convert/storage", &payload)?;
        Ok(converted.value)
    }

    fn create(
        &self,
        content: &str,
        space: &str,
        title: &str,
        ancestor_id: Option<&str>,
    ) -> Result<bool, ConfluenceError> {
        if content.is_empty() {
            return Err(ConfluenceError::MissingArgument("content"));
        }
        if title.is_empty() {
            return Err(ConfluenceError::MissingArgument("title"));
        }
        if space.is_empty() {
            return Err(ConfluenceError::MissingArgument("space"));
        }

        let payload = self.page_payload(content, space, title, ancestor_id)?;
        let page: Page = self.send_json("POST", "content/", &payload)?;

        match page_url(&page) {
            Some(url) => {
                info!(
                    "Page \"{title}\" (id {}) created successfully at {url}",
                    page.id
                );
                Ok(true)
            }
            None => {
                error!("Can't get link to the created page");
                Ok(false)
            }
        }
    }

    fn update(
        &self,
        post_id: &str,
        content: &str,
        space: &str,
        title: &str,
        ancestor_id: Option<&str>,
        page: &Page,
    ) -> Result<bool, ConfluenceError> {
        if post_id.is_empty() {
            return Err(ConfluenceError::MissingArgument("post_id"));
        }
        if content.is_empty() {
            return Err(ConfluenceError::MissingArgument("content"));
        }
        if title.is_empty() {
            return Err(ConfluenceError::MissingArgument("title"));
        }
        if space.is_empty() {
            return Err(ConfluenceError::MissingArgument("space"));
        }

        let mut payload = self.page_payload(content, space, title, ancestor_id)?;
        // The API requires the next version number on every update.
        payload["version"] = json!({"number": page.version.number + 1});

        let updated: Page = self.send_json("PUT", &format!("content/{post_id}"), &payload)?;

        match page_url(&updated) {
            Some(url) => {
                info!("Page \"{title}\" (id {post_id}) updated successfully at {url}");
                Ok(true)
            }
            None => {
                error!("Can't get link to the updated page");
                Ok(false)
            }
        }
    }
}

/// Check status and deserialize the response body.
fn parse_response<T: DeserializeOwned>(
    method: &'static str,
    url: &str,
    response: ureq::http::Response<ureq::Body>,
) -> Result<T, ConfluenceError> {
    let status = response.status().as_u16();
    let mut body_reader = response.into_body();

    if status >= 400 {
        let text = body_reader
            .read_to_string()
            .unwrap_or_else(|_| "(unable to read error body)".to_owned());
        let message = extract_error_message(&text);
        error!("{method} {url}: {status} - {message}");
        return Err(ConfluenceError::HttpResponse {
            method,
            url: url.to_owned(),
            status,
            message,
        });
    }

    Ok(body_reader.read_json()?)
}

/// Normalize a configured URL to the REST API root, without a trailing slash.
fn normalize_api_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    if trimmed.ends_with("/rest/api") {
        trimmed.to_owned()
    } else {
        format!("{trimmed}/rest/api")
    }
}

/// Build an AND-joined CQL query from the present filters.
fn build_cql(space: Option<&str>, title: &str, ancestor_id: Option<&str>) -> String {
    let mut parts = vec![format!("title='{}'", escape_cql(title))];
    if let Some(ancestor) = ancestor_id {
        parts.push(format!("ancestor={ancestor}"));
    }
    if let Some(space) = space {
        parts.push(format!("space='{}'", escape_cql(space)));
    }
    parts.join(" and ")
}

/// Escape single quotes inside a CQL string literal.
fn escape_cql(value: &str) -> String {
    value.replace('\'', "\\'")
}

/// Compose the tiny URL for a page from its link metadata, if present.
fn page_url(page: &Page) -> Option<String> {
    let links = page.links.as_ref()?;
    Some(format!("{}{}", links.base.as_deref()?, links.tinyui.as_deref()?))
}

/// Pull the `message` field out of a JSON error body, falling back to
/// the raw text when the body isn't parseable.
fn extract_error_message(text: &str) -> String {
    serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|value| value.get("message").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or_else(|| text.to_owned())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::types::{Links, Version};

    #[test]
    fn test_normalize_api_url_appends_rest_api() {
        assert_eq!(
            normalize_api_url("https://confluence.example.com/wiki"),
            "https://confluence.example.com/wiki/rest/api"
        );
    }

    #[test]
    fn test_normalize_api_url_handles_trailing_slash() {
        assert_eq!(
            normalize_api_url("https://confluence.example.com/wiki/"),
            "https://confluence.example.com/wiki/rest/api"
        );
    }

    #[test]
    fn test_normalize_api_url_keeps_existing_root() {
        assert_eq!(
            normalize_api_url("https://confluence.example.com/wiki/rest/api/"),
            "https://confluence.example.com/wiki/rest/api"
        );
    }

    #[test]
    fn test_build_cql_all_filters() {
        let cql = build_cql(Some("DOCS"), "My Page", Some("12345"));
        assert_eq!(cql, "title='My Page' and ancestor=12345 and space='DOCS'");
    }

    #[test]
    fn test_build_cql_title_only() {
        assert_eq!(build_cql(None, "My Page", None), "title='My Page'");
    }

    #[test]
    fn test_build_cql_escapes_quotes() {
        assert_eq!(build_cql(None, "It's here", None), r"title='It\'s here'");
    }

    #[test]
    fn test_extract_error_message_from_json() {
        let text = r#"{"statusCode": 404, "message": "No content found"}"#;
        assert_eq!(extract_error_message(text), "No content found");
    }

    #[test]
    fn test_extract_error_message_raw_fallback() {
        assert_eq!(extract_error_message("<html>gateway timeout</html>"), "<html>gateway timeout</html>");
    }

    #[test]
    fn test_page_url_requires_both_links() {
        let mut page = Page {
            id: "1".to_owned(),
            title: "T".to_owned(),
            version: Version { number: 1 },
            links: Some(Links {
                base: Some("https://confluence.example.com/wiki".to_owned()),
                tinyui: Some("/x/AbCd".to_owned()),
            }),
        };
        assert_eq!(
            page_url(&page).as_deref(),
            Some("https://confluence.example.com/wiki/x/AbCd")
        );

        page.links = None;
        assert_eq!(page_url(&page), None);
    }
}

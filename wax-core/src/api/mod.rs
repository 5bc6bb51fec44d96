//! API client for the wax backend (catalog, collection, Discogs import, sharing).

pub mod catalog;
pub mod collection;
pub mod discogs;
pub mod models;
pub mod owners;

use crate::config::Config;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Not authorized")]
    Unauthorized,
    #[error("Not found")]
    NotFound,
    #[error("API rate limit exceeded")]
    RateLimited,
    #[error("Server error (status {status}): {body}")]
    Server { status: u16, body: String },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Map a non-success status to the error taxonomy the UI layer branches on.
fn status_error(status: StatusCode, body: String) -> ApiError {
    match status.as_u16() {
        401 | 403 => ApiError::Unauthorized,
        404 => ApiError::NotFound,
        429 => ApiError::RateLimited,
        code => ApiError::Server { status: code, body },
    }
}

/// One reqwest client bound to the backend base URL and the caller's session.
///
/// Endpoint wrappers live in the sibling modules (`catalog`, `collection`,
/// `discogs`, `owners`) as inherent impls on this type.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session_token: String,
}

impl ApiClient {
    pub fn new(config: &Config, session_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.api_url.trim_end_matches('/').to_string(),
            session_token: session_token.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session_token(&self) -> &str {
        &self.session_token
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .get(self.url(path))
            .bearer_auth(&self.session_token)
    }

    pub(crate) fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .post(self.url(path))
            .bearer_auth(&self.session_token)
    }

    pub(crate) fn patch(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .patch(self.url(path))
            .bearer_auth(&self.session_token)
    }

    pub(crate) fn delete(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .delete(self.url(path))
            .bearer_auth(&self.session_token)
    }

    /// Check the response status, consuming the body into an error on failure.
    pub(crate) async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = resp.status();
        if status.is_success() {
            Ok(resp)
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(status_error(status, body))
        }
    }
}

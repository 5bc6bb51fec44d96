//! Server-mediated Discogs import wrappers.
//!
//! The backend proxies Discogs so the client never holds a Discogs token.
//! A 404 from the preview endpoint means the release ID does not exist;
//! 429 means the backend's Discogs quota is exhausted.

use super::models::{DiscogsImportResult, DiscogsMatch};
use super::{ApiClient, ApiError};

impl ApiClient {
    /// Preview a Discogs release before importing it.
    pub async fn preview_discogs_release(&self, discogs_id: u64) -> Result<DiscogsMatch, ApiError> {
        let resp = self
            .get(&format!("/api/discogs/releases/{discogs_id}"))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    /// Import a Discogs release, creating artist/album/pressing rows as needed.
    pub async fn import_discogs_release(
        &self,
        discogs_id: u64,
    ) -> Result<DiscogsImportResult, ApiError> {
        let resp = self
            .post("/api/discogs/import")
            .json(&serde_json::json!({ "discogsId": discogs_id }))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }
}

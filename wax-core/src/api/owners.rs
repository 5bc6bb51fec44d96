//! Batch owner lookups and followed-user wrappers.

use super::models::{FollowedUser, OwnerRecord};
use super::{ApiClient, ApiError};
use crate::owners::OwnerSource;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

impl ApiClient {
    /// Resolve owners for a bounded batch of album IDs.
    ///
    /// IDs absent from the response own no entries; the loader fills those
    /// in as empty lists.
    pub async fn album_owners(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, Vec<OwnerRecord>>, ApiError> {
        let resp = self
            .post("/api/owners/albums")
            .json(&serde_json::json!({ "ids": ids }))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    /// Resolve owners for a bounded batch of pressing IDs.
    pub async fn pressing_owners(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, Vec<OwnerRecord>>, ApiError> {
        let resp = self
            .post("/api/owners/pressings")
            .json(&serde_json::json!({ "ids": ids }))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    /// Users whose collections are shared with the caller.
    pub async fn get_follows(&self) -> Result<Vec<FollowedUser>, ApiError> {
        let resp = self.get("/api/follows").send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn follow(&self, user_id: &str) -> Result<FollowedUser, ApiError> {
        let resp = self
            .post("/api/follows")
            .json(&serde_json::json!({ "userId": user_id }))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn unfollow(&self, user_id: &str) -> Result<(), ApiError> {
        let resp = self.delete(&format!("/api/follows/{user_id}")).send().await?;
        Self::check(resp).await?;
        Ok(())
    }
}

/// [`OwnerSource`] backed by the album batch endpoint.
pub struct AlbumOwnerSource {
    client: Arc<ApiClient>,
}

impl AlbumOwnerSource {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OwnerSource for AlbumOwnerSource {
    async fn fetch_owners(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, Vec<OwnerRecord>>, ApiError> {
        self.client.album_owners(ids).await
    }
}

/// [`OwnerSource`] backed by the pressing batch endpoint.
pub struct PressingOwnerSource {
    client: Arc<ApiClient>,
}

impl PressingOwnerSource {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OwnerSource for PressingOwnerSource {
    async fn fetch_owners(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, Vec<OwnerRecord>>, ApiError> {
        self.client.pressing_owners(ids).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_follows() {
        let json = r##"[{
            "userId": "u-2",
            "displayName": "bob",
            "avatarIcon": "note",
            "avatarColor": "#000000",
            "avatarAccent": "#ffffff"
        }]"##;
        let follows: Vec<FollowedUser> = serde_json::from_str(json).unwrap();
        assert_eq!(follows[0].user_id, "u-2");
        assert_eq!(follows[0].display_name, "bob");
    }

    #[test]
    fn batch_request_body() {
        let ids = vec!["alb-1".to_string(), "alb-2".to_string()];
        let body = serde_json::json!({ "ids": ids });
        assert_eq!(body.to_string(), r#"{"ids":["alb-1","alb-2"]}"#);
    }
}

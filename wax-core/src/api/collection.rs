//! Collection item CRUD (condition, rating, notes).

use super::models::{ApiCollectionItem, CollectionItemPatch, NewCollectionItem};
use super::{ApiClient, ApiError};

impl ApiClient {
    /// Fetch the caller's full collection.
    pub async fn get_collection(&self) -> Result<Vec<ApiCollectionItem>, ApiError> {
        let resp = self.get("/api/collection").send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn add_to_collection(
        &self,
        item: &NewCollectionItem,
    ) -> Result<ApiCollectionItem, ApiError> {
        let resp = self.post("/api/collection").json(item).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    /// Partially update one collection item (condition, rating, notes).
    pub async fn update_collection_item(
        &self,
        item_id: &str,
        patch: &CollectionItemPatch,
    ) -> Result<ApiCollectionItem, ApiError> {
        let resp = self
            .patch(&format!("/api/collection/{item_id}"))
            .json(patch)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn remove_from_collection(&self, item_id: &str) -> Result<(), ApiError> {
        let resp = self
            .delete(&format!("/api/collection/{item_id}"))
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }
}

//! Artist, album, and pressing search + create wrappers.

use super::models::{ApiAlbum, ApiArtist, ApiPressing, NewAlbum, NewArtist, NewPressing};
use super::{ApiClient, ApiError};

impl ApiClient {
    /// Search artists by name.
    pub async fn search_artists(&self, query: &str) -> Result<Vec<ApiArtist>, ApiError> {
        let resp = self
            .get("/api/artists")
            .query(&[("query", query)])
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn create_artist(&self, artist: &NewArtist) -> Result<ApiArtist, ApiError> {
        let resp = self.post("/api/artists").json(artist).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    /// Search albums by title, optionally scoped to one artist.
    pub async fn search_albums(
        &self,
        query: &str,
        artist_id: Option<&str>,
    ) -> Result<Vec<ApiAlbum>, ApiError> {
        let mut params = vec![("query", query)];
        if let Some(artist_id) = artist_id {
            params.push(("artistId", artist_id));
        }
        let resp = self.get("/api/albums").query(&params).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn create_album(&self, album: &NewAlbum) -> Result<ApiAlbum, ApiError> {
        let resp = self.post("/api/albums").json(album).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    /// List the known pressings of an album.
    pub async fn get_pressings(&self, album_id: &str) -> Result<Vec<ApiPressing>, ApiError> {
        let resp = self
            .get(&format!("/api/albums/{album_id}/pressings"))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn create_pressing(&self, pressing: &NewPressing) -> Result<ApiPressing, ApiError> {
        let resp = self.post("/api/pressings").json(pressing).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }
}

//! Wire types for the wax backend API.
//!
//! Client-side Deserialize types are kept separate from the request bodies
//! (Serialize) so the backend can evolve either side independently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One user's ownership summary for an album or pressing.
///
/// Ownership of multiple copies collapses to one record with
/// `copy_count > 1`. The batch endpoint orders owners with the current
/// user first (when present), then followed users; callers must preserve
/// that order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerRecord {
    pub user_id: String,
    pub display_name: String,
    /// Icon style for avatar rendering (e.g. "disc", "note").
    pub avatar_icon: String,
    pub avatar_color: String,
    pub avatar_accent: String,
    pub copy_count: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiArtist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sort_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiAlbum {
    pub id: String,
    pub artist_id: String,
    pub title: String,
    pub year: Option<i32>,
    #[serde(default)]
    pub cover_url: Option<String>,
}

/// A physical pressing of an album (label, catalog number, country, year).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPressing {
    pub id: String,
    pub album_id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub catalog_number: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    pub year: Option<i32>,
}

/// Standard vinyl grading ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    #[serde(rename = "M")]
    Mint,
    #[serde(rename = "NM")]
    NearMint,
    #[serde(rename = "VG+")]
    VgPlus,
    #[serde(rename = "VG")]
    VeryGood,
    #[serde(rename = "G+")]
    GoodPlus,
    #[serde(rename = "G")]
    Good,
    #[serde(rename = "F")]
    Fair,
    #[serde(rename = "P")]
    Poor,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Mint => "M",
            Condition::NearMint => "NM",
            Condition::VgPlus => "VG+",
            Condition::VeryGood => "VG",
            Condition::GoodPlus => "G+",
            Condition::Good => "G",
            Condition::Fair => "F",
            Condition::Poor => "P",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCollectionItem {
    pub id: String,
    pub album_id: String,
    pub pressing_id: String,
    #[serde(default)]
    pub condition: Option<Condition>,
    #[serde(default)]
    pub sleeve_condition: Option<Condition>,
    /// 1-5 stars.
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub notes: Option<String>,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowedUser {
    pub user_id: String,
    pub display_name: String,
    pub avatar_icon: String,
    pub avatar_color: String,
    pub avatar_accent: String,
}

/// A Discogs release preview returned by the server-mediated lookup.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscogsMatch {
    pub discogs_id: u64,
    pub title: String,
    pub artist: String,
    pub year: Option<i32>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub catalog_number: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
}

/// Result of importing a Discogs release: the created (or matched) catalog rows.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscogsImportResult {
    pub artist: ApiArtist,
    pub album: ApiAlbum,
    pub pressing: ApiPressing,
}

// -- Request bodies --

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewArtist {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAlbum {
    pub artist_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPressing {
    pub album_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCollectionItem {
    pub pressing_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleeve_condition: Option<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Partial update for a collection item. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionItemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleeve_condition: Option<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

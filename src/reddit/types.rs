// SPDX-License-Identifier: MPL-2.0

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// API credentials for an application-only OAuth client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub client_id: String,
    /// Read from the settings file or environment, never written back
    #[serde(default, skip_serializing)]
    pub client_secret: String,
    #[serde(default)]
    pub user_agent: String,
}

/// A comment as fetched, before scoring.
/// Decoupled from the wire format so the rest of the app owns its types.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedComment {
    /// Hex SHA-256 of the native comment id
    pub id: String,
    pub post_id: String,
    pub body: String,
    /// Net upvotes at fetch time
    pub score: i64,
    /// Local time, `YYYY-MM-DDTHH:MM:SS`
    pub created_utc: String,
}

impl FetchedComment {
    pub fn new(
        native_id: &str,
        post_id: &str,
        body: String,
        score: i64,
        created_utc: String,
    ) -> Self {
        Self {
            id: hashed_comment_id(native_id),
            post_id: post_id.to_string(),
            body,
            score,
            created_utc,
        }
    }
}

/// Stable fixed-length key that hides the native comment id.
pub fn hashed_comment_id(native_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(native_id.as_bytes());
    hex::encode(hasher.finalize())
}

// --- Wire types ---

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    /// Seconds until the token expires
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// `GET /comments/{id}` answers with `[post listing, comment listing]`.
#[derive(Debug, Deserialize)]
pub(crate) struct ThreadResponse(pub IgnoredAny, pub Listing);

#[derive(Debug, Deserialize)]
pub(crate) struct Listing {
    pub data: ListingData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListingData {
    #[serde(default)]
    pub children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub(crate) enum Thing {
    #[serde(rename = "t1")]
    Comment(RawComment),
    #[serde(rename = "more")]
    More(MoreComments),
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawComment {
    pub id: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub score: i64,
    pub created_utc: f64,
    #[serde(default)]
    pub replies: Replies,
}

/// Leaf comments carry `"replies": ""` instead of an empty listing.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Replies {
    Listing(Box<Listing>),
    Empty(IgnoredAny),
}

impl Default for Replies {
    fn default() -> Self {
        Self::Empty(IgnoredAny)
    }
}

/// A "load more comments" placeholder. With no `children` it is a
/// "continue this thread" link to the replies of `parent_id`.
#[derive(Debug, Deserialize)]
pub(crate) struct MoreComments {
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub parent_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MoreChildrenResponse {
    pub json: MoreChildrenJson,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MoreChildrenJson {
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
    pub data: Option<MoreChildrenData>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MoreChildrenData {
    #[serde(default)]
    pub things: Vec<Thing>,
}

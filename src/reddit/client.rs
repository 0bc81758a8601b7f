// SPDX-License-Identifier: MPL-2.0

use crate::config::{DEFAULT_API_BASE, DEFAULT_AUTH_BASE};
use crate::reddit::types::{
    Credentials, FetchedComment, MoreChildrenResponse, RawComment, Replies, ThreadResponse,
    Thing, TokenResponse,
};
#[cfg(test)]
use crate::reddit::types::hashed_comment_id;
use crate::runtime;
use chrono::{DateTime, Local, TimeZone};
use reqwest::StatusCode;
use std::collections::{HashSet, VecDeque};
use serde::de::DeserializeOwned;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

/// The morechildren endpoint accepts at most this many ids per call
const MORE_CHILDREN_BATCH: usize = 100;
/// Assumed when the token response carries no `expires_in`
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;
/// Tokens are renewed this long before they expire
const TOKEN_EXPIRY_MARGIN_SECS: u64 = 60;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("rate limited by the API")]
    RateLimited,
    #[error("post not found: {0}")]
    NotFound(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::InvalidResponse(e.to_string())
        } else {
            ClientError::Network(e.to_string())
        }
    }
}

/// Synchronous source of a post's comments, consumed by the pipeline.
pub trait CommentSource {
    fn fetch(&self, post_id: &str) -> Result<Vec<FetchedComment>, ClientError>;
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Application-only OAuth client for reading comment threads.
pub struct RedditClient {
    http: reqwest::Client,
    credentials: Credentials,
    auth_base: String,
    api_base: String,
    token: RwLock<Option<CachedToken>>,
}

impl RedditClient {
    pub fn new(credentials: Credentials) -> Result<Self, ClientError> {
        Self::with_base_urls(credentials, DEFAULT_AUTH_BASE, DEFAULT_API_BASE)
    }

    pub fn with_base_urls(
        credentials: Credentials,
        auth_base: &str,
        api_base: &str,
    ) -> Result<Self, ClientError> {
        if credentials.client_id.is_empty() {
            return Err(ClientError::Auth("missing client id".to_string()));
        }
        if credentials.user_agent.is_empty() {
            return Err(ClientError::Auth("missing user agent".to_string()));
        }

        let http = reqwest::Client::builder()
            .user_agent(credentials.user_agent.clone())
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            http,
            credentials,
            auth_base: auth_base.trim_end_matches('/').to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        })
    }

    /// Fetch every comment of a post, expanding all "load more" placeholders,
    /// flattened breadth-first.
    pub async fn fetch_comments(&self, post_id: &str) -> Result<Vec<FetchedComment>, ClientError> {
        let start = Instant::now();

        let url = format!("{}/comments/{}", self.api_base, post_id);
        let ThreadResponse(_, listing) = self
            .get_json(&url, &[("raw_json", "1"), ("limit", "500")], post_id)
            .await?;

        let mut queue: VecDeque<Thing> = listing.data.children.into();
        let mut seen = HashSet::new();
        let mut comments = Vec::new();
        let mut expansions = 0usize;

        while let Some(thing) = queue.pop_front() {
            match thing {
                Thing::Comment(raw) => {
                    let RawComment {
                        id,
                        body,
                        score,
                        created_utc,
                        replies,
                    } = raw;

                    if let Replies::Listing(children) = replies {
                        queue.extend(children.data.children);
                    }
                    if !seen.insert(id.clone()) {
                        continue;
                    }

                    let created_utc = local_iso_from_unix(created_utc, &Local).ok_or_else(|| {
                        ClientError::InvalidResponse(format!(
                            "comment {id} has invalid timestamp {created_utc}"
                        ))
                    })?;

                    comments.push(FetchedComment::new(&id, post_id, body, score, created_utc));
                }
                Thing::More(more) if more.children.is_empty() => {
                    // "continue this thread": only the parent is known
                    let Some(parent) = more.parent_id.strip_prefix("t1_") else {
                        debug!("Skipping empty placeholder - parent={}", more.parent_id);
                        continue;
                    };
                    let things = self.continue_thread(post_id, parent).await?;
                    expansions += 1;
                    queue.extend(things);
                }
                Thing::More(more) => {
                    for chunk in more.children.chunks(MORE_CHILDREN_BATCH) {
                        let things = self.more_children(post_id, chunk).await?;
                        expansions += 1;
                        queue.extend(things);
                    }
                }
            }
        }

        info!(
            "Fetched comments - post={}, comments={}, expansions={}, duration={:.2}s",
            post_id,
            comments.len(),
            expansions,
            start.elapsed().as_secs_f32()
        );

        Ok(comments)
    }

    async fn more_children(&self, post_id: &str, ids: &[String]) -> Result<Vec<Thing>, ClientError> {
        debug!("Expanding placeholder - post={}, ids={}", post_id, ids.len());

        let link_id = format!("t3_{post_id}");
        let children = ids.join(",");
        let url = format!("{}/api/morechildren", self.api_base);

        let body: MoreChildrenResponse = self
            .get_json(
                &url,
                &[
                    ("api_type", "json"),
                    ("raw_json", "1"),
                    ("link_id", link_id.as_str()),
                    ("children", children.as_str()),
                ],
                post_id,
            )
            .await?;

        if !body.json.errors.is_empty() {
            return Err(ClientError::InvalidResponse(format!(
                "morechildren errors: {:?}",
                body.json.errors
            )));
        }

        Ok(body.json.data.map(|d| d.things).unwrap_or_default())
    }

    /// Subtree rooted at `comment_id`. The root comes back first and is
    /// dropped as already seen; its replies are what the caller is after.
    async fn continue_thread(&self, post_id: &str, comment_id: &str) -> Result<Vec<Thing>, ClientError> {
        debug!("Continuing thread - post={}, parent={}", post_id, comment_id);

        let url = format!("{}/comments/{}/_/{}", self.api_base, post_id, comment_id);
        let ThreadResponse(_, listing) = self
            .get_json(&url, &[("raw_json", "1"), ("limit", "500")], post_id)
            .await?;

        Ok(listing.data.children)
    }

    /// Authenticated GET. A 401 drops the cached token and retries once.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        post_id: &str,
    ) -> Result<T, ClientError> {
        let mut retried = false;
        loop {
            let token = self.access_token().await?;
            let response = self
                .http
                .get(url)
                .bearer_auth(&token)
                .query(query)
                .send()
                .await?;

            if response.status() == StatusCode::UNAUTHORIZED && !retried {
                debug!("Access token rejected, requesting a new one");
                *self.token.write().unwrap() = None;
                retried = true;
                continue;
            }

            let response = Self::check_status(response, post_id)?;
            return Ok(response.json().await?);
        }
    }

    /// Cached bearer token, requested on first use and again near expiry
    async fn access_token(&self) -> Result<String, ClientError> {
        if let Some(token) = self.token.read().unwrap().as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let url = format!("{}/api/v1/access_token", self.auth_base);
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ClientError::Auth(format!(
                    "token request rejected with {}",
                    response.status()
                )));
            }
            StatusCode::TOO_MANY_REQUESTS => return Err(ClientError::RateLimited),
            _ => {}
        }

        let response = response
            .error_for_status()
            .map_err(|e| ClientError::Auth(e.to_string()))?;
        let token: TokenResponse = response.json().await?;

        let lifetime = token.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        let expires_at =
            Instant::now() + Duration::from_secs(lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN_SECS));

        debug!("Obtained access token - expires_in={}s", lifetime);
        *self.token.write().unwrap() = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at,
        });
        Ok(token.access_token)
    }

    fn check_status(
        response: reqwest::Response,
        post_id: &str,
    ) -> Result<reqwest::Response, ClientError> {
        match response.status() {
            StatusCode::NOT_FOUND => Err(ClientError::NotFound(post_id.to_string())),
            StatusCode::TOO_MANY_REQUESTS => Err(ClientError::RateLimited),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ClientError::Auth(format!(
                "request rejected with {}",
                response.status()
            ))),
            _ => response
                .error_for_status()
                .map_err(|e| ClientError::Network(e.to_string())),
        }
    }
}

impl CommentSource for RedditClient {
    fn fetch(&self, post_id: &str) -> Result<Vec<FetchedComment>, ClientError> {
        runtime::block_on(self.fetch_comments(post_id))
    }
}

/// Unix timestamp to a timezone-naive ISO-8601 string in `tz`.
pub fn local_iso_from_unix<Tz: TimeZone>(timestamp: f64, tz: &Tz) -> Option<String> {
    if !timestamp.is_finite() {
        return None;
    }
    let utc = DateTime::from_timestamp(timestamp.trunc() as i64, 0)?;
    Some(
        utc.with_timezone(tz)
            .naive_local()
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string(),
    )
}

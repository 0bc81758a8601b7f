// SPDX-License-Identifier: MPL-2.0

pub const APP_ID: &str = "io.github.threadmood";
pub const APP_NAME: &str = "threadmood";

/// Endpoint for application-only OAuth tokens
pub const DEFAULT_AUTH_BASE: &str = "https://www.reddit.com";
/// Endpoint for authenticated API calls
pub const DEFAULT_API_BASE: &str = "https://oauth.reddit.com";

pub const DB_FILE_NAME: &str = "reddit_comments.db";

/// Environment overrides for the settings file
pub const ENV_CLIENT_ID: &str = "REDDIT_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "REDDIT_CLIENT_SECRET";
pub const ENV_USER_AGENT: &str = "REDDIT_USER_AGENT";
pub const ENV_DB_PATH: &str = "THREADMOOD_DB";

// SPDX-License-Identifier: MPL-2.0

mod client;
mod types;
mod thread_url;

pub use client::{ClientError, CommentSource, RedditClient};
pub use types::{Credentials, FetchedComment};
pub use thread_url::post_id_from_url;

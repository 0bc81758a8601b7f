// SPDX-License-Identifier: MPL-2.0

//! Post identifier extraction from thread URLs.

use url::Url;

const COMMENTS_SEGMENT: &str = "comments";

/// Extract the post id from a thread URL such as
/// `https://www.reddit.com/r/rust/comments/abc123/some_title/`.
///
/// Returns `None` when there is no `comments` segment or nothing follows it.
pub fn post_id_from_url(input: &str) -> Option<String> {
    let trimmed = input.trim();

    // Absolute URLs go through the parser so query strings and fragments
    // never end up in the id.
    if let Ok(parsed) = Url::parse(trimmed) {
        if let Some(segments) = parsed.path_segments() {
            return id_after_comments(segments);
        }
    }

    id_after_comments(trimmed.trim_matches('/').split('/'))
}

fn id_after_comments<'a>(mut segments: impl Iterator<Item = &'a str>) -> Option<String> {
    segments.find(|s| *s == COMMENTS_SEGMENT)?;
    segments
        .next()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_style_url() {
        assert_eq!(
            post_id_from_url(".../comments/abc123/title"),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn test_full_thread_url() {
        assert_eq!(
            post_id_from_url("https://www.reddit.com/r/rust/comments/1abcde/whats_new/"),
            Some("1abcde".to_string())
        );
    }

    #[test]
    fn test_query_string_is_not_part_of_id() {
        assert_eq!(
            post_id_from_url("https://old.reddit.com/comments/xyz789?sort=new#top"),
            Some("xyz789".to_string())
        );
    }

    #[test]
    fn test_surrounding_whitespace_and_slashes() {
        assert_eq!(
            post_id_from_url("  /r/pics/comments/q1w2e3/  "),
            Some("q1w2e3".to_string())
        );
    }

    #[test]
    fn test_no_comments_segment() {
        assert_eq!(post_id_from_url("https://example.com/nope"), None);
        assert_eq!(post_id_from_url("not a url at all"), None);
        assert_eq!(post_id_from_url(""), None);
    }

    #[test]
    fn test_comments_is_last_segment() {
        assert_eq!(post_id_from_url("https://www.reddit.com/r/rust/comments"), None);
        assert_eq!(post_id_from_url("https://www.reddit.com/r/rust/comments/"), None);
    }
}

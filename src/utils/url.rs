// src/utils/url.rs

//! Invite link parsing.

use url::Url;

const JOIN_SEGMENT: &str = "join_group";

/// Group id and share token taken from a GroupMe invite link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteLink {
    pub group_id: String,
    pub share_token: String,
}

/// Parse a GroupMe invite link of the form `.../join_group/<group id>/<token>`.
///
/// A trailing slash, a query string, and a missing scheme are tolerated.
/// Anything after the token is rejected.
///
/// # Examples
/// ```
/// use rhacbot::utils::url::parse_invite_link;
///
/// let link = parse_invite_link("https://groupme.com/join_group/12345678/TOKEN/").unwrap();
/// assert_eq!(link.group_id, "12345678");
/// assert_eq!(link.share_token, "TOKEN");
///
/// assert!(parse_invite_link("https://groupme.com/join_group/12345678").is_none());
/// ```
pub fn parse_invite_link(link: &str) -> Option<InviteLink> {
    let link = link.trim();
    let segments: Vec<String> = match Url::parse(link) {
        Ok(url) if url.has_host() => url
            .path_segments()?
            .map(str::to_string)
            .collect(),
        _ => {
            let without_query = link.split(['?', '#']).next().unwrap_or_default();
            without_query.split('/').map(str::to_string).collect()
        }
    };

    let segments: Vec<&str> = segments
        .iter()
        .map(String::as_str)
        .filter(|s| !s.is_empty())
        .collect();

    let index = segments.iter().position(|s| *s == JOIN_SEGMENT)?;
    match &segments[index + 1..] {
        [group_id, share_token] => Some(InviteLink {
            group_id: group_id.to_string(),
            share_token: share_token.to_string(),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_link() {
        let link = parse_invite_link("https://groupme.com/join_group/12345678/SHARE_TOKEN_ABC")
            .unwrap();
        assert_eq!(link.group_id, "12345678");
        assert_eq!(link.share_token, "SHARE_TOKEN_ABC");
    }

    #[test]
    fn test_parse_tolerates_trailing_slash_and_query() {
        let link = parse_invite_link("https://groupme.com/join_group/12345678/TOKEN/").unwrap();
        assert_eq!(link.group_id, "12345678");
        assert_eq!(link.share_token, "TOKEN");

        let link = parse_invite_link("https://groupme.com/join_group/1/T?ref=share").unwrap();
        assert_eq!(link.share_token, "T");
    }

    #[test]
    fn test_parse_without_scheme() {
        let link = parse_invite_link("  groupme.com/join_group/42/abc ").unwrap();
        assert_eq!(link.group_id, "42");
        assert_eq!(link.share_token, "abc");
    }

    #[test]
    fn test_parse_rejects_invalid_links() {
        assert!(parse_invite_link("https://invalid-link.com").is_none());
        assert!(parse_invite_link("https://groupme.com/join_group/12345678").is_none());
        assert!(parse_invite_link("https://groupme.com/join_group/1/T/extra").is_none());
        assert!(parse_invite_link("").is_none());
    }
}

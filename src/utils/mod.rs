//! Utility functions and helpers.

pub mod http;
pub mod retry;

use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Resolve a URL string against a base URL string.
///
/// Falls back to plain concatenation when the base does not parse.
pub fn resolve(base_url: &str, href: &str) -> String {
    match Url::parse(base_url) {
        Ok(base) => resolve_url(&base, href),
        Err(_) => format!("{}{}", base_url.trim_end_matches('/'), href),
    }
}

/// Join a directory location and a file name.
///
/// Works for local paths and `s3://` locations alike; an empty directory
/// yields the bare file name.
pub fn join_location(directory: &str, file_name: &str) -> String {
    let directory = directory.trim();
    if directory.is_empty() {
        file_name.to_string()
    } else {
        format!("{}/{}", directory.trim_end_matches('/'), file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("https://download.bls.gov").unwrap();
        assert_eq!(
            resolve_url(&base, "/pub/time.series/pr/pr.class"),
            "https://download.bls.gov/pub/time.series/pr/pr.class"
        );
        assert_eq!(
            resolve_url(&base, "https://other.com/x"),
            "https://other.com/x"
        );
    }

    #[test]
    fn test_resolve_unparseable_base() {
        assert_eq!(resolve("not a url/", "/a.txt"), "not a url/a.txt");
    }

    #[test]
    fn test_join_location() {
        assert_eq!(join_location("", "pr.class"), "pr.class");
        assert_eq!(join_location("data/bls/", "pr.class"), "data/bls/pr.class");
        assert_eq!(
            join_location("s3://bucket/bls", "pr.class"),
            "s3://bucket/bls/pr.class"
        );
    }
}

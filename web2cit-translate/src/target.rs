//! Target resolution: raw URL or domain+path to a normalized webpage.
use url::Url;

use crate::error::TranslateError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub domain: String,
    /// Pathname plus search, as normalized by the URL parser.
    pub path: String,
    /// Full URL without fragment.
    pub href: String,
}

/// Resolve a target URL. Only `http` and `https` targets on default ports
/// are accepted.
pub fn resolve_url(raw: &str) -> Result<ResolvedTarget, TranslateError> {
    let invalid = |reason: String| TranslateError::InvalidTarget {
        target: raw.to_string(),
        reason,
    };

    let mut url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme \"{}\"", url.scheme())));
    }
    if url.port().is_some() {
        return Err(invalid("explicit ports are not supported".to_string()));
    }
    let domain = match url.host_str() {
        Some(host) if !host.is_empty() => host.to_string(),
        _ => return Err(invalid("missing host".to_string())),
    };
    url.set_fragment(None);

    Ok(ResolvedTarget {
        domain,
        path: path_of(&url),
        href: url.to_string(),
    })
}

/// Resolve a path within `domain`. Returns `None` when the path does not
/// designate a webpage on that domain.
pub fn resolve_path(domain: &str, path: &str) -> Option<ResolvedTarget> {
    if !path.starts_with('/') || path.starts_with("//") {
        return None;
    }
    let mut url = Url::parse(&format!("https://{}{}", domain, path)).ok()?;
    if url.port().is_some() || url.host_str() != Some(domain.to_lowercase().as_str()) {
        return None;
    }
    url.set_fragment(None);
    Some(ResolvedTarget {
        domain: domain.to_lowercase(),
        path: path_of(&url),
        href: url.to_string(),
    })
}

fn path_of(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_plain_url() {
        let target = resolve_url("https://www.example.com/article?id=3#top").unwrap();
        assert_eq!(target.domain, "www.example.com");
        assert_eq!(target.path, "/article?id=3");
        assert_eq!(target.href, "https://www.example.com/article?id=3");
    }

    #[test]
    fn normalizes_recoverable_urls() {
        let target = resolve_url("https:\\\\example.com\\a\\b").unwrap();
        assert_eq!(target.path, "/a/b");
        let target = resolve_url("https:/example.com/a%20b").unwrap();
        assert_eq!(target.domain, "example.com");
        assert_eq!(target.path, "/a%20b");
        let target = resolve_url("HTTP://EXAMPLE.com").unwrap();
        assert_eq!(target.domain, "example.com");
        assert_eq!(target.path, "/");
    }

    #[test]
    fn rejects_invalid_targets() {
        for raw in ["not a url", "ftp://example.com/file", "https://example.com:8080/", "mailto:a@b.c"] {
            assert!(
                matches!(resolve_url(raw), Err(TranslateError::InvalidTarget { .. })),
                "accepted {}",
                raw
            );
        }
    }

    #[test]
    fn resolves_paths_within_domain() {
        let target = resolve_path("example.com", "/a/../b?x=1").unwrap();
        assert_eq!(target.path, "/b?x=1");
        assert_eq!(target.href, "https://example.com/b?x=1");
        assert!(resolve_path("example.com", "article").is_none());
        assert!(resolve_path("example.com", "//evil.org/").is_none());
        assert!(resolve_path("example.com", "@evil.org/").is_none());
        assert!(resolve_path("example.com", ":8080/").is_none());
    }
}

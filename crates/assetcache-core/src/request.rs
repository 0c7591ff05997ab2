//! Incoming requests and the mapping between URLs and manifest keys.

use std::fmt;

use url::Url;

use crate::manifest::ROOT_PATH;

/// Query parameter appended to core resources during install.
const REVISION_PARAM: &str = "revision";

/// Version query stripped before manifest lookup (`main.dart.js?v=123`).
const VERSION_QUERY_PREFIX: &str = "v=";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Other,
}

impl Method {
    pub fn parse(method: &str) -> Self {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            _ => Method::Other,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Other => "OTHER",
        };
        f.write_str(name)
    }
}

/// A request seen by the interceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: Url,
}

impl Request {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::Get,
            url,
        }
    }
}

/// Map a request URL to its manifest key.
///
/// Returns `None` for URLs on another origin. A leading `v=` query is
/// dropped; any other query stays part of the key, so such requests never
/// match the manifest. The bare origin, an empty path and root fragments
/// (`/#/route`) all map to `"/"`.
pub fn normalize_path(origin: &Url, url: &Url) -> Option<String> {
    if url.origin() != origin.origin() {
        return None;
    }

    let path = url.path().trim_start_matches('/');
    if path.is_empty() {
        return match url.query() {
            Some(query) if !query.starts_with(VERSION_QUERY_PREFIX) => {
                Some(format!("{}?{}", ROOT_PATH, query))
            }
            _ => Some(ROOT_PATH.to_string()),
        };
    }

    match url.query() {
        Some(query) if !query.starts_with(VERSION_QUERY_PREFIX) => {
            Some(format!("{}?{}", path, query))
        }
        _ => Some(path.to_string()),
    }
}

/// URL of a manifest key on `origin`.
pub fn resource_url(origin: &Url, path: &str) -> Result<Url, url::ParseError> {
    if path == ROOT_PATH {
        origin.join("/")
    } else {
        origin.join(&format!("/{}", path))
    }
}

/// Cache-busting URL used when installing a core resource.
pub fn revision_url(origin: &Url, path: &str, digest: &str) -> Result<Url, url::ParseError> {
    let mut url = resource_url(origin, path)?;
    url.query_pairs_mut().append_pair(REVISION_PARAM, digest);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://app.example.com").unwrap()
    }

    fn key(url: &str) -> Option<String> {
        normalize_path(&origin(), &Url::parse(url).unwrap())
    }

    #[test]
    fn test_root_forms_collapse() {
        assert_eq!(key("https://app.example.com").as_deref(), Some("/"));
        assert_eq!(key("https://app.example.com/").as_deref(), Some("/"));
        assert_eq!(key("https://app.example.com/#/settings").as_deref(), Some("/"));
        assert_eq!(key("https://app.example.com/?v=42").as_deref(), Some("/"));
    }

    #[test]
    fn test_version_query_stripped() {
        assert_eq!(
            key("https://app.example.com/main.dart.js?v=1712").as_deref(),
            Some("main.dart.js")
        );
    }

    #[test]
    fn test_other_query_kept() {
        assert_eq!(
            key("https://app.example.com/main.dart.js?lang=en").as_deref(),
            Some("main.dart.js?lang=en")
        );
    }

    #[test]
    fn test_foreign_origin_ignored() {
        assert_eq!(key("https://cdn.example.com/main.dart.js"), None);
    }

    #[test]
    fn test_revision_url() {
        let url = revision_url(&origin(), "assets/NOTICES", "abc123").unwrap();
        assert_eq!(url.as_str(), "https://app.example.com/assets/NOTICES?revision=abc123");

        let root = revision_url(&origin(), "/", "r00t").unwrap();
        assert_eq!(root.as_str(), "https://app.example.com/?revision=r00t");
    }

    #[test]
    fn test_method_parse() {
        assert_eq!(Method::parse("get"), Method::Get);
        assert_eq!(Method::parse("PATCH"), Method::Other);
        assert_eq!(Method::Post.to_string(), "POST");
    }
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ManifestError;

/// Key under which the entry document is served.
pub const ROOT_PATH: &str = "/";

/// Application shell files downloaded before the worker can activate.
const DEFAULT_CORE: [&str; 6] = [
    "/",
    "main.dart.js",
    "index.html",
    "assets/NOTICES",
    "assets/AssetManifest.json",
    "assets/FontManifest.json",
];

/// Normalize a manifest key: the root collapses to `"/"`, everything else
/// is relative to the origin with no leading slash.
pub fn normalize_key(key: &str) -> String {
    let trimmed = key.trim_start_matches('/');
    if trimmed.is_empty() {
        ROOT_PATH.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Resource path -> content digest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct Manifest {
    resources: BTreeMap<String, String>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &str, digest: impl Into<String>) -> Option<String> {
        self.resources.insert(normalize_key(path), digest.into())
    }

    pub fn digest(&self, path: &str) -> Option<&str> {
        self.resources.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.resources.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.resources
            .iter()
            .map(|(path, digest)| (path.as_str(), digest.as_str()))
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// True when `path` is listed here with the same digest `previous` had.
    /// A path missing from either side is never unchanged.
    pub fn is_unchanged(&self, previous: &Manifest, path: &str) -> bool {
        match (self.digest(path), previous.digest(path)) {
            (Some(current), Some(old)) => current == old,
            _ => false,
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>, ManifestError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, ManifestError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl From<BTreeMap<String, String>> for Manifest {
    fn from(raw: BTreeMap<String, String>) -> Self {
        raw.into_iter().collect()
    }
}

impl From<Manifest> for BTreeMap<String, String> {
    fn from(manifest: Manifest) -> Self {
        manifest.resources
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Manifest {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut manifest = Manifest::new();
        for (path, digest) in iter {
            manifest.insert(path.as_ref(), digest);
        }
        manifest
    }
}

/// Ordered list of paths required for a first offline paint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct CoreSet {
    paths: Vec<String>,
}

impl CoreSet {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            paths: paths.into_iter().map(|p| normalize_key(p.as_ref())).collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl Default for CoreSet {
    fn default() -> Self {
        Self::new(DEFAULT_CORE)
    }
}

impl From<Vec<String>> for CoreSet {
    fn from(paths: Vec<String>) -> Self {
        Self::new(paths)
    }
}

impl From<CoreSet> for Vec<String> {
    fn from(core: CoreSet) -> Self {
        core.paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key(""), "/");
        assert_eq!(normalize_key("/"), "/");
        assert_eq!(normalize_key("/index.html"), "index.html");
        assert_eq!(normalize_key("assets/NOTICES"), "assets/NOTICES");
    }

    #[test]
    fn test_manifest_json_normalizes_root() {
        let manifest =
            Manifest::from_json(br#"{"": "abc", "index.html": "abc", "/main.dart.js": "def"}"#)
                .unwrap();
        assert_eq!(manifest.digest("/"), Some("abc"));
        assert_eq!(manifest.digest("main.dart.js"), Some("def"));
        assert_eq!(manifest.len(), 3);
    }

    #[test]
    fn test_manifest_json_is_flat_object() {
        let manifest: Manifest = [("/", "a1"), ("favicon.png", "b2")].into_iter().collect();
        let json: serde_json::Value = serde_json::from_slice(&manifest.to_json().unwrap()).unwrap();
        assert_eq!(json, serde_json::json!({"/": "a1", "favicon.png": "b2"}));
    }

    #[test]
    fn test_is_unchanged() {
        let old: Manifest = [("a.js", "1"), ("b.js", "2"), ("gone.js", "3")].into_iter().collect();
        let new: Manifest = [("a.js", "1"), ("b.js", "9"), ("c.js", "4")].into_iter().collect();

        assert!(new.is_unchanged(&old, "a.js"));
        assert!(!new.is_unchanged(&old, "b.js"));
        assert!(!new.is_unchanged(&old, "c.js"));
        assert!(!new.is_unchanged(&old, "gone.js"));
    }

    #[test]
    fn test_default_core_set() {
        let core = CoreSet::default();
        assert_eq!(core.len(), 6);
        assert_eq!(core.iter().next(), Some("/"));
        assert!(core.iter().any(|p| p == "assets/FontManifest.json"));
    }
}

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{CoreSet, Manifest, ManifestError, ROOT_PATH};

/// Entry page whose digest the root path duplicates.
const ENTRY_PAGE: &str = "index.html";

/// Everything the build hands to a worker: the resource manifest and the
/// core set installed eagerly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub resources: Manifest,
    #[serde(default)]
    pub core: CoreSet,
}

impl Deployment {
    pub fn new(resources: Manifest, core: CoreSet) -> Result<Self, ManifestError> {
        let deployment = Self { resources, core };
        deployment.validate()?;
        Ok(deployment)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, ManifestError> {
        let deployment: Deployment = serde_json::from_slice(bytes)?;
        deployment.validate()?;
        Ok(deployment)
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let contents = std::fs::read(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    /// Every core path must be a manifest key and no digest may be empty.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if let Some((path, _)) = self.resources.iter().find(|(_, digest)| digest.is_empty()) {
            return Err(ManifestError::EmptyDigest(path.to_string()));
        }

        if let Some(missing) = self.core.iter().find(|p| !self.resources.contains(p)) {
            return Err(ManifestError::MissingCoreKey(missing.to_string()));
        }

        if let (Some(root), Some(entry)) = (
            self.resources.digest(ROOT_PATH),
            self.resources.digest(ENTRY_PAGE),
        ) {
            if root != entry {
                warn!(root = root, entry = entry, "Root digest differs from entry page digest");
            }
        }

        Ok(())
    }

    /// Core paths paired with their digests, in install order.
    pub fn core_resources(&self) -> impl Iterator<Item = (&str, &str)> {
        self.core
            .iter()
            .filter_map(|path| self.resources.digest(path).map(|digest| (path, digest)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEPLOYMENT: &str = r#"{
        "resources": {
            "/": "r00t",
            "index.html": "r00t",
            "main.dart.js": "ma1n",
            "assets/NOTICES": "n0t1",
            "assets/AssetManifest.json": "a55e",
            "assets/FontManifest.json": "f0n7",
            "favicon.png": "fav1"
        }
    }"#;

    #[test]
    fn test_from_json_defaults_core() {
        let deployment = Deployment::from_json(DEPLOYMENT.as_bytes()).unwrap();
        assert_eq!(deployment.core, CoreSet::default());
        assert_eq!(deployment.resources.len(), 7);

        let core: Vec<_> = deployment.core_resources().collect();
        assert_eq!(core[0], ("/", "r00t"));
        assert_eq!(core.len(), 6);
    }

    #[test]
    fn test_missing_core_key_rejected() {
        let resources: Manifest = [("/", "r00t")].into_iter().collect();
        let err = Deployment::new(resources, CoreSet::new(["/", "main.dart.js"])).unwrap_err();
        assert!(matches!(err, ManifestError::MissingCoreKey(ref k) if k == "main.dart.js"));
    }

    #[test]
    fn test_empty_digest_rejected() {
        let resources: Manifest = [("/", "r00t"), ("app.js", "")].into_iter().collect();
        let err = Deployment::new(resources, CoreSet::new(["/"])).unwrap_err();
        assert!(matches!(err, ManifestError::EmptyDigest(ref k) if k == "app.js"));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deployment.json");
        std::fs::write(&path, DEPLOYMENT).unwrap();

        let deployment = Deployment::load(&path).unwrap();
        assert_eq!(deployment.resources.digest("favicon.png"), Some("fav1"));

        let err = Deployment::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ManifestError::Io { .. }));
    }
}

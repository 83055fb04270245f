//! On-disk manifest of generated pages
//!
//! Records a content hash per route so that `generate` only rewrites pages
//! whose HTML changed and removes pages of posts that no longer exist.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

/// Cache directory, relative to the site directory
pub const CACHE_DIR: &str = ".spacetraveling-cache";
/// Manifest file, relative to the site directory
const MANIFEST_FILE: &str = ".spacetraveling-cache/manifest.json";

/// Represents a generated page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Hash of the rendered HTML
    pub content_hash: u64,
    /// Output path relative to public dir
    pub output_path: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Manifest {
    /// Version of the manifest format
    pub version: u32,
    /// Entries keyed by route
    pub routes: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    /// Current manifest format version
    const VERSION: u32 = 1;

    /// Create a new manifest with version set
    pub fn new() -> Self {
        Self {
            version: Self::VERSION,
            ..Default::default()
        }
    }

    /// Load the manifest from disk, or start empty
    pub fn load(base_dir: &Path) -> Self {
        let path = base_dir.join(MANIFEST_FILE);
        if let Ok(content) = fs::read_to_string(&path) {
            match serde_json::from_str::<Manifest>(&content) {
                Ok(manifest) if manifest.version == Self::VERSION => return manifest,
                Ok(_) => tracing::info!("Manifest version mismatch, rebuilding"),
                Err(e) => tracing::warn!("Ignoring unreadable manifest {:?}: {}", path, e),
            }
        }
        Self::new()
    }

    /// Save the manifest to disk
    pub fn save(&self, base_dir: &Path) -> Result<()> {
        fs::create_dir_all(base_dir.join(CACHE_DIR))?;
        let content = serde_json::to_string_pretty(self)?;
        fs::write(base_dir.join(MANIFEST_FILE), content)?;
        Ok(())
    }

    /// Compare the pages of a build with the previous one. A page is changed
    /// when its hash differs or its output file is gone.
    pub fn plan(&self, public_dir: &Path, pages: &[(String, u64)]) -> ChangeSet {
        let mut changeset = ChangeSet::default();

        for (route, hash) in pages {
            match self.routes.get(route) {
                Some(entry)
                    if entry.content_hash == *hash
                        && public_dir.join(&entry.output_path).exists() =>
                {
                    changeset.unchanged.push(route.clone());
                }
                Some(_) => {
                    tracing::debug!("Page changed: {}", route);
                    changeset.changed.push(route.clone());
                }
                None => {
                    tracing::debug!("New page: {}", route);
                    changeset.changed.push(route.clone());
                }
            }
        }

        let current: HashSet<&str> = pages.iter().map(|(route, _)| route.as_str()).collect();
        for (route, entry) in &self.routes {
            if !current.contains(route.as_str()) {
                tracing::debug!("Removed page: {}", route);
                changeset.removed.push((route.clone(), entry.output_path.clone()));
            }
        }

        changeset
    }

    /// Replace all entries with the pages of the current build
    pub fn update(&mut self, pages: &[(String, u64, String)], now: DateTime<Utc>) {
        self.version = Self::VERSION;
        let previous = std::mem::take(&mut self.routes);
        for (route, hash, output_path) in pages {
            let generated_at = match previous.get(route) {
                Some(entry) if entry.content_hash == *hash => entry.generated_at,
                _ => now,
            };
            self.routes.insert(
                route.clone(),
                ManifestEntry {
                    content_hash: *hash,
                    output_path: output_path.clone(),
                    generated_at,
                },
            );
        }
    }
}

/// Change detection result
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    /// Routes to write
    pub changed: Vec<String>,
    pub unchanged: Vec<String>,
    /// Routes that disappeared, with their output path
    pub removed: Vec<(String, String)>,
}

impl ChangeSet {
    /// Check if any changes were detected
    pub fn has_changes(&self) -> bool {
        !self.changed.is_empty() || !self.removed.is_empty()
    }

    /// Get summary of changes for logging
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if !self.changed.is_empty() {
            parts.push(format!("{} pages changed", self.changed.len()));
        }
        if !self.removed.is_empty() {
            parts.push(format!("{} pages removed", self.removed.len()));
        }
        if parts.is_empty() {
            "no changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Calculate a hash for page content
pub fn hash_content(content: &str) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}

/// Output file of a route, relative to the public dir
pub fn output_path(route: &str) -> String {
    let clean = route.trim_matches('/');
    if clean.is_empty() {
        "index.html".to_string()
    } else {
        format!("{}/index.html", clean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path() {
        assert_eq!(output_path("/"), "index.html");
        assert_eq!(output_path("/post/a"), "post/a/index.html");
    }

    #[test]
    fn test_plan_detects_changed_new_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let public = dir.path().join("public");
        fs::create_dir_all(public.join("post/a")).unwrap();
        fs::write(public.join("post/a/index.html"), "a").unwrap();
        fs::write(public.join("index.html"), "home").unwrap();

        let mut manifest = Manifest::new();
        manifest.update(
            &[
                ("/".to_string(), 1, output_path("/")),
                ("/post/a".to_string(), 2, output_path("/post/a")),
                ("/post/gone".to_string(), 3, output_path("/post/gone")),
            ],
            Utc::now(),
        );

        let changes = manifest.plan(
            &public,
            &[
                ("/".to_string(), 10),
                ("/post/a".to_string(), 2),
                ("/post/b".to_string(), 4),
            ],
        );
        assert_eq!(changes.changed, vec!["/", "/post/b"]);
        assert_eq!(changes.unchanged, vec!["/post/a"]);
        assert_eq!(
            changes.removed,
            vec![("/post/gone".to_string(), "post/gone/index.html".to_string())]
        );
        assert!(changes.has_changes());
    }

    #[test]
    fn test_missing_output_is_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let mut manifest = Manifest::new();
        manifest.update(&[("/".to_string(), 1, output_path("/"))], Utc::now());

        let changes = manifest.plan(dir.path(), &[("/".to_string(), 1)]);
        assert_eq!(changes.changed, vec!["/"]);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut manifest = Manifest::new();
        manifest.update(
            &[("/".to_string(), hash_content("home"), output_path("/"))],
            Utc::now(),
        );
        manifest.save(dir.path()).unwrap();

        let loaded = Manifest::load(dir.path());
        assert_eq!(loaded.routes.len(), 1);
        assert_eq!(loaded.routes["/"].content_hash, hash_content("home"));
    }

    #[test]
    fn test_load_ignores_other_versions() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(CACHE_DIR)).unwrap();
        fs::write(
            dir.path().join(MANIFEST_FILE),
            r#"{"version": 99, "routes": {}}"#,
        )
        .unwrap();
        assert_eq!(Manifest::load(dir.path()).version, 1);
    }
}

//! Archive-backed resource locator.
//!
//! Resolves `archive:` URIs against a configured list of zip-style
//! containers (`.zip`, `.jar`, `.war`). An exact URI is looked up container
//! by container, first hit wins. A wildcard URI is a deliberate union: every
//! container whose entries fall under the literal prefix contributes its
//! matches, in entry discovery order, each container contributing each
//! matching entry exactly once. The same logical path appearing in more than
//! one container is not a conflict, it widens the match set.

use std::io::Read;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, trace};
use zip::ZipArchive;

use crate::core::{BundleError, Result};
use crate::locator::ResourceLocator;
use crate::locator::wildcard::{self, WildcardContext, WildcardPolicy};

/// URI scheme handled by [`ArchiveLocator`].
pub const SCHEME: &str = "archive:";

/// Resolves `archive:<entry-path>` URIs across a list of containers.
pub struct ArchiveLocator {
    archives: Vec<PathBuf>,
    policy: WildcardPolicy,
}

impl ArchiveLocator {
    /// Locator searching the given containers, in order.
    pub fn new(archives: Vec<PathBuf>) -> Self {
        Self {
            archives,
            policy: WildcardPolicy::default(),
        }
    }

    /// Override the zero-match policy for wildcard URIs.
    pub fn with_policy(mut self, policy: WildcardPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn open_container(&self, uri: &str, path: &Path) -> Result<ZipArchive<std::fs::File>> {
        let file = std::fs::File::open(path).map_err(|err| BundleError::ResourceUnreadable {
            uri: uri.to_string(),
            reason: format!("{}: {err}", path.display()),
        })?;
        ZipArchive::new(file).map_err(|err| BundleError::ResourceUnreadable {
            uri: uri.to_string(),
            reason: format!("{}: {err}", path.display()),
        })
    }

    fn read_exact_entry(&self, uri: &str, entry_path: &str) -> Result<String> {
        for archive_path in &self.archives {
            let mut container = self.open_container(uri, archive_path)?;
            match container.by_name(entry_path) {
                Ok(mut entry) => {
                    trace!(uri, container = %archive_path.display(), "found archive entry");
                    let mut content = String::new();
                    entry
                        .read_to_string(&mut content)
                        .map_err(|err| BundleError::ResourceUnreadable {
                            uri: uri.to_string(),
                            reason: err.to_string(),
                        })?;
                    return Ok(content);
                }
                Err(_) => continue,
            }
        }
        Err(BundleError::ResourceUnreadable {
            uri: uri.to_string(),
            reason: "entry not found in any configured container".to_string(),
        })
    }

    fn expand_wildcard(&self, uri: &str, entry_path: &str) -> Result<String> {
        let context = WildcardContext::new(entry_path)?;
        let prefix = context.prefix();

        let mut merged = String::new();
        let mut matched = 0usize;
        for archive_path in &self.archives {
            let mut container = self.open_container(uri, archive_path)?;
            for index in 0..container.len() {
                let mut entry =
                    container
                        .by_index(index)
                        .map_err(|err| BundleError::ResourceUnreadable {
                            uri: uri.to_string(),
                            reason: format!("{}: {err}", archive_path.display()),
                        })?;
                if !entry.is_file() {
                    continue;
                }
                let name = entry.name().to_string();
                // accept only children of the prefix, never the prefix itself
                if !name.starts_with(prefix) || name == prefix {
                    continue;
                }
                if !context.matches(&name[prefix.len()..]) {
                    continue;
                }
                trace!(entry = %name, container = %archive_path.display(), "archive wildcard match");
                entry
                    .read_to_string(&mut merged)
                    .map_err(|err| BundleError::ResourceUnreadable {
                        uri: uri.to_string(),
                        reason: format!("{name}: {err}"),
                    })?;
                matched += 1;
            }
        }
        debug!(uri, matched, containers = self.archives.len(), "expanded archive wildcard");

        if matched == 0 && self.policy == WildcardPolicy::Require {
            return Err(BundleError::NoMatch {
                pattern: uri.to_string(),
            });
        }
        Ok(merged)
    }
}

#[async_trait]
impl ResourceLocator for ArchiveLocator {
    fn can_handle(&self, uri: &str) -> bool {
        uri.starts_with(SCHEME)
    }

    fn set_wildcard_policy(&mut self, policy: WildcardPolicy) {
        self.policy = policy;
    }

    async fn open(&self, uri: &str) -> Result<String> {
        let entry_path = uri[SCHEME.len()..].trim_start_matches('/');
        if wildcard::has_wildcard(entry_path) {
            self.expand_wildcard(uri, entry_path)
        } else {
            self.read_exact_entry(uri, entry_path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    fn build_archive(path: &Path, entries: &[(&str, &str)]) {
        let file = std::fs::File::create(path).unwrap();
        let mut writer = ZipWriter::new(file);
        for (name, content) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[tokio::test]
    async fn exact_entry_first_container_wins() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.zip");
        let second = dir.path().join("second.zip");
        build_archive(&first, &[("js/app.js", "from-first")]);
        build_archive(&second, &[("js/app.js", "from-second")]);

        let locator = ArchiveLocator::new(vec![first, second]);
        assert_eq!(
            locator.open("archive:js/app.js").await.unwrap(),
            "from-first"
        );
    }

    #[tokio::test]
    async fn exact_entry_falls_through_containers() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.zip");
        let second = dir.path().join("second.zip");
        build_archive(&first, &[("js/other.js", "x")]);
        build_archive(&second, &[("js/app.js", "found")]);

        let locator = ArchiveLocator::new(vec![first, second]);
        assert_eq!(locator.open("archive:js/app.js").await.unwrap(), "found");
    }

    #[tokio::test]
    async fn wildcard_unions_across_containers() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.zip");
        let second = dir.path().join("second.zip");
        build_archive(
            &first,
            &[("css/themes/dark.css", "dark;"), ("css/other.css", "skip;")],
        );
        build_archive(&second, &[("css/themes/light.css", "light;")]);

        let locator = ArchiveLocator::new(vec![first, second]);
        let merged = locator.open("archive:css/themes/*.css").await.unwrap();
        // entries from both containers, in container then discovery order
        assert_eq!(merged, "dark;light;");
    }

    #[tokio::test]
    async fn wildcard_excludes_prefix_entry_itself() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("a.zip");
        build_archive(&archive, &[("css/themes/", ""), ("css/themes/x.css", "x;")]);

        let locator = ArchiveLocator::new(vec![archive]);
        assert_eq!(locator.open("archive:css/themes/*.css").await.unwrap(), "x;");
    }

    #[tokio::test]
    async fn missing_entry_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("a.zip");
        build_archive(&archive, &[("js/app.js", "x")]);

        let locator = ArchiveLocator::new(vec![archive]);
        let err = locator.open("archive:js/missing.js").await.unwrap_err();
        assert!(matches!(err, BundleError::ResourceUnreadable { .. }));
    }

    #[tokio::test]
    async fn no_wildcard_match_follows_policy() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("a.zip");
        build_archive(&archive, &[("js/app.js", "x")]);

        let strict = ArchiveLocator::new(vec![archive.clone()]);
        let err = strict.open("archive:css/*.css").await.unwrap_err();
        assert!(matches!(err, BundleError::NoMatch { .. }));

        let lenient = ArchiveLocator::new(vec![archive]).with_policy(WildcardPolicy::AllowEmpty);
        assert_eq!(lenient.open("archive:css/*.css").await.unwrap(), "");
    }

    #[test]
    fn only_archive_scheme_is_accepted() {
        let locator = ArchiveLocator::new(vec![]);
        assert!(locator.can_handle("archive:js/app.js"));
        assert!(!locator.can_handle("/js/app.js"));
    }
}

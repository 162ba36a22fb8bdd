//! Webjar-style resource locator.
//!
//! Resolves `webjar:` URIs against the same zip-style containers the archive
//! locator searches, but from a partial path: `webjar:jquery.min.js` finds
//! the one entry across all containers whose path ends with that name and
//! reads it. The partial path may carry leading segments
//! (`webjar:jquery/3.1.1/jquery.min.js`) to disambiguate; a partial path
//! matching more than one distinct entry is an error, never a guess.

use std::io::Read;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, trace};
use zip::ZipArchive;

use crate::core::{BundleError, Result};
use crate::locator::ResourceLocator;

/// URI scheme handled by [`WebjarLocator`].
pub const SCHEME: &str = "webjar:";

/// Resolves `webjar:<partial-path>` URIs to their unique container entry.
pub struct WebjarLocator {
    archives: Vec<PathBuf>,
}

impl WebjarLocator {
    /// Locator searching the given containers.
    pub fn new(archives: Vec<PathBuf>) -> Self {
        Self { archives }
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

    /// Whether `entry` resolves the partial path: equal, or ending in
    /// `/<partial>`.
    fn suffix_matches(entry: &str, partial: &str) -> bool {
        entry == partial
            || (entry.len() > partial.len()
                && entry.ends_with(partial)
                && entry.as_bytes()[entry.len() - partial.len() - 1] == b'/')
    }

    fn resolve(&self, uri: &str, partial: &str) -> Result<String> {
        // (entry path, content); first container wins for identical paths
        let mut matches: Vec<(String, String)> = Vec::new();
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
                if !Self::suffix_matches(&name, partial) {
                    continue;
                }
                if matches.iter().any(|(existing, _)| *existing == name) {
                    continue;
                }
                trace!(entry = %name, container = %archive_path.display(), "webjar candidate");
                let mut content = String::new();
                entry
                    .read_to_string(&mut content)
                    .map_err(|err| BundleError::ResourceUnreadable {
                        uri: uri.to_string(),
                        reason: format!("{name}: {err}"),
                    })?;
                matches.push((name, content));
            }
        }

        match matches.len() {
            0 => Err(BundleError::ResourceUnreadable {
                uri: uri.to_string(),
                reason: "no webjar entry matches in any configured container".to_string(),
            }),
            1 => {
                let (name, content) = matches.remove(0);
                debug!(uri, entry = %name, "resolved webjar uri");
                Ok(content)
            }
            _ => {
                let candidates: Vec<String> =
                    matches.into_iter().map(|(name, _)| name).collect();
                Err(BundleError::ResourceUnreadable {
                    uri: uri.to_string(),
                    reason: format!("ambiguous webjar path, matches: {}", candidates.join(", ")),
                })
            }
        }
    }
}

#[async_trait]
impl ResourceLocator for WebjarLocator {
    fn can_handle(&self, uri: &str) -> bool {
        uri.trim_start().starts_with(SCHEME)
    }

    async fn open(&self, uri: &str) -> Result<String> {
        let Some(partial) = uri.trim_start().strip_prefix(SCHEME) else {
            return Err(BundleError::ResourceUnreadable {
                uri: uri.to_string(),
                reason: "not a webjar uri".to_string(),
            });
        };
        let partial = partial.trim_start_matches('/');
        // query suffixes address a serving concern, not an entry
        let partial = partial.split('?').next().unwrap_or(partial);
        if partial.is_empty() {
            return Err(BundleError::ResourceUnreadable {
                uri: uri.to_string(),
                reason: "empty webjar path".to_string(),
            });
        }
        self.resolve(uri, partial)
    }
}

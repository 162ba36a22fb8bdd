//! Wildcard-segment expansion.
//!
//! A resource URI may carry shell-style wildcards (`*`, `?`, `[...]`, and
//! `**` for recursive descent) in its final path segment only. The URI is
//! split into a literal prefix path and one wildcard segment; a wildcard
//! anywhere else is a configuration error surfaced when the context is
//! created, never a runtime matching failure.
//!
//! Matching against a directory enumerates entries lexically for a stable
//! order and descends into subdirectories only when the pattern contains
//! `**`. Each walk visits each entry exactly once, so matches are
//! deduplicated by construction.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use serde::Deserialize;
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::core::{BundleError, Result};

/// Characters that make a URI segment a wildcard segment.
const WILDCARD_CHARS: [char; 3] = ['*', '?', '['];

/// What to do when a wildcard matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WildcardPolicy {
    /// Zero matches fail with [`BundleError::NoMatch`].
    #[default]
    Require,
    /// Zero matches expand to empty content.
    AllowEmpty,
}

/// Whether a URI contains a wildcard segment at all.
pub fn has_wildcard(uri: &str) -> bool {
    uri.contains(WILDCARD_CHARS)
}

/// One URI split into a literal prefix path and a compiled wildcard segment.
///
/// Ephemeral: derived per expansion call, never persisted.
#[derive(Debug, Clone)]
pub struct WildcardContext {
    uri: String,
    prefix: String,
    segment: String,
    pattern: Pattern,
    recursive: bool,
}

impl WildcardContext {
    /// Split `uri` and compile its wildcard segment.
    ///
    /// Fails with [`BundleError::InvalidPattern`] when a wildcard appears
    /// outside the final path segment (which also covers a second wildcard
    /// segment) or when the segment is not a valid glob.
    pub fn new(uri: &str) -> Result<Self> {
        let (prefix, segment) = match uri.rfind('/') {
            Some(i) => (&uri[..=i], &uri[i + 1..]),
            None => ("", uri),
        };
        if has_wildcard(prefix) {
            return Err(BundleError::InvalidPattern {
                uri: uri.to_string(),
                reason: "only the final path segment may contain a wildcard".to_string(),
            });
        }
        if !has_wildcard(segment) {
            return Err(BundleError::InvalidPattern {
                uri: uri.to_string(),
                reason: "uri has no wildcard segment".to_string(),
            });
        }
        let recursive = segment.contains("**");
        // glob's `**` must be a full path component; the wro-style `**.js`
        // shape is expressed as `*` with separator crossing enabled instead
        let glob_src = if recursive {
            segment.replace("**", "*")
        } else {
            segment.to_string()
        };
        let pattern = Pattern::new(&glob_src).map_err(|err| BundleError::InvalidPattern {
            uri: uri.to_string(),
            reason: err.to_string(),
        })?;
        Ok(Self {
            uri: uri.to_string(),
            prefix: prefix.to_string(),
            segment: segment.to_string(),
            pattern,
            recursive,
        })
    }

    /// The original URI.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Literal prefix path, ending with `/` unless empty.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The raw wildcard segment.
    pub fn segment(&self) -> &str {
        &self.segment
    }

    /// Whether the pattern descends through subdirectories.
    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// Match a path relative to the literal prefix, `/`-separated.
    pub fn matches(&self, relative: &str) -> bool {
        if !self.recursive && relative.contains('/') {
            return false;
        }
        let options = MatchOptions {
            // a recursive segment may swallow separators
            require_literal_separator: !self.recursive,
            ..MatchOptions::new()
        };
        self.pattern.matches_with(relative, options)
    }

    /// All files under `dir` matching the wildcard segment, lexically
    /// ordered.
    ///
    /// Descends recursively only for `**` patterns. Zero matches follow
    /// `policy`; a missing directory counts as zero matches.
    pub fn expand_filesystem(&self, dir: &Path, policy: WildcardPolicy) -> Result<Vec<PathBuf>> {
        debug!(uri = %self.uri, dir = %dir.display(), "expanding wildcard");
        let mut walker = WalkDir::new(dir).follow_links(false).sort_by_file_name();
        if !self.recursive {
            walker = walker.max_depth(1);
        }

        let mut matches = Vec::new();
        for entry in walker.into_iter().filter_map(std::result::Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
            let relative = relative.to_string_lossy().replace('\\', "/");
            if self.matches(&relative) {
                trace!(entry = %relative, "wildcard match");
                matches.push(entry.into_path());
            }
        }

        if matches.is_empty() && policy == WildcardPolicy::Require {
            return Err(BundleError::NoMatch {
                pattern: self.uri.clone(),
            });
        }
        Ok(matches)
    }
}

//! Filesystem-backed resource locator.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::trace;

use crate::core::{BundleError, Result};
use crate::locator::ResourceLocator;
use crate::locator::wildcard::{self, WildcardContext, WildcardPolicy};

/// Resolves scheme-less URIs against a base directory.
///
/// A URI like `/js/app.js` maps to `<base>/js/app.js`. A URI whose final
/// segment carries a wildcard expands to the concatenation of every matching
/// file, in lexical order.
pub struct FileSystemLocator {
    base: PathBuf,
    policy: WildcardPolicy,
}

impl FileSystemLocator {
    /// Locator rooted at `base` with the default wildcard policy.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            policy: WildcardPolicy::default(),
        }
    }

    /// Override the zero-match policy.
    pub fn with_policy(mut self, policy: WildcardPolicy) -> Self {
        self.policy = policy;
        self
    }

    async fn read_file(&self, uri: &str, path: &std::path::Path) -> Result<String> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|err| BundleError::ResourceUnreadable {
                uri: uri.to_string(),
                reason: format!("{}: {err}", path.display()),
            })
    }
}

#[async_trait]
impl ResourceLocator for FileSystemLocator {
    fn can_handle(&self, uri: &str) -> bool {
        // scheme-less uris only; anything with a scheme belongs elsewhere
        !uri.contains(':')
    }

    fn set_wildcard_policy(&mut self, policy: WildcardPolicy) {
        self.policy = policy;
    }

    async fn open(&self, uri: &str) -> Result<String> {
        let relative = uri.trim_start_matches('/');
        if !wildcard::has_wildcard(uri) {
            return self.read_file(uri, &self.base.join(relative)).await;
        }

        let context = WildcardContext::new(relative)?;
        let dir = self.base.join(context.prefix());
        let files = context.expand_filesystem(&dir, self.policy)?;
        trace!(uri, matches = files.len(), "expanded filesystem wildcard");

        let mut merged = String::new();
        for file in files {
            merged.push_str(&self.read_file(uri, &file).await?);
        }
        Ok(merged)
    }
}

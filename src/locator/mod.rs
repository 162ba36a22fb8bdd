//! Resource locators: from a URI to content.
//!
//! A [`ResourceLocator`] turns a resource URI into its content, transparently
//! expanding wildcard segments into the concatenation of all matching
//! concrete resources. Locators are pluggable per URI shape and tried in a
//! configured priority order; the first locator that accepts a URI handles
//! it.
//!
//! - [`filesystem`] - plain files under a base directory
//! - [`archive`] - entries packed inside zip-style containers
//! - [`webjar`] - bare asset names resolved to their unique container entry
//! - [`wildcard`] - the shared wildcard-segment machinery

pub mod archive;
pub mod filesystem;
pub mod webjar;
pub mod wildcard;

pub use archive::ArchiveLocator;
pub use filesystem::FileSystemLocator;
pub use webjar::WebjarLocator;
pub use wildcard::{WildcardContext, WildcardPolicy};

use async_trait::async_trait;
use tracing::trace;

use crate::core::{BundleError, Result};

/// Resolves a resource URI into its content.
#[async_trait]
pub trait ResourceLocator: Send + Sync {
    /// Whether this locator understands the given URI.
    fn can_handle(&self, uri: &str) -> bool;

    /// Read the resource. A URI with a wildcard segment yields the
    /// concatenation of all matching concrete resources.
    async fn open(&self, uri: &str) -> Result<String>;

    /// Apply a bundler-level zero-match policy for wildcard expansion.
    ///
    /// Locators without wildcard support ignore this.
    fn set_wildcard_policy(&mut self, _policy: WildcardPolicy) {}
}

/// Ordered set of locators; the first acceptor wins per resource.
///
/// Registration order is the explicit priority list: when a URI is accepted
/// by more than one locator, the one registered earlier handles it.
pub struct LocatorRegistry {
    locators: Vec<Box<dyn ResourceLocator>>,
}

impl LocatorRegistry {
    /// Registry over the given locators, in priority order.
    pub fn new(locators: Vec<Box<dyn ResourceLocator>>) -> Self {
        Self { locators }
    }

    /// Open `uri` through the first locator that accepts it.
    pub async fn open(&self, uri: &str) -> Result<String> {
        for locator in &self.locators {
            if locator.can_handle(uri) {
                trace!(uri, "locator accepted uri");
                return locator.open(uri).await;
            }
        }
        Err(BundleError::ResourceUnreadable {
            uri: uri.to_string(),
            reason: "no locator accepts this uri".to_string(),
        })
    }

    /// Number of registered locators.
    pub fn len(&self) -> usize {
        self.locators.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }
}

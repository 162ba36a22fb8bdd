//! Error handling for sitepack.
//!
//! Every failure the crate can surface is a variant of [`BundleError`]. The
//! taxonomy distinguishes failures that are fatal to a single lookup (a group
//! that does not exist) from failures that are fatal to one resolution attempt
//! but not to the service (an unreadable declaration source during a scheduled
//! refresh, where the previous model is retained).
//!
//! All variants hold owned data and the enum is `Clone`: the content cache
//! coalesces concurrent computations for the same key onto a single in-flight
//! future, and every waiter receives a clone of that computation's outcome,
//! success or failure.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BundleError>;

/// The error type for all sitepack operations.
#[derive(Debug, Clone, Error)]
pub enum BundleError {
    /// The declaration source could not be opened or read.
    ///
    /// Fatal to the resolution attempt that hit it. When it happens during a
    /// scheduled background refresh the previous model is kept and the error
    /// is only logged.
    #[error("declaration source unavailable: {reason}")]
    SourceUnavailable {
        /// Why the source could not be read.
        reason: String,
    },

    /// The declaration source was readable but malformed.
    #[error("malformed group declaration: {reason}")]
    ModelParse {
        /// Specific reason for the parse failure.
        reason: String,
    },

    /// A group references itself, directly or through other groups.
    ///
    /// Carries the traversal path that closes the cycle, for diagnostics.
    #[error("recursive reference detected for group '{group}' (path: {})", path.join(" -> "))]
    RecursiveGroup {
        /// The group at which the cycle was detected.
        group: String,
        /// The reference chain that closes the cycle, ending with `group`.
        path: Vec<String>,
    },

    /// No group of the requested name exists in the current model.
    ///
    /// Policy-gated: with `ignore_missing_group` enabled the processor
    /// returns empty content instead.
    #[error("group '{name}' not found in model")]
    GroupNotFound {
        /// The requested group name.
        name: String,
    },

    /// The group exists but resolves to zero resources of the requested type.
    ///
    /// Policy-gated: with `ignore_empty_group` enabled the processor returns
    /// empty content instead.
    #[error("group '{name}' resolved to zero resources")]
    EmptyGroup {
        /// The empty group's name.
        name: String,
    },

    /// A resource could not be located or read.
    ///
    /// Propagates as a processing failure for the whole group containing the
    /// resource.
    #[error("cannot read resource '{uri}': {reason}")]
    ResourceUnreadable {
        /// The resource URI that failed.
        uri: String,
        /// Why it could not be read.
        reason: String,
    },

    /// A pre- or post-processor failed.
    ///
    /// Policy-gated: with `ignore_failing_processor` enabled the processor is
    /// skipped and its unmodified input forwarded to the next stage.
    #[error("processor '{processor}' failed on '{scope}': {reason}")]
    Transformer {
        /// Name of the failing processor.
        processor: String,
        /// What was being processed (a resource URI or the merged group).
        scope: String,
        /// The underlying failure.
        reason: String,
    },

    /// A wildcard pattern matched no entries.
    ///
    /// Policy-gated through [`WildcardPolicy`](crate::locator::WildcardPolicy):
    /// `AllowEmpty` turns this into empty content.
    #[error("wildcard '{pattern}' matched no entries")]
    NoMatch {
        /// The pattern that matched nothing.
        pattern: String,
    },

    /// A resource URI contains an unsupported wildcard shape.
    ///
    /// Surfaced when the wildcard context is created, not during matching: a
    /// URI with a wildcard outside its final path segment is a configuration
    /// error, never a runtime condition.
    #[error("invalid wildcard uri '{uri}': {reason}")]
    InvalidPattern {
        /// The offending URI.
        uri: String,
        /// Why it is rejected.
        reason: String,
    },

    /// The bundler configuration could not be parsed.
    #[error("invalid configuration: {reason}")]
    Config {
        /// Specific reason for the configuration failure.
        reason: String,
    },

    /// The bundler was torn down; no further lookups are served.
    #[error("bundler is shut down")]
    ShutDown,
}

//! Transformer chain contract and group processing.
//!
//! Transformers are external collaborators: the core only defines the chain
//! shapes and the failure policy around them. A pre-processor runs over each
//! individual resource; a post-processor runs over the merged group output.
//! Either may fail, and the group processor decides whether that failure
//! aborts the computation or degrades to passing the input through
//! unchanged.

pub mod group;

pub use group::{GroupProcessor, ProcessingPolicy};

use async_trait::async_trait;

use crate::core::Result;
use crate::model::Resource;

/// Transforms one resource's content before merging.
#[async_trait]
pub trait ResourcePreProcessor: Send + Sync {
    /// Name used in logs and transformer errors.
    fn name(&self) -> &str;

    /// Whether this processor only applies when minimization is requested.
    ///
    /// A minimize-aware processor is skipped when the cache key asks for an
    /// unminimized bundle or the individual resource opted out with
    /// `minimize = false`.
    fn minimize_aware(&self) -> bool {
        false
    }

    /// Transform `input` for the given resource.
    async fn process(&self, resource: &Resource, input: &str) -> Result<String>;
}

/// Transforms the merged group output.
#[async_trait]
pub trait PostProcessor: Send + Sync {
    /// Name used in logs and transformer errors.
    fn name(&self) -> &str;

    /// Whether this processor only applies when minimization is requested.
    fn minimize_aware(&self) -> bool {
        false
    }

    /// Transform the merged `input`.
    async fn process(&self, input: &str) -> Result<String>;
}

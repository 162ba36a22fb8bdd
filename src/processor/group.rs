//! Group processing: from a cache key to merged, transformed content.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::CacheKey;
use crate::core::{BundleError, Result};
use crate::locator::LocatorRegistry;
use crate::model::{ModelService, Resource};
use crate::processor::{PostProcessor, ResourcePreProcessor};

/// Failure and leniency policy for group processing.
///
/// Missing-group and empty-group tolerance are deliberately independent
/// flags, not one combined switch.
#[derive(Debug, Clone, Copy)]
pub struct ProcessingPolicy {
    /// Return empty content instead of failing when the group does not
    /// exist.
    pub ignore_missing_group: bool,
    /// Return empty content instead of failing when the group has no
    /// resources of the requested type.
    pub ignore_empty_group: bool,
    /// Skip a failing processor and forward its unmodified input to the next
    /// stage instead of aborting the group.
    pub ignore_failing_processor: bool,
}

impl Default for ProcessingPolicy {
    fn default() -> Self {
        Self {
            ignore_missing_group: false,
            ignore_empty_group: true,
            ignore_failing_processor: false,
        }
    }
}

/// Computes the merged, transformed content for one cache key.
///
/// Stateless apart from its collaborators: caching is the caller's concern,
/// the processor only ever computes.
pub struct GroupProcessor {
    model: Arc<ModelService>,
    locators: Arc<LocatorRegistry>,
    pre_processors: Vec<Arc<dyn ResourcePreProcessor>>,
    post_processors: Vec<Arc<dyn PostProcessor>>,
    policy: ProcessingPolicy,
}

impl GroupProcessor {
    /// Processor over the given collaborators.
    pub fn new(
        model: Arc<ModelService>,
        locators: Arc<LocatorRegistry>,
        pre_processors: Vec<Arc<dyn ResourcePreProcessor>>,
        post_processors: Vec<Arc<dyn PostProcessor>>,
        policy: ProcessingPolicy,
    ) -> Self {
        Self {
            model,
            locators,
            pre_processors,
            post_processors,
            policy,
        }
    }

    /// Compute the merged content for `key`.
    ///
    /// Output is the concatenation of the pre-processed resources in
    /// declared order, with the post-processor chain applied to the whole.
    pub async fn process(&self, key: &CacheKey) -> Result<String> {
        debug!(%key, "processing group");
        let model = self.model.model().await?;

        let Some(group) = model.group(&key.group) else {
            if self.policy.ignore_missing_group {
                debug!(group = %key.group, "group not found, ignored by policy");
                return Ok(String::new());
            }
            return Err(BundleError::GroupNotFound {
                name: key.group.clone(),
            });
        };

        let resources: Vec<&Resource> = group.resources_of(key.kind).collect();
        if resources.is_empty() {
            if self.policy.ignore_empty_group {
                debug!(group = %key.group, kind = %key.kind, "group empty, ignored by policy");
                return Ok(String::new());
            }
            return Err(BundleError::EmptyGroup {
                name: key.group.clone(),
            });
        }

        let mut merged = String::new();
        for resource in resources {
            let raw = self.locators.open(&resource.uri).await?;
            let processed = self.apply_pre_chain(resource, raw, key.minimize).await?;
            merged.push_str(&processed);
        }

        self.apply_post_chain(&key.group, merged, key.minimize).await
    }

    async fn apply_pre_chain(
        &self,
        resource: &Resource,
        input: String,
        minimize: bool,
    ) -> Result<String> {
        let minimize_this = minimize && resource.minimize;
        let mut current = input;
        for processor in &self.pre_processors {
            if processor.minimize_aware() && !minimize_this {
                continue;
            }
            match processor.process(resource, &current).await {
                Ok(output) => current = output,
                Err(err) if self.policy.ignore_failing_processor => {
                    warn!(
                        processor = processor.name(),
                        uri = %resource.uri,
                        %err,
                        "pre-processor failed; forwarding input unchanged"
                    );
                }
                Err(err) => {
                    return Err(BundleError::Transformer {
                        processor: processor.name().to_string(),
                        scope: resource.uri.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }
        Ok(current)
    }

    async fn apply_post_chain(
        &self,
        group: &str,
        input: String,
        minimize: bool,
    ) -> Result<String> {
        let mut current = input;
        for processor in &self.post_processors {
            if processor.minimize_aware() && !minimize {
                continue;
            }
            match processor.process(&current).await {
                Ok(output) => current = output,
                Err(err) if self.policy.ignore_failing_processor => {
                    warn!(
                        processor = processor.name(),
                        group,
                        %err,
                        "post-processor failed; forwarding input unchanged"
                    );
                }
                Err(err) => {
                    return Err(BundleError::Transformer {
                        processor: processor.name().to_string(),
                        scope: group.to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::ResourceLocator;
    use crate::model::{ResourceType, StaticDeclarationSource};
    use async_trait::async_trait;

    /// Locator whose content is the URI itself.
    struct IdentityLocator;

    #[async_trait]
    impl ResourceLocator for IdentityLocator {
        fn can_handle(&self, _uri: &str) -> bool {
            true
        }

        async fn open(&self, uri: &str) -> Result<String> {
            Ok(uri.to_string())
        }
    }

    struct UppercasePre;

    #[async_trait]
    impl ResourcePreProcessor for UppercasePre {
        fn name(&self) -> &str {
            "uppercase"
        }

        async fn process(&self, _resource: &Resource, input: &str) -> Result<String> {
            Ok(input.to_uppercase())
        }
    }

    struct FailingPre;

    #[async_trait]
    impl ResourcePreProcessor for FailingPre {
        fn name(&self) -> &str {
            "failing"
        }

        async fn process(&self, resource: &Resource, _input: &str) -> Result<String> {
            Err(BundleError::Transformer {
                processor: "failing".to_string(),
                scope: resource.uri.clone(),
                reason: "always fails".to_string(),
            })
        }
    }

    struct MinifyPre;

    #[async_trait]
    impl ResourcePreProcessor for MinifyPre {
        fn name(&self) -> &str {
            "minify"
        }

        fn minimize_aware(&self) -> bool {
            true
        }

        async fn process(&self, _resource: &Resource, input: &str) -> Result<String> {
            Ok(input.replace(' ', ""))
        }
    }

    struct WrappingPost;

    #[async_trait]
    impl PostProcessor for WrappingPost {
        fn name(&self) -> &str {
            "wrapping"
        }

        async fn process(&self, input: &str) -> Result<String> {
            Ok(format!("[{input}]"))
        }
    }

    fn processor_for(
        declaration: &str,
        pre: Vec<Arc<dyn ResourcePreProcessor>>,
        post: Vec<Arc<dyn PostProcessor>>,
        policy: ProcessingPolicy,
    ) -> GroupProcessor {
        let model = Arc::new(ModelService::new(Arc::new(StaticDeclarationSource::new(
            declaration,
        ))));
        let locators = Arc::new(LocatorRegistry::new(vec![Box::new(IdentityLocator)]));
        GroupProcessor::new(model, locators, pre, post, policy)
    }

    fn key(group: &str) -> CacheKey {
        CacheKey::new(group, ResourceType::Script, true)
    }

    const TWO_SCRIPTS: &str = r#"
        [groups.g]
        items = [{ js = "1.js" }, { js = "2.js" }]
    "#;

    #[tokio::test]
    async fn concatenates_in_declared_order() {
        let processor = processor_for(TWO_SCRIPTS, vec![], vec![], ProcessingPolicy::default());
        assert_eq!(processor.process(&key("g")).await.unwrap(), "1.js2.js");
    }

    #[tokio::test]
    async fn pre_chain_applies_per_resource() {
        let processor = processor_for(
            TWO_SCRIPTS,
            vec![Arc::new(UppercasePre)],
            vec![],
            ProcessingPolicy::default(),
        );
        assert_eq!(processor.process(&key("g")).await.unwrap(), "1.JS2.JS");
    }

    #[tokio::test]
    async fn post_chain_applies_to_merged_output() {
        let processor = processor_for(
            TWO_SCRIPTS,
            vec![],
            vec![Arc::new(WrappingPost)],
            ProcessingPolicy::default(),
        );
        assert_eq!(processor.process(&key("g")).await.unwrap(), "[1.js2.js]");
    }

    #[tokio::test]
    async fn failing_processor_degrades_gracefully_when_ignored() {
        let processor = processor_for(
            TWO_SCRIPTS,
            vec![Arc::new(FailingPre)],
            vec![],
            ProcessingPolicy {
                ignore_failing_processor: true,
                ..ProcessingPolicy::default()
            },
        );
        // failing processor skipped, inputs forwarded unchanged
        assert_eq!(processor.process(&key("g")).await.unwrap(), "1.js2.js");
    }

    #[tokio::test]
    async fn failing_processor_aborts_by_default() {
        let processor = processor_for(
            TWO_SCRIPTS,
            vec![Arc::new(FailingPre)],
            vec![],
            ProcessingPolicy::default(),
        );
        let err = processor.process(&key("g")).await.unwrap_err();
        assert!(matches!(err, BundleError::Transformer { .. }));
    }

    #[tokio::test]
    async fn skipped_processor_forwards_to_next_stage() {
        let processor = processor_for(
            TWO_SCRIPTS,
            vec![Arc::new(FailingPre), Arc::new(UppercasePre)],
            vec![],
            ProcessingPolicy {
                ignore_failing_processor: true,
                ..ProcessingPolicy::default()
            },
        );
        // the stage after the skipped one still sees the original input
        assert_eq!(processor.process(&key("g")).await.unwrap(), "1.JS2.JS");
    }

    #[tokio::test]
    async fn missing_group_policy() {
        let strict = processor_for(TWO_SCRIPTS, vec![], vec![], ProcessingPolicy::default());
        let err = strict.process(&key("nope")).await.unwrap_err();
        assert!(matches!(err, BundleError::GroupNotFound { .. }));

        let lenient = processor_for(
            TWO_SCRIPTS,
            vec![],
            vec![],
            ProcessingPolicy {
                ignore_missing_group: true,
                ..ProcessingPolicy::default()
            },
        );
        assert_eq!(lenient.process(&key("nope")).await.unwrap(), "");
    }

    #[tokio::test]
    async fn empty_group_policy() {
        let declaration = "[groups.empty]\n";

        let lenient = processor_for(declaration, vec![], vec![], ProcessingPolicy::default());
        assert_eq!(lenient.process(&key("empty")).await.unwrap(), "");

        let strict = processor_for(
            declaration,
            vec![],
            vec![],
            ProcessingPolicy {
                ignore_empty_group: false,
                ..ProcessingPolicy::default()
            },
        );
        let err = strict.process(&key("empty")).await.unwrap_err();
        assert!(matches!(err, BundleError::EmptyGroup { .. }));
    }

    #[tokio::test]
    async fn only_requested_kind_participates() {
        let processor = processor_for(
            r#"
            [groups.mixed]
            items = [{ js = "a.js" }, { css = "a.css" }, { js = "b.js" }]
            "#,
            vec![],
            vec![],
            ProcessingPolicy::default(),
        );
        assert_eq!(processor.process(&key("mixed")).await.unwrap(), "a.jsb.js");

        let css_key = CacheKey::new("mixed", ResourceType::Style, true);
        assert_eq!(processor.process(&css_key).await.unwrap(), "a.css");
    }

    #[tokio::test]
    async fn minimize_aware_processor_honors_key_and_resource_flags() {
        let declaration = r#"
            [groups.g]
            items = [{ js = "a b.js" }, { js = "c d.js", minimize = false }]
        "#;
        let processor = processor_for(
            declaration,
            vec![Arc::new(MinifyPre)],
            vec![],
            ProcessingPolicy::default(),
        );

        // minimizing key: first resource minified, the opted-out one kept
        let minimized = processor
            .process(&CacheKey::new("g", ResourceType::Script, true))
            .await
            .unwrap();
        assert_eq!(minimized, "ab.jsc d.js");

        // non-minimizing key skips the processor entirely
        let plain = processor
            .process(&CacheKey::new("g", ResourceType::Script, false))
            .await
            .unwrap();
        assert_eq!(plain, "a b.jsc d.js");
    }

    #[tokio::test]
    async fn unreadable_resource_fails_the_group() {
        struct RejectingLocator;

        #[async_trait]
        impl ResourceLocator for RejectingLocator {
            fn can_handle(&self, _uri: &str) -> bool {
                false
            }

            async fn open(&self, uri: &str) -> Result<String> {
                Ok(uri.to_string())
            }
        }

        let model = Arc::new(ModelService::new(Arc::new(StaticDeclarationSource::new(
            TWO_SCRIPTS,
        ))));
        let locators = Arc::new(LocatorRegistry::new(vec![Box::new(RejectingLocator)]));
        let processor = GroupProcessor::new(
            model,
            locators,
            vec![],
            vec![],
            ProcessingPolicy::default(),
        );

        let err = processor.process(&key("g")).await.unwrap_err();
        assert!(matches!(err, BundleError::ResourceUnreadable { .. }));
    }
}

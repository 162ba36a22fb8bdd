//! The bundler: wiring and lifecycle for the whole pipeline.
//!
//! [`Bundler`] owns the model service, locator registry, transformer chains,
//! group processor and content cache, and drives the control flow of a
//! lookup: cache first, group processor on a miss, model resolution behind
//! that. It also owns the reactions to configuration changes (restart a
//! scheduler, clear the cache) and the idempotent teardown that stops
//! background work.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{CacheEntry, CacheKey, ContentCache};
use crate::config::BundleConfig;
use crate::core::{BundleError, Result};
use crate::locator::{LocatorRegistry, ResourceLocator};
use crate::model::{DeclarationSource, ModelService};
use crate::processor::{GroupProcessor, PostProcessor, ResourcePreProcessor};

/// Assembles a [`Bundler`] from its collaborators.
pub struct BundlerBuilder {
    source: Arc<dyn DeclarationSource>,
    locators: Vec<Box<dyn ResourceLocator>>,
    pre_processors: Vec<Arc<dyn ResourcePreProcessor>>,
    post_processors: Vec<Arc<dyn PostProcessor>>,
    config: BundleConfig,
}

impl BundlerBuilder {
    /// Builder over the given declaration source.
    pub fn new(source: Arc<dyn DeclarationSource>) -> Self {
        Self {
            source,
            locators: Vec::new(),
            pre_processors: Vec::new(),
            post_processors: Vec::new(),
            config: BundleConfig::default(),
        }
    }

    /// Append a locator; registration order is lookup priority.
    ///
    /// The built bundler applies the configured wildcard policy to every
    /// registered locator.
    pub fn locator(mut self, locator: Box<dyn ResourceLocator>) -> Self {
        self.locators.push(locator);
        self
    }

    /// Append a pre-processor to the per-resource chain.
    pub fn pre_processor(mut self, processor: Arc<dyn ResourcePreProcessor>) -> Self {
        self.pre_processors.push(processor);
        self
    }

    /// Append a post-processor to the merged-output chain.
    pub fn post_processor(mut self, processor: Arc<dyn PostProcessor>) -> Self {
        self.post_processors.push(processor);
        self
    }

    /// Use the given configuration instead of defaults.
    pub fn config(mut self, config: BundleConfig) -> Self {
        self.config = config;
        self
    }

    /// Wire everything together and start the configured schedulers.
    pub fn build(self) -> Bundler {
        let cache = ContentCache::new(!self.config.disable_cache);
        let model = Arc::new(ModelService::new(self.source));
        {
            // a model swap invalidates every memoized bundle
            let cache = cache.clone();
            model.set_on_model_changed(move || cache.invalidate());
        }
        model.start_refresh(self.config.model_update_period());

        let mut locators = self.locators;
        for locator in &mut locators {
            locator.set_wildcard_policy(self.config.wildcard_policy);
        }

        let processor = Arc::new(GroupProcessor::new(
            Arc::clone(&model),
            Arc::new(LocatorRegistry::new(locators)),
            self.pre_processors,
            self.post_processors,
            self.config.processing_policy(),
        ));

        let bundler = Bundler {
            model,
            processor,
            cache,
            flush_task: Mutex::new(None),
            shut_down: AtomicBool::new(false),
        };
        bundler.start_cache_flush(self.config.cache_update_period());
        info!("bundler ready");
        bundler
    }
}

/// Entry point for bundle lookups and lifecycle management.
pub struct Bundler {
    model: Arc<ModelService>,
    processor: Arc<GroupProcessor>,
    cache: ContentCache,
    flush_task: Mutex<Option<JoinHandle<()>>>,
    shut_down: AtomicBool,
}

impl Bundler {
    /// The merged, transformed content for `key`, memoized until
    /// invalidated.
    pub async fn lookup(&self, key: &CacheKey) -> Result<Arc<CacheEntry>> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(BundleError::ShutDown);
        }
        let processor = Arc::clone(&self.processor);
        let compute_key = key.clone();
        self.cache
            .get_or_compute(key, move || async move { processor.process(&compute_key).await })
            .await
    }

    /// The model service backing this bundler.
    pub fn model(&self) -> &Arc<ModelService> {
        &self.model
    }

    /// The content cache backing this bundler.
    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    /// React to a changed cache flush period: restart the flush scheduler
    /// and clear the cache.
    pub fn on_cache_period_changed(&self, period: Duration) {
        debug!(period_secs = period.as_secs_f64(), "cache period changed");
        self.start_cache_flush(period);
        self.cache.invalidate();
    }

    /// React to a changed model refresh period: restart the model scheduler
    /// and clear the cache.
    pub fn on_model_period_changed(&self, period: Duration) {
        debug!(period_secs = period.as_secs_f64(), "model period changed");
        self.model.on_refresh_period_changed(period);
        self.cache.invalidate();
    }

    /// Toggle the disable-cache mode.
    pub fn set_cache_disabled(&self, disabled: bool) {
        self.cache.set_enabled(!disabled);
    }

    /// Stop all background work and release cached state. Idempotent.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("shutting down bundler");
        if let Some(task) = self.lock_flush_task().take() {
            task.abort();
        }
        self.model.shutdown();
        self.cache.invalidate();
    }

    fn start_cache_flush(&self, period: Duration) {
        let previous = if period.is_zero() {
            debug!("cache flush scheduling disabled");
            self.lock_flush_task().take()
        } else {
            let cache = self.cache.clone();
            let handle = tokio::spawn(async move {
                loop {
                    tokio::time::sleep(period).await;
                    debug!("scheduled cache flush");
                    cache.invalidate();
                }
            });
            self.lock_flush_task().replace(handle)
        };
        if let Some(task) = previous {
            task.abort();
        }
    }

    fn lock_flush_task(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.flush_task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Bundler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

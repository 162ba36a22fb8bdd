//! Model lifecycle: lazy creation, atomic replacement, background refresh.
//!
//! [`ModelService`] owns the live model reference. Readers take a cheap
//! `Arc` clone and never block on resolution once a model exists; the
//! expensive parse and flatten happens once, guarded by a resolution mutex,
//! when the first caller asks for a model that is not there yet. A refresh
//! resolves a fresh snapshot and swaps the reference in one write, so a
//! concurrent reader observes either the old model or the new one, never a
//! torn state.
//!
//! The optional background refresh runs on a fixed delay, not a fixed rate:
//! the next refresh is scheduled only after the previous one finished, so a
//! slow resolution cannot pile up. A failed scheduled refresh is logged and
//! the previous model retained; background failures never surface to a
//! foreground caller.

use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::Result;
use crate::model::source::DeclarationSource;
use crate::model::{Model, resolver};

/// Callback fired after a successful refresh replaced the model.
pub type ModelChangedFn = dyn Fn() + Send + Sync;

/// Owns the current [`Model`] and keeps it fresh.
pub struct ModelService {
    source: Arc<dyn DeclarationSource>,
    current: RwLock<Option<Arc<Model>>>,
    /// Serializes resolution: lazy first build and scheduled refreshes never
    /// run concurrently, so resolution state is never shared between passes.
    resolve_lock: tokio::sync::Mutex<()>,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
    on_model_changed: OnceLock<Box<ModelChangedFn>>,
}

impl ModelService {
    /// Service over the given declaration source. No model is built until
    /// the first [`model`](Self::model) call.
    pub fn new(source: Arc<dyn DeclarationSource>) -> Self {
        Self {
            source,
            current: RwLock::new(None),
            resolve_lock: tokio::sync::Mutex::new(()),
            refresh_task: Mutex::new(None),
            on_model_changed: OnceLock::new(),
        }
    }

    /// Register the callback fired after each successful refresh. Can be set
    /// once; later calls are ignored.
    pub fn set_on_model_changed(&self, callback: impl Fn() + Send + Sync + 'static) {
        let _ = self.on_model_changed.set(Box::new(callback));
    }

    /// The current model, building it on first access.
    ///
    /// Concurrent first-time callers block on the resolution mutex until the
    /// single build completes and then observe the finished model; the parse
    /// is never redone by a racing caller.
    pub async fn model(&self) -> Result<Arc<Model>> {
        if let Some(model) = self.read_current() {
            return Ok(model);
        }
        let _guard = self.resolve_lock.lock().await;
        // re-check: another caller may have built while we waited
        if let Some(model) = self.read_current() {
            return Ok(model);
        }
        debug!("building model");
        let model = self.build().await?;
        self.store_current(Some(model.clone()));
        Ok(model)
    }

    /// Resolve a fresh model and swap it in.
    ///
    /// On failure the previous model is left untouched.
    pub async fn refresh(&self) -> Result<()> {
        let guard = self.resolve_lock.lock().await;
        let model = self.build().await?;
        self.store_current(Some(model));
        drop(guard);
        if let Some(callback) = self.on_model_changed.get() {
            callback();
        }
        info!("model refreshed");
        Ok(())
    }

    /// Start the background refresh task.
    ///
    /// A zero period disables scheduling. Restarting replaces any previous
    /// task.
    pub fn start_refresh(self: &Arc<Self>, period: Duration) {
        if period.is_zero() {
            debug!("model refresh scheduling disabled");
            self.stop_refresh();
            return;
        }
        info!(period_secs = period.as_secs_f64(), "scheduling model refresh");
        let service = Arc::clone(self);
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(period).await;
                if let Err(err) = service.refresh().await {
                    warn!(%err, "scheduled model refresh failed; keeping previous model");
                }
            }
        });
        if let Some(previous) = self.lock_task().replace(handle) {
            previous.abort();
        }
    }

    /// Stop the background refresh task, if any.
    pub fn stop_refresh(&self) {
        if let Some(task) = self.lock_task().take() {
            task.abort();
        }
    }

    /// React to a changed refresh period: restart the scheduler and drop the
    /// current model so the next access resolves against fresh state.
    pub fn on_refresh_period_changed(self: &Arc<Self>, period: Duration) {
        self.stop_refresh();
        self.store_current(None);
        self.start_refresh(period);
    }

    /// Tear down: stop the scheduler and release the model. Idempotent.
    pub fn shutdown(&self) {
        self.stop_refresh();
        self.store_current(None);
    }

    async fn build(&self) -> Result<Arc<Model>> {
        let text = self.source.open().await?;
        Ok(Arc::new(resolver::resolve(&text)?))
    }

    fn read_current(&self) -> Option<Arc<Model>> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn store_current(&self, model: Option<Arc<Model>>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = model;
    }

    fn lock_task(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.refresh_task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ModelService {
    fn drop(&mut self) {
        self.stop_refresh();
    }
}

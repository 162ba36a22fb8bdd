//! Bundler configuration.
//!
//! [`BundleConfig`] gathers the tunables the core reacts to: scheduler
//! periods, cache mode, and the leniency policies. How the values reach the
//! process (file, environment, admin surface) is the embedder's concern;
//! this module only parses and defaults them.

use std::time::Duration;

use serde::Deserialize;

use crate::core::{BundleError, Result};
use crate::locator::WildcardPolicy;
use crate::processor::ProcessingPolicy;

/// Tunable settings for a [`Bundler`](crate::manager::Bundler).
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BundleConfig {
    /// Seconds between background model refreshes. Zero disables the
    /// scheduler.
    pub model_update_period_secs: u64,
    /// Seconds between scheduled cache flushes. Zero disables the scheduler.
    pub cache_update_period_secs: u64,
    /// Disable memoization entirely; every lookup recomputes.
    pub disable_cache: bool,
    /// Return empty content for an unknown group instead of failing.
    pub ignore_missing_group: bool,
    /// Return empty content for a group with no matching resources instead
    /// of failing.
    pub ignore_empty_group: bool,
    /// Skip a failing transformer and forward its input unchanged.
    pub ignore_failing_processor: bool,
    /// What a wildcard that matches nothing should do.
    pub wildcard_policy: WildcardPolicy,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            model_update_period_secs: 0,
            cache_update_period_secs: 0,
            disable_cache: false,
            ignore_missing_group: false,
            ignore_empty_group: true,
            ignore_failing_processor: false,
            wildcard_policy: WildcardPolicy::default(),
        }
    }
}

impl BundleConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|err| BundleError::Config {
            reason: err.to_string(),
        })
    }

    /// Model refresh period as a [`Duration`]; zero disables scheduling.
    pub fn model_update_period(&self) -> Duration {
        Duration::from_secs(self.model_update_period_secs)
    }

    /// Cache flush period as a [`Duration`]; zero disables scheduling.
    pub fn cache_update_period(&self) -> Duration {
        Duration::from_secs(self.cache_update_period_secs)
    }

    /// The group-processing policy portion of this configuration.
    pub fn processing_policy(&self) -> ProcessingPolicy {
        ProcessingPolicy {
            ignore_missing_group: self.ignore_missing_group,
            ignore_empty_group: self.ignore_empty_group,
            ignore_failing_processor: self.ignore_failing_processor,
        }
    }
}

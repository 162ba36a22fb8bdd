//! sitepack - declarative CSS/JS asset-group bundling.
//!
//! sitepack resolves a declarative graph of named resource groups into
//! merged, transformed output, keeps that output cached and coherent with
//! both the declaration graph and a chain of content transformers, and
//! refreshes itself in the background without blocking concurrent readers.
//!
//! # Architecture Overview
//!
//! A lookup flows through three cooperating subsystems:
//!
//! 1. **Model resolution** ([`model`]) - the declaration source is parsed
//!    into named groups, nested group references are flattened recursively
//!    with mandatory cycle detection, and the resulting immutable [`Model`]
//!    snapshot is swapped atomically on each background refresh.
//! 2. **Cache-coherent processing** ([`cache`], [`processor`]) - the content
//!    for a `(group, type, minimize)` key is computed at most once per
//!    concurrent burst, memoized, and invalidated when the model or the
//!    configuration changes.
//! 3. **Wildcard expansion** ([`locator`]) - a resource URI with a wildcard
//!    segment expands to the ordered set of matching concrete resources,
//!    whether they live on the filesystem or inside zip-style archive
//!    containers (and across *all* matching containers, as a union).
//!
//! The [`manager::Bundler`] ties these together and owns the lifecycle:
//! schedulers, configuration-change reactions, and idempotent teardown.
//!
//! # Core Modules
//!
//! - [`model`] - declaration parsing, reference resolution, model lifecycle
//! - [`locator`] - URI to content, including wildcard and archive support
//! - [`processor`] - transformer chain contract and group processing
//! - [`cache`] - single-flight memoization of processed output
//! - [`manager`] - wiring, lookups, lifecycle
//! - [`config`] - tunables and policies
//! - [`core`] - the [`BundleError`] taxonomy
//!
//! # Declaration Format
//!
//! ```toml
//! [groups.base]
//! items = [
//!     { css = "/css/reset.css" },
//!     { js = "/js/lib/*.js", minimize = false },
//! ]
//!
//! [groups.all]
//! items = [
//!     { group = "base" },
//!     { js = "/js/app.js" },
//! ]
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sitepack::cache::CacheKey;
//! use sitepack::config::BundleConfig;
//! use sitepack::locator::FileSystemLocator;
//! use sitepack::manager::BundlerBuilder;
//! use sitepack::model::{FileDeclarationSource, ResourceType};
//!
//! # async fn example() -> sitepack::Result<()> {
//! let bundler = BundlerBuilder::new(Arc::new(FileDeclarationSource::new("bundles.toml")))
//!     .locator(Box::new(FileSystemLocator::new("webroot")))
//!     .config(BundleConfig {
//!         model_update_period_secs: 30,
//!         ..BundleConfig::default()
//!     })
//!     .build();
//!
//! let key = CacheKey::new("all", ResourceType::Script, true);
//! let bundle = bundler.lookup(&key).await?;
//! println!("{} bytes", bundle.content.len());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod core;
pub mod locator;
pub mod manager;
pub mod model;
pub mod processor;

pub use crate::core::{BundleError, Result};
pub use crate::model::Model;

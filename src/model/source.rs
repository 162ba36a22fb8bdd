//! Declaration source contract.
//!
//! The resolver pulls the raw declaration text from a [`DeclarationSource`].
//! A file-backed implementation covers the common case; the in-memory one is
//! for embedding and tests.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::core::{BundleError, Result};

/// Supplies the raw group/resource declaration text.
#[async_trait]
pub trait DeclarationSource: Send + Sync {
    /// Open the declaration and return its full text.
    ///
    /// Fails with [`BundleError::SourceUnavailable`] when the backing source
    /// cannot be read.
    async fn open(&self) -> Result<String>;
}

/// Declaration stored in a file on disk.
#[derive(Debug, Clone)]
pub struct FileDeclarationSource {
    path: PathBuf,
}

impl FileDeclarationSource {
    /// Source backed by the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DeclarationSource for FileDeclarationSource {
    async fn open(&self) -> Result<String> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|err| BundleError::SourceUnavailable {
                reason: format!("{}: {err}", self.path.display()),
            })
    }
}

/// Fixed in-memory declaration text.
#[derive(Debug, Clone)]
pub struct StaticDeclarationSource {
    text: String,
}

impl StaticDeclarationSource {
    /// Source returning the given text verbatim.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl DeclarationSource for StaticDeclarationSource {
    async fn open(&self) -> Result<String> {
        Ok(self.text.clone())
    }
}

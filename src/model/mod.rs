//! The resolved group/resource model and its resolution machinery.
//!
//! A declaration source describes named groups of script and style resources,
//! where a group may reference other groups. Resolution flattens every
//! reference so that a [`Model`] contains only concrete resources, fails
//! loudly on reference cycles, and produces an immutable snapshot that is
//! replaced wholesale on refresh.
//!
//! - [`parser`] - declaration parsing (TOML by default)
//! - [`graph`] - group-reference graph with cycle detection
//! - [`resolver`] - reference flattening into a [`Model`]
//! - [`service`] - lazy creation, atomic swap, background refresh
//! - [`source`] - the [`DeclarationSource`](source::DeclarationSource) contract

pub mod graph;
pub mod parser;
pub mod resolver;
pub mod service;
pub mod source;

pub use resolver::resolve;
pub use service::ModelService;
pub use source::{DeclarationSource, FileDeclarationSource, StaticDeclarationSource};

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// The kind of content a resource carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    /// JavaScript, declared with a `js` item.
    Script,
    /// CSS, declared with a `css` item.
    Style,
}

impl ResourceType {
    /// Short name used in cache key display and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Script => "js",
            Self::Style => "css",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single addressable asset.
///
/// Immutable once constructed. Equality and hashing cover `(uri, kind)` only;
/// the minimize flag is advisory metadata for transformers.
#[derive(Debug, Clone)]
pub struct Resource {
    /// Where the resource lives, in a form some locator accepts.
    pub uri: String,
    /// Script or style.
    pub kind: ResourceType,
    /// Whether minimize-aware transformers should touch this resource.
    /// Defaults to `true` when the declaration omits it.
    pub minimize: bool,
}

impl Resource {
    /// Create a resource with the default minimize flag.
    pub fn new(uri: impl Into<String>, kind: ResourceType) -> Self {
        Self {
            uri: uri.into(),
            kind,
            minimize: true,
        }
    }

    /// Create a resource with an explicit minimize flag.
    pub fn with_minimize(uri: impl Into<String>, kind: ResourceType, minimize: bool) -> Self {
        Self {
            uri: uri.into(),
            kind,
            minimize,
        }
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.uri == other.uri && self.kind == other.kind
    }
}

impl Eq for Resource {}

impl Hash for Resource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uri.hash(state);
        self.kind.hash(state);
    }
}

/// A named, ordered collection of concrete resources.
///
/// The resource list is the fully flattened result of resolving any nested
/// group references at parse time; no reference markers remain.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    /// Unique name within a model.
    pub name: String,
    /// Resources in declared order.
    pub resources: Vec<Resource>,
}

impl Group {
    /// Resources of the given kind, preserving declared order.
    pub fn resources_of(&self, kind: ResourceType) -> impl Iterator<Item = &Resource> {
        self.resources.iter().filter(move |r| r.kind == kind)
    }
}

/// The full resolved set of groups for one declaration snapshot.
///
/// Immutable; readers hold an `Arc<Model>` and a refresh replaces the whole
/// snapshot with a single reference swap.
#[derive(Debug, Clone, Default)]
pub struct Model {
    groups: HashMap<String, Group>,
}

impl Model {
    pub(crate) fn new(groups: HashMap<String, Group>) -> Self {
        Self { groups }
    }

    /// Look up a group by name.
    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    /// Group names in unspecified order.
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Number of groups in the model.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether the model declares no groups at all.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

//! Declaration parsing.
//!
//! The default declaration format is TOML: a `[groups.<name>]` table per
//! group, each with an ordered `items` array. An item is exactly one of a
//! `css` resource, a `js` resource, or a `group` reference:
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
//! The format itself is an external concern; anything able to produce the
//! same group/resource/reference tree can feed the resolver. Parsing here
//! only validates shape, never references - undeclared targets and cycles
//! are the resolver's job.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::core::{BundleError, Result};
use crate::model::{Resource, ResourceType};

/// One parsed declaration item, shape-validated but unresolved.
#[derive(Debug, Clone, PartialEq)]
pub enum RawItem {
    /// A concrete resource.
    Resource(Resource),
    /// A reference to another group, to be spliced in during resolution.
    GroupRef(String),
}

/// A parsed declaration: group name to ordered raw items.
///
/// `BTreeMap` keeps iteration deterministic so resolving the same source
/// twice yields identical models.
pub type RawDeclaration = BTreeMap<String, Vec<RawItem>>;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeclarationDoc {
    groups: BTreeMap<String, GroupDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GroupDoc {
    #[serde(default)]
    items: Vec<ItemDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ItemDoc {
    css: Option<String>,
    js: Option<String>,
    group: Option<String>,
    minimize: Option<bool>,
}

impl ItemDoc {
    fn into_raw_item(self, group_name: &str) -> Result<RawItem> {
        let (uri, kind) = match (self.css, self.js, self.group) {
            (Some(uri), None, None) => (uri, ResourceType::Style),
            (None, Some(uri), None) => (uri, ResourceType::Script),
            (None, None, Some(target)) => {
                if self.minimize.is_some() {
                    return Err(BundleError::ModelParse {
                        reason: format!(
                            "group reference '{target}' in group '{group_name}' cannot carry a minimize flag"
                        ),
                    });
                }
                return Ok(RawItem::GroupRef(target));
            }
            _ => {
                return Err(BundleError::ModelParse {
                    reason: format!(
                        "item in group '{group_name}' must set exactly one of 'css', 'js' or 'group'"
                    ),
                });
            }
        };
        // minimize defaults to true when the declaration omits it
        Ok(RawItem::Resource(Resource::with_minimize(
            uri,
            kind,
            self.minimize.unwrap_or(true),
        )))
    }
}

/// Parse a declaration document into raw, shape-validated groups.
pub fn parse_declaration(text: &str) -> Result<RawDeclaration> {
    let doc: DeclarationDoc = toml::from_str(text).map_err(|err| BundleError::ModelParse {
        reason: err.to_string(),
    })?;

    let mut raw = RawDeclaration::new();
    for (name, group) in doc.groups {
        let items = group
            .items
            .into_iter()
            .map(|item| item.into_raw_item(&name))
            .collect::<Result<Vec<_>>>()?;
        raw.insert(name, items);
    }
    Ok(raw)
}

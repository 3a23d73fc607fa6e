// ── Server catalog ──
//
// Static, versioned mapping from group name to an ordered member list.
// The default catalog is compiled into the binary; a profile may point at
// a replacement file with the same schema. Loaded once, never mutated.

use std::path::Path;
use std::sync::LazyLock;

use indexmap::IndexMap;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CoreError;

const EMBEDDED_TOML: &str = include_str!("catalog.toml");

static EMBEDDED: LazyLock<Catalog> = LazyLock::new(|| {
    Catalog::from_toml_str(EMBEDDED_TOML).expect("embedded catalog must parse")
});

#[derive(Deserialize)]
struct RawCatalog {
    version: u32,
    groups: IndexMap<String, Vec<String>>,
    #[serde(default)]
    composites: IndexMap<String, Vec<String>>,
}

/// Ordered groups of connect targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    version: u32,
    groups: IndexMap<String, Vec<String>>,
}

/// Outcome of resolving a caller-supplied label against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// The label after normalization.
    pub label: String,
    /// The chosen server name (lowercase, not yet platform-spelled).
    pub server: String,
    /// The group the server was drawn from, if the label named one.
    pub group: Option<String>,
}

impl Catalog {
    /// The catalog compiled into this build.
    pub fn embedded() -> &'static Catalog {
        &EMBEDDED
    }

    /// Read a catalog file.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let text = std::fs::read_to_string(path).map_err(|e| CoreError::Catalog {
            message: format!("failed to read {}: {e}", path.display()),
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate a catalog document.
    pub fn from_toml_str(text: &str) -> Result<Self, CoreError> {
        let raw: RawCatalog = toml::from_str(text).map_err(|e| CoreError::Catalog {
            message: e.to_string(),
        })?;

        let mut groups: IndexMap<String, Vec<String>> = IndexMap::new();
        for (name, members) in raw.groups {
            let key = normalize_label(&name);
            let members: Vec<String> = members
                .iter()
                .map(|m| normalize_label(m))
                .filter(|m| !m.is_empty())
                .collect();
            if members.is_empty() {
                return Err(CoreError::Catalog {
                    message: format!("group '{key}' has no members"),
                });
            }
            if groups.insert(key.clone(), members).is_some() {
                return Err(CoreError::Catalog {
                    message: format!("group '{key}' is defined twice"),
                });
            }
        }

        let mut composites = Vec::with_capacity(raw.composites.len());
        for (name, parts) in raw.composites {
            let key = normalize_label(&name);
            if groups.contains_key(&key) {
                return Err(CoreError::Catalog {
                    message: format!("composite '{key}' shadows a group of the same name"),
                });
            }
            let mut members: Vec<String> = Vec::new();
            for part in &parts {
                let part = normalize_label(part);
                let source = groups.get(&part).ok_or_else(|| CoreError::Catalog {
                    message: format!("composite '{key}' references unknown group '{part}'"),
                })?;
                for member in source {
                    if !members.contains(member) {
                        members.push(member.clone());
                    }
                }
            }
            composites.push((key, members));
        }
        groups.extend(composites);

        debug!(version = raw.version, groups = groups.len(), "loaded server catalog");
        Ok(Self {
            version: raw.version,
            groups,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Group names with their members, in catalog order.
    pub fn groups(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.groups.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Members of one group, looked up by (normalized) name.
    pub fn group(&self, name: &str) -> Option<&[String]> {
        self.groups.get(&normalize_label(name)).map(Vec::as_slice)
    }

    pub fn is_group(&self, name: &str) -> bool {
        self.group(name).is_some()
    }

    /// Resolve a label to a concrete server.
    ///
    /// Group names pick one member at random; anything else is taken as a
    /// server name the client understands.
    pub fn resolve<R: Rng + ?Sized>(&self, label: &str, rng: &mut R) -> Result<Resolution, CoreError> {
        let label = normalize_label(label);
        if label.is_empty() {
            return Err(CoreError::InvalidTarget {
                label,
                reason: "target must not be empty".into(),
            });
        }

        let Some(members) = self.groups.get(&label) else {
            return Ok(Resolution {
                server: label.clone(),
                label,
                group: None,
            });
        };

        let server = members.choose(rng).cloned().ok_or_else(|| CoreError::Catalog {
            message: format!("group '{label}' has no members"),
        })?;

        Ok(Resolution {
            server,
            group: Some(label.clone()),
            label,
        })
    }
}

/// Trim, lowercase, treat `_` as a space and collapse runs of whitespace.
pub fn normalize_label(label: &str) -> String {
    label
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

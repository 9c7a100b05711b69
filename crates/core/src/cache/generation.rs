//! Cache generation naming.
//!
//! A generation is a logical partition of cached responses named
//! `{role}-{version}`. Deploying a new version yields new names and the old
//! generations become stale.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical role of a cache generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Pre-warmed at install; also written by cache-first and stale-while-revalidate.
    Static,
    /// Written lazily by network-first.
    Dynamic,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Static => "static",
            Role::Dynamic => "dynamic",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role plus version tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Generation {
    pub role: Role,
    pub version: String,
}

impl Generation {
    pub fn new(role: Role, version: impl Into<String>) -> Self {
        Self { role, version: version.into() }
    }

    pub fn name(&self) -> String {
        format!("{}-{}", self.role, self.version)
    }

    /// Parse a stored generation name. Names that don't start with a known
    /// role return `None`.
    pub fn parse(name: &str) -> Option<Self> {
        let (role, version) = name.split_once('-')?;
        let role = match role {
            "static" => Role::Static,
            "dynamic" => Role::Dynamic,
            _ => return None,
        };
        if version.is_empty() {
            return None;
        }
        Some(Self::new(role, version))
    }
}

/// The generations the running worker considers current.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GenerationSet {
    pub static_cache: Generation,
    pub dynamic_cache: Generation,
}

impl GenerationSet {
    /// Both roles at the same version tag.
    pub fn for_version(version: &str) -> Self {
        Self { static_cache: Generation::new(Role::Static, version), dynamic_cache: Generation::new(Role::Dynamic, version) }
    }

    pub fn static_name(&self) -> String {
        self.static_cache.name()
    }

    pub fn dynamic_name(&self) -> String {
        self.dynamic_cache.name()
    }

    pub fn name_for(&self, role: Role) -> String {
        match role {
            Role::Static => self.static_name(),
            Role::Dynamic => self.dynamic_name(),
        }
    }

    /// Whether `name` belongs to the current set.
    pub fn is_current(&self, name: &str) -> bool {
        name == self.static_name() || name == self.dynamic_name()
    }
}

//! Closed registry of config transforms
//!
//! A config source may name a transform instead of being copied verbatim.
//! Identifiers are resolved when the application template is loaded, so an
//! unknown identifier stops the process before any tenant is provisioned.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier that no transform is registered under
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown transform '{0}'")]
pub struct UnknownTransform(pub String);

/// Transforms a config source can request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TransformKind {
    /// Render the file as a text template against the run's context
    Template,
    /// Expose the raw bytes under `binaryData`
    Binary,
}

impl TransformKind {
    /// Every registered transform with the identifiers it answers to
    pub const REGISTRY: &'static [(&'static str, TransformKind)] = &[
        ("template", TransformKind::Template),
        ("ProcessTemplateForCM", TransformKind::Template),
        ("binary", TransformKind::Binary),
    ];

    /// Canonical identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::Binary => "binary",
        }
    }
}

impl FromStr for TransformKind {
    type Err = UnknownTransform;

    fn from_str(id: &str) -> Result<Self, Self::Err> {
        Self::REGISTRY
            .iter()
            .find(|(name, _)| *name == id)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| UnknownTransform(id.to_string()))
    }
}

impl TryFrom<String> for TransformKind {
    type Error = UnknownTransform;

    fn try_from(id: String) -> Result<Self, Self::Error> {
        id.parse()
    }
}

impl From<TransformKind> for String {
    fn from(kind: TransformKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Configuration materializer
//!
//! Turns a [`ConfigSource`] into a [`ConfigMap`] ready for submission. The
//! policy is picked per source:
//!
//! - no transform: the file is copied verbatim under the declared key and must
//!   be UTF-8
//! - [`TransformKind::Template`]: the file is rendered with the
//!   [`TemplateEngine`] against the run's context
//! - [`TransformKind::Binary`]: the raw bytes are exposed under `binaryData`
//!
//! Asset files are read with `tokio::fs` from the template's asset directory.
//! The materializer never submits anything; a failure here only means the
//! caller skips this one config object.

mod transform;

pub use transform::{TransformKind, UnknownTransform};

use std::collections::BTreeMap;
use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD, Engine};
use thiserror::Error;
use tracing::debug;

use crate::config::ConfigSource;
use crate::context::ProvisioningContext;
use crate::template::{TemplateContext, TemplateEngine, TemplateError};
use crate::workload::ConfigMap;

/// Reasons a config object could not be produced
#[derive(Debug, Error)]
pub enum MaterializeError {
    /// Asset file missing or unreadable
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// Resolved asset path
        path: PathBuf,
        /// The underlying I/O error
        source: std::io::Error,
    },

    /// Template failed to parse or render
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// A verbatim payload is not valid UTF-8
    #[error("{} is not valid UTF-8; use the binary transform", path.display())]
    Encoding {
        /// Resolved asset path
        path: PathBuf,
    },

    /// Structured config data could not be serialized
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Produce the config object for `source`, named `name`
///
/// The returned object lives in the run's namespace and carries the
/// standard labels; the caller decides whether and when to submit it.
pub async fn materialize(
    source: &ConfigSource,
    name: &str,
    ctx: &ProvisioningContext,
    engine: &TemplateEngine,
) -> Result<ConfigMap, MaterializeError> {
    let path = ctx.template.resolve_asset(&source.file_path);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|source| MaterializeError::Read {
            path: path.clone(),
            source,
        })?;
    debug!(name = %name, path = %path.display(), bytes = bytes.len(), "read config source");

    match source.transform {
        None => {
            let text = String::from_utf8(bytes).map_err(|_| MaterializeError::Encoding { path })?;
            Ok(ConfigMap::new(name, ctx.namespace()).with_data(&source.file_key, text))
        }
        Some(kind) => apply(kind, bytes, &source.file_key, name, ctx, engine),
    }
}

/// Run a registered transform over raw file bytes
///
/// Transforms receive the bytes, the declared key and the resolved object
/// name, and produce the whole config object.
pub fn apply(
    kind: TransformKind,
    bytes: Vec<u8>,
    key: &str,
    name: &str,
    ctx: &ProvisioningContext,
    engine: &TemplateEngine,
) -> Result<ConfigMap, MaterializeError> {
    match kind {
        TransformKind::Template => {
            let values = TemplateContext::new(ctx, name);
            let rendered = engine.render_bytes(bytes, &values)?;
            Ok(ConfigMap::new(name, ctx.namespace()).with_data(key, rendered))
        }
        TransformKind::Binary => {
            Ok(ConfigMap::new(name, ctx.namespace()).with_binary_data(key, STANDARD.encode(bytes)))
        }
    }
}

/// Serialize structured data into a single-key config object
pub fn json_config<T: serde::Serialize>(
    name: &str,
    namespace: &str,
    key: &str,
    value: &T,
) -> Result<ConfigMap, MaterializeError> {
    let text =
        serde_json::to_string(value).map_err(|e| MaterializeError::Serialization(e.to_string()))?;
    let mut data = BTreeMap::new();
    data.insert(key.to_string(), text);
    Ok(crate::workload::build_config(name, namespace, data))
}

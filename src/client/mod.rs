//! Cluster resource API
//!
//! The provisioners submit objects through the [`ClusterClient`] trait:
//! - [`KubeClusterClient`] creates and deletes objects on a live cluster
//! - [`ManifestCollector`] records submissions in memory for dry runs and tests

mod cluster;
mod collect;

pub use cluster::KubeClusterClient;
pub use collect::{ManifestCollector, Submission};

use std::fmt;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::workload::{AccessRule, ConfigMap, Deployment, Service};

/// Kinds of object this system creates
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Compute workload
    Deployment,
    /// Network service
    Service,
    /// Configuration object
    ConfigMap,
    /// Gateway access rule
    #[serde(rename = "APIRule")]
    AccessRule,
}

impl ResourceKind {
    /// Kubernetes kind name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deployment => "Deployment",
            Self::Service => "Service",
            Self::ConfigMap => "ConfigMap",
            Self::AccessRule => "APIRule",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured failure from the cluster resource API
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// An object with the same name already exists
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The object does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The API rejected the object as invalid
    #[error("rejected as invalid: {0}")]
    Invalid(String),

    /// The API could not be reached
    #[error("connectivity failure: {0}")]
    Connectivity(String),

    /// The object could not be encoded for the API
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Any other API status
    #[error("api error {code}: {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Server message
        message: String,
    },
}

impl From<kube::Error> for SubmitError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(response) => match response.code {
                409 => Self::AlreadyExists(response.message),
                404 => Self::NotFound(response.message),
                400 | 422 => Self::Invalid(response.message),
                code => Self::Api {
                    code,
                    message: response.message,
                },
            },
            kube::Error::SerdeError(e) => Self::Serialization(e.to_string()),
            other => Self::Connectivity(other.to_string()),
        }
    }
}

/// Create and delete primitives the provisioners depend on
///
/// Creates use POST semantics: an existing object is reported as
/// [`SubmitError::AlreadyExists`], never overwritten.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Create a compute workload
    async fn create_workload(&self, workload: &Deployment) -> Result<(), SubmitError>;

    /// Create a network service
    async fn create_service(&self, service: &Service) -> Result<(), SubmitError>;

    /// Create a configuration object
    async fn create_config(&self, config: &ConfigMap) -> Result<(), SubmitError>;

    /// Create a gateway access rule
    async fn create_access_rule(&self, rule: &AccessRule) -> Result<(), SubmitError>;

    /// Delete an object by kind and name
    async fn delete(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<(), SubmitError>;
}

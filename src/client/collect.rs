//! In-memory cluster client
//!
//! Records every submission in order and mimics the API's conflict
//! semantics: creating a name twice yields [`SubmitError::AlreadyExists`],
//! deleting an unknown name yields [`SubmitError::NotFound`]. Used for the
//! `render` dry run and in tests.

use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::Serialize;

use super::{ClusterClient, ResourceKind, SubmitError};
use crate::workload::{AccessRule, ConfigMap, Deployment, Service};

/// One recorded create call
#[derive(Clone, Debug, PartialEq)]
pub struct Submission {
    /// Object kind
    pub kind: ResourceKind,
    /// Object namespace
    pub namespace: String,
    /// Object name
    pub name: String,
    /// Object as it would be sent to the API
    pub manifest: serde_json::Value,
}

#[derive(Default)]
struct State {
    submissions: Vec<Submission>,
    deletions: Vec<(ResourceKind, String)>,
    live: BTreeSet<(ResourceKind, String, String)>,
}

/// [`ClusterClient`] that keeps objects in memory
#[derive(Default)]
pub struct ManifestCollector {
    state: Mutex<State>,
}

impl ManifestCollector {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Every successful create, in submission order
    pub fn submissions(&self) -> Vec<Submission> {
        self.lock().submissions.clone()
    }

    /// Names of successful creates of one kind, in order
    pub fn names(&self, kind: ResourceKind) -> Vec<String> {
        self.lock()
            .submissions
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| s.name.clone())
            .collect()
    }

    /// Successful deletes, in order
    pub fn deletions(&self) -> Vec<(ResourceKind, String)> {
        self.lock().deletions.clone()
    }

    /// Whether an object currently exists
    pub fn contains(&self, kind: ResourceKind, namespace: &str, name: &str) -> bool {
        self.lock()
            .live
            .contains(&(kind, namespace.to_string(), name.to_string()))
    }

    /// Render all successful creates as a multi-document YAML stream
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        let mut out = String::new();
        for submission in self.lock().submissions.iter() {
            out.push_str("---\n");
            out.push_str(&serde_yaml::to_string(&submission.manifest)?);
        }
        Ok(out)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record<T: Serialize>(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
        object: &T,
    ) -> Result<(), SubmitError> {
        let manifest =
            serde_json::to_value(object).map_err(|e| SubmitError::Serialization(e.to_string()))?;
        let mut state = self.lock();
        let key = (kind, namespace.to_string(), name.to_string());
        if state.live.contains(&key) {
            return Err(SubmitError::AlreadyExists(format!(
                "{} \"{}\" already exists",
                kind, name
            )));
        }
        state.live.insert(key);
        state.submissions.push(Submission {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
            manifest,
        });
        Ok(())
    }
}

#[async_trait]
impl ClusterClient for ManifestCollector {
    async fn create_workload(&self, workload: &Deployment) -> Result<(), SubmitError> {
        let meta = &workload.metadata;
        self.record(ResourceKind::Deployment, &meta.namespace, &meta.name, workload)
    }

    async fn create_service(&self, service: &Service) -> Result<(), SubmitError> {
        let meta = &service.metadata;
        self.record(ResourceKind::Service, &meta.namespace, &meta.name, service)
    }

    async fn create_config(&self, config: &ConfigMap) -> Result<(), SubmitError> {
        let meta = &config.metadata;
        self.record(ResourceKind::ConfigMap, &meta.namespace, &meta.name, config)
    }

    async fn create_access_rule(&self, rule: &AccessRule) -> Result<(), SubmitError> {
        let meta = &rule.metadata;
        self.record(ResourceKind::AccessRule, &meta.namespace, &meta.name, rule)
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<(), SubmitError> {
        let mut state = self.lock();
        if !state
            .live
            .remove(&(kind, namespace.to_string(), name.to_string()))
        {
            return Err(SubmitError::NotFound(format!("{} \"{}\" not found", kind, name)));
        }
        state.deletions.push((kind, name.to_string()));
        Ok(())
    }
}

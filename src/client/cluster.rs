//! Live cluster client backed by kube-rs

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment as K8sDeployment;
use k8s_openapi::api::core::v1::{ConfigMap as K8sConfigMap, Service as K8sService};
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, DeleteParams, DynamicObject, PostParams};
use kube::discovery::ApiResource;
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::{ClusterClient, ResourceKind, SubmitError};
use crate::workload::{access_rule, AccessRule, ConfigMap, Deployment, Service};

/// Field manager recorded on every object this client creates
const FIELD_MANAGER: &str = "saas-provisioner";

/// [`ClusterClient`] talking to the Kubernetes API
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    /// Wrap an existing kube client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn post_params() -> PostParams {
        PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        }
    }

    fn access_rule_resource() -> ApiResource {
        ApiResource::from_gvk(&kube::core::GroupVersionKind {
            group: access_rule::GROUP.to_string(),
            version: access_rule::VERSION.to_string(),
            kind: access_rule::KIND.to_string(),
        })
    }

    /// Convert our object into the typed k8s-openapi form and POST it
    async fn create_typed<K, T>(&self, namespace: &str, name: &str, object: &T) -> Result<(), SubmitError>
    where
        T: Serialize,
        K: Resource<Scope = NamespaceResourceScope>
            + Clone
            + DeserializeOwned
            + Serialize
            + std::fmt::Debug,
        <K as Resource>::DynamicType: Default,
    {
        let json =
            serde_json::to_value(object).map_err(|e| SubmitError::Serialization(e.to_string()))?;
        let typed: K =
            serde_json::from_value(json).map_err(|e| SubmitError::Serialization(e.to_string()))?;
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        api.create(&Self::post_params(), &typed).await?;
        debug!(name = %name, namespace = %namespace, "created");
        Ok(())
    }

    async fn delete_typed<K>(&self, namespace: &str, name: &str) -> Result<(), SubmitError>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + std::fmt::Debug,
        <K as Resource>::DynamicType: Default,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        api.delete(name, &DeleteParams::background()).await?;
        Ok(())
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn create_workload(&self, workload: &Deployment) -> Result<(), SubmitError> {
        let meta = &workload.metadata;
        self.create_typed::<K8sDeployment, _>(&meta.namespace, &meta.name, workload)
            .await
    }

    async fn create_service(&self, service: &Service) -> Result<(), SubmitError> {
        let meta = &service.metadata;
        self.create_typed::<K8sService, _>(&meta.namespace, &meta.name, service)
            .await
    }

    async fn create_config(&self, config: &ConfigMap) -> Result<(), SubmitError> {
        let meta = &config.metadata;
        self.create_typed::<K8sConfigMap, _>(&meta.namespace, &meta.name, config)
            .await
    }

    async fn create_access_rule(&self, rule: &AccessRule) -> Result<(), SubmitError> {
        let meta = &rule.metadata;
        let json =
            serde_json::to_value(rule).map_err(|e| SubmitError::Serialization(e.to_string()))?;
        let object: DynamicObject =
            serde_json::from_value(json).map_err(|e| SubmitError::Serialization(e.to_string()))?;
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), &meta.namespace, &Self::access_rule_resource());
        api.create(&Self::post_params(), &object).await?;
        debug!(name = %meta.name, namespace = %meta.namespace, "created APIRule");
        Ok(())
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<(), SubmitError> {
        match kind {
            ResourceKind::Deployment => self.delete_typed::<K8sDeployment>(namespace, name).await,
            ResourceKind::Service => self.delete_typed::<K8sService>(namespace, name).await,
            ResourceKind::ConfigMap => self.delete_typed::<K8sConfigMap>(namespace, name).await,
            ResourceKind::AccessRule => {
                let api: Api<DynamicObject> = Api::namespaced_with(
                    self.client.clone(),
                    namespace,
                    &Self::access_rule_resource(),
                );
                api.delete(name, &DeleteParams::background()).await?;
                Ok(())
            }
        }
    }
}

//! Resource spec builders
//!
//! This module defines the Kubernetes objects created for a tenant and pure
//! constructors for each of them:
//! - Deployment: single-replica compute workload
//! - Service: cluster-internal HTTP exposure
//! - ConfigMap: key/value configuration
//! - APIRule: gateway access rule (see [`access_rule`])
//!
//! Nothing here talks to the cluster; submission is done through
//! [`crate::client::ClusterClient`].

pub mod access_rule;

pub use access_rule::{build_access_rule, AccessRule};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Value of the `app.kubernetes.io/managed-by` label on every object
pub const MANAGED_BY: &str = "saas-provisioner";

/// Port every tenant service exposes
pub const SERVICE_PORT: u16 = 80;

// =============================================================================
// Kubernetes Resource Types
// =============================================================================

/// Standard Kubernetes ObjectMeta
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Resource name
    pub name: String,
    /// Resource namespace
    pub namespace: String,
    /// Labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl ObjectMeta {
    /// Create new metadata with the standard tenant labels
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        let name = name.into();
        let mut labels = app_labels(&name);
        labels.insert(
            "app.kubernetes.io/managed-by".to_string(),
            MANAGED_BY.to_string(),
        );
        Self {
            name,
            namespace: namespace.into(),
            labels,
        }
    }
}

/// `{app: name}`, used for selectors and pod labels
pub fn app_labels(name: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert("app".to_string(), name.to_string());
    labels
}

// =============================================================================
// Deployment
// =============================================================================

/// Kubernetes Deployment
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    /// API version
    pub api_version: String,
    /// Kind
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
    /// Spec
    pub spec: DeploymentSpec,
}

/// Deployment spec
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSpec {
    /// Number of replicas
    pub replicas: u32,
    /// Label selector
    pub selector: LabelSelector,
    /// Pod template
    pub template: PodTemplateSpec,
}

/// Label selector
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    /// Match labels
    pub match_labels: BTreeMap<String, String>,
}

/// Pod template spec
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodTemplateSpec {
    /// Pod metadata
    pub metadata: PodMeta,
    /// Pod spec
    pub spec: PodSpec,
}

/// Pod metadata (subset of ObjectMeta)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodMeta {
    /// Labels
    pub labels: BTreeMap<String, String>,
}

/// Pod spec
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    /// Containers
    pub containers: Vec<Container>,
    /// Volumes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,
}

/// Container spec
///
/// No resource limits and no probes; the platform's defaults apply.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    /// Container name
    pub name: String,
    /// Image
    pub image: String,
    /// Volume mounts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volume_mounts: Vec<VolumeMount>,
}

/// Volume
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    /// Volume name
    pub name: String,
    /// ConfigMap source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_map: Option<ConfigMapVolumeSource>,
    /// EmptyDir source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_dir: Option<EmptyDirVolumeSource>,
}

impl Volume {
    /// Volume backed by a config object
    pub fn config_map(name: impl Into<String>, config_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config_map: Some(ConfigMapVolumeSource {
                name: config_name.into(),
            }),
            empty_dir: None,
        }
    }

    /// Scratch volume
    pub fn empty_dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config_map: None,
            empty_dir: Some(EmptyDirVolumeSource {}),
        }
    }
}

/// ConfigMap volume source
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMapVolumeSource {
    /// ConfigMap name
    pub name: String,
}

/// EmptyDir volume source
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmptyDirVolumeSource {}

/// Volume mount
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    /// Volume name
    pub name: String,
    /// Mount path
    pub mount_path: String,
    /// Mount a single key of the volume
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_path: Option<String>,
}

impl VolumeMount {
    /// Mount the whole volume at `mount_path`
    pub fn new(name: impl Into<String>, mount_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mount_path: mount_path.into(),
            sub_path: None,
        }
    }
}

// =============================================================================
// Service
// =============================================================================

/// Kubernetes Service
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    /// API version
    pub api_version: String,
    /// Kind
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
    /// Spec
    pub spec: ServiceSpec,
}

/// Service spec
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    /// Selector
    pub selector: BTreeMap<String, String>,
    /// Ports
    pub ports: Vec<ServicePort>,
    /// Service type
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
}

/// Service port
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServicePort {
    /// Port name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Port number
    pub port: u16,
    /// Target port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_port: Option<u16>,
}

// =============================================================================
// ConfigMap
// =============================================================================

/// Kubernetes ConfigMap
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMap {
    /// API version
    pub api_version: String,
    /// Kind
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
    /// String data
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
    /// Binary data, base64 encoded
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub binary_data: BTreeMap<String, String>,
}

impl ConfigMap {
    /// Create an empty ConfigMap
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            api_version: "v1".to_string(),
            kind: "ConfigMap".to_string(),
            metadata: ObjectMeta::new(name, namespace),
            data: BTreeMap::new(),
            binary_data: BTreeMap::new(),
        }
    }

    /// Add a data entry
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Add a binary entry; `value` must already be base64
    pub fn with_binary_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.binary_data.insert(key.into(), value.into());
        self
    }
}

// =============================================================================
// Builders
// =============================================================================

/// Single-replica workload with one container named after the workload
pub fn build_workload(
    name: &str,
    namespace: &str,
    image: &str,
    volume_mounts: Vec<VolumeMount>,
    volumes: Vec<Volume>,
) -> Deployment {
    Deployment {
        api_version: "apps/v1".to_string(),
        kind: "Deployment".to_string(),
        metadata: ObjectMeta::new(name, namespace),
        spec: DeploymentSpec {
            replicas: 1,
            selector: LabelSelector {
                match_labels: app_labels(name),
            },
            template: PodTemplateSpec {
                metadata: PodMeta {
                    labels: app_labels(name),
                },
                spec: PodSpec {
                    containers: vec![Container {
                        name: name.to_string(),
                        image: image.to_string(),
                        volume_mounts,
                    }],
                    volumes,
                },
            },
        },
    }
}

/// ClusterIP service mapping port 80 to `target_port`
pub fn build_service(name: &str, namespace: &str, target_port: u16) -> Service {
    Service {
        api_version: "v1".to_string(),
        kind: "Service".to_string(),
        metadata: ObjectMeta::new(name, namespace),
        spec: ServiceSpec {
            selector: app_labels(name),
            ports: vec![ServicePort {
                name: Some("http".to_string()),
                port: SERVICE_PORT,
                target_port: Some(target_port),
            }],
            type_: Some("ClusterIP".to_string()),
        },
    }
}

/// Key/value config object
pub fn build_config(name: &str, namespace: &str, data: BTreeMap<String, String>) -> ConfigMap {
    ConfigMap {
        data,
        ..ConfigMap::new(name, namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Story: Workloads run one container named after the resource
    // =========================================================================

    #[test]
    fn story_workload_has_single_replica_and_container() {
        let deployment = build_workload("foo-acme", "tenants", "registry/foo:v1", vec![], vec![]);

        assert_eq!(deployment.api_version, "apps/v1");
        assert_eq!(deployment.kind, "Deployment");
        assert_eq!(deployment.metadata.name, "foo-acme");
        assert_eq!(deployment.metadata.namespace, "tenants");
        assert_eq!(deployment.spec.replicas, 1);

        let containers = &deployment.spec.template.spec.containers;
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0].name, "foo-acme");
        assert_eq!(containers[0].image, "registry/foo:v1");
    }

    #[test]
    fn story_selector_and_pod_labels_are_exactly_app() {
        let deployment = build_workload("foo-acme", "tenants", "foo", vec![], vec![]);

        let expected = app_labels("foo-acme");
        assert_eq!(deployment.spec.selector.match_labels, expected);
        assert_eq!(deployment.spec.template.metadata.labels, expected);

        // Object metadata additionally marks the owner
        assert_eq!(
            deployment.metadata.labels.get("app.kubernetes.io/managed-by"),
            Some(&MANAGED_BY.to_string())
        );
        assert_eq!(deployment.metadata.labels.get("app"), Some(&"foo-acme".to_string()));
    }

    #[test]
    fn story_workload_carries_mounts_and_volumes() {
        let mounts = vec![
            VolumeMount::new("settings", "/etc/foo"),
            VolumeMount {
                name: "app".to_string(),
                mount_path: "/etc/foo/app.yaml".to_string(),
                sub_path: Some("app.yaml".to_string()),
            },
        ];
        let volumes = vec![
            Volume::config_map("settings", "settings-acme-0"),
            Volume::empty_dir("app"),
        ];

        let deployment = build_workload("foo-acme", "tenants", "foo", mounts.clone(), volumes.clone());
        assert_eq!(deployment.spec.template.spec.containers[0].volume_mounts, mounts);
        assert_eq!(deployment.spec.template.spec.volumes, volumes);
    }

    // =========================================================================
    // Story: Services expose port 80 inside the cluster
    // =========================================================================

    #[test]
    fn story_service_routes_port_80_to_target() {
        let service = build_service("foo-acme", "tenants", 8080);

        assert_eq!(service.metadata.name, "foo-acme");
        assert_eq!(service.spec.type_.as_deref(), Some("ClusterIP"));
        assert_eq!(service.spec.selector, app_labels("foo-acme"));
        assert_eq!(service.spec.ports.len(), 1);
        assert_eq!(service.spec.ports[0].name.as_deref(), Some("http"));
        assert_eq!(service.spec.ports[0].port, 80);
        assert_eq!(service.spec.ports[0].target_port, Some(8080));
    }

    #[test]
    fn story_config_holds_given_data() {
        let mut data = BTreeMap::new();
        data.insert("config.json".to_string(), "{}".to_string());

        let cm = build_config("app-acme", "tenants", data.clone());
        assert_eq!(cm.kind, "ConfigMap");
        assert_eq!(cm.data, data);
        assert_eq!(cm.metadata.labels.get("app"), Some(&"app-acme".to_string()));
    }

    // =========================================================================
    // Story: Serialized objects match the Kubernetes wire shape
    // =========================================================================

    #[test]
    fn story_serialization_uses_camel_case_and_omits_empty() {
        let deployment = build_workload(
            "foo-acme",
            "tenants",
            "foo",
            vec![VolumeMount::new("scratch", "/tmp")],
            vec![Volume::empty_dir("scratch")],
        );
        let json = serde_json::to_value(&deployment).unwrap();

        assert_eq!(json["apiVersion"], "apps/v1");
        assert_eq!(json["spec"]["selector"]["matchLabels"]["app"], "foo-acme");
        let container = &json["spec"]["template"]["spec"]["containers"][0];
        assert_eq!(container["volumeMounts"][0]["mountPath"], "/tmp");
        assert!(container["volumeMounts"][0].get("subPath").is_none());
        assert!(container.get("resources").is_none());
        assert!(container.get("livenessProbe").is_none());
        assert_eq!(
            json["spec"]["template"]["spec"]["volumes"][0]["emptyDir"],
            serde_json::json!({})
        );

        let service = serde_json::to_value(build_service("foo-acme", "tenants", 8080)).unwrap();
        assert_eq!(service["spec"]["type"], "ClusterIP");
        assert_eq!(service["spec"]["ports"][0]["targetPort"], 8080);

        let cm = serde_json::to_value(ConfigMap::new("c", "tenants").with_binary_data("k", "AA==")).unwrap();
        assert_eq!(cm["binaryData"]["k"], "AA==");
        assert!(cm.get("data").is_none());
    }
}

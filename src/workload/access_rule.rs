//! Gateway access rules
//!
//! A Kyma `APIRule` exposes a tenant's auth proxy through the cluster
//! gateway. The rule itself does no authentication (`noop` handler); the auth
//! proxy behind it is the enforcement point.

use serde::{Deserialize, Serialize};

use super::{ObjectMeta, SERVICE_PORT};

/// API group of the access rule resource
pub const GROUP: &str = "gateway.kyma-project.io";
/// API version of the access rule resource
pub const VERSION: &str = "v1alpha1";
/// Kind of the access rule resource
pub const KIND: &str = "APIRule";

/// Methods every access rule allows
pub const ALLOWED_METHODS: [&str; 7] = ["GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"];

/// Kyma APIRule
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccessRule {
    /// API version
    pub api_version: String,
    /// Kind
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
    /// Spec
    pub spec: AccessRuleSpec,
}

/// APIRule spec
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccessRuleSpec {
    /// Gateway the rule attaches to
    pub gateway: String,
    /// Backend service and public host
    pub service: RuleService,
    /// Path rules
    pub rules: Vec<Rule>,
}

/// Backend of an APIRule
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuleService {
    /// Service name
    pub name: String,
    /// Service port
    pub port: u16,
    /// Host, relative to the gateway's domain
    pub host: String,
}

/// One path rule
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Path regex
    pub path: String,
    /// Allowed HTTP methods
    pub methods: Vec<String>,
    /// Access strategies, applied in order
    pub access_strategies: Vec<AccessStrategy>,
}

/// Access strategy handler
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccessStrategy {
    /// Handler name
    pub handler: String,
}

/// Wildcard rule exposing service `name` under host `name`
pub fn build_access_rule(name: &str, namespace: &str, gateway: &str) -> AccessRule {
    AccessRule {
        api_version: format!("{}/{}", GROUP, VERSION),
        kind: KIND.to_string(),
        metadata: ObjectMeta::new(name, namespace),
        spec: AccessRuleSpec {
            gateway: gateway.to_string(),
            service: RuleService {
                name: name.to_string(),
                port: SERVICE_PORT,
                host: name.to_string(),
            },
            rules: vec![Rule {
                path: "/.*".to_string(),
                methods: ALLOWED_METHODS.iter().map(|m| m.to_string()).collect(),
                access_strategies: vec![AccessStrategy {
                    handler: "noop".to_string(),
                }],
            }],
        },
    }
}

//! Per-request provisioning inputs
//!
//! A [`ProvisioningContext`] is created for each callback, passed by reference
//! through every builder and provisioner, and dropped when the run ends.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ApplicationTemplate;
use crate::Error;

/// Longest tenant id accepted; leaves room for `{image}-{tenant}-{index}` within
/// the 63 character DNS label limit for typical image names.
pub const MAX_TENANT_LEN: usize = 40;

/// Opaque subscriber identifier, embedded in every resource name
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Tenant(String);

impl Tenant {
    /// Validate and wrap a tenant identifier
    ///
    /// The identifier must be usable as part of a DNS-1123 label: lowercase
    /// alphanumerics and `-`, not starting or ending with `-`.
    pub fn parse(id: impl Into<String>) -> Result<Self, Error> {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::validation("tenant id must not be empty"));
        }
        if id.len() > MAX_TENANT_LEN {
            return Err(Error::validation(format!(
                "tenant id '{}' is longer than {} characters",
                id, MAX_TENANT_LEN
            )));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(Error::validation(format!(
                "tenant id '{}' may only contain lowercase letters, digits and '-'",
                id
            )));
        }
        if id.starts_with('-') || id.ends_with('-') {
            return Err(Error::validation(format!(
                "tenant id '{}' must not start or end with '-'",
                id
            )));
        }
        Ok(Self(id))
    }

    /// The identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Tenant {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Tenant::parse(raw).map_err(serde::de::Error::custom)
    }
}

/// Identity-provider credentials issued for the subscription
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdpCredentials {
    /// OAuth token endpoint
    #[serde(default, rename = "tokenURL", alias = "tokenUrl", alias = "TokenURL")]
    pub token_url: String,
    /// OAuth client id
    #[serde(default, alias = "ClientID", alias = "clientid")]
    pub client_id: String,
    /// OAuth client secret
    #[serde(default, alias = "ClientSecret", alias = "clientsecret")]
    pub client_secret: String,
}

impl fmt::Debug for IdpCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdpCredentials")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Body of the subscription callback
///
/// Known fields are typed; everything else the subscription service sends is
/// kept verbatim in `metadata` so templates can reference it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestInfo {
    /// Tenant id as known to the subscription service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscribed_tenant_id: Option<String>,
    /// Subdomain of the subscribing account
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscribed_subdomain: Option<String>,
    /// Name of the subscribed application
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_app_name: Option<String>,
    /// Global account of the subscriber
    #[serde(
        default,
        rename = "globalAccountGUID",
        alias = "globalAccountGuid",
        skip_serializing_if = "Option::is_none"
    )]
    pub global_account_guid: Option<String>,
    /// Identity-provider credentials
    #[serde(default)]
    pub additional_information: IdpCredentials,
    /// Remaining subscription metadata
    #[serde(flatten)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl RequestInfo {
    /// Names of identity-provider fields the callback left empty
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let idp = &self.additional_information;
        let mut missing = Vec::new();
        if idp.token_url.is_empty() {
            missing.push("additionalInformation.tokenURL");
        }
        if idp.client_id.is_empty() {
            missing.push("additionalInformation.clientId");
        }
        if idp.client_secret.is_empty() {
            missing.push("additionalInformation.clientSecret");
        }
        missing
    }
}

/// Everything one provisioning run reads
#[derive(Clone, Debug)]
pub struct ProvisioningContext {
    /// Tenant being provisioned
    pub tenant: Tenant,
    /// Shared, read-only application template
    pub template: Arc<ApplicationTemplate>,
    /// Callback data for this run
    pub request: RequestInfo,
    /// Correlates the log lines and report of one run
    pub run_id: Uuid,
}

impl ProvisioningContext {
    /// Create a context for a new run
    pub fn new(tenant: Tenant, template: Arc<ApplicationTemplate>, request: RequestInfo) -> Self {
        Self {
            tenant,
            template,
            request,
            run_id: Uuid::new_v4(),
        }
    }

    /// Namespace all tenant resources live in
    pub fn namespace(&self) -> &str {
        &self.template.namespace
    }

    /// Public URL of the tenant's application
    pub fn tenant_url(&self) -> String {
        self.template.tenant_url(&self.tenant)
    }
}

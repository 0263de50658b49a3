//! Auth proxy provisioner
//!
//! Each tenant gets its own auth proxy: a config object holding the
//! identity-provider settings and the tenant's route table, a workload
//! mounting it, a service, and a gateway access rule. The access rule lets
//! all traffic through; the proxy enforces authentication.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::{note, Outcome, ProvisionReport};
use crate::client::{ClusterClient, ResourceKind};
use crate::context::ProvisioningContext;
use crate::materialize::json_config;
use crate::naming::auth_proxy_name;
use crate::workload::{build_access_rule, build_service, build_workload, Volume, VolumeMount};

/// Volume the proxy config is mounted from
pub const CONFIG_VOLUME: &str = "config-volume";
/// Directory the proxy reads its config from
pub const CONFIG_MOUNT_PATH: &str = "/app/config";
/// Key of the serialized config inside the config object
pub const CONFIG_KEY: &str = "config.json";

/// Session cookie settings handed to the proxy
#[derive(Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CookieConfig {
    /// Cookie name
    pub name: String,
    /// Signing secret, regenerated every run
    pub key: String,
    /// Session lifetime
    pub max_age_seconds: u64,
    /// Only send over TLS
    pub secure: bool,
}

/// Identity-provider settings handed to the proxy
#[derive(Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct IdpConfig {
    /// Token endpoint
    #[serde(rename = "URL")]
    pub url: String,
    /// OAuth client id
    #[serde(rename = "ClientID")]
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Requested scopes
    pub scopes: Vec<String>,
    /// User info endpoint
    #[serde(rename = "UserInfoURL", skip_serializing_if = "Option::is_none")]
    pub user_info_url: Option<String>,
    /// Logout endpoint
    #[serde(rename = "LogoutURL", skip_serializing_if = "Option::is_none")]
    pub logout_url: Option<String>,
}

/// One entry of the proxy's route table
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProxyRoute {
    /// Request path prefix
    pub path: String,
    /// Upstream the proxy forwards to
    pub target: String,
}

/// Full proxy configuration, serialized as `config.json`
#[derive(Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProxyConfig {
    /// OAuth redirect URI of this tenant
    #[serde(rename = "RedirectURI")]
    pub redirect_uri: String,
    /// Session cookie
    pub cookie: CookieConfig,
    /// Identity provider
    #[serde(rename = "IDPConfig")]
    pub idp_config: IdpConfig,
    /// Route table
    pub routes: Vec<ProxyRoute>,
}

impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("redirect_uri", &self.redirect_uri)
            .field("client_id", &self.idp_config.client_id)
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}

impl ProxyConfig {
    /// Build the tenant's proxy config with a fresh cookie secret
    ///
    /// Image routes are rewritten to `{target}-{tenant}.{namespace}`;
    /// declaration-only routes keep their target as written.
    pub fn build(ctx: &ProvisioningContext) -> Self {
        let template = &ctx.template;
        let proxy = &template.auth_proxy;
        let idp = &ctx.request.additional_information;

        let routes = template
            .routes
            .iter()
            .map(|route| ProxyRoute {
                path: route.path.clone(),
                target: match route.image() {
                    Some(_) => format!(
                        "{}-{}.{}",
                        route.target, ctx.tenant, template.namespace
                    ),
                    None => route.target.clone(),
                },
            })
            .collect();

        Self {
            redirect_uri: format!("{}/oauth/callback", ctx.tenant_url()),
            cookie: CookieConfig {
                name: proxy.cookie.name.clone(),
                key: generate_cookie_secret(),
                max_age_seconds: proxy.cookie.max_age_seconds,
                secure: proxy.cookie.secure,
            },
            idp_config: IdpConfig {
                url: idp.token_url.clone(),
                client_id: idp.client_id.clone(),
                client_secret: idp.client_secret.clone(),
                scopes: proxy.idp.scopes.clone(),
                user_info_url: proxy.idp.user_info_url.clone(),
                logout_url: proxy.idp.logout_url.clone(),
            },
            routes,
        }
    }
}

/// 32 random bytes, URL-safe base64 without padding
pub fn generate_cookie_secret() -> String {
    let mut raw = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut raw);
    URL_SAFE_NO_PAD.encode(raw)
}

/// Submit config, workload, service and access rule for the tenant's proxy
#[instrument(skip_all, fields(app = %ctx.template.app_name))]
pub async fn provision_auth_proxy(
    ctx: &ProvisioningContext,
    client: &dyn ClusterClient,
    report: &mut ProvisionReport,
) {
    let template = &ctx.template;
    let name = auth_proxy_name(&template.app_name, &ctx.tenant);
    let namespace = ctx.namespace();
    info!(name = %name, "provisioning auth proxy");

    let config = ProxyConfig::build(ctx);
    let outcome = match json_config(&name, namespace, CONFIG_KEY, &config) {
        Ok(config) => Outcome::from_create(client.create_config(&config).await),
        Err(e) => {
            warn!(name = %name, error = %e, "skipping auth proxy config");
            Outcome::skipped(&e)
        }
    };
    note(report, ResourceKind::ConfigMap, &name, outcome);

    let workload = build_workload(
        &name,
        namespace,
        &template.auth_proxy.image,
        vec![VolumeMount::new(CONFIG_VOLUME, CONFIG_MOUNT_PATH)],
        vec![Volume::config_map(CONFIG_VOLUME, &name)],
    );
    let outcome = Outcome::from_create(client.create_workload(&workload).await);
    note(report, ResourceKind::Deployment, &name, outcome);

    let service = build_service(&name, namespace, template.auth_proxy.target_port);
    let outcome = Outcome::from_create(client.create_service(&service).await);
    note(report, ResourceKind::Service, &name, outcome);

    let rule = build_access_rule(&name, namespace, &template.gateway);
    let outcome = Outcome::from_create(client.create_access_rule(&rule).await);
    note(report, ResourceKind::AccessRule, &name, outcome);
}

/// Delete the tenant's proxy resources in reverse creation order
pub async fn deprovision_auth_proxy(
    ctx: &ProvisioningContext,
    client: &dyn ClusterClient,
    report: &mut ProvisionReport,
) {
    let name = auth_proxy_name(&ctx.template.app_name, &ctx.tenant);
    info!(name = %name, "deprovisioning auth proxy");

    for kind in [
        ResourceKind::AccessRule,
        ResourceKind::Service,
        ResourceKind::Deployment,
        ResourceKind::ConfigMap,
    ] {
        let outcome = Outcome::from_delete(client.delete(kind, ctx.namespace(), &name).await);
        note(report, kind, &name, outcome);
    }
}

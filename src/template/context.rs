//! Values a config template is rendered against

use serde::Serialize;

use crate::context::{ProvisioningContext, RequestInfo};

/// Application fields exposed to templates as `app.*`
#[derive(Clone, Debug, Serialize)]
pub struct AppValues<'a> {
    /// Application name
    pub name: &'a str,
    /// Base domain
    pub domain: &'a str,
    /// Namespace tenant resources live in
    pub namespace: &'a str,
    /// Public URL of this tenant's application
    pub url: String,
}

/// Render context for one config object
///
/// Templates see `tenant`, `request.*` (the full callback body, camelCase),
/// `app.*` and `resourceName` (the config object being produced).
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateContext<'a> {
    /// Tenant id
    pub tenant: &'a str,
    /// Callback body
    pub request: &'a RequestInfo,
    /// Application template fields
    pub app: AppValues<'a>,
    /// Name of the config object being rendered
    pub resource_name: &'a str,
}

impl<'a> TemplateContext<'a> {
    /// Build the render context for a config object of this run
    pub fn new(ctx: &'a ProvisioningContext, resource_name: &'a str) -> Self {
        Self {
            tenant: ctx.tenant.as_str(),
            request: &ctx.request,
            app: AppValues {
                name: &ctx.template.app_name,
                domain: &ctx.template.domain,
                namespace: &ctx.template.namespace,
                url: ctx.tenant_url(),
            },
            resource_name,
        }
    }
}

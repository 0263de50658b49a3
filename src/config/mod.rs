//! Application template: what gets provisioned for every tenant
//!
//! The template is loaded once at startup from YAML (or JSON) and shared
//! read-only by all provisioning runs. Validation and transform resolution
//! happen here, so a broken template stops the process before any tenant is
//! touched.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::context::Tenant;
use crate::materialize::TransformKind;
use crate::naming::template_id;
use crate::Error;

/// Default gateway that exposes access rules
pub const DEFAULT_GATEWAY: &str = "kyma-gateway.kyma-system.svc.cluster.local";

/// Declarative description of the per-tenant application stack
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationTemplate {
    /// Application name, used for the auth proxy and the tenant host name
    pub app_name: String,
    /// Base domain tenants are served under
    pub domain: String,
    /// Namespace all tenant resources are created in
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Gateway the access rules attach to
    #[serde(default = "default_gateway")]
    pub gateway: String,
    /// Auth proxy deployment and identity-provider defaults
    pub auth_proxy: AuthProxyTemplate,
    /// Backing services, in provisioning order
    #[serde(default)]
    pub routes: Vec<RouteTemplate>,
    /// Base directory config source paths are resolved against
    #[serde(skip)]
    pub asset_dir: PathBuf,
}

/// Auth proxy settings shared by all tenants
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthProxyTemplate {
    /// Auth proxy image
    pub image: String,
    /// Port the proxy container listens on
    pub target_port: u16,
    /// Session cookie settings
    #[serde(default)]
    pub cookie: CookieTemplate,
    /// Identity-provider defaults merged with per-tenant credentials
    #[serde(default)]
    pub idp: IdpTemplate,
}

/// Session cookie settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieTemplate {
    /// Cookie name
    #[serde(default = "default_cookie_name")]
    pub name: String,
    /// Session lifetime
    #[serde(default = "default_cookie_max_age")]
    pub max_age_seconds: u64,
    /// Only send the cookie over TLS
    #[serde(default = "default_true")]
    pub secure: bool,
}

impl Default for CookieTemplate {
    fn default() -> Self {
        Self {
            name: default_cookie_name(),
            max_age_seconds: default_cookie_max_age(),
            secure: true,
        }
    }
}

/// Identity-provider integration defaults
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdpTemplate {
    /// OAuth scopes requested by the proxy
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    /// User info endpoint, if the proxy should call one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_info_url: Option<String>,
    /// Logout endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logout_url: Option<String>,
}

impl Default for IdpTemplate {
    fn default() -> Self {
        Self {
            scopes: default_scopes(),
            user_info_url: None,
            logout_url: None,
        }
    }
}

/// One backing service behind the auth proxy
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteTemplate {
    /// Logical target the proxy forwards to
    pub target: String,
    /// Request path prefix served by this route
    #[serde(default = "default_route_path")]
    pub path: String,
    /// Image to deploy; absent for routes served outside this system
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Port the route's container listens on
    #[serde(default = "default_target_port")]
    pub target_port: u16,
    /// Volumes mounted into the route's container
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<VolumeTemplate>,
}

impl RouteTemplate {
    /// Image reference, treating an empty string as absent
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref().filter(|image| !image.is_empty())
    }
}

/// A volume mounted into a route's container
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeTemplate {
    /// Volume name, unique within the route
    pub name: String,
    /// Where the volume is mounted
    pub mount_path: String,
    /// Mount a single key instead of the whole volume
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_path: Option<String>,
    /// Config object backing the volume; `emptyDir` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ConfigSource>,
}

/// Where a config object's contents come from
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSource {
    /// Base name of the config object
    pub name: String,
    /// Asset file, relative to the template's asset directory
    pub file_path: PathBuf,
    /// Key the contents are exposed under
    pub file_key: String,
    /// Custom transform applied instead of copying the file
    #[serde(
        default,
        alias = "customMethodProcessor",
        skip_serializing_if = "Option::is_none"
    )]
    pub transform: Option<TransformKind>,
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_gateway() -> String {
    DEFAULT_GATEWAY.to_string()
}

fn default_cookie_name() -> String {
    "_session".to_string()
}

fn default_cookie_max_age() -> u64 {
    3600
}

fn default_true() -> bool {
    true
}

fn default_scopes() -> Vec<String> {
    vec!["openid".to_string()]
}

fn default_route_path() -> String {
    "/".to_string()
}

fn default_target_port() -> u16 {
    80
}

impl ApplicationTemplate {
    /// Load and validate a template file
    ///
    /// Config source paths resolve against `asset_dir`, or against the
    /// template file's directory when no asset directory is given.
    pub fn load(path: &Path, asset_dir: Option<&Path>) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let base = match asset_dir {
            Some(dir) => dir.to_path_buf(),
            None => path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        };

        let template = Self::from_yaml(&raw, base).map_err(|e| match e {
            Error::Serialization { message } => Error::config(path, message),
            other => other,
        })?;

        info!(
            path = %path.display(),
            app = %template.app_name,
            routes = template.routes.len(),
            asset_dir = %template.asset_dir.display(),
            "loaded application template"
        );
        Ok(template)
    }

    /// Parse and validate a template from YAML or JSON text
    pub fn from_yaml(raw: &str, asset_dir: impl Into<PathBuf>) -> Result<Self, Error> {
        let mut template: ApplicationTemplate =
            serde_yaml::from_str(raw).map_err(|e| Error::serialization(e.to_string()))?;
        template.asset_dir = asset_dir.into();
        template.validate()?;
        Ok(template)
    }

    /// Check the invariants provisioning relies on
    pub fn validate(&self) -> Result<(), Error> {
        if self.app_name.is_empty() {
            return Err(Error::validation_for_field("appName", "must not be empty"));
        }
        if self.domain.is_empty() {
            return Err(Error::validation_for_field("domain", "must not be empty"));
        }
        if self.namespace.is_empty() {
            return Err(Error::validation_for_field("namespace", "must not be empty"));
        }
        if self.auth_proxy.image.is_empty() {
            return Err(Error::validation_for_field(
                "authProxy.image",
                "must not be empty",
            ));
        }
        if self.auth_proxy.target_port == 0 {
            return Err(Error::validation_for_field(
                "authProxy.targetPort",
                "must be a valid port",
            ));
        }

        // The auth proxy's objects are named after the app
        let proxy_id = template_id(&self.app_name).to_string();
        let mut workloads = HashSet::new();
        let mut configs = HashSet::new();
        for (i, route) in self.routes.iter().enumerate() {
            let field = format!("routes[{}]", i);
            if route.target.is_empty() {
                return Err(Error::validation_for_field(
                    format!("{}.target", field),
                    "must not be empty",
                ));
            }
            let Some(image) = route.image() else {
                debug!(route = %route.target, "declaration-only route");
                continue;
            };
            if route.target_port == 0 {
                return Err(Error::validation_for_field(
                    format!("{}.targetPort", field),
                    "must be a valid port",
                ));
            }
            let id = template_id(image);
            if id.is_empty() {
                return Err(Error::validation_for_field(
                    format!("{}.image", field),
                    format!("cannot derive a name from image '{}'", image),
                ));
            }
            if id == proxy_id {
                return Err(Error::validation_for_field(
                    format!("{}.image", field),
                    format!(
                        "image name '{}' collides with the auth proxy of app '{}'",
                        id, self.app_name
                    ),
                ));
            }
            if !workloads.insert(id.to_string()) {
                return Err(Error::validation_for_field(
                    format!("{}.image", field),
                    format!("image name '{}' is used by more than one route", id),
                ));
            }
            Self::validate_volumes(&field, route, &mut configs)?;
        }
        Ok(())
    }

    /// `configs` holds the `(source id, index)` pairs already claimed by
    /// earlier routes; each pair maps to exactly one config object name.
    fn validate_volumes<'t>(
        field: &str,
        route: &'t RouteTemplate,
        configs: &mut HashSet<(&'t str, usize)>,
    ) -> Result<(), Error> {
        let mut names = HashSet::new();
        for (j, volume) in route.volumes.iter().enumerate() {
            let field = format!("{}.volumes[{}]", field, j);
            if volume.name.is_empty() || volume.mount_path.is_empty() {
                return Err(Error::validation_for_field(
                    field,
                    "name and mountPath must not be empty",
                ));
            }
            if !names.insert(volume.name.as_str()) {
                return Err(Error::validation_for_field(
                    field,
                    format!("duplicate volume name '{}'", volume.name),
                ));
            }
            let Some(source) = &volume.config else {
                continue;
            };
            if source.name.is_empty() || source.file_key.is_empty() {
                return Err(Error::validation_for_field(
                    format!("{}.config", field),
                    "name and fileKey must not be empty",
                ));
            }
            if !configs.insert((template_id(&source.name), j)) {
                return Err(Error::validation_for_field(
                    format!("{}.config.name", field),
                    format!(
                        "config '{}' at volume index {} is already used by another route",
                        source.name, j
                    ),
                ));
            }
            if !is_contained(&source.file_path) {
                return Err(Error::validation_for_field(
                    format!("{}.config.filePath", field),
                    format!(
                        "'{}' must be a relative path inside the asset directory",
                        source.file_path.display()
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Absolute location of a config source's asset file
    pub fn resolve_asset(&self, file_path: &Path) -> PathBuf {
        self.asset_dir.join(file_path)
    }

    /// Public URL of a tenant's application
    pub fn tenant_url(&self, tenant: &Tenant) -> String {
        format!("https://{}-{}.{}", self.app_name, tenant, self.domain)
    }

    /// Routes that deploy a workload
    pub fn image_routes(&self) -> impl Iterator<Item = (&RouteTemplate, &str)> {
        self.routes
            .iter()
            .filter_map(|route| route.image().map(|image| (route, image)))
    }
}

/// Relative path with no `..` or root components
fn is_contained(path: &Path) -> bool {
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

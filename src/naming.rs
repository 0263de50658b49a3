//! Tenant-qualified resource names
//!
//! Every object created for a tenant is named `{template-id}-{tenant}`. The
//! template id is the bare image name for workloads (registry path, tag and
//! digest stripped) or the declared name for config sources. Names are pure
//! functions of their inputs so a re-run for the same tenant always targets
//! the same objects.

use crate::context::Tenant;

/// Strip registry/path prefix, tag and digest from an image reference
///
/// `registry.example:5000/team/foo:v1` and `foo@sha256:...` both yield `foo`.
pub fn template_id(image: &str) -> &str {
    let base = image.rsplit('/').next().unwrap_or(image);
    let base = base.split('@').next().unwrap_or(base);
    base.split(':').next().unwrap_or(base)
}

/// Name for a resource derived from an image reference or template id
pub fn resource_name(template: &str, tenant: &Tenant) -> String {
    format!("{}-{}", template_id(template), tenant)
}

/// Name for the config object backing the `index`-th volume of a route
pub fn config_map_name(source: &str, tenant: &Tenant, index: usize) -> String {
    format!("{}-{}", resource_name(source, tenant), index)
}

/// Name shared by every auth-proxy resource of a tenant
pub fn auth_proxy_name(app_name: &str, tenant: &Tenant) -> String {
    resource_name(app_name, tenant)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant(id: &str) -> Tenant {
        Tenant::parse(id).unwrap()
    }

    #[test]
    fn strips_registry_and_tag() {
        assert_eq!(template_id("registry/foo:v1"), "foo");
        assert_eq!(template_id("ghcr.io/org/team/foo:1.2.3"), "foo");
        assert_eq!(template_id("localhost:5000/foo"), "foo");
        assert_eq!(template_id("foo"), "foo");
    }

    #[test]
    fn strips_digest() {
        assert_eq!(template_id("registry/foo@sha256:abcdef"), "foo");
        assert_eq!(template_id("registry/foo:v1@sha256:abcdef"), "foo");
    }

    #[test]
    fn workload_name_for_image() {
        assert_eq!(resource_name("registry/foo:v1", &tenant("acme")), "foo-acme");
    }

    #[test]
    fn distinct_tenants_never_collide() {
        let a = resource_name("registry/foo:v1", &tenant("acme"));
        let b = resource_name("registry/foo:v1", &tenant("globex"));
        assert_ne!(a, b);
    }

    #[test]
    fn names_are_stable_across_calls() {
        let t = tenant("acme");
        let first = resource_name("registry/foo:v1", &t);
        for _ in 0..3 {
            assert_eq!(resource_name("registry/foo:v1", &t), first);
        }
        assert_eq!(config_map_name("nginx-conf", &t, 1), config_map_name("nginx-conf", &t, 1));
    }

    #[test]
    fn config_names_are_indexed_per_volume() {
        let t = tenant("acme");
        assert_eq!(config_map_name("settings", &t, 0), "settings-acme-0");
        assert_ne!(config_map_name("settings", &t, 0), config_map_name("settings", &t, 1));
    }

    #[test]
    fn auth_proxy_name_uses_app_name() {
        assert_eq!(auth_proxy_name("app", &tenant("acme")), "app-acme");
    }
}

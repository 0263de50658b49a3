//! The shipped sample template must load and provision cleanly

use std::path::PathBuf;
use std::sync::Arc;

use saas_provisioner::client::{ManifestCollector, ResourceKind};
use saas_provisioner::config::ApplicationTemplate;
use saas_provisioner::context::{RequestInfo, Tenant};
use saas_provisioner::provision::{RunStatus, TenantProvisioner};

fn deploy_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("deploy")
}

#[tokio::test]
async fn sample_template_renders_for_a_tenant() {
    let dir = deploy_dir();
    let template =
        ApplicationTemplate::load(&dir.join("app-template.yaml"), Some(&dir.join("assets")))
            .unwrap();
    let request: RequestInfo =
        serde_json::from_str(&std::fs::read_to_string(dir.join("request.json")).unwrap()).unwrap();
    assert!(request.missing_credentials().is_empty());

    let collector = Arc::new(ManifestCollector::new());
    let provisioner = TenantProvisioner::new(Arc::new(template), collector.clone());
    let report = provisioner
        .provision(Tenant::parse("acme").unwrap(), request)
        .await;

    assert_eq!(
        report.status(),
        RunStatus::Succeeded,
        "{:?}",
        report.failures().collect::<Vec<_>>()
    );
    assert_eq!(
        collector.names(ResourceKind::ConfigMap),
        vec!["foo-settings-acme-0", "foo-app-acme-1", "app-acme"]
    );

    let rendered = collector
        .submissions()
        .into_iter()
        .find(|s| s.name == "foo-app-acme-1")
        .unwrap();
    let app_yaml = rendered.manifest["data"]["app.yaml"].as_str().unwrap();
    assert!(app_yaml.contains("tenant: acme"));
    assert!(app_yaml.contains("publicUrl: https://app-acme.example.com"));
    assert!(app_yaml.contains("clientId: sb-app!t1"));

    // 3 config maps, 2 deployments, 2 services, 1 access rule
    assert_eq!(collector.submissions().len(), 8);
    assert!(collector.to_yaml().unwrap().starts_with("---\n"));
}

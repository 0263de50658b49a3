//! HTTP-level tests for the subscription callback API
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot`; the
//! cluster is replaced by the in-memory collector or a client that fails on
//! selected kinds.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use saas_provisioner::api;
use saas_provisioner::client::{ClusterClient, ManifestCollector, ResourceKind, SubmitError};
use saas_provisioner::config::ApplicationTemplate;
use saas_provisioner::provision::TenantProvisioner;
use saas_provisioner::workload::{AccessRule, ConfigMap, Deployment, Service};

const TEMPLATE: &str = r#"
appName: app
domain: example.com
namespace: tenants
authProxy:
  image: registry/auth-proxy:1.0
  targetPort: 4180
routes:
  - target: foo
    path: /api
    image: registry/foo:v1
    targetPort: 8080
    volumes:
      - name: settings
        mountPath: /etc/foo
        config:
          name: foo-settings
          filePath: settings.json
          fileKey: settings.json
"#;

fn template(asset_dir: &Path) -> Arc<ApplicationTemplate> {
    std::fs::write(asset_dir.join("settings.json"), "{}").unwrap();
    Arc::new(ApplicationTemplate::from_yaml(TEMPLATE, asset_dir).unwrap())
}

fn router_with(asset_dir: &Path, client: Arc<dyn ClusterClient>) -> Router {
    api::router(Arc::new(TenantProvisioner::new(template(asset_dir), client)))
}

fn callback_body() -> Value {
    json!({
        "subscribedTenantId": "t-1",
        "subscribedSubdomain": "acme-sub",
        "additionalInformation": {
            "tokenURL": "https://idp.example/token",
            "clientId": "cid",
            "clientSecret": "secret"
        }
    })
}

fn put(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Cluster client that rejects one kind of object and accepts the rest
struct RejectKind(Option<ResourceKind>);

impl RejectKind {
    fn check(&self, kind: ResourceKind) -> Result<(), SubmitError> {
        match self.0 {
            Some(rejected) if rejected == kind => {
                Err(SubmitError::Invalid(format!("{} rejected", kind)))
            }
            Some(_) => Ok(()),
            None => Err(SubmitError::Connectivity("connection refused".to_string())),
        }
    }
}

#[async_trait]
impl ClusterClient for RejectKind {
    async fn create_workload(&self, _: &Deployment) -> Result<(), SubmitError> {
        self.check(ResourceKind::Deployment)
    }
    async fn create_service(&self, _: &Service) -> Result<(), SubmitError> {
        self.check(ResourceKind::Service)
    }
    async fn create_config(&self, _: &ConfigMap) -> Result<(), SubmitError> {
        self.check(ResourceKind::ConfigMap)
    }
    async fn create_access_rule(&self, _: &AccessRule) -> Result<(), SubmitError> {
        self.check(ResourceKind::AccessRule)
    }
    async fn delete(&self, kind: ResourceKind, _: &str, _: &str) -> Result<(), SubmitError> {
        self.check(kind)
    }
}

#[tokio::test]
async fn provision_callback_returns_report_and_url() {
    let dir = tempfile::tempdir().unwrap();
    let collector = Arc::new(ManifestCollector::new());
    let router = router_with(dir.path(), collector.clone());

    let response = router
        .oneshot(put("/callback/v1.0/tenants/acme", &callback_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "succeeded");
    assert_eq!(body["url"], "https://app-acme.example.com");
    assert_eq!(body["tenant"], "acme");
    assert_eq!(body["operation"], "provision");
    assert_eq!(body["outcomes"].as_array().unwrap().len(), 7);
    assert_eq!(body["outcomes"][0]["name"], "foo-settings-acme-0");
    assert_eq!(body["outcomes"][0]["outcome"]["result"], "created");

    assert!(collector.contains(ResourceKind::Deployment, "tenants", "foo-acme"));
    assert!(collector.contains(ResourceKind::AccessRule, "tenants", "app-acme"));
}

#[tokio::test]
async fn unprefixed_route_is_equivalent() {
    let dir = tempfile::tempdir().unwrap();
    let collector = Arc::new(ManifestCollector::new());
    let router = router_with(dir.path(), collector.clone());

    let response = router
        .oneshot(put("/tenants/globex", &callback_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(collector.contains(ResourceKind::Service, "tenants", "foo-globex"));
}

#[tokio::test]
async fn repeated_provision_is_still_success() {
    let dir = tempfile::tempdir().unwrap();
    let collector = Arc::new(ManifestCollector::new());
    let router = router_with(dir.path(), collector.clone());

    let first = router
        .clone()
        .oneshot(put("/tenants/acme", &callback_body()))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = router
        .oneshot(put("/tenants/acme", &callback_body()))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    let body = json_body(second).await;
    assert!(body["outcomes"]
        .as_array()
        .unwrap()
        .iter()
        .all(|o| o["outcome"]["result"] == "alreadyExists"));
    assert_eq!(collector.submissions().len(), 7);
}

#[tokio::test]
async fn partial_failure_is_multi_status() {
    let dir = tempfile::tempdir().unwrap();
    let router = router_with(dir.path(), Arc::new(RejectKind(Some(ResourceKind::AccessRule))));

    let response = router
        .oneshot(put("/tenants/acme", &callback_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::MULTI_STATUS);

    let body = json_body(response).await;
    assert_eq!(body["status"], "partiallySucceeded");
    let last = body["outcomes"].as_array().unwrap().last().unwrap().clone();
    assert_eq!(last["kind"], "APIRule");
    assert_eq!(last["outcome"]["result"], "failed");
    assert_eq!(last["outcome"]["kind"], "resourceSubmissionFailure");
}

#[tokio::test]
async fn total_failure_is_bad_gateway() {
    let dir = tempfile::tempdir().unwrap();
    let router = router_with(dir.path(), Arc::new(RejectKind(None)));

    let response = router
        .oneshot(put("/tenants/acme", &callback_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(json_body(response).await["status"], "failed");
}

#[tokio::test]
async fn invalid_tenant_is_rejected_before_provisioning() {
    let dir = tempfile::tempdir().unwrap();
    let collector = Arc::new(ManifestCollector::new());
    let router = router_with(dir.path(), collector.clone());

    let response = router
        .oneshot(put("/tenants/Acme_Corp", &callback_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("invalid tenant"));
    assert!(collector.submissions().is_empty());
}

#[tokio::test]
async fn malformed_or_incomplete_body_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let collector = Arc::new(ManifestCollector::new());
    let router = router_with(dir.path(), collector.clone());

    let malformed = Request::builder()
        .method("PUT")
        .uri("/tenants/acme")
        .body(Body::from("not json"))
        .unwrap();
    let response = router.clone().oneshot(malformed).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"]
        .as_str()
        .unwrap()
        .contains("invalid request body"));

    let no_secret = json!({
        "additionalInformation": {"tokenURL": "https://idp.example/token", "clientId": "cid"}
    });
    let response = router.oneshot(put("/tenants/acme", &no_secret)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"]
        .as_str()
        .unwrap()
        .contains("additionalInformation.clientSecret"));

    assert!(collector.submissions().is_empty());
}

#[tokio::test]
async fn deprovision_removes_everything_and_repeats_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let collector = Arc::new(ManifestCollector::new());
    let router = router_with(dir.path(), collector.clone());

    router
        .clone()
        .oneshot(put("/tenants/acme", &callback_body()))
        .await
        .unwrap();

    let response = router
        .clone()
        .oneshot(delete("/callback/v1.0/tenants/acme"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["operation"], "deprovision");
    assert!(body.get("url").is_none());
    assert_eq!(collector.deletions().len(), 7);
    assert!(!collector.contains(ResourceKind::Deployment, "tenants", "foo-acme"));

    let again = router.oneshot(delete("/tenants/acme")).await.unwrap();
    assert_eq!(again.status(), StatusCode::OK);
    let body = json_body(again).await;
    assert!(body["outcomes"]
        .as_array()
        .unwrap()
        .iter()
        .all(|o| o["outcome"]["result"] == "absent"));
}

#[tokio::test]
async fn health_endpoint_responds() {
    let dir = tempfile::tempdir().unwrap();
    let router = router_with(dir.path(), Arc::new(ManifestCollector::new()));

    let response = router
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

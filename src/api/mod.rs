//! HTTP callback API
//!
//! The subscription service calls:
//! - `PUT /callback/v1.0/tenants/{tenant}` to provision a tenant
//! - `DELETE /callback/v1.0/tenants/{tenant}` to deprovision it
//!
//! The same routes are mounted without the `/callback/v1.0` prefix. Both
//! respond with the run's [`ProvisionReport`]; the status code reflects the
//! aggregate outcome so callers can tell full, partial and failed runs apart.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::context::{RequestInfo, Tenant};
use crate::provision::{ProvisionReport, RunStatus, TenantProvisioner};

/// Prefix the subscription service calls under
pub const CALLBACK_PREFIX: &str = "/callback/v1.0";

/// Callback request errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Tenant id cannot be used in resource names
    #[error("invalid tenant: {0}")]
    InvalidTenant(String),

    /// Body is not a valid callback payload
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    /// Body lacks identity-provider credentials
    #[error("missing credentials: {}", .0.join(", "))]
    MissingCredentials(Vec<&'static str>),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidTenant(_)
            | ApiError::InvalidBody(_)
            | ApiError::MissingCredentials(_) => StatusCode::BAD_REQUEST,
        };

        (status, Json(serde_json::json!({"error": self.to_string()}))).into_response()
    }
}

/// Body returned for every completed run
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackResponse {
    /// Aggregate outcome
    pub status: RunStatus,
    /// Tenant application URL, for provisioning runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Full run report
    #[serde(flatten)]
    pub report: ProvisionReport,
}

impl IntoResponse for CallbackResponse {
    fn into_response(self) -> Response {
        (status_code(self.status), Json(self)).into_response()
    }
}

/// HTTP status for an aggregate run outcome
pub fn status_code(status: RunStatus) -> StatusCode {
    match status {
        RunStatus::Succeeded | RunStatus::Empty => StatusCode::OK,
        RunStatus::PartiallySucceeded => StatusCode::MULTI_STATUS,
        RunStatus::Failed => StatusCode::BAD_GATEWAY,
    }
}

fn parse_tenant(raw: String) -> Result<Tenant, ApiError> {
    Tenant::parse(raw).map_err(|e| ApiError::InvalidTenant(e.to_string()))
}

/// Provision handler
pub async fn provision_tenant(
    State(provisioner): State<Arc<TenantProvisioner>>,
    Path(tenant): Path<String>,
    body: Bytes,
) -> Result<CallbackResponse, ApiError> {
    let tenant = parse_tenant(tenant)?;
    debug!(tenant = %tenant, bytes = body.len(), "provision callback received");

    let request: RequestInfo =
        serde_json::from_slice(&body).map_err(|e| ApiError::InvalidBody(e.to_string()))?;
    let missing = request.missing_credentials();
    if !missing.is_empty() {
        return Err(ApiError::MissingCredentials(missing));
    }

    let url = provisioner.template().tenant_url(&tenant);
    let report = provisioner.provision(tenant, request).await;
    info!(tenant = %report.tenant, run_id = %report.run_id, status = ?report.status(), "provision callback done");

    Ok(CallbackResponse {
        status: report.status(),
        url: Some(url),
        report,
    })
}

/// Deprovision handler; the body is ignored
pub async fn deprovision_tenant(
    State(provisioner): State<Arc<TenantProvisioner>>,
    Path(tenant): Path<String>,
) -> Result<CallbackResponse, ApiError> {
    let tenant = parse_tenant(tenant)?;
    debug!(tenant = %tenant, "deprovision callback received");

    let report = provisioner.deprovision(tenant).await;
    info!(tenant = %report.tenant, run_id = %report.run_id, status = ?report.status(), "deprovision callback done");

    Ok(CallbackResponse {
        status: report.status(),
        url: None,
        report,
    })
}

async fn healthz() -> &'static str {
    "ok"
}

/// Create the callback router
///
/// Routes:
/// - `PUT|DELETE /callback/v1.0/tenants/{tenant}`
/// - `PUT|DELETE /tenants/{tenant}`
/// - `GET /healthz`
pub fn router(provisioner: Arc<TenantProvisioner>) -> Router {
    let tenants = Router::new().route(
        "/tenants/{tenant}",
        put(provision_tenant).delete(deprovision_tenant),
    );

    Router::new()
        .route("/healthz", get(healthz))
        .nest(CALLBACK_PREFIX, tenants.clone())
        .merge(tenants)
        .with_state(provisioner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn story_run_status_maps_to_http_status() {
        assert_eq!(status_code(RunStatus::Succeeded), StatusCode::OK);
        assert_eq!(status_code(RunStatus::Empty), StatusCode::OK);
        assert_eq!(status_code(RunStatus::PartiallySucceeded), StatusCode::MULTI_STATUS);
        assert_eq!(status_code(RunStatus::Failed), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn story_client_errors_are_bad_requests() {
        let cases = [
            ApiError::InvalidTenant("Acme".to_string()),
            ApiError::InvalidBody("expected value".to_string()),
            ApiError::MissingCredentials(vec!["additionalInformation.clientId"]),
        ];
        for err in cases {
            assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn story_missing_credentials_are_named() {
        let err = ApiError::MissingCredentials(vec![
            "additionalInformation.tokenURL",
            "additionalInformation.clientSecret",
        ]);
        assert_eq!(
            err.to_string(),
            "missing credentials: additionalInformation.tokenURL, additionalInformation.clientSecret"
        );
    }
}

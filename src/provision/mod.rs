//! Tenant provisioning orchestrator
//!
//! A run for one tenant executes sequentially in the calling task:
//! 1. Route provisioner: config objects, workload and service per image route
//! 2. Auth proxy provisioner: config, workload, service and access rule
//!
//! The second step runs even when the first had failures; nothing is rolled
//! back. Every resource attempt is recorded in the returned
//! [`ProvisionReport`]. Runs for the same tenant are serialized by
//! [`TenantLocks`]; de-provisioning deletes the same deterministically named
//! set in reverse and treats already-missing objects as done.

mod auth_proxy;
mod lock;
mod report;
mod routes;

pub use auth_proxy::{generate_cookie_secret, ProxyConfig, ProxyRoute};
pub use lock::TenantLocks;
pub use report::{
    FailureKind, Operation, Outcome, ProvisionReport, ResourceOutcome, RunStatus,
};

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::client::{ClusterClient, ResourceKind};
use crate::config::ApplicationTemplate;
use crate::context::{ProvisioningContext, RequestInfo, Tenant};
use crate::template::TemplateEngine;

/// Entry point for tenant create and delete callbacks
pub struct TenantProvisioner {
    template: Arc<ApplicationTemplate>,
    client: Arc<dyn ClusterClient>,
    engine: TemplateEngine,
    locks: TenantLocks,
}

impl TenantProvisioner {
    /// Create a provisioner for a loaded template
    pub fn new(template: Arc<ApplicationTemplate>, client: Arc<dyn ClusterClient>) -> Self {
        Self {
            template,
            client,
            engine: TemplateEngine::new(),
            locks: TenantLocks::new(),
        }
    }

    /// The shared application template
    pub fn template(&self) -> &ApplicationTemplate {
        &self.template
    }

    /// Create every resource of `tenant`
    pub async fn provision(&self, tenant: Tenant, request: RequestInfo) -> ProvisionReport {
        let ctx = ProvisioningContext::new(tenant, self.template.clone(), request);
        self.provision_context(&ctx).await
    }

    /// Create every resource for an existing context
    #[instrument(skip_all, fields(tenant = %ctx.tenant, run_id = %ctx.run_id))]
    pub async fn provision_context(&self, ctx: &ProvisioningContext) -> ProvisionReport {
        let guard = self.locks.acquire(&ctx.tenant).await;
        info!("provisioning tenant");

        let mut report = ProvisionReport::new(ctx.tenant.clone(), ctx.run_id, Operation::Provision);
        routes::provision_routes(ctx, self.client.as_ref(), &self.engine, &mut report).await;
        auth_proxy::provision_auth_proxy(ctx, self.client.as_ref(), &mut report).await;

        drop(guard);
        self.locks.prune();
        summarize(&report);
        report
    }

    /// Delete every resource of `tenant`
    ///
    /// Objects that do not exist are recorded as [`Outcome::Absent`], so
    /// deleting a partially provisioned or unknown tenant succeeds.
    #[instrument(skip_all, fields(tenant = %tenant))]
    pub async fn deprovision(&self, tenant: Tenant) -> ProvisionReport {
        let ctx = ProvisioningContext::new(tenant, self.template.clone(), RequestInfo::default());

        let guard = self.locks.acquire(&ctx.tenant).await;
        info!(run_id = %ctx.run_id, "deprovisioning tenant");

        let mut report =
            ProvisionReport::new(ctx.tenant.clone(), ctx.run_id, Operation::Deprovision);
        auth_proxy::deprovision_auth_proxy(&ctx, self.client.as_ref(), &mut report).await;
        routes::deprovision_routes(&ctx, self.client.as_ref(), &mut report).await;

        drop(guard);
        self.locks.prune();
        summarize(&report);
        report
    }
}

/// Log one resource outcome and append it to the report
fn note(report: &mut ProvisionReport, kind: ResourceKind, name: impl Into<String>, outcome: Outcome) {
    let name = name.into();
    match &outcome {
        Outcome::Created | Outcome::Deleted => info!(kind = %kind, name = %name, ?outcome, "done"),
        Outcome::AlreadyExists | Outcome::Absent => {
            info!(kind = %kind, name = %name, ?outcome, "nothing to do")
        }
        Outcome::Skipped { reason, .. } | Outcome::Failed { reason, .. } => {
            warn!(kind = %kind, name = %name, error = %reason, ?outcome, "resource failed")
        }
    }
    report.record(kind, name, outcome);
}

fn summarize(report: &ProvisionReport) {
    let status = report.status();
    let failed = report.failures().count();
    match report.last_failure() {
        Some(last) => warn!(
            ?status,
            resources = report.outcomes.len(),
            failed,
            last_kind = %last.kind,
            last_name = %last.name,
            "run finished with failures"
        ),
        None => info!(?status, resources = report.outcomes.len(), "run finished"),
    }
}

//! Route provisioner
//!
//! Every route that names an image gets, in order: its config objects, a
//! workload mounting them, and a service in front of the workload. Routes
//! without an image are declaration-only and produce nothing.

use tracing::{info, instrument, warn};

use super::{note, ProvisionReport};
use crate::client::{ClusterClient, ResourceKind};
use crate::config::RouteTemplate;
use crate::context::ProvisioningContext;
use crate::materialize::materialize;
use crate::naming::{config_map_name, resource_name};
use crate::provision::Outcome;
use crate::template::TemplateEngine;
use crate::workload::{build_service, build_workload, Volume, VolumeMount};

/// Provision every image route in declared order
pub async fn provision_routes(
    ctx: &ProvisioningContext,
    client: &dyn ClusterClient,
    engine: &TemplateEngine,
    report: &mut ProvisionReport,
) {
    for route in &ctx.template.routes {
        match route.image() {
            Some(image) => provision_route(route, image, ctx, client, engine, report).await,
            None => info!(route = %route.target, "declaration-only route, nothing to provision"),
        }
    }
}

#[instrument(skip_all, fields(route = %route.target))]
async fn provision_route(
    route: &RouteTemplate,
    image: &str,
    ctx: &ProvisioningContext,
    client: &dyn ClusterClient,
    engine: &TemplateEngine,
    report: &mut ProvisionReport,
) {
    let name = resource_name(image, &ctx.tenant);
    let namespace = ctx.namespace();
    info!(name = %name, image = %image, "provisioning route");

    let mut mounts = Vec::with_capacity(route.volumes.len());
    let mut volumes = Vec::with_capacity(route.volumes.len());
    for (index, volume) in route.volumes.iter().enumerate() {
        mounts.push(VolumeMount {
            name: volume.name.clone(),
            mount_path: volume.mount_path.clone(),
            sub_path: volume.sub_path.clone(),
        });

        let Some(source) = &volume.config else {
            volumes.push(Volume::empty_dir(&volume.name));
            continue;
        };

        // The volume references the config object even if it cannot be
        // produced, so the workload keeps the shape the template declares.
        let config_name = config_map_name(&source.name, &ctx.tenant, index);
        volumes.push(Volume::config_map(&volume.name, &config_name));

        let outcome = match materialize(source, &config_name, ctx, engine).await {
            Ok(config) => Outcome::from_create(client.create_config(&config).await),
            Err(e) => {
                warn!(name = %config_name, error = %e, "skipping config object");
                Outcome::skipped(&e)
            }
        };
        note(report, ResourceKind::ConfigMap, config_name, outcome);
    }

    let workload = build_workload(&name, namespace, image, mounts, volumes);
    let outcome = Outcome::from_create(client.create_workload(&workload).await);
    note(report, ResourceKind::Deployment, &name, outcome);

    let service = build_service(&name, namespace, route.target_port);
    let outcome = Outcome::from_create(client.create_service(&service).await);
    note(report, ResourceKind::Service, &name, outcome);
}

/// Delete every image route's resources, last route first
///
/// Per route the service goes first, then the workload, then its config
/// objects.
pub async fn deprovision_routes(
    ctx: &ProvisioningContext,
    client: &dyn ClusterClient,
    report: &mut ProvisionReport,
) {
    let namespace = ctx.namespace();
    for (route, image) in ctx.template.image_routes().collect::<Vec<_>>().into_iter().rev() {
        let name = resource_name(image, &ctx.tenant);
        info!(route = %route.target, name = %name, "deprovisioning route");

        for kind in [ResourceKind::Service, ResourceKind::Deployment] {
            let outcome = Outcome::from_delete(client.delete(kind, namespace, &name).await);
            note(report, kind, &name, outcome);
        }

        for (index, volume) in route.volumes.iter().enumerate() {
            let Some(source) = &volume.config else {
                continue;
            };
            let config_name = config_map_name(&source.name, &ctx.tenant, index);
            let outcome = Outcome::from_delete(
                client
                    .delete(ResourceKind::ConfigMap, namespace, &config_name)
                    .await,
            );
            note(report, ResourceKind::ConfigMap, config_name, outcome);
        }
    }
}

//! saas-provisioner - per-tenant application stacks from subscription callbacks
//!
//! When a SaaS subscription is created, the subscription service calls back
//! with a tenant id and identity-provider credentials. This crate derives a
//! collision-free set of cluster objects for that tenant from a shared
//! application template and creates them in dependency order, recording
//! every outcome instead of stopping at the first failure.
//!
//! # Architecture
//!
//! Leaf first:
//! - [`naming`] - Deterministic tenant-qualified resource names
//! - [`workload`] - Deployment, Service, ConfigMap and APIRule builders
//! - [`materialize`] - Config object contents (verbatim, templated, binary)
//! - [`provision`] - Route and auth proxy provisioners, orchestrator, reports
//!
//! # Modules
//!
//! - [`config`] - Application template loading and validation
//! - [`context`] - Tenant id, callback body and per-run context
//! - [`template`] - Text templates for config objects
//! - [`client`] - Cluster resource API (kube-rs and in-memory)
//! - [`api`] - HTTP callback endpoints
//! - [`telemetry`] - Logging initialization
//! - [`error`] - Error types for setup and template loading

#![deny(missing_docs)]

pub mod api;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod materialize;
pub mod naming;
pub mod provision;
pub mod telemetry;
pub mod template;
pub mod workload;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

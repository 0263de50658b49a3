//! saas-provisioner - per-tenant application stacks from subscription callbacks

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::Client;

use saas_provisioner::api;
use saas_provisioner::client::{KubeClusterClient, ManifestCollector};
use saas_provisioner::config::ApplicationTemplate;
use saas_provisioner::context::{RequestInfo, Tenant};
use saas_provisioner::provision::{RunStatus, TenantProvisioner};
use saas_provisioner::telemetry::{init_tracing, LogFormat};

/// Provisions isolated per-tenant application stacks on SaaS subscription callbacks
#[derive(Parser, Debug)]
#[command(name = "saas-provisioner", version, about, long_about = None)]
struct Cli {
    /// Log line format
    #[arg(long, global = true, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the subscription callback API (default mode)
    Serve(ServeArgs),

    /// Run provisioning for one tenant without a cluster and print the objects
    ///
    /// Every object the run would submit is printed to stdout as a
    /// multi-document YAML stream; the run report goes to stderr.
    Render(RenderArgs),

    /// Load and validate an application template
    Validate(TemplateArgs),
}

/// Where the application template comes from
#[derive(Args, Debug, Clone)]
struct TemplateArgs {
    /// Application template file (YAML or JSON)
    #[arg(short = 't', long = "template", env = "APP_TEMPLATE")]
    template: PathBuf,

    /// Base directory for config source files; defaults to the template's directory
    #[arg(long, env = "APP_ASSET_DIR")]
    asset_dir: Option<PathBuf>,
}

impl TemplateArgs {
    fn load(&self) -> anyhow::Result<ApplicationTemplate> {
        ApplicationTemplate::load(&self.template, self.asset_dir.as_deref())
            .context("application template is not usable")
    }
}

/// Serve mode arguments
#[derive(Args, Debug)]
struct ServeArgs {
    #[command(flatten)]
    template: TemplateArgs,

    /// Address the callback API listens on
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8000")]
    listen: SocketAddr,

    /// Kubeconfig file; in-cluster or `KUBECONFIG` configuration otherwise
    #[arg(long)]
    kubeconfig: Option<PathBuf>,
}

/// Render mode arguments
#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    template: TemplateArgs,

    /// Tenant to render for
    #[arg(long)]
    tenant: String,

    /// Callback body (JSON) to render with; empty credentials otherwise
    #[arg(long)]
    request: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install crypto provider before any TLS client is built
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        eprintln!(
            "CRITICAL: Failed to install crypto provider: {:?}. \
             The Kubernetes client cannot operate without a working TLS implementation.",
            e
        );
        std::process::exit(1);
    }

    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    match cli.command {
        Some(Commands::Serve(args)) => run_serve(args).await,
        Some(Commands::Render(args)) => run_render(args).await,
        Some(Commands::Validate(args)) => run_validate(args),
        None => {
            // Serve is the default; take everything from the environment
            let args = ServeArgs::from_env()?;
            run_serve(args).await
        }
    }
}

impl ServeArgs {
    /// Serve arguments when no subcommand was given
    fn from_env() -> anyhow::Result<Self> {
        #[derive(Parser)]
        struct Env {
            #[command(flatten)]
            serve: ServeArgs,
        }
        let env = Env::try_parse_from(["saas-provisioner"])
            .map_err(|e| anyhow::anyhow!("serve mode needs APP_TEMPLATE: {}", e))?;
        Ok(env.serve)
    }
}

/// Run the callback API against the cluster
async fn run_serve(args: ServeArgs) -> anyhow::Result<()> {
    let template = Arc::new(args.template.load()?);
    let client = kube_client(args.kubeconfig.as_deref()).await?;

    let provisioner = Arc::new(TenantProvisioner::new(
        template,
        Arc::new(KubeClusterClient::new(client)),
    ));
    let app = api::router(provisioner);

    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", args.listen, e))?;
    tracing::info!(addr = %args.listen, "callback API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}

async fn kube_client(kubeconfig: Option<&Path>) -> anyhow::Result<Client> {
    let client = match kubeconfig {
        Some(path) => {
            let raw = Kubeconfig::read_from(path)
                .map_err(|e| anyhow::anyhow!("Failed to read kubeconfig {:?}: {}", path, e))?;
            let config = kube::Config::from_custom_kubeconfig(raw, &KubeConfigOptions::default())
                .await
                .map_err(|e| anyhow::anyhow!("Invalid kubeconfig {:?}: {}", path, e))?;
            Client::try_from(config)?
        }
        None => Client::try_default()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?,
    };
    Ok(client)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

/// Dry run: provision into memory and print the result
async fn run_render(args: RenderArgs) -> anyhow::Result<()> {
    let template = Arc::new(args.template.load()?);
    let tenant = Tenant::parse(args.tenant)?;

    let request = match &args.request {
        Some(path) => {
            let raw = tokio::fs::read(path)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to read request {:?}: {}", path, e))?;
            serde_json::from_slice::<RequestInfo>(&raw)
                .map_err(|e| anyhow::anyhow!("Failed to parse request {:?}: {}", path, e))?
        }
        None => RequestInfo::default(),
    };

    let collector = Arc::new(ManifestCollector::new());
    let provisioner = TenantProvisioner::new(template, collector.clone());
    let report = provisioner.provision(tenant, request).await;

    print!("{}", collector.to_yaml()?);
    eprintln!("{}", serde_json::to_string_pretty(&report)?);

    match report.status() {
        RunStatus::Succeeded | RunStatus::Empty => Ok(()),
        status => Err(anyhow::anyhow!("render finished with status {:?}", status)),
    }
}

/// Load a template and print what it provisions per tenant
fn run_validate(args: TemplateArgs) -> anyhow::Result<()> {
    let template = args.load()?;

    println!("=== Application template ===");
    println!("App: {} ({})", template.app_name, template.domain);
    println!("Namespace: {}", template.namespace);
    println!("Asset dir: {}", template.asset_dir.display());
    println!("Auth proxy: {}", template.auth_proxy.image);
    for route in &template.routes {
        match route.image() {
            Some(image) => println!(
                "Route {} -> {} (port {}, {} volume(s))",
                route.path,
                image,
                route.target_port,
                route.volumes.len()
            ),
            None => println!("Route {} -> {} (declaration only)", route.path, route.target),
        }
    }
    Ok(())
}

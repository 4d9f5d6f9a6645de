//! # argocdctl
//!
//! Command-line interface for the Argo CD operator.
//!
//! ## Usage
//!
//! ```bash
//! # List ArgoCD resources with their phase and host
//! argocdctl list
//!
//! # Show the composite status of an ArgoCD
//! argocdctl status --namespace argocd --name example-argocd
//!
//! # Trigger a reconcile
//! argocdctl reconcile --namespace argocd --name example-argocd
//!
//! # Replace the redis RoleBinding after its roleRef drifted
//! argocdctl recreate --namespace argocd --name example-argocd --component redis --yes
//! ```

use anyhow::{bail, Context, Result};
use argocd_operator::client::KubeClusterClient;
use argocd_operator::constants::ANNOTATION_RECONCILE_TRIGGER;
use argocd_operator::controller::reconciler::drift::recreate_object;
use argocd_operator::controller::synthesize::redis_role_binding;
use argocd_operator::crd::ArgoCD;
use clap::{Parser, Subcommand, ValueEnum};
use kube::{
    api::{Api, ListParams, Patch, PatchParams},
    Client,
};
use serde_json::json;

/// Argo CD operator CLI
#[derive(Parser)]
#[command(name = "argocdctl")]
#[command(about = "Argo CD operator CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Kubernetes namespace (defaults to "default")
    #[arg(short, long, global = true)]
    namespace: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Trigger reconciliation of an ArgoCD resource
    Reconcile {
        /// Name of the ArgoCD resource
        #[arg(long)]
        name: String,
    },
    /// List ArgoCD resources
    List {
        /// List across all namespaces
        #[arg(short = 'A', long)]
        all_namespaces: bool,
    },
    /// Show the status of an ArgoCD resource
    Status {
        /// Name of the ArgoCD resource
        #[arg(long)]
        name: String,
    },
    /// Delete and recreate a component's objects after structural drift
    Recreate {
        /// Name of the ArgoCD resource
        #[arg(long)]
        name: String,

        /// Component whose objects are replaced
        #[arg(long, value_enum)]
        component: RecreateComponent,

        /// Confirm the delete
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RecreateComponent {
    Redis,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "argocdctl=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let namespace = cli.namespace.unwrap_or_else(|| "default".to_string());

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client. Ensure kubeconfig is configured.")?;

    match cli.command {
        Commands::Reconcile { name } => reconcile_command(client, &namespace, &name).await,
        Commands::List { all_namespaces } => {
            list_command(client, (!all_namespaces).then_some(namespace.as_str())).await
        }
        Commands::Status { name } => status_command(client, &namespace, &name).await,
        Commands::Recreate {
            name,
            component,
            yes,
        } => recreate_command(client, &namespace, &name, component, yes).await,
    }
}

/// Trigger reconciliation by bumping an annotation; any metadata change
/// requeues the resource
async fn reconcile_command(client: Client, ns: &str, name: &str) -> Result<()> {
    let api: Api<ArgoCD> = Api::namespaced(client, ns);
    let timestamp = chrono::Utc::now().timestamp().to_string();

    let patch = json!({
        "metadata": {
            "annotations": {
                ANNOTATION_RECONCILE_TRIGGER: timestamp
            }
        }
    });

    api.patch(name, &PatchParams::default(), &Patch::Merge(patch))
        .await
        .with_context(|| format!("Failed to trigger reconciliation for '{ns}/{name}'"))?;

    println!("Reconciliation triggered for ArgoCD '{ns}/{name}' (timestamp {timestamp})");
    Ok(())
}

async fn list_command(client: Client, namespace: Option<&str>) -> Result<()> {
    let api: Api<ArgoCD> = match namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    };

    let list = api
        .list(&ListParams::default())
        .await
        .context("Failed to list ArgoCD resources")?;

    if list.items.is_empty() {
        println!("No ArgoCD resources found.");
        return Ok(());
    }

    println!(
        "{:<30} {:<20} {:<12} {:<12} HOST",
        "NAME", "NAMESPACE", "PHASE", "SSO"
    );
    for argocd in &list.items {
        let status = argocd.status.clone().unwrap_or_default();
        println!(
            "{:<30} {:<20} {:<12} {:<12} {}",
            argocd.instance_name(),
            argocd.instance_namespace(),
            or_dash(&status.phase),
            or_dash(&status.sso_config),
            or_dash(&status.host)
        );
    }
    Ok(())
}

async fn status_command(client: Client, ns: &str, name: &str) -> Result<()> {
    let api: Api<ArgoCD> = Api::namespaced(client, ns);
    let argocd = api
        .get(name)
        .await
        .with_context(|| format!("Failed to get ArgoCD '{ns}/{name}'"))?;

    println!("ArgoCD {ns}/{name}");
    if let Some(generation) = argocd.metadata.generation {
        println!("  Generation: {generation}");
    }

    let Some(status) = argocd.status else {
        println!("  Status: not reconciled yet");
        return Ok(());
    };

    if let Some(observed) = status.observed_generation {
        println!("  Observed Generation: {observed}");
    }
    println!("  Phase: {}", or_dash(&status.phase));
    println!("  Host: {}", or_dash(&status.host));
    println!("  SSO Config: {}", or_dash(&status.sso_config));
    println!("  SSO: {}", or_dash(&status.sso));
    println!(
        "  Notifications Controller: {}",
        or_dash(&status.notifications_controller)
    );
    println!(
        "  ApplicationSet Controller: {}",
        or_dash(&status.application_set_controller)
    );

    for condition in &status.conditions {
        println!("  Condition {}: {}", condition.r#type, condition.status);
        if let Some(reason) = &condition.reason {
            println!("    Reason: {reason}");
        }
        if let Some(message) = &condition.message {
            println!("    Message: {message}");
        }
        if let Some(time) = &condition.last_transition_time {
            println!("    Last Transition: {time}");
        }
    }
    Ok(())
}

async fn recreate_command(
    client: Client,
    ns: &str,
    name: &str,
    component: RecreateComponent,
    yes: bool,
) -> Result<()> {
    if !yes {
        bail!("recreate deletes live objects; pass --yes to confirm");
    }

    let api: Api<ArgoCD> = Api::namespaced(client.clone(), ns);
    let argocd = api
        .get(name)
        .await
        .with_context(|| format!("Failed to get ArgoCD '{ns}/{name}'"))?;

    let cluster = KubeClusterClient::new(client);
    match component {
        RecreateComponent::Redis => {
            let binding = recreate_object(&cluster, &redis_role_binding(&argocd))
                .await
                .context("Failed to recreate redis RoleBinding")?;
            println!(
                "Recreated RoleBinding {}/{}",
                ns,
                binding.metadata.name.as_deref().unwrap_or_default()
            );
        }
    }
    Ok(())
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

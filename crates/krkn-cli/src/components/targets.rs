use crate::exceptions::CliError;
use crate::models::SecretTypeArg;
use krkn_api::OperatorAPI;
use krkn_console::{effects::poll_target_until_ready, Action, Dispatcher};
use krkn_core::{
    exceptions::{AppError, GenericError},
    forms::validate_cluster_names,
    models::{CreateTargetRequest, SecretType, TargetResponse},
    ConsoleSettings,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Manage the cluster targets registered with the operator
#[derive(clap::Args)]
#[command(version, about, long_about = None)]
pub struct TargetsArgs {
    #[command(subcommand)]
    pub command: TargetsCommand,
}

#[derive(clap::Subcommand)]
pub enum TargetsCommand {
    /// List registered targets
    List {
        /// Print the raw targets as JSON
        #[arg(long, short)]
        json: bool,
    },
    /// Show one target
    Get { uuid: String },
    /// Register a new target
    Create(TargetSpec),
    /// Replace the definition of an existing target
    Update {
        uuid: String,
        #[command(flatten)]
        spec: TargetSpec,
    },
    /// Remove a target
    Delete { uuid: String },
    /// List the nodes of a discovered cluster
    Nodes {
        /// Cluster name as shown during cluster selection
        cluster_name: String,

        /// Reuse a finished target request instead of starting a new one
        #[arg(long)]
        request: Option<String>,
    },
}

#[derive(clap::Args)]
pub struct TargetSpec {
    /// Display name of the cluster
    #[arg(long)]
    pub cluster_name: String,

    /// How the operator authenticates against the cluster
    #[arg(long, value_enum)]
    pub secret_type: SecretTypeArg,

    /// Cluster API url, required for token and credentials
    #[arg(long)]
    pub cluster_api_url: Option<String>,

    /// Path to a kubeconfig file, required for kubeconfig
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Path to a CA bundle for the cluster API
    #[arg(long)]
    pub ca_bundle: Option<PathBuf>,

    #[arg(long)]
    pub token: Option<String>,

    #[arg(long)]
    pub username: Option<String>,

    #[arg(long)]
    pub password: Option<String>,
}

fn read_file(path: &PathBuf) -> Result<String, GenericError> {
    std::fs::read_to_string(path).map_err(|e| {
        GenericError::Validation(vec![format!("Cannot read {}: {}", path.display(), e)])
    })
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().map(|v| !v.trim().is_empty()).unwrap_or(false)
}

impl TargetSpec {
    /// Check the credentials required by the secret type and read any
    /// referenced files
    pub fn to_request(&self) -> Result<CreateTargetRequest, GenericError> {
        let mut errors = validate_cluster_names(&[self.cluster_name.clone()]);
        let secret_type = SecretType::from(self.secret_type);
        match secret_type {
            SecretType::Kubeconfig => {
                if self.kubeconfig.is_none() {
                    errors.push("Kubeconfig is required".to_string());
                }
            }
            SecretType::Token => {
                if !present(&self.cluster_api_url) {
                    errors.push("Cluster API URL is required".to_string());
                }
                if !present(&self.token) {
                    errors.push("Token is required".to_string());
                }
            }
            SecretType::Credentials => {
                if !present(&self.cluster_api_url) {
                    errors.push("Cluster API URL is required".to_string());
                }
                if !present(&self.username) || !present(&self.password) {
                    errors.push("Username and password are required".to_string());
                }
            }
        }
        if !errors.is_empty() {
            return Err(GenericError::Validation(errors));
        }

        Ok(CreateTargetRequest {
            cluster_name: self.cluster_name.trim().to_string(),
            secret_type,
            cluster_api_url: self.cluster_api_url.clone(),
            ca_bundle: self.ca_bundle.as_ref().map(read_file).transpose()?,
            kubeconfig: self.kubeconfig.as_ref().map(read_file).transpose()?,
            token: self.token.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
        })
    }
}

fn print_target(target: &TargetResponse) {
    println!(
        "  {} {}  {}  {}  [{}]",
        if target.ready { "✓" } else { "⏳" },
        target.cluster_name,
        target.uuid,
        target.cluster_api_url,
        target.secret_type
    );
}

/// Start a target request and wait until the operator reports it ready
pub async fn discover(
    api: Arc<dyn OperatorAPI>,
    settings: &ConsoleSettings,
) -> Result<String, CliError> {
    let uuid = api.create_target_request().await?;
    log::info!("Waiting for target request {}", uuid);
    let (dispatcher, mut rx) = Dispatcher::new();
    poll_target_until_ready(
        api,
        dispatcher,
        uuid.clone(),
        settings.poll_interval,
        settings.poll_timeout,
        settings.debug_mode,
    )
    .await;
    while let Some(action) = rx.try_recv() {
        match action {
            Action::PollSuccess => return Ok(uuid),
            Action::PollError(e) => return Err(CliError::Workflow(e)),
            _ => {}
        }
    }
    Err(CliError::Workflow(AppError::api("Target request ended without a result")))
}

fn print_nodes(cluster_name: &str, nodes: &[String]) {
    if nodes.is_empty() {
        println!("No nodes were discovered in cluster {}", cluster_name);
        return;
    }
    println!("Cluster {} ({} nodes):", cluster_name, nodes.len());
    for node in nodes {
        println!("  {}", node);
    }
}

pub async fn handle_targets(
    api: Arc<dyn OperatorAPI>,
    settings: &ConsoleSettings,
    args: TargetsArgs,
) -> Result<(), CliError> {
    match args.command {
        TargetsCommand::List { json } => {
            let targets = api.list_targets().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&targets).map_err(GenericError::from)?);
            } else if targets.is_empty() {
                println!("No targets registered");
            } else {
                for target in &targets {
                    print_target(target);
                }
            }
        }
        TargetsCommand::Get { uuid } => {
            print_target(&api.get_target(&uuid).await?);
        }
        TargetsCommand::Create(spec) => {
            let resp = api.create_target(&spec.to_request()?).await?;
            println!(
                "Created target {}{}",
                resp.uuid,
                resp.message.map(|m| format!(": {}", m)).unwrap_or_default()
            );
        }
        TargetsCommand::Update { uuid, spec } => {
            let resp = api.update_target(&uuid, &spec.to_request()?).await?;
            println!("Updated target {}", resp.uuid);
        }
        TargetsCommand::Delete { uuid } => {
            api.delete_target(&uuid).await?;
            println!("Deleted target {}", uuid);
        }
        TargetsCommand::Nodes {
            cluster_name,
            request,
        } => {
            let uuid = match request {
                Some(uuid) => uuid,
                None => discover(api.clone(), settings).await?,
            };
            print_nodes(&cluster_name, &api.get_nodes(&uuid, &cluster_name).await?);
        }
    }
    Ok(())
}

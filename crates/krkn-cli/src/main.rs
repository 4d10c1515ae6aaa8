mod components;
mod exceptions;
mod models;

use clap::{Parser, Subcommand};
use components::{
    logs::{handle_logs, LogArgs},
    run::{handle_run, RunArgs},
    runs::{handle_cancel, handle_delete, handle_runs, handle_status},
    runs::{CancelArgs, DeleteArgs, RunsArgs, StatusArgs},
    targets::{handle_targets, TargetsArgs},
    watch::{handle_watch, WatchArgs},
};
use dotenv::dotenv;
use exceptions::CliError;
use krkn_api::{HttpLogSource, LogSource, OperatorAPI, OperatorClient, WsLogSource};
use krkn_console::{log_stream::LogStreamController, log_stream::ReconnectPolicy, Action, Console};
use krkn_core::{ConsoleSettings, LogTransport, WorkflowVariant};
use log::{debug, error};
use models::TransportArg;
use std::process::ExitCode;
use std::sync::Arc;

/// Command line console for the krkn chaos operator
#[derive(Parser)]
#[command(name = "krkn")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Operator API base url, e.g. http://localhost:8080/api/v1.
    /// Overrides KRKN_API_BASE_URL.
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// The log level to set for the application
    #[arg(long, short, global = true, default_value = "info")]
    log_level: String,

    /// Transport used to tail job logs. Overrides KRKN_LOG_TRANSPORT.
    #[arg(long, global = true, value_enum)]
    transport: Option<TransportArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow scenario runs as they progress
    Watch(WatchArgs),
    /// List scenario runs
    Runs(RunsArgs),
    /// Show one scenario run and its jobs
    Status(StatusArgs),
    /// Create a scenario run
    Run(RunArgs),
    /// Print or tail the logs of a job
    Logs(LogArgs),
    /// Cancel a running job
    Cancel(CancelArgs),
    /// Delete a scenario run
    Delete(DeleteArgs),
    /// Manage cluster targets
    Targets(TargetsArgs),
}

fn settings_from(cli: &Cli) -> ConsoleSettings {
    let mut settings = ConsoleSettings::from_env();
    if let Some(url) = &cli.api_url {
        settings.api_base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(transport) = cli.transport {
        settings.log_transport = transport.into();
    }
    settings
}

fn log_source(settings: &ConsoleSettings) -> Result<Arc<dyn LogSource>, CliError> {
    Ok(match settings.log_transport {
        LogTransport::WebSocket => Arc::new(WsLogSource::new(&settings.api_base_url)?),
        LogTransport::Http => Arc::new(HttpLogSource::new(
            &settings.api_base_url,
            settings.request_timeout,
        )?),
    })
}

/// Run `f` against a console whose action loop runs in the background
async fn with_console<F, Fut>(
    api: Arc<dyn OperatorAPI>,
    settings: ConsoleSettings,
    f: F,
) -> Result<(), CliError>
where
    F: FnOnce(krkn_console::ConsoleHandle) -> Fut,
    Fut: std::future::Future<Output = Result<(), CliError>>,
{
    let (mut console, action_receiver) = Console::new(api, settings);
    let handle = console.handle();
    let dispatcher = console.dispatcher();
    let main_loop = tokio::spawn(async move { console.run(action_receiver).await });

    let result = f(handle).await;

    dispatcher.dispatch(Action::Quit);
    if let Err(e) = main_loop.await {
        error!("Console loop ended abnormally: {}", e);
    }
    result
}

async fn _main(cli: Cli) -> Result<(), CliError> {
    let settings = settings_from(&cli);
    debug!("Using operator API at {}", settings.api_base_url);
    let client = OperatorClient::from_settings(&settings)?;
    let api: Arc<dyn OperatorAPI> = Arc::new(client);

    match cli.command {
        Commands::Watch(args) => {
            let settings = ConsoleSettings {
                workflow_variant: WorkflowVariant::JobsListLanding,
                ..settings
            };
            with_console(api, settings, |handle| handle_watch(handle, args)).await
        }
        Commands::Run(args) => {
            with_console(api, settings, |handle| handle_run(handle, args)).await
        }
        Commands::Runs(args) => Ok(handle_runs(api.as_ref(), args).await?),
        Commands::Status(args) => Ok(handle_status(api.as_ref(), args).await?),
        Commands::Cancel(args) => Ok(handle_cancel(api.as_ref(), args).await?),
        Commands::Delete(args) => Ok(handle_delete(api.as_ref(), args).await?),
        Commands::Targets(args) => handle_targets(api, &settings, args).await,
        Commands::Logs(args) => {
            let controller = LogStreamController::new(
                log_source(&settings)?,
                ReconnectPolicy::from_settings(&settings),
            );
            handle_logs(api.as_ref(), controller, settings.run_poll_interval, args).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();

    match _main(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

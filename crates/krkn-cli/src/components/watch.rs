use super::runs::print_run_summary;
use crate::exceptions::CliError;
use krkn_console::{Action, ConsoleHandle, WorkflowPhase, WorkflowState};
use krkn_core::models::ScenarioRun;
use std::collections::BTreeSet;
use std::time::Duration;

/// Follow the scenario runs of the operator as they progress
#[derive(clap::Args)]
#[command(version, about, long_about = None)]
pub struct WatchArgs {
    /// Reload the full run list at this interval, e.g. `30s`. Active runs
    /// are polled individually regardless.
    #[arg(long, short, value_parser = humantime::parse_duration)]
    pub refresh: Option<Duration>,
}

fn print_runs(runs: &[ScenarioRun]) {
    let active = runs.iter().filter(|r| !r.is_terminal()).count();
    println!("Scenario runs ({} active, {} total):", active, runs.len());
    for run in runs {
        print_run_summary(run);
    }
}

pub async fn handle_watch(handle: ConsoleHandle, args: WatchArgs) -> Result<(), CliError> {
    let mut rx = handle.subscribe();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut refresh = args.refresh.map(tokio::time::interval);
    let mut last: Option<WorkflowState> = None;
    let mut shown_notifications = BTreeSet::new();

    loop {
        let state = rx.borrow_and_update().clone();
        match state.phase {
            WorkflowPhase::Error => {
                let error = state
                    .error
                    .clone()
                    .unwrap_or_else(|| krkn_core::AppError::api("Unknown failure"));
                return Err(CliError::Workflow(error));
            }
            WorkflowPhase::Initializing | WorkflowPhase::Polling => {
                if last.as_ref().map(|l| l.poll_attempts) != Some(state.poll_attempts) {
                    log::info!(
                        "Waiting for the operator (attempt {})",
                        state.poll_attempts
                    );
                }
            }
            _ => {
                if last.as_ref().map(|l| &l.scenario_runs) != Some(&state.scenario_runs) {
                    print_runs(&state.scenario_runs);
                }
            }
        }
        for notification in &state.notifications {
            if shown_notifications.insert(notification.id) {
                println!("[{}] {}", notification.title, notification.message);
            }
        }
        last = Some(state);

        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
            }
            _ = async {
                match refresh.as_mut() {
                    Some(interval) => {
                        interval.tick().await;
                    }
                    None => std::future::pending::<()>().await,
                }
            } => {
                handle.dispatch(Action::RefreshScenarioRuns);
            }
            _ = &mut ctrl_c => return Ok(()),
        }
    }
}

use crate::exceptions::CliError;
use krkn_api::{LogTarget, OperatorAPI};
use krkn_console::log_stream::{
    ConnectionState, LogStreamController, LogStreamHandle, WAITING_FOR_POD,
};
use krkn_core::models::{ClusterJobPhase, ScenarioRunStatusResponse};
use std::time::Duration;

/// Print the logs of a scenario job. Running jobs are tailed and the stream
/// reconnects on failure; finished jobs are printed once.
#[derive(clap::Args)]
#[command(version, about, long_about = None)]
pub struct LogArgs {
    /// Name of the scenario run
    pub scenario_run_name: String,

    /// Job id as shown by `krkn status`
    pub job_id: String,

    /// Exit instead of waiting when the job's pod has not started yet
    #[arg(long)]
    pub no_wait: bool,
}

/// Phase of `job_id` in a run status
pub fn job_phase(
    status: &ScenarioRunStatusResponse,
    job_id: &str,
) -> Result<ClusterJobPhase, CliError> {
    status
        .cluster_jobs
        .iter()
        .find(|j| j.job_id == job_id)
        .map(|j| j.phase)
        .ok_or_else(|| {
            CliError::Usage(format!(
                "Scenario run {} has no job {}",
                status.scenario_run_name, job_id
            ))
        })
}

async fn current_phase(api: &dyn OperatorAPI, args: &LogArgs) -> Result<ClusterJobPhase, CliError> {
    let status = api.get_scenario_run_status(&args.scenario_run_name).await?;
    job_phase(&status, &args.job_id)
}

async fn wait_for_pod(
    api: &dyn OperatorAPI,
    args: &LogArgs,
    interval: Duration,
) -> Result<Option<ClusterJobPhase>, CliError> {
    let mut announced = false;
    loop {
        let phase = current_phase(api, args).await?;
        if phase != ClusterJobPhase::Pending {
            return Ok(Some(phase));
        }
        if !announced {
            println!("{}", WAITING_FOR_POD);
            announced = true;
        }
        if args.no_wait {
            return Ok(None);
        }
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => return Ok(None),
        }
    }
}

fn report_state(state: ConnectionState) {
    match state {
        ConnectionState::Reconnecting { attempt, delay } => {
            log::warn!("Log stream dropped, reconnect {} in {:?}", attempt, delay)
        }
        ConnectionState::Open => log::info!("Log stream connected"),
        ConnectionState::Terminal => log::error!("Log stream gave up reconnecting"),
        _ => log::debug!("Log stream {:?}", state),
    }
}

/// Print lines as they arrive until the session is done or Ctrl-C. While
/// the job runs its phase is re-read every `poll_interval` and fed to the
/// session.
async fn print_session(
    api: &dyn OperatorAPI,
    args: &LogArgs,
    session: LogStreamHandle,
    poll_interval: Duration,
) {
    let mut rx = session.subscribe();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut printed = 0;
    let mut last_state = None;
    let mut tracking = !session.phase().is_terminal();
    let mut ticker = tokio::time::interval_at(
        tokio::time::Instant::now() + poll_interval,
        poll_interval,
    );

    loop {
        let done = session.is_done();
        let state = session.state();
        if last_state != Some(state) {
            report_state(state);
            last_state = Some(state);
        }
        let lines = session.lines_since(printed);
        printed += lines.len();
        for line in lines {
            println!("{}", line);
        }
        if done {
            return;
        }

        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    return;
                }
            }
            _ = ticker.tick(), if tracking => {
                match current_phase(api, args).await {
                    Ok(phase) => {
                        session.update_phase(phase);
                        tracking = !phase.is_terminal();
                    }
                    Err(e) => log::debug!("Failed to refresh job phase: {}", e),
                }
            }
            _ = &mut ctrl_c => {
                session.cancel();
                return;
            }
        }
    }
}

pub async fn handle_logs(
    api: &dyn OperatorAPI,
    controller: LogStreamController,
    poll_interval: Duration,
    args: LogArgs,
) -> Result<(), CliError> {
    let Some(phase) = wait_for_pod(api, &args, poll_interval).await? else {
        return Ok(());
    };
    let target = LogTarget::new(&args.scenario_run_name, &args.job_id);
    log::debug!("Opening logs for {:?} ({:?})", target, phase);
    let session = controller.start(target, phase);
    print_session(api, &args, session, poll_interval).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::testing::{run_status, ScriptedLogs, StubOperator};
    use krkn_api::StreamEvent;
    use krkn_console::log_stream::ReconnectPolicy;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    fn args() -> LogArgs {
        LogArgs {
            scenario_run_name: "run-1".to_string(),
            job_id: "j-1".to_string(),
            no_wait: false,
        }
    }

    #[test]
    fn test_job_phase() {
        let status = run_status(ClusterJobPhase::Running);
        assert_eq!(job_phase(&status, "j-1").unwrap(), ClusterJobPhase::Running);
        let err = job_phase(&status, "j-2").unwrap_err();
        assert_eq!(err.to_string(), "Scenario run run-1 has no job j-2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_followed_job_switches_to_snapshot_when_it_finishes() {
        let api = StubOperator::default();
        api.job_phases
            .lock()
            .unwrap()
            .push_back(ClusterJobPhase::Succeeded);
        let logs = Arc::new(ScriptedLogs::default());
        logs.streams.lock().unwrap().extend([
            vec![
                StreamEvent::Data(b"one\n".to_vec()),
                StreamEvent::Closed {
                    normal: false,
                    reason: Some("going away".to_string()),
                },
            ],
            vec![StreamEvent::Data(b"one\ntwo\n".to_vec())],
        ]);
        let controller = LogStreamController::new(
            logs.clone(),
            ReconnectPolicy::new(Duration::from_secs(2), Duration::from_secs(30), 3),
        );
        let target = LogTarget::new("run-1", "j-1");
        let session = controller.start(target, ClusterJobPhase::Running);

        print_session(&api, &args(), session.clone(), Duration::from_millis(500)).await;

        assert_eq!(*logs.opens.lock().unwrap(), vec![true, false]);
        assert_eq!(session.lines(), vec!["one", "two"]);
        assert_eq!(session.state(), ConnectionState::Closed);
        assert_eq!(api.status_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_on_pending_job() {
        let api = StubOperator::default();
        api.job_phases
            .lock()
            .unwrap()
            .push_back(ClusterJobPhase::Pending);
        let args = LogArgs {
            no_wait: true,
            ..args()
        };
        let phase = wait_for_pod(&api, &args, Duration::from_secs(1)).await.unwrap();
        assert_eq!(phase, None);
    }
}

use super::backoff::ReconnectPolicy;
use super::buffer::LineBuffer;
use super::session::{ConnectionState, LogStreamHandle, SessionShared};
use krkn_api::{LogSource, LogTarget, StreamEvent};
use krkn_core::models::ClusterJobPhase;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

pub const WAITING_FOR_POD: &str = "Waiting for pod to start...";
pub const NO_LOGS: &str = "No logs available";
pub const MAX_ATTEMPTS_REACHED: &str = "Max reconnection attempts reached. Please refresh.";
const WARNING_MARKER: &str = "⚠️  ";

/// Backend-reported errors arrive in-band as `ERROR:` lines
fn surface(line: String) -> String {
    if line.starts_with("ERROR:") {
        format!("{}{}", WARNING_MARKER, line)
    } else {
        line
    }
}

/// Starts log tail sessions against a [`LogSource`]
#[derive(Clone)]
pub struct LogStreamController {
    source: Arc<dyn LogSource>,
    policy: ReconnectPolicy,
}

impl LogStreamController {
    pub fn new(source: Arc<dyn LogSource>, policy: ReconnectPolicy) -> Self {
        Self { source, policy }
    }

    pub fn policy(&self) -> ReconnectPolicy {
        self.policy
    }

    /// Start tailing `target` for a job currently in `phase`. Pending jobs get
    /// a placeholder line and no connection; terminal jobs are read once.
    /// Later phases are fed in through [`LogStreamHandle::update_phase`].
    pub fn start(&self, target: LogTarget, phase: ClusterJobPhase) -> LogStreamHandle {
        let follow = !phase.is_terminal();
        let shared = SessionShared::new(target.clone(), follow);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (phase_tx, phase_rx) = watch::channel(phase);
        let handle = LogStreamHandle::new(shared.clone(), cancel_tx, phase_tx);

        if phase == ClusterJobPhase::Pending {
            debug!("Job {} is pending, not connecting", target.job_id);
            shared.append([WAITING_FOR_POD.to_string()]);
            return handle;
        }

        shared.set_state(ConnectionState::Connecting);
        let task = tokio::spawn(run_session(
            self.source.clone(),
            self.policy,
            shared,
            target,
            follow,
            cancel_rx,
            phase_rx,
        ));
        handle.attach(task);
        handle
    }
}

async fn cancelled(rx: &mut watch::Receiver<bool>) {
    // a dropped sender means every handle is gone
    let _ = rx.wait_for(|c| *c).await;
}

/// Resolves once the job reaches a terminal phase
async fn job_finished(rx: &mut watch::Receiver<ClusterJobPhase>) {
    if rx.wait_for(|p| p.is_terminal()).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Drop the first `skip` lines, which the session already holds
fn skip_seen(lines: Vec<String>, skip: &mut usize) -> Vec<String> {
    let seen = (*skip).min(lines.len());
    *skip -= seen;
    lines.into_iter().skip(seen).collect()
}

enum ReadOutcome {
    Closed { normal: bool, reason: Option<String> },
    Cancelled,
}

/// Pump one open stream into the session until it closes
async fn read_stream(
    stream: &mut Box<dyn krkn_api::LogStream>,
    shared: &SessionShared,
    cancel_rx: &mut watch::Receiver<bool>,
    attempts: &mut u32,
    received_any: &mut bool,
    skip: &mut usize,
) -> ReadOutcome {
    let mut buffer = LineBuffer::new();
    let outcome = loop {
        let event = tokio::select! {
            _ = cancelled(cancel_rx) => return ReadOutcome::Cancelled,
            event = stream.next_event() => event,
        };
        match event {
            StreamEvent::Data(bytes) => {
                *received_any = true;
                if *attempts > 0 {
                    *attempts = 0;
                    shared.set_attempts(0);
                }
                let lines = skip_seen(buffer.push(&bytes), skip);
                if !lines.is_empty() && !shared.append(lines.into_iter().map(surface)) {
                    return ReadOutcome::Cancelled;
                }
            }
            StreamEvent::Closed { normal, reason } => break ReadOutcome::Closed { normal, reason },
        }
    };
    if let Some(rest) = buffer.finish() {
        for line in skip_seen(vec![rest], skip) {
            if !shared.append([surface(line)]) {
                return ReadOutcome::Cancelled;
            }
        }
    }
    outcome
}

async fn run_session(
    source: Arc<dyn LogSource>,
    policy: ReconnectPolicy,
    shared: Arc<SessionShared>,
    target: LogTarget,
    mut follow: bool,
    mut cancel_rx: watch::Receiver<bool>,
    mut phase_rx: watch::Receiver<ClusterJobPhase>,
) {
    let mut attempts: u32 = 0;
    let mut received_any = false;
    // lines a snapshot read must not repeat
    let mut skip: usize = 0;

    loop {
        if !shared.set_state(ConnectionState::Connecting) {
            return;
        }
        let opened = tokio::select! {
            _ = cancelled(&mut cancel_rx) => return,
            opened = source.open(&target, follow) => opened,
        };

        match opened {
            Ok(mut stream) => {
                if !shared.set_state(ConnectionState::Open) {
                    return;
                }
                let outcome = read_stream(
                    &mut stream,
                    &shared,
                    &mut cancel_rx,
                    &mut attempts,
                    &mut received_any,
                    &mut skip,
                )
                .await;
                let (normal, reason) = match outcome {
                    ReadOutcome::Cancelled => return,
                    ReadOutcome::Closed { normal, reason } => (normal, reason),
                };

                if !follow {
                    if !normal {
                        shared.append([format!(
                            "{}Log stream interrupted: {}",
                            WARNING_MARKER,
                            reason.unwrap_or_else(|| "connection lost".to_string())
                        )]);
                    } else if !received_any {
                        shared.append([NO_LOGS.to_string()]);
                    }
                    shared.set_state(ConnectionState::Closed);
                    return;
                }
                if normal {
                    info!("Log stream for job {} closed normally", target.job_id);
                    shared.set_state(ConnectionState::Closed);
                    return;
                }
                warn!(
                    "Log stream for job {} closed unexpectedly: {}",
                    target.job_id,
                    reason.unwrap_or_default()
                );
            }
            Err(e) => {
                if !follow {
                    shared.append([format!("{}Failed to fetch logs: {}", WARNING_MARKER, e)]);
                    shared.set_state(ConnectionState::Closed);
                    return;
                }
                warn!("Failed to open log stream for job {}: {}", target.job_id, e);
            }
        }

        if phase_rx.borrow_and_update().is_terminal() {
            if !switch_to_snapshot(&shared, &target, &mut follow, &mut skip) {
                return;
            }
            continue;
        }

        attempts += 1;
        if !policy.allows(attempts) {
            warn!("Max reconnection attempts reached for job {}", target.job_id);
            shared.append([format!("{}{}", WARNING_MARKER, MAX_ATTEMPTS_REACHED)]);
            shared.set_state(ConnectionState::Terminal);
            return;
        }
        let delay = policy.delay_for(attempts);
        debug!(
            "Reconnecting log stream in {} ms (attempt {}/{})",
            delay.as_millis(),
            attempts,
            policy.max_attempts
        );
        shared.set_attempts(attempts);
        if !shared.set_state(ConnectionState::Reconnecting {
            attempt: attempts,
            delay,
        }) {
            return;
        }
        tokio::select! {
            _ = cancelled(&mut cancel_rx) => return,
            _ = tokio::time::sleep(delay) => {}
            _ = job_finished(&mut phase_rx) => {
                if !switch_to_snapshot(&shared, &target, &mut follow, &mut skip) {
                    return;
                }
            }
        }
    }
}

/// The job finished while the stream was down: stop following and read the
/// complete log once, skipping what was already received
fn switch_to_snapshot(
    shared: &SessionShared,
    target: &LogTarget,
    follow: &mut bool,
    skip: &mut usize,
) -> bool {
    info!("Job {} finished, reading remaining logs once", target.job_id);
    *follow = false;
    *skip = shared.snapshot().lines.len();
    shared.set_follow(false)
}

/// Keeps at most one live session per (run, job) pair
#[derive(Clone)]
pub struct LogStreamRegistry {
    controller: LogStreamController,
    sessions: Arc<Mutex<HashMap<LogTarget, LogStreamHandle>>>,
}

impl LogStreamRegistry {
    pub fn new(controller: LogStreamController) -> Self {
        Self {
            controller,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Open a session, cancelling any previous one for the same job first
    pub fn open(&self, target: LogTarget, phase: ClusterJobPhase) -> LogStreamHandle {
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(previous) = sessions.remove(&target) {
            previous.cancel();
        }
        let handle = self.controller.start(target.clone(), phase);
        sessions.insert(target, handle.clone());
        handle
    }

    /// Forward a job phase to its session, if one is open
    pub fn update_phase(&self, target: &LogTarget, phase: ClusterJobPhase) {
        if let Some(handle) = self.sessions.lock().unwrap().get(target) {
            handle.update_phase(phase);
        }
    }

    pub fn get(&self, target: &LogTarget) -> Option<LogStreamHandle> {
        self.sessions.lock().unwrap().get(target).cloned()
    }

    pub fn close(&self, target: &LogTarget) {
        if let Some(handle) = self.sessions.lock().unwrap().remove(target) {
            handle.cancel();
        }
    }

    pub fn close_all(&self) {
        let drained: Vec<LogStreamHandle> = self
            .sessions
            .lock()
            .unwrap()
            .drain()
            .map(|(_, h)| h)
            .collect();
        for handle in drained {
            handle.cancel();
        }
    }

    /// Forget sessions that can no longer produce lines
    pub fn prune_finished(&self) {
        self.sessions.lock().unwrap().retain(|_, h| !h.is_done());
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

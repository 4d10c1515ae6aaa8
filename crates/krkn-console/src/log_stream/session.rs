use krkn_api::LogTarget;
use krkn_core::models::ClusterJobPhase;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Connection lifecycle of a log stream session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    /// Not connected and not going to, e.g. waiting for the pod
    Idle,
    Connecting,
    Open,
    Reconnecting { attempt: u32, delay: Duration },
    /// Finished normally, or snapshot complete
    Closed,
    /// Gave up after exhausting reconnect attempts
    Terminal,
}

/// Log lines and connection status for one (run, job) pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogStreamSession {
    #[serde(skip)]
    pub target: LogTarget,
    pub follow: bool,
    pub lines: Vec<String>,
    pub state: ConnectionState,
    pub reconnect_attempts: u32,
    pub cancelled: bool,
}

impl LogStreamSession {
    fn new(target: LogTarget, follow: bool) -> Self {
        Self {
            target,
            follow,
            lines: Vec::new(),
            state: ConnectionState::Idle,
            reconnect_attempts: 0,
            cancelled: false,
        }
    }

    /// No further lines will be appended
    pub fn is_done(&self) -> bool {
        self.cancelled
            || matches!(
                self.state,
                ConnectionState::Idle | ConnectionState::Closed | ConnectionState::Terminal
            )
    }
}

/// Session state shared between the stream task and its handles. Every
/// mutation happens under the lock and is refused once cancelled.
pub(crate) struct SessionShared {
    session: Mutex<LogStreamSession>,
    version: watch::Sender<u64>,
}

impl SessionShared {
    pub(crate) fn new(target: LogTarget, follow: bool) -> Arc<Self> {
        let (version, _) = watch::channel(0);
        Arc::new(Self {
            session: Mutex::new(LogStreamSession::new(target, follow)),
            version,
        })
    }

    fn update<F: FnOnce(&mut LogStreamSession)>(&self, f: F) -> bool {
        let mut session = self.session.lock().unwrap();
        if session.cancelled {
            return false;
        }
        f(&mut session);
        drop(session);
        self.version.send_modify(|v| *v += 1);
        true
    }

    pub(crate) fn append<I: IntoIterator<Item = String>>(&self, lines: I) -> bool {
        self.update(|s| s.lines.extend(lines))
    }

    pub(crate) fn set_state(&self, state: ConnectionState) -> bool {
        self.update(|s| s.state = state)
    }

    pub(crate) fn set_follow(&self, follow: bool) -> bool {
        self.update(|s| s.follow = follow)
    }

    pub(crate) fn set_attempts(&self, attempts: u32) -> bool {
        self.update(|s| s.reconnect_attempts = attempts)
    }

    pub(crate) fn snapshot(&self) -> LogStreamSession {
        self.session.lock().unwrap().clone()
    }

    fn cancel(&self) {
        let mut session = self.session.lock().unwrap();
        session.cancelled = true;
        drop(session);
        self.version.send_modify(|v| *v += 1);
    }
}

/// Owner's view of a running session
#[derive(Clone)]
pub struct LogStreamHandle {
    shared: Arc<SessionShared>,
    cancel_tx: Arc<watch::Sender<bool>>,
    phase_tx: Arc<watch::Sender<ClusterJobPhase>>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl LogStreamHandle {
    pub(crate) fn new(
        shared: Arc<SessionShared>,
        cancel_tx: watch::Sender<bool>,
        phase_tx: watch::Sender<ClusterJobPhase>,
    ) -> Self {
        Self {
            shared,
            cancel_tx: Arc::new(cancel_tx),
            phase_tx: Arc::new(phase_tx),
            task: Arc::new(Mutex::new(None)),
        }
    }

    pub(crate) fn attach(&self, task: JoinHandle<()>) {
        *self.task.lock().unwrap() = Some(task);
    }

    pub fn target(&self) -> LogTarget {
        self.shared.snapshot().target
    }

    pub fn snapshot(&self) -> LogStreamSession {
        self.shared.snapshot()
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.snapshot().state
    }

    pub fn lines(&self) -> Vec<String> {
        self.shared.snapshot().lines
    }

    /// Lines appended after the first `from`
    pub fn lines_since(&self, from: usize) -> Vec<String> {
        let session = self.shared.session.lock().unwrap();
        session.lines.iter().skip(from).cloned().collect()
    }

    pub fn is_done(&self) -> bool {
        self.shared.snapshot().is_done()
    }

    /// Receiver that is notified on every session change
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.version.subscribe()
    }

    /// Wait until no further lines can be appended
    pub async fn wait(&self) {
        let mut rx = self.subscribe();
        loop {
            if self.is_done() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Cancel the session. Once this returns no line is ever appended and no
    /// reconnect is scheduled.
    pub fn cancel(&self) {
        self.shared.cancel();
        self.cancel_tx.send_replace(true);
        if let Some(task) = self.task.lock().unwrap().take() {
            task.abort();
        }
        log::debug!("Cancelled log stream for {:?}", self.shared.snapshot().target);
    }

    /// Report the latest phase of the job. Once the job is terminal a
    /// followed stream stops reconnecting and finishes with one snapshot read.
    pub fn update_phase(&self, phase: ClusterJobPhase) {
        self.phase_tx.send_if_modified(|current| {
            if *current == phase {
                return false;
            }
            *current = phase;
            true
        });
    }

    pub fn phase(&self) -> ClusterJobPhase {
        *self.phase_tx.borrow()
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.snapshot().cancelled
    }
}

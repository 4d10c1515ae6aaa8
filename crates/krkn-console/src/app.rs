/// Console struct and its action loop
use crate::actions::Action;
use crate::dispatcher::{ActionReceiver, Dispatcher};
use crate::effects::Effects;
use crate::stores::{WorkflowState, WorkflowStore};
use krkn_api::OperatorAPI;
use krkn_core::ConsoleSettings;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// The console core following flux architecture: actions go through the
/// dispatcher, get reduced into the store and then trigger effects.
pub struct Console {
    /// Dispatcher for sending actions
    dispatcher: Dispatcher,

    /// Store for the live workflow
    store: WorkflowStore,

    /// Effects handler for side effects
    effects: Effects,
}

impl Console {
    pub fn new(api: Arc<dyn OperatorAPI>, settings: ConsoleSettings) -> (Self, ActionReceiver) {
        let (dispatcher, action_receiver) = Dispatcher::new();
        let store = WorkflowStore::new(settings.workflow_variant);
        let effects = Effects::new(dispatcher.clone(), api, store.clone(), settings);
        (
            Self {
                dispatcher,
                store,
                effects,
            },
            action_receiver,
        )
    }

    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }

    pub fn store(&self) -> WorkflowStore {
        self.store.clone()
    }

    /// Cheap handle for driving the console from another task
    pub fn handle(&self) -> ConsoleHandle {
        ConsoleHandle {
            dispatcher: self.dispatcher.clone(),
            store: self.store.clone(),
        }
    }

    /// Names of scenario runs currently being polled
    pub fn active_pollers(&self) -> Vec<String> {
        self.effects.active_pollers()
    }

    /// Main loop. Starts initialization and processes actions until `Quit`
    /// is dispatched.
    pub async fn run(&mut self, mut action_receiver: ActionReceiver) {
        log::info!("Console started");
        self.dispatcher.dispatch(Action::InitStart);

        while let Some(action) = action_receiver.recv().await {
            if action == Action::Quit {
                log::info!("Quit requested");
                break;
            }
            self.handle_action(&action);
        }

        self.effects.shutdown();
        log::info!("Console stopped");
    }

    /// Handle an action by routing it to the store and effects
    pub fn handle_action(&self, action: &Action) {
        log::debug!("Handling action: {}", action.name());

        let changed = self.store.reduce(action);
        self.effects.handle(action);
        if changed {
            self.effects.reconcile_run_pollers();
        }
    }
}

/// Dispatches actions into a running console and observes its state
#[derive(Clone)]
pub struct ConsoleHandle {
    dispatcher: Dispatcher,
    store: WorkflowStore,
}

impl ConsoleHandle {
    pub fn dispatch(&self, action: Action) {
        self.dispatcher.dispatch(action);
    }

    pub fn state(&self) -> WorkflowState {
        self.store.get_state()
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.store.subscribe()
    }

    /// Wait until the state satisfies `pred`. Returns `None` when the timeout
    /// elapses or the console stops first.
    pub async fn wait_for<F>(&self, pred: F, timeout: Duration) -> Option<WorkflowState>
    where
        F: Fn(&WorkflowState) -> bool,
    {
        let mut rx = self.subscribe();
        let wait = async {
            loop {
                {
                    let state = rx.borrow_and_update();
                    if pred(&state) {
                        return Some(state.clone());
                    }
                }
                if rx.changed().await.is_err() {
                    return None;
                }
            }
        };
        tokio::time::timeout(timeout, wait).await.ok().flatten()
    }
}

/// Central dispatcher for the flux architecture.
/// Receives Actions and forwards them to the store and effects in order.
use crate::actions::Action;
use tokio::sync::mpsc;

/// The Dispatcher is the single serializing queue every action goes through
#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<Action>,
}

impl Dispatcher {
    /// Create a new Dispatcher with a receiver for processing actions
    pub fn new() -> (Self, ActionReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, ActionReceiver { rx })
    }

    /// Dispatch an action through the system
    pub fn dispatch(&self, action: Action) {
        log::trace!("Dispatching {}", action.name());
        if let Err(e) = self.tx.send(action) {
            log::error!("Failed to dispatch action {}: receiver dropped", e.0.name());
        }
    }

    /// Whether the console loop is still receiving actions
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// ActionReceiver yields dispatched actions in dispatch order
pub struct ActionReceiver {
    rx: mpsc::UnboundedReceiver<Action>,
}

impl ActionReceiver {
    /// Receive the next action, waiting until one is available
    pub async fn recv(&mut self) -> Option<Action> {
        self.rx.recv().await
    }

    /// Receive an already queued action without waiting
    pub fn try_recv(&mut self) -> Option<Action> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_actions_arrive_in_dispatch_order() {
        let (dispatcher, mut rx) = Dispatcher::new();
        dispatcher.dispatch(Action::InitStart);
        dispatcher.dispatch(Action::InitSuccess("abc".to_string()));
        dispatcher.dispatch(Action::PollSuccess);
        assert_eq!(rx.recv().await, Some(Action::InitStart));
        assert_eq!(rx.recv().await, Some(Action::InitSuccess("abc".to_string())));
        assert_eq!(rx.try_recv(), Some(Action::PollSuccess));
        assert_eq!(rx.try_recv(), None);
    }

    #[test]
    fn test_dispatch_after_receiver_dropped_does_not_panic() {
        let (dispatcher, rx) = Dispatcher::new();
        drop(rx);
        assert!(dispatcher.is_closed());
        dispatcher.dispatch(Action::Quit);
    }
}

//! Change notifications emitted by the registry.
//!
//! Subscribers receive a bare description of what changed and are expected to
//! re-query the registry for current state.

use std::sync::{mpsc, Mutex};

/// A committed change to the set of syntaxes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxChange {
    /// A new user syntax appeared
    Added(String),
    /// A syntax was edited (`from == to`) or renamed
    Updated { from: String, to: String },
    /// A user syntax was deleted
    Removed(String),
}

/// Fan-out of change notifications to channel subscribers.
#[derive(Debug, Default)]
pub struct ChangeNotifier {
    subscribers: Mutex<Vec<mpsc::Sender<SyntaxChange>>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber.
    pub fn subscribe(&self) -> mpsc::Receiver<SyntaxChange> {
        let (sender, receiver) = mpsc::channel();
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(sender);
        receiver
    }

    /// Deliver `change` to every live subscriber. Subscribers whose receiver
    /// was dropped are forgotten.
    pub fn notify(&self, change: SyntaxChange) {
        tracing::debug!("Syntax change: {:?}", change);
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.retain(|sender| sender.send(change.clone()).is_ok());
    }
}

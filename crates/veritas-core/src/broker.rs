//! In-memory publish/subscribe message broker.
//!
//! [`MessageBroker`] fans messages out to zero or more registered
//! callbacks without blocking publishers on slow or failing subscribers.
//!
//! # Concurrency
//!
//! Subscriber and history state is serialized by a single mutex. Callback
//! invocation happens on a snapshot taken under the lock and executed
//! after release, so a callback may itself call back into
//! [`publish`](MessageBroker::publish) or
//! [`subscribe`](MessageBroker::subscribe) without deadlock, and a slow
//! subscriber never stalls bookkeeping for concurrent publishers.
//!
//! # Failure semantics
//!
//! A callback returning an error is logged at `warn` and skipped; it never
//! propagates to the publisher and never aborts delivery to the remaining
//! callbacks. There is no retry and no backpressure: delivery is
//! synchronous on the publisher's stack.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};

use veritas_types::{AgentMessage, MessageKind, Targets};

/// Error type subscriber callbacks may return; logged, never propagated.
pub type DeliveryError = Box<dyn std::error::Error + Send + Sync>;

/// A subscriber callback. Unsubscription identity is the `Arc` pointer,
/// so callers keep the `Arc` they subscribed with.
pub type Callback = Arc<dyn Fn(&AgentMessage) -> Result<(), DeliveryError> + Send + Sync>;

/// Default cap on retained message history.
const DEFAULT_MAX_HISTORY: usize = 1000;

#[derive(Default)]
struct BrokerState {
    /// Ordered callback lists per agent id; duplicates allowed.
    subscribers: HashMap<String, Vec<Callback>>,
    /// Bounded history of published messages, oldest first.
    history: VecDeque<AgentMessage>,
}

/// Central publish/subscribe registry for agent communication.
pub struct MessageBroker {
    state: Mutex<BrokerState>,
    max_history: usize,
}

impl MessageBroker {
    /// Create a broker with the default history cap (1000 messages).
    pub fn new() -> Self {
        Self::with_history_cap(DEFAULT_MAX_HISTORY)
    }

    /// Create a broker with a custom history cap.
    pub fn with_history_cap(max_history: usize) -> Self {
        Self {
            state: Mutex::new(BrokerState::default()),
            max_history,
        }
    }

    /// Register a callback under `agent_id`. The same callback may be
    /// registered multiple times; each registration is invoked separately.
    pub fn subscribe(&self, agent_id: &str, callback: Callback) {
        let mut state = self.state.lock();
        state
            .subscribers
            .entry(agent_id.to_string())
            .or_default()
            .push(callback);
        debug!(agent_id, "subscriber registered");
    }

    /// Remove exactly one registration of `callback` under `agent_id`,
    /// matched by `Arc` pointer identity. No-op when absent.
    pub fn unsubscribe(&self, agent_id: &str, callback: &Callback) {
        let mut state = self.state.lock();
        if let Some(callbacks) = state.subscribers.get_mut(agent_id) {
            if let Some(pos) = callbacks.iter().position(|c| Arc::ptr_eq(c, callback)) {
                callbacks.remove(pos);
                debug!(agent_id, "subscriber removed");
            }
        }
    }

    /// Publish a message to the subscribers its targets resolve to.
    ///
    /// The message is appended to history (evicting the oldest past the
    /// cap) and the matched callbacks are invoked after the lock is
    /// released, in subscription order per agent.
    pub fn publish(&self, message: AgentMessage) {
        let callbacks = {
            let mut state = self.state.lock();
            Self::push_history(&mut state, self.max_history, message.clone());
            match &message.targets {
                Targets::All => Self::all_callbacks(&state),
                Targets::Agents(ids) => {
                    let mut snapshot = Vec::new();
                    for id in ids {
                        if let Some(cbs) = state.subscribers.get(id) {
                            snapshot.extend(cbs.iter().cloned());
                        }
                    }
                    snapshot
                }
            }
        };
        self.deliver(&message, callbacks);
    }

    /// Deliver a message to every current subscriber regardless of its
    /// `targets` field.
    pub fn broadcast(&self, message: AgentMessage) {
        let callbacks = {
            let mut state = self.state.lock();
            Self::push_history(&mut state, self.max_history, message.clone());
            Self::all_callbacks(&state)
        };
        self.deliver(&message, callbacks);
    }

    /// Build a message stamped with the current time.
    pub fn create_message(
        &self,
        agent_id: &str,
        kind: MessageKind,
        content: Value,
        targets: Targets,
    ) -> AgentMessage {
        AgentMessage::new(agent_id, kind, content, targets)
    }

    /// Retained history entries addressed to `agent_id` (wildcard
    /// messages match every agent), optionally filtered by kind.
    pub fn messages_for(&self, agent_id: &str, kind: Option<MessageKind>) -> Vec<AgentMessage> {
        let state = self.state.lock();
        state
            .history
            .iter()
            .filter(|m| m.targets.includes(agent_id))
            .filter(|m| kind.is_none_or(|k| m.kind == k))
            .cloned()
            .collect()
    }

    /// Number of retained history entries.
    pub fn history_len(&self) -> usize {
        self.state.lock().history.len()
    }

    /// Number of callbacks currently registered under `agent_id`.
    pub fn subscriber_count(&self, agent_id: &str) -> usize {
        self.state
            .lock()
            .subscribers
            .get(agent_id)
            .map_or(0, Vec::len)
    }

    fn push_history(state: &mut BrokerState, cap: usize, message: AgentMessage) {
        state.history.push_back(message);
        while state.history.len() > cap {
            state.history.pop_front();
        }
    }

    fn all_callbacks(state: &BrokerState) -> Vec<Callback> {
        state
            .subscribers
            .values()
            .flat_map(|cbs| cbs.iter().cloned())
            .collect()
    }

    /// Invoke callbacks outside the lock; errors are logged and swallowed.
    fn deliver(&self, message: &AgentMessage, callbacks: Vec<Callback>) {
        for callback in callbacks {
            if let Err(e) = callback(message) {
                warn!(
                    sender = %message.agent_id,
                    kind = ?message.kind,
                    error = %e,
                    "subscriber callback failed"
                );
            }
        }
    }
}

impl Default for MessageBroker {
    fn default() -> Self {
        Self::new()
    }
}

//! Push channel: named server events delivered over a persistent connection.
//!
//! [`PushHub`] is the in-process side of the channel. A transport feeds it with
//! [`PushHub::publish`] and watches [`PushHub::connection`] to know when to
//! re-authenticate. Subscriptions outlive reconnects.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{broadcast, watch};

/// Name of the event announcing an edit of a user's profile.
pub const USER_EDITED_EVENT: &str = "users/editUser";
/// Name of the event carrying constructor add/delete envelopes.
pub const CONSTRUCTORS_EVENT: &str = "constructors";

const EVENT_CAPACITY: usize = 64;

pub trait PushChannel: Send + Sync {
    /// Connect, or reconnect, authenticating with `token` when present.
    fn reconnect(&self, token: Option<&str>);

    /// Receive every payload published under `event` from now on.
    fn subscribe(&self, event: &str) -> broadcast::Receiver<Value>;
}

/// Credential the connection is currently authenticated with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionAuth {
    /// Bumped on every reconnect
    pub generation: u64,
    pub token: Option<String>,
}

pub struct PushHub {
    events: Mutex<HashMap<String, broadcast::Sender<Value>>>,
    auth: watch::Sender<ConnectionAuth>,
}

impl PushHub {
    pub fn new() -> Self {
        let (auth, _) = watch::channel(ConnectionAuth::default());
        Self {
            events: Mutex::new(HashMap::new()),
            auth,
        }
    }

    /// Deliver `payload` to every subscriber of `event`. Returns how many received it.
    pub fn publish(&self, event: &str, payload: Value) -> usize {
        let sender = self.events.lock().get(event).cloned();
        match sender {
            Some(sender) => sender.send(payload).unwrap_or(0),
            None => {
                tracing::debug!("push event {} has no subscribers", event);
                0
            }
        }
    }

    pub fn connection(&self) -> watch::Receiver<ConnectionAuth> {
        self.auth.subscribe()
    }

    pub fn current(&self) -> ConnectionAuth {
        self.auth.borrow().clone()
    }
}

impl Default for PushHub {
    fn default() -> Self {
        Self::new()
    }
}

impl PushChannel for PushHub {
    fn reconnect(&self, token: Option<&str>) {
        self.auth.send_modify(|auth| {
            auth.generation += 1;
            auth.token = token.map(str::to_string);
        });
        tracing::info!(
            authenticated = token.is_some(),
            "push channel reconnect requested"
        );
    }

    fn subscribe(&self, event: &str) -> broadcast::Receiver<Value> {
        self.events
            .lock()
            .entry(event.to_string())
            .or_insert_with(|| broadcast::channel(EVENT_CAPACITY).0)
            .subscribe()
    }
}

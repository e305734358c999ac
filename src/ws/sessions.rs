//! Registry of open connections and their outbound queues

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::game::{Broadcaster, SessionId};
use crate::ws::protocol::ServerMsg;

/// Per-connection outbound queue capacity. A client this far behind loses messages.
pub const OUTBOUND_QUEUE: usize = 256;

/// Serialized frames waiting to be written to a socket
pub type OutboundRx = mpsc::Receiver<String>;

/// All open connections, joined or not
#[derive(Default)]
pub struct SessionRegistry {
    senders: DashMap<SessionId, mpsc::Sender<String>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and get the receiving end of its queue
    pub fn register(&self, session: SessionId) -> OutboundRx {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE);
        self.senders.insert(session, tx);
        rx
    }

    pub fn unregister(&self, session: SessionId) {
        self.senders.remove(&session);
    }

    pub fn connection_count(&self) -> usize {
        self.senders.len()
    }

    fn deliver(&self, session: SessionId, tx: &mpsc::Sender<String>, frame: String) {
        match tx.try_send(frame) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(session_id = %session, "Outbound queue full, dropping message");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(session_id = %session, "Connection gone, dropping message");
            }
        }
    }

    fn fan_out(&self, skip: Option<SessionId>, msg: &ServerMsg) {
        let Some(frame) = encode(msg) else {
            return;
        };
        for entry in self.senders.iter() {
            if Some(*entry.key()) == skip {
                continue;
            }
            self.deliver(*entry.key(), entry.value(), frame.clone());
        }
    }
}

impl Broadcaster for SessionRegistry {
    fn send_to(&self, session: SessionId, msg: ServerMsg) {
        let Some(frame) = encode(&msg) else {
            return;
        };
        match self.senders.get(&session) {
            Some(tx) => self.deliver(session, tx.value(), frame),
            None => debug!(session_id = %session, "No such connection"),
        }
    }

    fn send_to_all(&self, msg: ServerMsg) {
        self.fan_out(None, &msg);
    }

    fn send_to_all_except(&self, session: SessionId, msg: ServerMsg) {
        self.fan_out(Some(session), &msg);
    }
}

fn encode(msg: &ServerMsg) -> Option<String> {
    match serde_json::to_string(msg) {
        Ok(frame) => Some(frame),
        Err(e) => {
            error!(error = %e, "Failed to serialize server message");
            None
        }
    }
}

//! Outbound delivery capability used by the match logic

use crate::ws::protocol::ServerMsg;

use super::SessionId;

/// Fire-and-forget delivery of server messages.
///
/// Implementations must not block: the match task calls these while it owns
/// the state, and a dead or slow connection only loses its own messages.
pub trait Broadcaster: Send + Sync {
    fn send_to(&self, session: SessionId, msg: ServerMsg);

    fn send_to_all(&self, msg: ServerMsg);

    fn send_to_all_except(&self, session: SessionId, msg: ServerMsg);
}

#[cfg(test)]
pub(crate) mod testing {
    use parking_lot::Mutex;

    use super::*;

    /// Who a recorded message was addressed to
    #[derive(Debug, Clone, PartialEq)]
    pub enum Audience {
        One(SessionId),
        All,
        AllExcept(SessionId),
    }

    /// Captures every message instead of sending it
    #[derive(Default)]
    pub struct RecordingBroadcaster {
        sent: Mutex<Vec<(Audience, ServerMsg)>>,
    }

    impl RecordingBroadcaster {
        pub fn take(&self) -> Vec<(Audience, ServerMsg)> {
            std::mem::take(&mut *self.sent.lock())
        }

        pub fn messages(&self) -> Vec<ServerMsg> {
            self.sent.lock().iter().map(|(_, m)| m.clone()).collect()
        }

        pub fn clear(&self) {
            self.sent.lock().clear();
        }
    }

    impl Broadcaster for RecordingBroadcaster {
        fn send_to(&self, session: SessionId, msg: ServerMsg) {
            self.sent.lock().push((Audience::One(session), msg));
        }

        fn send_to_all(&self, msg: ServerMsg) {
            self.sent.lock().push((Audience::All, msg));
        }

        fn send_to_all_except(&self, session: SessionId, msg: ServerMsg) {
            self.sent.lock().push((Audience::AllExcept(session), msg));
        }
    }
}

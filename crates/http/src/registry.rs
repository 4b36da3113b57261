//! The set of live websocket sessions of a server.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::connection::{SessionId, WebSocketSession};
use crate::protocol::{OpCode, WebSocketFrame};

const INBOUND_CAPACITY: usize = 256;

/// A data frame received from a client.
#[derive(Debug, Clone)]
pub struct InboundFrame {
    pub session: SessionId,
    pub frame: WebSocketFrame,
}

/// Live upgraded sessions, in upgrade order.
///
/// Sessions are added by the connection after the handshake and removed when it ends.
/// [`SessionRegistry::broadcast`] sends to a snapshot taken under the lock, so a slow
/// send never blocks registration and a session closing mid-broadcast is harmless.
///
/// After [`SessionRegistry::close`] the registry stays empty: sessions added later are
/// closed right away instead of being registered.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: Mutex<Sessions>,
    inbound: broadcast::Sender<InboundFrame>,
}

#[derive(Debug, Default)]
struct Sessions {
    live: Vec<Arc<WebSocketSession>>,
    closed: bool,
}

impl SessionRegistry {
    pub fn new() -> Self {
        let (inbound, _) = broadcast::channel(INBOUND_CAPACITY);
        Self { sessions: Mutex::new(Sessions::default()), inbound }
    }

    /// Registers `session` for broadcasts and returns true.
    ///
    /// Returns false, and closes `session`, if the registry was already closed.
    pub fn add(&self, session: Arc<WebSocketSession>) -> bool {
        let id = session.id();
        let refused = {
            let mut sessions = self.sessions.lock();
            if sessions.closed {
                Some(session)
            } else {
                sessions.live.push(session);
                None
            }
        };

        match refused {
            Some(session) => {
                debug!(session = %id, "registry closed, refuse websocket session");
                session.close();
                false
            }
            None => {
                debug!(session = %id, "register websocket session");
                true
            }
        }
    }

    pub fn remove(&self, id: SessionId) -> Option<Arc<WebSocketSession>> {
        let removed = {
            let mut sessions = self.sessions.lock();
            let index = sessions.live.iter().position(|session| session.id() == id)?;
            sessions.live.remove(index)
        };
        debug!(session = %id, "unregister websocket session");
        Some(removed)
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.lock().live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().live.is_empty()
    }

    /// True once [`SessionRegistry::close`] was called.
    pub fn is_closed(&self) -> bool {
        self.sessions.lock().closed
    }

    /// Sends `payload` to every live session and returns how many accepted it.
    ///
    /// A session that fails to accept the message is closed and dropped.
    pub fn broadcast(&self, opcode: OpCode, payload: &[u8]) -> usize {
        let snapshot = self.sessions.lock().live.clone();

        let mut delivered = 0;
        for session in snapshot {
            match session.send_frame(opcode, payload) {
                Ok(_) => delivered += 1,
                Err(e) => {
                    warn!(session = %session.id(), cause = %e, "broadcast failed, drop websocket session");
                    session.close();
                    self.remove(session.id());
                }
            }
        }
        delivered
    }

    pub fn broadcast_text(&self, text: &str) -> usize {
        self.broadcast(OpCode::Text, text.as_bytes())
    }

    /// Closes and drops every session. Sessions added afterwards are still accepted.
    pub fn close_all(&self) {
        let sessions = std::mem::take(&mut self.sessions.lock().live);
        for session in sessions {
            session.close();
        }
    }

    /// Closes every session and refuses the ones added from now on.
    pub fn close(&self) {
        let sessions = {
            let mut sessions = self.sessions.lock();
            sessions.closed = true;
            std::mem::take(&mut sessions.live)
        };
        for session in sessions {
            session.close();
        }
    }

    /// Receives the data frames of all sessions, starting from now.
    pub fn subscribe(&self) -> broadcast::Receiver<InboundFrame> {
        self.inbound.subscribe()
    }

    /// Publishes a frame received by `session` to the subscribers.
    pub fn deliver(&self, session: SessionId, frame: WebSocketFrame) {
        // nobody listening is fine
        let _ = self.inbound.send(InboundFrame { session, frame });
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

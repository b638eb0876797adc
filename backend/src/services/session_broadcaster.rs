use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, error};
use upgrade_shared::shared_upgrade_game::ServerMessage;
use uuid::Uuid;

pub type SessionId = Uuid;

/// Outbound queues of every live connection. Frames are serialized once and
/// pushed as text; each connection's writer task drains its own queue in order.
#[derive(Default)]
pub struct SessionBroadcaster {
    sessions: HashMap<SessionId, mpsc::UnboundedSender<String>>,
}

impl SessionBroadcaster {
    pub fn register(&mut self, session_id: SessionId, outbound: mpsc::UnboundedSender<String>) {
        self.sessions.insert(session_id, outbound);
    }

    pub fn remove(&mut self, session_id: &SessionId) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn send_to(&mut self, session_id: &SessionId, message: &ServerMessage) -> bool {
        let Some(frame) = encode(message) else {
            return false;
        };
        let delivered = match self.sessions.get(session_id) {
            Some(outbound) => outbound.send(frame).is_ok(),
            None => false,
        };
        if !delivered && self.sessions.remove(session_id).is_some() {
            debug!("Dropped closed session {}", session_id);
        }
        delivered
    }

    /// Pushes `message` to every session and returns how many received it.
    /// Sessions whose queue is closed are dropped.
    pub fn broadcast(&mut self, message: &ServerMessage) -> usize {
        let Some(frame) = encode(message) else {
            return 0;
        };
        self.sessions.retain(|session_id, outbound| {
            let open = outbound.send(frame.clone()).is_ok();
            if !open {
                debug!("Dropped closed session {}", session_id);
            }
            open
        });
        self.sessions.len()
    }
}

fn encode(message: &ServerMessage) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(frame) => Some(frame),
        Err(e) => {
            error!("Failed to serialize server message: {}", e);
            None
        }
    }
}

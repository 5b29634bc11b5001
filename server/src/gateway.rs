use hilo_protocol::ServerToClient;
use std::collections::HashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

/// One connected socket. `player_id` stays empty until the client identifies.
pub struct Session {
    pub player_id: Option<String>,
    pub tx: mpsc::UnboundedSender<ServerToClient>,
}

/// Outbound fan-out over every connected socket. Sends go through each
/// session's unbounded channel so a slow or dead peer never blocks the
/// game loop.
#[derive(Default)]
pub struct Gateway {
    sessions: HashMap<Uuid, Session>,
}

impl Gateway {
    pub fn attach(&mut self, session_id: Uuid, tx: mpsc::UnboundedSender<ServerToClient>) {
        self.sessions.insert(
            session_id,
            Session {
                player_id: None,
                tx,
            },
        );
    }

    /// Binds a session to a player id, returning the id it previously held.
    pub fn identify(&mut self, session_id: Uuid, player_id: &str) -> Option<String> {
        self.sessions
            .get_mut(&session_id)
            .and_then(|s| s.player_id.replace(player_id.to_string()))
    }

    pub fn detach(&mut self, session_id: Uuid) -> Option<Session> {
        self.sessions.remove(&session_id)
    }

    pub fn player_of(&self, session_id: Uuid) -> Option<String> {
        self.sessions
            .get(&session_id)
            .and_then(|s| s.player_id.clone())
    }

    /// True while at least one session is identified as `player_id`.
    pub fn has_player(&self, player_id: &str) -> bool {
        self.sessions
            .values()
            .any(|s| s.player_id.as_deref() == Some(player_id))
    }

    /// Everyone, identified or not.
    pub fn publish(&self, event: ServerToClient) {
        for s in self.sessions.values() {
            let _ = s.tx.send(event.clone());
        }
    }

    /// Every session identified as `player_id` (a player can have several
    /// tabs open).
    pub fn send_to_player(&self, player_id: &str, event: ServerToClient) {
        for s in self.sessions.values() {
            if s.player_id.as_deref() == Some(player_id) {
                let _ = s.tx.send(event.clone());
            }
        }
    }

    pub fn send_to_session(&self, session_id: Uuid, event: ServerToClient) {
        if let Some(s) = self.sessions.get(&session_id) {
            let _ = s.tx.send(event);
        }
    }
}

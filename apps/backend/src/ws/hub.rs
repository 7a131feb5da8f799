//! Connection registry: which websocket currently speaks for which player.
//!
//! The lobby manager pushes `ServerMsg`s through here without knowing about
//! actors. Each session owns the receiving half of its channel and forwards
//! whatever arrives to the socket.

use dashmap::DashMap;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace};

use crate::domain::state::{ConnectionId, PlayerId};
use crate::ws::protocol::ServerMsg;

struct Connection {
    conn_id: ConnectionId,
    tx: UnboundedSender<ServerMsg>,
}

#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<PlayerId, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `player` to a fresh channel. A previous connection for the same
    /// player is replaced; its receiver sees the channel close.
    pub fn register(
        &self,
        player: PlayerId,
        conn_id: ConnectionId,
    ) -> UnboundedReceiver<ServerMsg> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(old) = self
            .connections
            .insert(player.clone(), Connection { conn_id, tx })
        {
            debug!(player_id = %player, old_conn = %old.conn_id, new_conn = %conn_id, "connection replaced");
        }
        rx
    }

    /// Drop the binding only if it still belongs to `conn_id`, so a stale
    /// session closing late cannot evict its replacement. Returns whether
    /// anything was removed.
    pub fn unregister(&self, player: &PlayerId, conn_id: ConnectionId) -> bool {
        self.connections
            .remove_if(player, |_, c| c.conn_id == conn_id)
            .is_some()
    }

    pub fn is_current(&self, player: &PlayerId, conn_id: ConnectionId) -> bool {
        self.connections
            .get(player)
            .is_some_and(|c| c.conn_id == conn_id)
    }

    /// Best effort; a player without a live connection just misses the push.
    pub fn send(&self, player: &PlayerId, msg: ServerMsg) {
        match self.connections.get(player) {
            Some(conn) => {
                if conn.tx.send(msg).is_err() {
                    trace!(player_id = %player, "push to closed connection dropped");
                }
            }
            None => trace!(player_id = %player, "push to offline player dropped"),
        }
    }

    pub fn broadcast<'a, I>(&self, players: I, msg: &ServerMsg)
    where
        I: IntoIterator<Item = &'a PlayerId>,
    {
        for player in players {
            self.send(player, msg.clone());
        }
    }

    pub fn active_connections_count(&self) -> usize {
        self.connections.len()
    }
}

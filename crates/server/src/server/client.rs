//! Client sessions and message fan-out.

use protocol::WormId;
use protocol::packets::ServerMessage;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::mpsc;

/// Identifier assigned to each accepted connection.
pub type ConnectionId = u64;

/// Per-connection queue of encoded frames, drained by the writer task.
pub type Outbox = mpsc::UnboundedSender<String>;

/// A connected client session.
#[derive(Debug)]
pub struct Client {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// Remote address.
    pub addr: SocketAddr,
    /// The worm this connection controls.
    pub worm: WormId,
    /// When the session started.
    pub connected_at: Instant,
    outbox: Outbox,
}

impl Client {
    pub fn new(id: ConnectionId, addr: SocketAddr, worm: WormId, outbox: Outbox) -> Self {
        Self {
            id,
            addr,
            worm,
            connected_at: Instant::now(),
            outbox,
        }
    }

    /// Queue an already encoded frame. A closed outbox means the
    /// connection is going away; its read loop cleans up.
    #[inline]
    fn push(&self, text: String) {
        let _ = self.outbox.send(text);
    }
}

/// Registry of live connections, one worm per connection.
#[derive(Debug, Default)]
pub struct Clients {
    by_id: HashMap<ConnectionId, Client>,
    by_worm: HashMap<WormId, ConnectionId>,
}

impl Clients {
    pub fn insert(&mut self, client: Client) {
        self.by_worm.insert(client.worm, client.id);
        self.by_id.insert(client.id, client);
    }

    pub fn remove(&mut self, id: ConnectionId) -> Option<Client> {
        let client = self.by_id.remove(&id)?;
        self.by_worm.remove(&client.worm);
        Some(client)
    }

    pub fn get(&self, id: ConnectionId) -> Option<&Client> {
        self.by_id.get(&id)
    }

    pub fn by_worm(&self, worm: WormId) -> Option<&Client> {
        self.by_worm.get(&worm).and_then(|id| self.by_id.get(id))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Send to every client.
    pub fn broadcast_all(&self, msg: &ServerMessage) {
        let text = msg.encode();
        for client in self.by_id.values() {
            client.push(text.clone());
        }
    }

    /// Send to every client except `except`.
    pub fn broadcast_except(&self, msg: &ServerMessage, except: ConnectionId) {
        let text = msg.encode();
        for client in self.by_id.values().filter(|c| c.id != except) {
            client.push(text.clone());
        }
    }

    /// Send to a single client, if it is still connected.
    pub fn send_to(&self, id: ConnectionId, msg: &ServerMessage) {
        if let Some(client) = self.by_id.get(&id) {
            client.push(msg.encode());
        }
    }
}

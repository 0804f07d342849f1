use std::collections::{HashMap, HashSet};

use tokio::sync::mpsc;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::protocol::Outbound;

/* ── 每條連線一個 channel，單一連線內保持送出順序 ── */
pub type ConnId = Uuid;
pub type Tx = mpsc::UnboundedSender<Outbound>;
pub type Rx = mpsc::UnboundedReceiver<Outbound>;

struct Peer {
    tx:    Tx,
    rooms: HashSet<String>,
}

#[derive(Default)]
pub struct BroadcastRouter {
    peers:   HashMap<ConnId, Peer>,
    members: HashMap<String, HashSet<ConnId>>,
}

impl BroadcastRouter {
    pub fn register(&mut self, id: ConnId, tx: Tx) {
        self.peers.insert(id, Peer { tx, rooms: HashSet::new() });
    }

    pub fn unregister(&mut self, id: ConnId) -> Vec<String> {
        let Some(peer) = self.peers.remove(&id) else { return Vec::new() };
        let rooms: Vec<String> = peer.rooms.into_iter().collect();
        for room in &rooms {
            self.drop_member(room, id);
        }
        rooms
    }

    pub fn join(&mut self, id: ConnId, room: &str) -> bool {
        let Some(peer) = self.peers.get_mut(&id) else { return false };
        peer.rooms.insert(room.to_owned());
        self.members.entry(room.to_owned()).or_default().insert(id);
        true
    }

    pub fn leave(&mut self, id: ConnId, room: &str) -> bool {
        let Some(peer) = self.peers.get_mut(&id) else { return false };
        if !peer.rooms.remove(room) {
            return false;
        }
        self.drop_member(room, id);
        true
    }

    fn drop_member(&mut self, room: &str, id: ConnId) {
        if let Some(set) = self.members.get_mut(room) {
            set.remove(&id);
            if set.is_empty() {
                self.members.remove(room);
            }
        }
    }

    #[cfg(test)]
    pub fn is_member(&self, id: ConnId, room: &str) -> bool {
        self.members.get(room).is_some_and(|s| s.contains(&id))
    }

    #[cfg(test)]
    pub fn member_count(&self, room: &str) -> usize {
        self.members.get(room).map_or(0, HashSet::len)
    }

    pub fn connection_count(&self) -> usize { self.peers.len() }

    pub fn send_to(&self, id: ConnId, ev: Outbound) -> bool {
        match self.peers.get(&id) {
            Some(peer) => peer.tx.send(ev).is_ok(),
            None => false,
        }
    }

    // sender included
    pub fn broadcast_to_room(&self, room: &str, ev: &Outbound) -> usize {
        let Some(ids) = self.members.get(room) else {
            trace!(room = %room, "broadcast to empty room");
            return 0;
        };
        let mut delivered = 0;
        for id in ids {
            if let Some(peer) = self.peers.get(id) {
                if peer.tx.send(ev.clone()).is_ok() {
                    delivered += 1;
                } else {
                    debug!(conn = %id, room = %room, "receiver gone, skipping");
                }
            }
        }
        delivered
    }
}

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    broadcast::{BroadcastRouter, ConnId, Rx, Tx},
    config::Config,
    protocol::{Message, Outbound},
    state::{MediaEntry, MediaLog, RoomRegistry, RoomSnapshot},
};

/* 房間狀態 + 廣播表共用一把鎖：寫入與廣播在同一臨界區 */
#[derive(Default)]
struct Inner {
    rooms:  RoomRegistry,
    router: BroadcastRouter,
}

pub struct Hub {
    inner:     Mutex<Inner>,
    pub cfg:   Arc<Config>,
    pub media: MediaLog,
}

impl Hub {
    pub fn new(cfg: Arc<Config>, media: MediaLog) -> Self {
        Self { inner: Mutex::default(), cfg, media }
    }

    pub async fn connect(&self) -> (ConnId, Tx, Rx) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        let mut g = self.inner.lock().await;
        g.router.register(id, tx.clone());
        info!(conn = %id, live = g.router.connection_count(), "client connected");
        (id, tx, rx)
    }

    pub async fn disconnect(&self, id: ConnId) {
        let mut g = self.inner.lock().await;
        let rooms = g.router.unregister(id);
        info!(conn = %id, ?rooms, live = g.router.connection_count(), "client disconnected");
    }

    /// Replays history + content type to the joiner only.
    pub async fn join(&self, id: ConnId, room: &str) {
        let mut g = self.inner.lock().await;
        if !g.router.join(id, room) {
            return;
        }
        let RoomSnapshot { messages, content_type } = g.rooms.snapshot(room);
        info!(conn = %id, room = %room, history = messages.len(), "joined room");
        g.router.send_to(id, Outbound::RoomMessages(messages));
        g.router.send_to(id, Outbound::ContentType(content_type));
    }

    pub async fn leave(&self, id: ConnId, room: &str) -> bool {
        let left = self.inner.lock().await.router.leave(id, room);
        if left {
            info!(conn = %id, room = %room, "left room");
        }
        left
    }

    pub async fn post_message(&self, msg: Message) {
        let room = msg.room_id.clone();
        let mut g = self.inner.lock().await;
        g.rooms.record_message(&room, msg.clone());
        let n = g.router.broadcast_to_room(&room, &Outbound::RoomMessage(msg));
        debug!(room = %room, recipients = n, "room message");
    }

    pub async fn set_content_type(&self, room: &str, kind: &str) {
        let mut g = self.inner.lock().await;
        g.rooms.set_content_type(room, kind);
        let n = g.router.broadcast_to_room(room, &Outbound::ContentType(kind.to_owned()));
        debug!(room = %room, kind = %kind, recipients = n, "content type changed");
    }

    pub async fn snapshot(&self, room: &str) -> RoomSnapshot {
        self.inner.lock().await.rooms.snapshot(room)
    }

    #[cfg(test)]
    pub async fn is_member(&self, id: ConnId, room: &str) -> bool {
        self.inner.lock().await.router.is_member(id, room)
    }

    #[cfg(test)]
    pub async fn connection_count(&self) -> usize {
        self.inner.lock().await.router.connection_count()
    }

    pub async fn record_media(&self, entry: MediaEntry) {
        self.media.write().await.push_back(entry);
    }
}

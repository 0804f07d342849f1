use std::{
    collections::{HashMap, VecDeque},
    path::PathBuf,
    sync::Arc,
};
use tokio::sync::RwLock;

use crate::protocol::Message;

pub const HISTORY_CAP: usize = 5;
pub const DEFAULT_CONTENT_TYPE: &str = "text";

/* ------------ 固定長度 FIFO ------------ */
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    buf: VecDeque<T>,
    cap: usize,
}

impl<T> RingBuffer<T> {
    pub fn new(cap: usize) -> Self {
        Self { buf: VecDeque::with_capacity(cap), cap }
    }

    pub fn push(&mut self, item: T) {
        self.buf.push_back(item);
        while self.buf.len() > self.cap {
            self.buf.pop_front();
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize { self.buf.len() }
}

impl<T: Clone> RingBuffer<T> {
    pub fn snapshot(&self) -> Vec<T> {
        self.buf.iter().cloned().collect()
    }
}

impl<T> Default for RingBuffer<T> {
    fn default() -> Self { Self::new(HISTORY_CAP) }
}

/* ------------ 房間 ------------ */
#[derive(Debug)]
pub struct RoomState {
    pub history:      RingBuffer<Message>,
    pub content_type: String,
}

impl Default for RoomState {
    fn default() -> Self {
        Self { history: RingBuffer::default(), content_type: DEFAULT_CONTENT_TYPE.into() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoomSnapshot {
    pub messages:     Vec<Message>,
    pub content_type: String,
}

// rooms are never removed
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<String, RoomState>,
}

impl RoomRegistry {
    pub fn get_or_create(&mut self, room_id: &str) -> &mut RoomState {
        if !self.rooms.contains_key(room_id) {
            tracing::debug!(room = %room_id, "room created");
        }
        self.rooms.entry(room_id.to_owned()).or_default()
    }

    pub fn record_message(&mut self, room_id: &str, mut msg: Message) {
        if msg.room_id != room_id {
            msg.room_id = room_id.to_owned();
        }
        self.get_or_create(room_id).history.push(msg);
    }

    pub fn set_content_type(&mut self, room_id: &str, kind: &str) {
        self.get_or_create(room_id).content_type = kind.to_owned();
    }

    pub fn snapshot(&mut self, room_id: &str) -> RoomSnapshot {
        let st = self.get_or_create(room_id);
        RoomSnapshot { messages: st.history.snapshot(), content_type: st.content_type.clone() }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize { self.rooms.len() }
}

/* ------------ 上傳媒體清單 -------------- */
#[derive(Debug, Clone)]
pub struct MediaEntry {
    pub path: PathBuf,
    pub size: u64,
    pub room: String,
}
pub type MediaLog = Arc<RwLock<VecDeque<MediaEntry>>>;

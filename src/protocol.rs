/* ── 所有 frame 都是 {"event": ..., "data": ...} ── */
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    #[default]
    Text,
    File,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub room_id: String,
    #[serde(default)]
    pub kind:    Kind,
    #[serde(default)]
    pub payload: Value,
}

impl Message {
    pub fn text(room_id: impl Into<String>, payload: Value) -> Self {
        Self { room_id: room_id.into(), kind: Kind::Text, payload }
    }

    pub fn file(room_id: impl Into<String>, info: &FileInfo) -> Self {
        Self {
            room_id: room_id.into(),
            kind:    Kind::File,
            payload: json!({
                "fileName": info.file_name,
                "fileType": info.file_type,
                "url":      info.url,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub file_name: String,
    pub file_type: String,
    pub url:       String,
}

/* ------------ inbound ------------ */

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentTypeChange {
    pub room_id: String,
    #[serde(rename = "type")]
    pub kind:    String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadStart {
    pub room_id:      String,
    pub file_name:    String,
    pub total_chunks: u32,
    #[serde(default)]
    pub file_type:    Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadChunk {
    pub chunk_data: Vec<u8>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum Inbound {
    #[serde(rename = "join-room")]
    JoinRoom(String),
    #[serde(rename = "leave-room")]
    LeaveRoom(String),
    #[serde(rename = "room-message")]
    RoomMessage(Message),
    #[serde(rename = "room-contentType")]
    ContentType(ContentTypeChange),
    #[serde(rename = "upload-start")]
    UploadStart(UploadStart),
    #[serde(rename = "upload-chunk")]
    UploadChunk(UploadChunk),
}

/* ------------ outbound ------------ */

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub file_name: String,
    pub percent:   u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFailure {
    pub file_name: String,
    pub message:   String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum Outbound {
    #[serde(rename = "room-messages")]
    RoomMessages(Vec<Message>),
    #[serde(rename = "room-contentType")]
    ContentType(String),
    #[serde(rename = "room-message")]
    RoomMessage(Message),
    #[serde(rename = "upload-progress")]
    UploadProgress(Progress),
    #[serde(rename = "upload-error")]
    UploadError(UploadFailure),
    #[serde(rename = "error")]
    Error { message: String },
}

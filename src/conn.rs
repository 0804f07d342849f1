use std::{sync::Arc, time::Duration};

use tracing::{debug, error, info, warn};

use crate::{
    broadcast::{ConnId, Rx, Tx},
    error::{AppErr, AppResult},
    hub::Hub,
    protocol::{ContentTypeChange, Inbound, Message, Outbound, Progress, UploadFailure, UploadStart},
    session::UploadSession,
};

pub struct Connection {
    id:     ConnId,
    hub:    Arc<Hub>,
    tx:     Tx,
    upload: Option<UploadSession>,
}

impl Connection {
    pub async fn open(hub: Arc<Hub>) -> (Self, Rx) {
        let (id, tx, rx) = hub.connect().await;
        (Self { id, hub, tx, upload: None }, rx)
    }

    pub fn id(&self) -> ConnId { self.id }

    #[cfg(test)]
    pub fn upload(&self) -> Option<&UploadSession> { self.upload.as_ref() }

    pub async fn handle_text(&mut self, raw: &str) {
        match serde_json::from_str::<Inbound>(raw) {
            Ok(ev) => self.handle(ev).await,
            Err(e) => self.report(AppErr::Bad(format!("invalid event: {e}"))),
        }
    }

    pub async fn handle(&mut self, ev: Inbound) {
        if let Err(e) = self.dispatch(ev).await {
            self.report(e);
        }
    }

    /* binary frame 或 upload-chunk */
    pub async fn on_chunk(&mut self, data: &[u8]) {
        if let Err(e) = self.apply_chunk(data).await {
            self.report(e);
        }
    }

    async fn dispatch(&mut self, ev: Inbound) -> AppResult<()> {
        match ev {
            Inbound::JoinRoom(room) => {
                self.hub.join(self.id, &room).await;
            }
            Inbound::LeaveRoom(room) => {
                self.hub.leave(self.id, &room).await;
            }
            Inbound::RoomMessage(msg) => self.hub.post_message(msg).await,
            // any string is accepted, including ""
            Inbound::ContentType(ContentTypeChange { room_id, kind }) => {
                self.hub.set_content_type(&room_id, &kind).await;
            }
            Inbound::UploadStart(req) => self.start_upload(req).await?,
            Inbound::UploadChunk(chunk) => self.apply_chunk(&chunk.chunk_data).await?,
        }
        Ok(())
    }

    async fn start_upload(&mut self, req: UploadStart) -> AppResult<()> {
        if req.file_name.trim().is_empty() {
            return Err(AppErr::Bad("missing fileName".into()));
        }
        if req.total_chunks == 0 {
            return Err(AppErr::Bad("totalChunks must be > 0".into()));
        }
        // one upload per connection: a new start replaces the old one
        if let Some(old) = self.upload.take() {
            warn!(conn = %self.id, file = %old.file_name, "upload replaced before completion");
            old.abort().await;
        }

        let file_name = req.file_name.clone();
        match UploadSession::start(&self.hub.cfg.upload_dir, req).await {
            Ok(up) => {
                info!(conn = %self.id, room = %up.room_id, file = %up.file_name, chunks = up.total_chunks, "upload started");
                self.upload = Some(up);
                Ok(())
            }
            Err(e) => {
                self.send(Outbound::UploadError(UploadFailure { file_name, message: e.client_message() }));
                Err(e)
            }
        }
    }

    async fn apply_chunk(&mut self, data: &[u8]) -> AppResult<()> {
        let Some(up) = self.upload.as_mut() else { return Err(AppErr::NoSession) };

        let step = match up.append(data).await {
            Ok(step) => step,
            Err(e) => {
                // never keep appending after a lost write
                if let Some(up) = self.upload.take() {
                    self.send(Outbound::UploadError(UploadFailure {
                        file_name: up.file_name.clone(),
                        message:   e.client_message(),
                    }));
                    up.abort().await;
                }
                return Err(e);
            }
        };
        debug!(conn = %self.id, received = up.received, total = up.total_chunks, "chunk");
        let progress = Progress { file_name: up.file_name.clone(), percent: step.percent };
        self.send(Outbound::UploadProgress(progress));

        if step.done {
            if let Some(up) = self.upload.take() {
                self.complete(up).await?;
            }
        }
        Ok(())
    }

    async fn complete(&self, up: UploadSession) -> AppResult<()> {
        let room = up.room_id.clone();
        let file_name = up.file_name.clone();
        let (info, entry) = match up.finish(&self.hub.cfg).await {
            Ok(done) => done,
            Err(e) => {
                self.send(Outbound::UploadError(UploadFailure { file_name, message: e.client_message() }));
                return Err(e);
            }
        };
        info!(conn = %self.id, room = %room, url = %info.url, bytes = entry.size, "upload complete");
        self.hub.record_media(entry).await;
        self.hub.post_message(Message::file(room, &info)).await;
        Ok(())
    }

    pub async fn reap_idle(&mut self, idle: Duration) {
        if self.upload.as_ref().is_some_and(|up| up.idle_for() >= idle) {
            if let Some(up) = self.upload.take() {
                warn!(conn = %self.id, file = %up.file_name, "stalled upload aborted");
                self.send(Outbound::UploadError(UploadFailure {
                    file_name: up.file_name.clone(),
                    message:   "upload timed out".into(),
                }));
                up.abort().await;
            }
        }
    }

    /* 離線：消耗 self，只會跑一次 */
    pub async fn close(mut self) {
        if let Some(up) = self.upload.take() {
            up.abort().await;
        }
        self.hub.disconnect(self.id).await;
    }

    fn send(&self, ev: Outbound) {
        if self.tx.send(ev).is_err() {
            debug!(conn = %self.id, "outbound channel closed");
        }
    }

    fn report(&self, e: AppErr) {
        match e {
            AppErr::NoSession => debug!(conn = %self.id, "chunk without upload ignored"),
            AppErr::Bad(msg) => {
                warn!(conn = %self.id, %msg, "rejected event");
                self.send(Outbound::Error { message: msg });
            }
            AppErr::Io(e) => error!(conn = %self.id, error = %e, "upload io failure"),
        }
    }
}

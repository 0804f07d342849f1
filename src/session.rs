use std::{
    path::{Path, PathBuf},
    time::Instant,
};

use chrono::Utc;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::{debug, warn};

use crate::{
    config::Config,
    error::{io, AppResult},
    protocol::{FileInfo, UploadStart},
    state::MediaEntry,
};

pub const FALLBACK_MIME: &str = "application/octet-stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub percent: u8,
    pub done:    bool,
}

#[derive(Debug)]
pub struct UploadSession {
    pub dest:         PathBuf,
    pub stored_name:  String,
    pub file_name:    String,
    pub file_type:    String,
    pub total_chunks: u32,
    pub received:     u32,
    pub room_id:      String,
    bytes:            u64,
    file:             File,
    last_activity:    Instant,
}

impl UploadSession {
    pub async fn start(dir: &Path, req: UploadStart) -> AppResult<Self> {
        let (stored_name, dest) = allocate(dir, &req.file_name).await?;
        let file = File::create(&dest).await.map_err(io)?;
        let file_type = req
            .file_type
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| guess_type(&req.file_name));

        debug!(path = %dest.display(), total = req.total_chunks, "upload started");
        Ok(Self {
            dest,
            stored_name,
            file_name: req.file_name,
            file_type,
            total_chunks: req.total_chunks,
            received: 0,
            room_id: req.room_id,
            bytes: 0,
            file,
            last_activity: Instant::now(),
        })
    }

    // chunks have no index: appended in arrival order, counter capped at total
    pub async fn append(&mut self, data: &[u8]) -> AppResult<Step> {
        if self.is_complete() {
            return Ok(self.step());
        }
        self.file.write_all(data).await.map_err(io)?;
        self.bytes += data.len() as u64;
        self.received += 1;
        self.last_activity = Instant::now();
        Ok(self.step())
    }

    pub fn is_complete(&self) -> bool { self.received >= self.total_chunks }

    pub fn percent(&self) -> u8 {
        if self.total_chunks == 0 {
            return 100;
        }
        (u64::from(self.received) * 100 / u64::from(self.total_chunks)) as u8
    }

    pub fn idle_for(&self) -> std::time::Duration { self.last_activity.elapsed() }

    fn step(&self) -> Step { Step { percent: self.percent(), done: self.is_complete() } }

    pub async fn finish(mut self, cfg: &Config) -> AppResult<(FileInfo, MediaEntry)> {
        if let Err(e) = self.file.flush().await {
            self.abort().await;
            return Err(io(e));
        }
        let info = FileInfo {
            file_name: self.file_name.clone(),
            file_type: self.file_type.clone(),
            url:       cfg.file_url(&self.stored_name),
        };
        let entry = MediaEntry { path: self.dest.clone(), size: self.bytes, room: self.room_id.clone() };
        Ok((info, entry))
    }

    pub async fn abort(self) {
        let Self { file, dest, received, total_chunks, .. } = self;
        drop(file);
        match fs::remove_file(&dest).await {
            Ok(()) => debug!(path = %dest.display(), received, total_chunks, "upload aborted"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %dest.display(), error = %e, "could not remove partial upload"),
        }
    }
}

/* ── 檔名：<millis>-<id>-<name> ── */
pub async fn allocate(dir: &Path, original: &str) -> AppResult<(String, PathBuf)> {
    fs::create_dir_all(dir).await.map_err(io)?;
    let stored = format!(
        "{}-{}-{}",
        Utc::now().timestamp_millis(),
        nanoid::nanoid!(8),
        sanitize(original)
    );
    let path = dir.join(&stored);
    Ok((stored, path))
}

pub fn sanitize(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("");
    let clean: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    if clean.trim_matches('.').is_empty() { "file".into() } else { clean }
}

pub fn guess_type(name: &str) -> String {
    mime_guess::from_path(name)
        .first_raw()
        .unwrap_or(FALLBACK_MIME)
        .to_owned()
}

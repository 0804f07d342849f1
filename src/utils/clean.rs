use std::{
    collections::HashSet,
    io,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, SystemTime},
};
use tokio::{fs, time};
use tracing::{debug, info, warn};

use crate::{config::Config, state::MediaLog};

/* 清道夫：先清過期檔案，再依容量上限淘汰最舊的 */
pub async fn task(cfg: Arc<Config>, log: MediaLog) {
    let mut tick = time::interval(cfg.sweep_every.max(Duration::from_secs(1)));
    loop {
        tick.tick().await;
        match sweep(&cfg.upload_dir, &log, cfg.max_file_age, cfg.disk_cap).await {
            Ok(0) => {}
            Ok(n) => info!(removed = n, "housekeeping sweep"),
            Err(e) => warn!(error = %e, dir = %cfg.upload_dir.display(), "housekeeping sweep failed"),
        }
    }
}

pub async fn sweep(dir: &Path, log: &MediaLog, max_age: Duration, cap: u64) -> io::Result<usize> {
    let expired = remove_expired(dir, max_age).await?;
    let mut removed = expired.len();

    let mut lg = log.write().await;
    lg.retain(|m| !expired.contains(&m.path));

    let mut used: u64 = lg.iter().map(|m| m.size).sum();
    while used > cap {
        let Some(old) = lg.pop_front() else { break };
        match fs::remove_file(&old.path).await {
            Ok(()) => {
                debug!(path = %old.path.display(), room = %old.room, size = old.size, "evicted over cap");
                removed += 1;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %old.path.display(), error = %e, "could not evict"),
        }
        used = used.saturating_sub(old.size);
    }
    Ok(removed)
}

async fn remove_expired(dir: &Path, max_age: Duration) -> io::Result<HashSet<PathBuf>> {
    let mut gone = HashSet::new();
    let mut rd = match fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(gone),
        Err(e) => return Err(e),
    };
    let now = SystemTime::now();
    while let Some(ent) = rd.next_entry().await? {
        let Ok(meta) = ent.metadata().await else { continue };
        if !meta.is_file() { continue; }
        let age = meta.modified().ok().and_then(|m| now.duration_since(m).ok());
        if age.is_some_and(|a| a > max_age) && fs::remove_file(ent.path()).await.is_ok() {
            gone.insert(ent.path());
        }
    }
    Ok(gone)
}

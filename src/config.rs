use std::{path::PathBuf, str::FromStr, time::Duration};

use crate::error::{AppErr, AppResult};

/// URL prefix the upload directory is served under.
pub const UPLOADS_ROUTE: &str = "/uploads";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr:       String,
    pub public_base_url: String,
    pub upload_dir:      PathBuf,
    pub body_limit:      usize,
    pub max_file_age:    Duration,
    pub disk_cap:        u64,
    pub sweep_every:     Duration,
    pub upload_idle:     Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr:       "0.0.0.0:5000".into(),
            public_base_url: "http://localhost:5000".into(),
            upload_dir:      PathBuf::from("uploads"),
            body_limit:      100 * 1024 * 1024,
            max_file_age:    Duration::from_secs(24 * 60 * 60),
            disk_cap:        10 * 1024 * 1024 * 1024,
            sweep_every:     Duration::from_secs(30),
            upload_idle:     Duration::from_secs(300),
        }
    }
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let d = Self::default();
        Ok(Self {
            bind_addr:       get("BIND_ADDR").unwrap_or(d.bind_addr),
            public_base_url: get("PUBLIC_BASE_URL").unwrap_or(d.public_base_url),
            upload_dir:      get("UPLOAD_DIR").map(PathBuf::from).unwrap_or(d.upload_dir),
            body_limit:      parse(&get, "BODY_LIMIT")?.unwrap_or(d.body_limit),
            max_file_age:    secs(&get, "MAX_FILE_AGE_SECS")?.unwrap_or(d.max_file_age),
            disk_cap:        parse(&get, "DISK_CAP_BYTES")?.unwrap_or(d.disk_cap),
            sweep_every:     secs(&get, "SWEEP_INTERVAL_SECS")?.unwrap_or(d.sweep_every),
            upload_idle:     secs(&get, "UPLOAD_IDLE_SECS")?.unwrap_or(d.upload_idle),
        })
    }

    pub fn file_url(&self, stored_name: &str) -> String {
        format!("{}{UPLOADS_ROUTE}/{stored_name}", self.public_base_url.trim_end_matches('/'))
    }
}

fn parse<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str) -> AppResult<Option<T>> {
    match get(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| AppErr::Bad(format!("{key}: not a number: {raw:?}"))),
    }
}

fn secs(get: &impl Fn(&str) -> Option<String>, key: &str) -> AppResult<Option<Duration>> {
    Ok(parse::<u64>(get, key)?.map(Duration::from_secs))
}

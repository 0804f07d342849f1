use std::{path::Path, sync::Arc};

use axum::{routing::post, Router, Extension, Json, extract::multipart::{Field, Multipart}};
use tokio::{fs::{self, File}, io::AsyncWriteExt};
use futures_util::StreamExt;
use bytes::Bytes;
use serde_json::{json, Value};
use tracing::info;

use crate::{
    error::{AppResult, bad, io},
    hub::Hub,
    session,
    state::MediaEntry,
};

pub fn router() -> Router {
    Router::new().route("/upload", post(upload_file))
}

pub async fn upload_file(
    Extension(hub): Extension<Arc<Hub>>,
    mut mp: Multipart,
) -> AppResult<Json<Value>> {
    let mut field = loop {
        match mp.next_field().await.map_err(bad)? {
            Some(f) if f.name() == Some("file") => break f,
            Some(_) => continue,
            None => return Err(bad("No file uploaded")),
        }
    };

    let original = field.file_name().unwrap_or("upload").to_owned();
    let mime = field
        .content_type()
        .map(str::to_owned)
        .unwrap_or_else(|| session::guess_type(&original));

    let cfg = &hub.cfg;
    let (stored, full) = session::allocate(&cfg.upload_dir, &original).await?;
    let size = match write_field(&mut field, &full).await {
        Ok(n) => n,
        Err(e) => {
            fs::remove_file(&full).await.ok();
            return Err(e);
        }
    };

    info!(file = %original, bytes = size, "single-shot upload stored");
    hub.record_media(MediaEntry { path: full, size, room: "global".into() }).await;

    Ok(Json(json!({
        "success":  true,
        "fileName": original,
        "fileType": mime,
        "fileUrl":  cfg.file_url(&stored),
    })))
}

async fn write_field(field: &mut Field<'_>, full: &Path) -> AppResult<u64> {
    let mut file = File::create(full).await.map_err(io)?;
    let mut size = 0u64;
    while let Some(chunk) = field.next().await {
        let chunk: Bytes = chunk.map_err(bad)?;
        file.write_all(&chunk).await.map_err(io)?;
        size += chunk.len() as u64;
    }
    file.flush().await.map_err(io)?;
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::{Request, StatusCode}};
    use tower::ServiceExt;
    use crate::{config::Config, state::MediaLog};

    const BOUNDARY: &str = "relay-test-boundary";

    fn app() -> (Router, Arc<Hub>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            upload_dir:      dir.path().to_path_buf(),
            public_base_url: "http://relay.test".into(),
            ..Config::default()
        };
        let hub = Arc::new(Hub::new(Arc::new(cfg), MediaLog::default()));
        (router().layer(Extension(hub.clone())), hub, dir)
    }

    /* (name, filename, content-type, data) */
    fn form(parts: &[(&str, Option<&str>, Option<&str>, &str)]) -> Request<Body> {
        let mut body = String::new();
        for (name, file_name, ctype, data) in parts {
            body.push_str(&format!("--{BOUNDARY}\r\n"));
            match file_name {
                Some(f) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\n"
                )),
                None => body.push_str(&format!("Content-Disposition: form-data; name=\"{name}\"\r\n")),
            }
            if let Some(ct) = ctype {
                body.push_str(&format!("Content-Type: {ct}\r\n"));
            }
            body.push_str("\r\n");
            body.push_str(data);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));

        Request::builder()
            .method("POST")
            .uri("/upload")
            .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn no_file_part_is_400() {
        let (app, hub, _dir) = app();
        let resp = app.oneshot(form(&[("note", None, None, "hello")])).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        assert_eq!(&body[..], b"No file uploaded");
        assert!(hub.media.read().await.is_empty());
    }

    #[tokio::test]
    async fn file_part_is_stored_and_described() {
        let (app, hub, dir) = app();
        let req = form(&[
            ("note", None, None, "ignored"),
            ("file", Some("a b.txt"), Some("text/plain"), "hello"),
        ]);
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        let v: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["success"], true);
        assert_eq!(v["fileName"], "a b.txt");
        assert_eq!(v["fileType"], "text/plain");
        let url = v["fileUrl"].as_str().unwrap();
        assert!(url.starts_with("http://relay.test/uploads/"));
        assert!(url.ends_with("-a_b.txt"));

        let log = hub.media.read().await;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].size, 5);
        assert_eq!(log[0].path.parent(), Some(dir.path()));
        assert_eq!(fs::read(&log[0].path).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn missing_content_type_is_guessed_from_name() {
        let (app, _hub, _dir) = app();
        let resp = app.oneshot(form(&[("file", Some("pic.png"), None, "x")])).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        let v: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["fileType"], "image/png");
    }
}

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{ws::{Message, WebSocket, WebSocketUpgrade}, Extension},
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use tokio::time;
use tracing::{debug, warn};

use crate::{conn::Connection, hub::Hub};

pub fn router() -> Router {
    Router::new().route("/rooms", get(ws_handler))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Extension(hub): Extension<Arc<Hub>>,
) -> impl IntoResponse {
    let limit = hub.cfg.body_limit;
    ws.max_message_size(limit)
        .max_frame_size(limit)
        .on_upgrade(move |s| user_ws(s, hub))
}

/* ---------------- per user ---------------- */
async fn user_ws(sock: WebSocket, hub: Arc<Hub>) {
    let (mut sink, mut stream) = sock.split();
    let (mut conn, mut rx) = Connection::open(hub.clone()).await;
    let id = conn.id();

    /* 出站：單一 writer，保持送出順序 */
    let writer = tokio::spawn(async move {
        while let Some(ev) = rx.recv().await {
            let txt = match serde_json::to_string(&ev) {
                Ok(t) => t,
                Err(e) => { warn!(conn = %id, error = %e, "serialize outbound"); continue; }
            };
            if sink.send(Message::Text(txt)).await.is_err() { break; }
        }
    });

    let idle = hub.cfg.upload_idle;
    let mut tick = time::interval(idle.max(Duration::from_secs(1)));
    tick.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(raw)))   => conn.handle_text(&raw).await,
                Some(Ok(Message::Binary(buf))) => conn.on_chunk(&buf).await,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => { debug!(conn = %id, error = %e, "socket error"); break; }
            },
            _ = tick.tick() => conn.reap_idle(idle).await,
        }
    }

    /* 離線 */
    conn.close().await;
    writer.abort();
}

mod broadcast;
mod config;
mod conn;
mod error;
mod hub;
mod protocol;
mod session;
mod state;
mod utils {
    pub mod clean;
}
mod routes;

use std::sync::Arc;

use axum::{
    Router, Extension, extract::DefaultBodyLimit
};
use tower_http::{limit::RequestBodyLimitLayer, services::ServeDir};
use tracing_subscriber::EnvFilter;
use crate::config::{Config, UPLOADS_ROUTE};
use crate::hub::Hub;
use crate::state::MediaLog;
use crate::utils::clean;
use error::AppErr;

#[tokio::main]
async fn main() -> Result<(), AppErr> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg   = Arc::new(Config::from_env()?);
    let media = MediaLog::default();
    let hub   = Arc::new(Hub::new(cfg.clone(), media.clone()));

    tokio::fs::create_dir_all(&cfg.upload_dir).await?;
    tokio::spawn(clean::task(cfg.clone(), media));  // 啟動清道夫

    let app = Router::new()
        .nest_service(UPLOADS_ROUTE, ServeDir::new(&cfg.upload_dir))
        .merge(routes::router())
        .layer(Extension(hub))
        .layer(DefaultBodyLimit::max(cfg.body_limit))
        .layer(RequestBodyLimitLayer::new(cfg.body_limit));

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!(addr = %cfg.bind_addr, base = %cfg.public_base_url, "room relay listening");
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

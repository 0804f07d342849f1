use axum::Router;

pub mod upload;
pub mod ws;

pub fn router() -> Router {
    Router::new()
        .merge(upload::router())
        .nest("/ws", ws::router())
}

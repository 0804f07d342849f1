use axum::{http::StatusCode, response::IntoResponse};
use std::fmt::Display;

pub type AppResult<T> = Result<T, AppErr>;

#[derive(thiserror::Error, Debug)]
pub enum AppErr {
    /// Malformed or incomplete inbound event / request.
    #[error("Bad request: {0}")]
    Bad(String),

    /// Chunk arrived on a connection without an active upload.
    #[error("no active upload session")]
    NoSession,

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
}

impl AppErr {
    pub fn client_message(&self) -> String {
        match self {
            AppErr::Bad(msg) => msg.clone(),
            other            => other.to_string(),
        }
    }
}

impl IntoResponse for AppErr {
    fn into_response(self) -> axum::response::Response {
        let code = match self {
            AppErr::Bad(_) | AppErr::NoSession => StatusCode::BAD_REQUEST,
            AppErr::Io(_)                      => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (code, self.client_message()).into_response()
    }
}

/* ── 小助手：把任何 error 轉成 Bad / Io ── */
pub fn bad<E: Display>(e: E) -> AppErr { AppErr::Bad(e.to_string()) }
pub fn io<E: Into<std::io::Error>>(e: E) -> AppErr {
    AppErr::Io(e.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_maps_to_400_with_plain_body() {
        let err = bad("No file uploaded");
        assert_eq!(err.client_message(), "No file uploaded");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn io_maps_to_500() {
        let err = io(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        assert!(err.client_message().contains("disk full"));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

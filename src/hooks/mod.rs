//! The webhook side of HUBCRAB: GitHub pushes repository events at us and we relay them
//! to every channel subscribed to that repo.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

pub mod dispatch;
pub mod event;
pub mod messages;
pub mod oauth;
pub mod server;
pub mod signature;

pub use dispatch::{HookJob, HookQueue};
pub use event::{HookEvent, PayloadError};
pub use server::{router, serve, AppState};

#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("request has no X-Hub-Signature-256 header")]
    MissingSignature,
    #[error("request signature does not match")]
    BadSignature,
    #[error("payload is not JSON: {0}")]
    NotJson(#[source] serde_json::Error),
    #[error("payload names no repository")]
    NoRepository,
}

impl HookError {
    pub fn status(&self) -> StatusCode {
        match self {
            HookError::MissingSignature => StatusCode::UNAUTHORIZED,
            HookError::BadSignature => StatusCode::FORBIDDEN,
            HookError::NotJson(_) | HookError::NoRepository => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for HookError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_carry_their_status() {
        assert_eq!(HookError::MissingSignature.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(HookError::BadSignature.status(), StatusCode::FORBIDDEN);
        assert_eq!(HookError::NoRepository.status(), StatusCode::BAD_REQUEST);
        let garbage = serde_json::from_slice::<serde_json::Value>(b"{").unwrap_err();
        let response = HookError::NotJson(garbage).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

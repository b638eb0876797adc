use std::fmt;
use axum::body::Body;
use axum::http::StatusCode;
use axum::response::Response;
use serde_json::json;

#[derive(Debug)]
pub enum Error {
    /// The inventory authority task has stopped and no longer answers.
    AuthorityUnavailable,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthorityUnavailable => write!(f, "Inventory authority unavailable"),
        }
    }
}

impl std::error::Error for Error {}

impl axum::response::IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            Error::AuthorityUnavailable => (StatusCode::SERVICE_UNAVAILABLE, "Server error."),
        };

        let mut response = Response::new(Body::from(json!({ "error": message }).to_string()));
        *response.status_mut() = status;
        response.headers_mut().insert(
            axum::http::header::CONTENT_TYPE,
            axum::http::HeaderValue::from_static("application/json"),
        );
        response
    }
}

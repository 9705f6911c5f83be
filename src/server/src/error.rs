use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use kubeguard_privilege::PrivilegeError;
use serde_json::json;
use tracing::error;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Privilege query error: {0}")]
    Privilege(#[from] PrivilegeError),

    #[error("Invalid request body: {0}")]
    Payload(#[from] JsonRejection),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Privilege(PrivilegeError::InvalidQuery(_))
            | ApiError::Privilege(PrivilegeError::InvalidPattern { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Privilege(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Payload(rejection) => rejection.status(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Privilege(e) => e.to_string(),
            ApiError::Payload(rejection) => rejection.body_text(),
        };

        if status.is_server_error() {
            error!("status [{}]: {}", status.as_u16(), message);
        }

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use sea_orm::DbErr;
use thiserror::Error;

use crate::web_ui;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Authentication required")]
    AuthRequired,

    #[error("Invalid username or password")]
    AuthFailed,

    #[error("This action is unauthorized")]
    PermissionDenied,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ServerError::AuthRequired => {
                return Redirect::to("/login?error=Please+sign+in+to+continue").into_response();
            }
            ServerError::AuthFailed => (StatusCode::UNAUTHORIZED, self.to_string()),
            ServerError::PermissionDenied => (StatusCode::FORBIDDEN, self.to_string()),
            ServerError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            ServerError::Template(e) => {
                tracing::error!("Template error: {:?}", e);
                return (StatusCode::INTERNAL_SERVER_ERROR, format!("Template error: {}", e))
                    .into_response();
            }
            ServerError::Database(_) | ServerError::Internal(_) => {
                tracing::error!("{}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        web_ui::render_error_page(status, &message)
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;

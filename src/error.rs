use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Failure kinds surfaced by the progression engine.
///
/// The first four are caller-facing and map onto 4xx responses. The rest are
/// internal and always become a 500 after being logged.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Conflict(String),
    #[error("storage error: {0}")]
    Storage(#[source] sqlx::Error),
    #[error("certificate rendering failed: {0}")]
    Render(String),
    #[error("catalog error: {0}")]
    Catalog(String),
}

impl EngineError {
    pub fn validation<T: Into<String>>(msg: T) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn forbidden<T: Into<String>>(msg: T) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Storage(_) | Self::Render(_) | Self::Catalog(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        // 23505 = unique_violation
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some("23505") {
                return Self::Conflict(db_err.message().to_string());
            }
        }
        Self::Storage(err)
    }
}

// Undecodable request bodies are caller input errors like any other.
impl From<JsonRejection> for EngineError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "internal error");
        }
        let body = Json(json!({
            "error": {
                "message": self.to_string(),
                "status": status.as_u16(),
            }
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_errors_map_to_4xx() {
        assert_eq!(EngineError::validation("bad").status(), StatusCode::BAD_REQUEST);
        assert_eq!(EngineError::not_found("gone").status(), StatusCode::NOT_FOUND);
        assert_eq!(EngineError::forbidden("no").status(), StatusCode::FORBIDDEN);
        assert_eq!(
            EngineError::Conflict("dup".into()).status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn internal_errors_map_to_500() {
        let err = EngineError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, EngineError::Storage(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            EngineError::Render("timeout".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn message_is_passed_through() {
        let err = EngineError::forbidden("course not completed");
        assert_eq!(err.to_string(), "course not completed");
    }
}

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;

/// Conditions the server's error handler table is keyed by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    BadRequest,
    Forbidden,
    Internal,
    Database,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Internal | Self::Database => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error raised out of a request handler.
///
/// Handlers return `Result<_, AppError>` and use `?`; the error is not turned
/// into a body here. `into_response` only marks the response with the raised
/// error so the dispatch layer can run the registered handlers for its kind.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("not found")]
    NotFound,

    #[error("bad request: {0}")]
    BadRequest(String),

    /// The request could not be authenticated.
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error(transparent)]
    Database(#[from] DbErr),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound => ErrorKind::NotFound,
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Database(_) => ErrorKind::Database,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn internal(message: impl std::fmt::Display) -> Self {
        Self::Internal(anyhow::anyhow!("{message}"))
    }
}

/// Response extension carrying an error that still has to be dispatched.
#[derive(Clone, Debug)]
pub struct RaisedError(pub Arc<AppError>);

impl RaisedError {
    pub fn response(error: Arc<AppError>) -> Response {
        let mut response = error.kind().status().into_response();
        response.extensions_mut().insert(RaisedError(error));
        response
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        RaisedError::response(Arc::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_errors_are_classified_as_database() {
        let err: AppError = DbErr::Custom("connection reset".into()).into();
        assert_eq!(err.kind(), ErrorKind::Database);
        assert_eq!(err.kind().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn into_response_marks_the_raised_error() {
        let response = AppError::NotFound.into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let raised = response
            .extensions()
            .get::<RaisedError>()
            .expect("raised error marker");
        assert_eq!(raised.0.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn rejections_map_to_client_statuses() {
        let forbidden = AppError::Forbidden("missing signature".into());
        assert_eq!(forbidden.kind().status(), StatusCode::FORBIDDEN);

        let bad = AppError::BadRequest("not json".into());
        assert_eq!(bad.kind().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_keeps_the_message() {
        let err = AppError::internal("template missing");
        assert_eq!(err.to_string(), "template missing");
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}

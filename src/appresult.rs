use axum::{http::StatusCode, response::{IntoResponse, Response}};

use crate::ChatError;

pub type AppResult<T> = Result<T, AppError>;
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.0
            .downcast_ref::<ChatError>()
            .map(ChatError::status_code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
            (status, format!("{}\n\n{}", self.0, self.0.backtrace())).into_response()
        } else {
            (status, self.0.to_string()).into_response()
        }
    }
}

macro_rules! apperr_impl {
    ($E:ty) => {
        impl From<$E> for AppError {
            fn from(err: $E) -> Self {
                Self(anyhow::Error::from(err))
            }
        }
    };
}

apperr_impl!(ChatError);

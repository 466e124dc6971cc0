use axum::http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("no conversation selected")]
    NoConversation,
    #[error("not signed in")]
    Unauthenticated,
    #[error("unknown user {0}")]
    UnknownUser(String),
    #[error("change feed closed")]
    Closed,
    #[error(transparent)]
    Store(#[from] sqlx::Error),
}

impl ChatError {
    pub fn status_code(&self) -> StatusCode {
        use ChatError::*;
        match self {
            EmptyMessage | NoConversation => StatusCode::BAD_REQUEST,
            Unauthenticated => StatusCode::UNAUTHORIZED,
            UnknownUser(_) => StatusCode::NOT_FOUND,
            Closed | Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type ChatResult<T> = Result<T, ChatError>;

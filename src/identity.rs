use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{model::Identity, AppError, ChatError};

/// Set by the auth gateway in front of this service once the user is signed in.
pub const USER_ID_HEADER: &str = "x-user-id";

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(ChatError::Unauthenticated)?;

        Ok(Identity::new(user_id))
    }
}

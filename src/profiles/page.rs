use axum::{debug_handler, extract::{Path, State}, Json};
use time::OffsetDateTime;

use crate::{model::Identity, users::Directory, AppResult, AppState, ChatError};

use super::ProfileCard;

#[debug_handler(state = AppState)]
pub(crate) async fn profile(
    Path(user_id): Path<String>,
    State(directory): State<Directory>,
    _identity: Identity,
) -> AppResult<Json<ProfileCard>> {
    let Some(user) = directory.find(&user_id).await else {
        return Err(ChatError::UnknownUser(user_id).into());
    };

    Ok(Json(ProfileCard::new(&user, OffsetDateTime::now_utc())))
}

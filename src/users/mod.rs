mod directory;

use axum::{debug_handler, extract::{Query, State}, routing::{get, post}, Json, Router};
use serde::{Deserialize, Serialize};

use crate::{model::{Identity, UserRecord}, AppResult, AppState, ChatError};

pub use directory::{current_user, list_users, roster_view, Directory};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(roster))
        .route("/me", get(me))
        .route("/refresh", post(refresh))
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RosterQuery {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct RosterResponse {
    users: Vec<UserRecord>,
    error: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn roster(
    Query(RosterQuery { q }): Query<RosterQuery>,
    State(directory): State<Directory>,
    identity: Identity,
) -> AppResult<Json<RosterResponse>> {
    let users = directory.users().await;
    let users = roster_view(&users, &identity.user_id, &q)
        .into_iter()
        .cloned()
        .collect();

    Ok(Json(RosterResponse {
        users,
        error: directory.error().await,
    }))
}

#[debug_handler(state = AppState)]
pub(crate) async fn me(
    State(directory): State<Directory>,
    identity: Identity,
) -> AppResult<Json<UserRecord>> {
    match directory.find(&identity.user_id).await {
        Some(user) => Ok(Json(user)),
        None => Err(ChatError::UnknownUser(identity.user_id).into()),
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn refresh(
    State(directory): State<Directory>,
    identity: Identity,
) -> AppResult<Json<RosterResponse>> {
    directory.refresh().await?;

    let users = directory.users().await;
    Ok(Json(RosterResponse {
        users: roster_view(&users, &identity.user_id, "").into_iter().cloned().collect(),
        error: None,
    }))
}

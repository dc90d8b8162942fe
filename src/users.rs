// ABOUTME: User listing and follow/unfollow handlers
// ABOUTME: is_subscribed is computed against the viewer when a session is present

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_extra::extract::cookie::CookieJar;
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::storage::{AddOutcome, RemoveOutcome};
use crate::types::{SearchQuery, StatusResponse, UserResponse};
use crate::{AppState, auth_helpers};

pub async fn list_users(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<UserResponse>>> {
    let viewer = auth_helpers::optional_user_id(&jar, &state);
    let following: HashSet<Uuid> = match viewer {
        Some(user_id) => state
            .storage
            .followed_author_ids(user_id)
            .await?
            .into_iter()
            .collect(),
        None => HashSet::new(),
    };

    let users = state.storage.list_users(query.search.as_deref()).await?;
    let responses = users
        .into_iter()
        .map(|user| {
            let is_subscribed = following.contains(&user.id);
            UserResponse::from_model(user, is_subscribed)
        })
        .collect();
    Ok(Json(responses))
}

pub async fn get_user(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserResponse>> {
    let viewer = auth_helpers::optional_user_id(&jar, &state);
    let user = state
        .storage
        .user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {}", user_id)))?;

    let is_subscribed = match viewer {
        Some(viewer_id) => state
            .storage
            .followed_author_ids(viewer_id)
            .await?
            .contains(&user.id),
        None => false,
    };

    Ok(Json(UserResponse::from_model(user, is_subscribed)))
}

pub async fn follow_author(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(author_id): Path<Uuid>,
) -> Result<(StatusCode, Json<StatusResponse>)> {
    let follower_id = auth_helpers::current_user_id(&jar, &state)?;
    if follower_id == author_id {
        return Err(AppError::BadRequest("Cannot follow yourself".into()));
    }

    state
        .storage
        .user_by_id(author_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {}", author_id)))?;

    match state.storage.add_follow(follower_id, author_id).await? {
        AddOutcome::Created => Ok((
            StatusCode::CREATED,
            Json(StatusResponse::new("subscribed")),
        )),
        AddOutcome::AlreadyExists => {
            Err(AppError::Conflict("Already subscribed to this author".into()))
        }
    }
}

pub async fn unfollow_author(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(author_id): Path<Uuid>,
) -> Result<Json<StatusResponse>> {
    let follower_id = auth_helpers::current_user_id(&jar, &state)?;

    match state.storage.remove_follow(follower_id, author_id).await? {
        RemoveOutcome::Removed => Ok(Json(StatusResponse::new("unsubscribed"))),
        RemoveOutcome::NotFound => {
            Err(AppError::NotFound("Not subscribed to this author".into()))
        }
    }
}

pub async fn list_subscriptions(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<Vec<UserResponse>>> {
    let follower_id = auth_helpers::current_user_id(&jar, &state)?;
    let authors = state.storage.followed_authors(follower_id).await?;
    let responses = authors
        .into_iter()
        .map(|user| UserResponse::from_model(user, true))
        .collect();
    Ok(Json(responses))
}

/*
 * SPDX-FileCopyrightText: 2026 Nivriti Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::error::{ApiError, ApiResult};
use crate::extract::{blocking, is_authorized_admin, AuthUser, JsonBody};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use nivriti_core::Profile;
use nivriti_protocol::{FollowResponse, MessageBody, RegisterRequest, RegisterResponse};
use tracing::info;

pub async fn healthz(State(state): State<AppState>) -> ApiResult<&'static str> {
    blocking(&state.db, |db| db.health_check()).await?;
    Ok("ok")
}

pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    if !state.cfg.allow_self_register && !is_authorized_admin(&state, &headers) {
        return Err(ApiError::forbidden("registration disabled"));
    }
    let actor = blocking(&state.db, move |db| {
        db.register(&req.username, req.display_name.as_deref(), &req.token)
    })
    .await?;
    info!(user = %actor.username, "registered user");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: actor.id,
            username: actor.username,
        }),
    ))
}

pub async fn revoke_session(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<MessageBody>> {
    let token = user.token;
    blocking(&state.db, move |db| db.revoke_session(&token)).await?;
    Ok(Json(MessageBody {
        message: "Signed out".to_string(),
    }))
}

pub async fn profile(State(state): State<AppState>, Path(username): Path<String>) -> ApiResult<Json<Profile>> {
    let profile = blocking(&state.db, move |db| db.profile(&username)).await?;
    Ok(Json(profile))
}

pub async fn follow(
    State(state): State<AppState>,
    user: AuthUser,
    Path(username): Path<String>,
) -> ApiResult<Json<FollowResponse>> {
    let target = username.clone();
    let t = blocking(&state.db, move |db| db.toggle_follow(&user.actor, &target)).await?;
    let message = if t.following {
        format!("You are now following {username}")
    } else {
        format!("You unfollowed {username}")
    };
    Ok(Json(FollowResponse {
        following: t.following,
        follower_count: t.follower_count,
        message,
    }))
}

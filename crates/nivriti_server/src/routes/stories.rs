/*
 * SPDX-FileCopyrightText: 2026 Nivriti Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::error::ApiResult;
use crate::extract::{blocking, AuthUser, JsonBody, MaybeUser};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use nivriti_core::{Comment, Story, StoryView};
use nivriti_protocol::{BookmarkResponse, CreateCommentRequest, CreateStoryRequest, LikeResponse, MessageBody};

pub async fn create_story(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(req): JsonBody<CreateStoryRequest>,
) -> ApiResult<impl IntoResponse> {
    let story = blocking(&state.db, move |db| {
        db.create_story(&user.actor, &req.title, req.description.as_deref(), req.story_type)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(story)))
}

pub async fn get_story(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<String>,
) -> ApiResult<Json<StoryView>> {
    let view = blocking(&state.db, move |db| db.get_story(viewer.as_ref(), &id)).await?;
    Ok(Json(view))
}

pub async fn like_story(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<LikeResponse>> {
    let t = blocking(&state.db, move |db| db.toggle_story_like(&user.actor, &id)).await?;
    Ok(Json(LikeResponse {
        liked: t.active,
        like_count: t.count,
        message: if t.active { "Story liked" } else { "Story unliked" }.to_string(),
    }))
}

pub async fn bookmark_story(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<BookmarkResponse>> {
    let t = blocking(&state.db, move |db| db.toggle_story_bookmark(&user.actor, &id)).await?;
    Ok(Json(BookmarkResponse {
        success: true,
        bookmarked: t.active,
        message: if t.active { "Story bookmarked" } else { "Bookmark removed" }.to_string(),
    }))
}

pub async fn my_bookmarks(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<Story>>> {
    let stories = blocking(&state.db, move |db| db.list_bookmarks(&user.actor)).await?;
    Ok(Json(stories))
}

pub async fn list_comments(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Comment>>> {
    let comments = blocking(&state.db, move |db| db.list_comments(viewer.as_ref(), &id)).await?;
    Ok(Json(comments))
}

pub async fn add_comment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<CreateCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let comment = blocking(&state.db, move |db| {
        db.add_comment(&user.actor, &id, req.chapter_id.as_deref(), &req.content)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageBody>> {
    blocking(&state.db, move |db| db.delete_comment(&user.actor, &id)).await?;
    Ok(Json(MessageBody {
        message: "Comment deleted".to_string(),
    }))
}

pub async fn like_comment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<LikeResponse>> {
    let t = blocking(&state.db, move |db| db.toggle_comment_like(&user.actor, &id)).await?;
    Ok(Json(LikeResponse {
        liked: t.active,
        like_count: t.count,
        message: if t.active { "Comment liked" } else { "Comment unliked" }.to_string(),
    }))
}

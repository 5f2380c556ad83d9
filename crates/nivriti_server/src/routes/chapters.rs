/*
 * SPDX-FileCopyrightText: 2026 Nivriti Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::error::{ApiError, ApiResult};
use crate::extract::{blocking, AuthUser, JsonBody, MaybeUser};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use nivriti_core::Chapter;
use nivriti_protocol::{
    BulkAction, BulkChaptersRequest, BulkChaptersResponse, CreateChapterRequest, PublishRequest, PublishResponse,
    ReorderRequest,
};
use serde_json::{json, Value};

pub async fn list_chapters(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Chapter>>> {
    let chapters = blocking(&state.db, move |db| db.list_chapters(viewer.as_ref(), &id)).await?;
    Ok(Json(chapters))
}

pub async fn create_chapter(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<CreateChapterRequest>,
) -> ApiResult<impl IntoResponse> {
    let chapter = blocking(&state.db, move |db| {
        db.create_chapter(&user.actor, &id, &req.title, &req.content)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(chapter)))
}

pub async fn reorder_chapters(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<ReorderRequest>,
) -> ApiResult<Json<Value>> {
    let chapters = blocking(&state.db, move |db| {
        db.reorder_chapters(&user.actor, &id, &req.chapter_ids)
    })
    .await?;
    Ok(Json(json!({
        "message": "Chapters reordered successfully",
        "chapters": chapters,
    })))
}

pub async fn bulk_chapters(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<BulkChaptersRequest>,
) -> ApiResult<Json<BulkChaptersResponse>> {
    let BulkChaptersRequest {
        action,
        chapter_ids,
        is_published,
    } = req;
    let affected = blocking(&state.db, move |db| {
        db.bulk_chapters(&user.actor, &id, action, chapter_ids.as_deref(), is_published)
    })
    .await?;
    let verb = match (action, is_published) {
        (BulkAction::Publish, _) | (BulkAction::SetPublished, Some(true)) => "published",
        (BulkAction::Unpublish, _) | (BulkAction::SetPublished, _) => "unpublished",
        (BulkAction::Delete, _) => "deleted",
    };
    Ok(Json(BulkChaptersResponse {
        message: format!("{affected} chapter(s) {verb}"),
        affected,
    }))
}

/// The body is optional; an empty one publishes the story alone.
pub async fn publish_story(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<PublishResponse>> {
    let req: PublishRequest = if body.iter().all(u8::is_ascii_whitespace) {
        PublishRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::bad_request(format!("invalid body: {e}")))?
    };
    let publish = req.publish.unwrap_or(true);
    let publish_chapters = req.publish_chapters.unwrap_or(false);
    let story_id = id.clone();
    let is_published = blocking(&state.db, move |db| {
        db.publish_story(&user.actor, &story_id, publish, publish_chapters)
    })
    .await?;
    let message = if is_published {
        "Story published successfully"
    } else {
        "Story unpublished successfully"
    };
    Ok(Json(PublishResponse {
        message: message.to_string(),
        story_id: id,
        is_published,
    }))
}

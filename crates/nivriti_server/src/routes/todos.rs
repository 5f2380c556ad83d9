/*
 * SPDX-FileCopyrightText: 2026 Nivriti Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::error::ApiResult;
use crate::extract::{blocking, AuthUser, JsonBody};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use nivriti_core::{Todo, TodoPatch};
use nivriti_protocol::{CreateTodoRequest, MessageBody, UpdateTodoRequest};

pub async fn list_todos(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<Todo>>> {
    let todos = blocking(&state.db, move |db| db.list_todos(&user.actor)).await?;
    Ok(Json(todos))
}

pub async fn create_todo(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(req): JsonBody<CreateTodoRequest>,
) -> ApiResult<impl IntoResponse> {
    let todo = blocking(&state.db, move |db| {
        db.create_todo(&user.actor, &req.title, req.description.as_deref())
    })
    .await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

pub async fn update_todo(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateTodoRequest>,
) -> ApiResult<Json<Todo>> {
    let patch = TodoPatch {
        title: req.title,
        description: req.description,
        completed: req.completed,
    };
    let todo = blocking(&state.db, move |db| db.update_todo(&user.actor, &id, patch)).await?;
    Ok(Json(todo))
}

pub async fn delete_todo(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageBody>> {
    blocking(&state.db, move |db| db.delete_todo(&user.actor, &id)).await?;
    Ok(Json(MessageBody {
        message: "Todo deleted".to_string(),
    }))
}

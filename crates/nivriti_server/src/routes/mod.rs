/*
 * SPDX-FileCopyrightText: 2026 Nivriti Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

mod account;
mod admin;
mod chapters;
mod stories;
mod todos;

use crate::error::ApiError;
use crate::middleware::{add_security_headers, ensure_request_ids, json_method_not_allowed};
use crate::AppState;
use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::info_span;

pub fn router(state: AppState) -> Router {
    let max_body = state.cfg.max_body_bytes;
    Router::new()
        .route("/healthz", get(account::healthz))
        .route("/register", post(account::register))
        .route("/sessions/current", delete(account::revoke_session))
        .route("/users/:username", get(account::profile))
        .route("/users/:username/follow", post(account::follow))
        .route("/me/bookmarks", get(stories::my_bookmarks))
        .route("/stories", post(stories::create_story))
        .route("/stories/:id", get(stories::get_story))
        .route("/stories/:id/like", post(stories::like_story))
        .route("/stories/:id/bookmark", post(stories::bookmark_story))
        .route(
            "/stories/:id/comments",
            get(stories::list_comments).post(stories::add_comment),
        )
        .route("/comments/:id", delete(stories::delete_comment))
        .route("/comments/:id/like", post(stories::like_comment))
        .route(
            "/stories/:id/chapters",
            get(chapters::list_chapters).post(chapters::create_chapter),
        )
        .route("/stories/:id/chapters/reorder", post(chapters::reorder_chapters))
        .route("/stories/:id/chapters/bulk", post(chapters::bulk_chapters))
        .route("/stories/:id/publish", post(chapters::publish_story))
        .route("/todos", get(todos::list_todos).post(todos::create_todo))
        .route("/todos/:id", put(todos::update_todo).delete(todos::delete_todo))
        .route("/admin/reconcile", post(admin::reconcile))
        .fallback(|| async { ApiError::not_found("Not found") })
        .layer(from_fn(json_method_not_allowed))
        .layer(DefaultBodyLimit::max(max_body))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
                let request_id = req
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("req");
                info_span!(
                    "http",
                    method = %req.method(),
                    uri = %req.uri(),
                    request_id = %request_id
                )
            }),
        )
        .layer(from_fn(add_security_headers))
        .layer(from_fn(ensure_request_ids))
        .with_state(state)
}

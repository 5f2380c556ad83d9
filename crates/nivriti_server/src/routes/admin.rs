/*
 * SPDX-FileCopyrightText: 2026 Nivriti Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::error::{ApiError, ApiResult};
use crate::extract::{blocking, is_authorized_admin};
use crate::AppState;
use axum::{extract::State, http::HeaderMap, Json};
use nivriti_protocol::ReconcileResponse;
use tracing::info;

pub async fn reconcile(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<ReconcileResponse>> {
    if !is_authorized_admin(&state, &headers) {
        return Err(ApiError::unauthenticated());
    }
    let corrected = blocking(&state.db, |db| db.reconcile_counters()).await?;
    info!(corrected, "reconciled counters");
    Ok(Json(ReconcileResponse { corrected }))
}

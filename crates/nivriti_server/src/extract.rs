/*
 * SPDX-FileCopyrightText: 2026 Nivriti Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::{error::ApiError, AppState};
use async_trait::async_trait;
use axum::{
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Request},
    http::{request::Parts, HeaderMap},
    Json,
};
use nivriti_core::{Actor, StoryDb};

/// Runs a store call on the blocking pool.
pub(crate) async fn blocking<T, F>(db: &StoryDb, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&StoryDb) -> nivriti_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = db.clone();
    Ok(tokio::task::spawn_blocking(move || f(&db)).await??)
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let v = headers.get("Authorization")?.to_str().ok()?.trim().to_string();
    let v = v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer "))?;
    let v = v.trim();
    if v.is_empty() {
        None
    } else {
        Some(v.to_string())
    }
}

pub(crate) fn is_authorized_admin(state: &AppState, headers: &HeaderMap) -> bool {
    let Some(expected) = &state.cfg.admin_token else { return false };
    bearer_token(headers).is_some_and(|token| &token == expected)
}

/// A caller holding a live session.
pub struct AuthUser {
    pub actor: Actor,
    pub token: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(ApiError::unauthenticated)?;
        let lookup = token.clone();
        let actor = blocking(&state.db, move |db| db.authenticate(&lookup)).await?;
        Ok(Self { actor, token })
    }
}

/// Anonymous callers pass through; a presented but unknown token is still 401.
pub struct MaybeUser(pub Option<Actor>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if parts.headers.get("Authorization").is_none() {
            return Ok(Self(None));
        }
        let user = AuthUser::from_request_parts(parts, state).await?;
        Ok(Self(Some(user.actor)))
    }
}

/// `Json<T>` whose rejection renders as a 400 `{"error"}` body.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    T: Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_parsing() {
        let mut h = HeaderMap::new();
        assert_eq!(bearer_token(&h), None);
        h.insert("Authorization", HeaderValue::from_static("Bearer  abc "));
        assert_eq!(bearer_token(&h).as_deref(), Some("abc"));
        h.insert("Authorization", HeaderValue::from_static("bearer xyz"));
        assert_eq!(bearer_token(&h).as_deref(), Some("xyz"));
        h.insert("Authorization", HeaderValue::from_static("Basic xyz"));
        assert_eq!(bearer_token(&h), None);
        h.insert("Authorization", HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&h), None);
    }
}

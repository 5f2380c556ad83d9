/*
 * SPDX-FileCopyrightText: 2026 Nivriti Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::db::{new_id, now_ms, token_hash_hex, StoryDb};
use crate::error::{Error, Result};
use crate::model::{Actor, Profile};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

pub const MIN_TOKEN_LEN: usize = 16;

pub fn is_valid_username(user: &str) -> bool {
    if user.is_empty() || user.len() > 64 {
        return false;
    }
    user.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

impl StoryDb {
    /// Creates a user and binds `token` as its first session.
    pub fn register(&self, username: &str, display_name: Option<&str>, token: &str) -> Result<Actor> {
        let username = username.trim();
        if !is_valid_username(username) {
            return Err(Error::validation("invalid username"));
        }
        if token.len() < MIN_TOKEN_LEN {
            return Err(Error::validation("token too short"));
        }
        let display_name = display_name.map(str::trim).filter(|s| !s.is_empty());
        let id = new_id();
        let now = now_ms();
        self.write(|tx| {
            if user_id_by_username(tx, username)?.is_some() {
                return Err(Error::Conflict("username already taken".into()));
            }
            tx.execute(
                "INSERT INTO users(id, username, display_name, created_at_ms) VALUES (?1, ?2, ?3, ?4)",
                params![id, username, display_name, now],
            )?;
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO sessions(token_sha256, user_id, created_at_ms, last_used_ms) VALUES (?1, ?2, ?3, ?3)",
                params![token_hash_hex(token), id, now],
            )?;
            if inserted == 0 {
                return Err(Error::Conflict("token already in use".into()));
            }
            Ok(())
        })?;
        debug!(user = %username, "registered user");
        Ok(Actor {
            id,
            username: username.to_string(),
        })
    }

    /// Resolves a bearer token to its user.
    pub fn authenticate(&self, token: &str) -> Result<Actor> {
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::Unauthorized("Authentication required".into()));
        }
        let hash = token_hash_hex(token);
        let conn = self.conn()?;
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT u.id, u.username FROM sessions s JOIN users u ON u.id = s.user_id WHERE s.token_sha256 = ?1",
                params![hash],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;
        let Some((id, username)) = row else {
            return Err(Error::Unauthorized("Authentication required".into()));
        };
        conn.execute(
            "UPDATE sessions SET last_used_ms = ?2 WHERE token_sha256 = ?1",
            params![hash, now_ms()],
        )?;
        Ok(Actor { id, username })
    }

    pub fn revoke_session(&self, token: &str) -> Result<bool> {
        let conn = self.conn()?;
        let n = conn.execute(
            "DELETE FROM sessions WHERE token_sha256 = ?1",
            params![token_hash_hex(token.trim())],
        )?;
        Ok(n > 0)
    }

    pub fn profile(&self, username: &str) -> Result<Profile> {
        let conn = self.conn()?;
        conn.query_row(
            r#"
            SELECT u.id, u.username, u.display_name, u.follower_count, u.following_count,
                   (SELECT COUNT(*) FROM stories s WHERE s.author_id = u.id AND s.is_published = 1),
                   u.created_at_ms
            FROM users u WHERE u.username = ?1
            "#,
            params![username.trim()],
            |r| {
                Ok(Profile {
                    id: r.get(0)?,
                    username: r.get(1)?,
                    display_name: r.get(2)?,
                    follower_count: r.get(3)?,
                    following_count: r.get(4)?,
                    story_count: r.get(5)?,
                    created_at_ms: r.get(6)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| Error::not_found("User not found"))
    }
}

pub(crate) fn user_id_by_username(conn: &Connection, username: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT id FROM users WHERE username = ?1",
            params![username],
            |r| r.get(0),
        )
        .optional()?)
}

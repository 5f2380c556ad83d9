/*
 * SPDX-FileCopyrightText: 2026 Nivriti Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Relation toggles (like, bookmark, follow) and the denormalized counters
//! that mirror them.
//!
//! Each toggle runs the existence check, the insert or delete and the
//! counter adjustment in one immediate transaction, so the counter always
//! equals the number of relation rows pointing at the target.

use crate::db::{now_ms, StoryDb};
use crate::error::{Error, Result};
use crate::model::{Actor, FollowToggle, Toggle};
use crate::users::user_id_by_username;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

/// A join table plus the counter column it feeds.
struct Relation {
    table: &'static str,
    actor_col: &'static str,
    target_col: &'static str,
    counter_table: &'static str,
    counter_col: &'static str,
}

const STORY_LIKES: Relation = Relation {
    table: "story_likes",
    actor_col: "user_id",
    target_col: "story_id",
    counter_table: "stories",
    counter_col: "like_count",
};

const STORY_BOOKMARKS: Relation = Relation {
    table: "story_bookmarks",
    actor_col: "user_id",
    target_col: "story_id",
    counter_table: "stories",
    counter_col: "bookmark_count",
};

const COMMENT_LIKES: Relation = Relation {
    table: "comment_likes",
    actor_col: "user_id",
    target_col: "comment_id",
    counter_table: "comments",
    counter_col: "like_count",
};

const FOLLOWS: Relation = Relation {
    table: "follows",
    actor_col: "follower_id",
    target_col: "followee_id",
    counter_table: "users",
    counter_col: "follower_count",
};

fn toggle_relation(conn: &Connection, rel: &Relation, actor_id: &str, target_id: &str) -> Result<Toggle> {
    let Relation {
        table,
        actor_col,
        target_col,
        counter_table,
        counter_col,
    } = rel;
    let exists: Option<i64> = conn
        .query_row(
            &format!("SELECT 1 FROM {table} WHERE {actor_col} = ?1 AND {target_col} = ?2"),
            params![actor_id, target_id],
            |r| r.get(0),
        )
        .optional()?;
    let delta = if exists.is_some() {
        conn.execute(
            &format!("DELETE FROM {table} WHERE {actor_col} = ?1 AND {target_col} = ?2"),
            params![actor_id, target_id],
        )?;
        -1
    } else {
        conn.execute(
            &format!("INSERT INTO {table}({actor_col}, {target_col}, created_at_ms) VALUES (?1, ?2, ?3)"),
            params![actor_id, target_id, now_ms()],
        )?;
        1
    };
    conn.execute(
        &format!("UPDATE {counter_table} SET {counter_col} = {counter_col} + ?2 WHERE id = ?1"),
        params![target_id, delta],
    )?;
    let count: i64 = conn.query_row(
        &format!("SELECT {counter_col} FROM {counter_table} WHERE id = ?1"),
        params![target_id],
        |r| r.get(0),
    )?;
    Ok(Toggle {
        active: exists.is_none(),
        count,
    })
}

fn ensure_story_public(conn: &Connection, story_id: &str) -> Result<()> {
    let published: Option<bool> = conn
        .query_row(
            "SELECT is_published FROM stories WHERE id = ?1",
            params![story_id],
            |r| r.get(0),
        )
        .optional()?;
    match published {
        Some(true) => Ok(()),
        _ => Err(Error::not_found("Story not found")),
    }
}

impl StoryDb {
    pub fn toggle_story_like(&self, actor: &Actor, story_id: &str) -> Result<Toggle> {
        let out = self.write(|tx| {
            ensure_story_public(tx, story_id)?;
            toggle_relation(tx, &STORY_LIKES, &actor.id, story_id)
        })?;
        debug!(story = %story_id, user = %actor.username, liked = out.active, count = out.count, "toggled story like");
        Ok(out)
    }

    pub fn toggle_story_bookmark(&self, actor: &Actor, story_id: &str) -> Result<Toggle> {
        let out = self.write(|tx| {
            ensure_story_public(tx, story_id)?;
            toggle_relation(tx, &STORY_BOOKMARKS, &actor.id, story_id)
        })?;
        debug!(story = %story_id, user = %actor.username, bookmarked = out.active, "toggled bookmark");
        Ok(out)
    }

    pub fn toggle_comment_like(&self, actor: &Actor, comment_id: &str) -> Result<Toggle> {
        let out = self.write(|tx| {
            let published: Option<bool> = tx
                .query_row(
                    "SELECT s.is_published FROM comments c JOIN stories s ON s.id = c.story_id WHERE c.id = ?1",
                    params![comment_id],
                    |r| r.get(0),
                )
                .optional()?;
            if published != Some(true) {
                return Err(Error::not_found("Comment not found"));
            }
            toggle_relation(tx, &COMMENT_LIKES, &actor.id, comment_id)
        })?;
        debug!(comment = %comment_id, user = %actor.username, liked = out.active, "toggled comment like");
        Ok(out)
    }

    /// Follows or unfollows `username`. Both sides' counters move together.
    pub fn toggle_follow(&self, actor: &Actor, username: &str) -> Result<FollowToggle> {
        let out = self.write(|tx| {
            let target_id = user_id_by_username(tx, username.trim())?
                .ok_or_else(|| Error::not_found("User not found"))?;
            if target_id == actor.id {
                return Err(Error::validation("You cannot follow yourself"));
            }
            let t = toggle_relation(tx, &FOLLOWS, &actor.id, &target_id)?;
            let delta: i64 = if t.active { 1 } else { -1 };
            tx.execute(
                "UPDATE users SET following_count = following_count + ?2 WHERE id = ?1",
                params![actor.id, delta],
            )?;
            let following_count: i64 = tx.query_row(
                "SELECT following_count FROM users WHERE id = ?1",
                params![actor.id],
                |r| r.get(0),
            )?;
            Ok(FollowToggle {
                following: t.active,
                follower_count: t.count,
                following_count,
            })
        })?;
        debug!(user = %actor.username, target = %username, following = out.following, "toggled follow");
        Ok(out)
    }

    /// Recomputes every denormalized counter from its relation rows and
    /// returns how many rows were off.
    pub fn reconcile_counters(&self) -> Result<u64> {
        const FIXES: &[(&str, &str, &str)] = &[
            ("stories", "like_count", "SELECT COUNT(*) FROM story_likes x WHERE x.story_id = stories.id"),
            ("stories", "bookmark_count", "SELECT COUNT(*) FROM story_bookmarks x WHERE x.story_id = stories.id"),
            ("stories", "comment_count", "SELECT COUNT(*) FROM comments x WHERE x.story_id = stories.id"),
            ("comments", "like_count", "SELECT COUNT(*) FROM comment_likes x WHERE x.comment_id = comments.id"),
            ("users", "follower_count", "SELECT COUNT(*) FROM follows x WHERE x.followee_id = users.id"),
            ("users", "following_count", "SELECT COUNT(*) FROM follows x WHERE x.follower_id = users.id"),
        ];
        self.write(|tx| {
            let mut corrected = 0u64;
            for (table, col, count_sql) in FIXES {
                let n = tx.execute(
                    &format!("UPDATE {table} SET {col} = ({count_sql}) WHERE {col} <> ({count_sql})"),
                    [],
                )?;
                if n > 0 {
                    debug!(table = %table, column = %col, rows = n, "reconciled counter");
                }
                corrected = corrected.saturating_add(n as u64);
            }
            Ok(corrected)
        })
    }
}

/*
 * SPDX-FileCopyrightText: 2026 Nivriti Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Chapters and the owner-only bulk operations scoped to one story.

use crate::db::{new_id, now_ms, StoryDb};
use crate::error::{Error, Result};
use crate::model::{Actor, Chapter};
use crate::stories::{clean_title, load_story, visible_to};
use nivriti_protocol::{BulkAction, StoryType};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashSet;
use tracing::debug;

const CHAPTER_COLUMNS: &str =
    "id, story_id, title, content, order_index, is_published, created_at_ms, updated_at_ms";

fn map_chapter(r: &Row<'_>) -> rusqlite::Result<Chapter> {
    Ok(Chapter {
        id: r.get(0)?,
        story_id: r.get(1)?,
        title: r.get(2)?,
        content: r.get(3)?,
        order_index: r.get(4)?,
        is_published: r.get(5)?,
        created_at_ms: r.get(6)?,
        updated_at_ms: r.get(7)?,
    })
}

/// The parts of a story an ownership-gated operation needs.
pub(crate) struct OwnedStory {
    pub(crate) story_type: StoryType,
}

/// Returns the story only when `actor` wrote it. A missing story and someone
/// else's story produce the same error.
pub(crate) fn owned_story(conn: &Connection, actor: &Actor, story_id: &str) -> Result<OwnedStory> {
    let story_type: Option<String> = conn
        .query_row(
            "SELECT story_type FROM stories WHERE id = ?1 AND author_id = ?2",
            params![story_id, actor.id],
            |r| r.get(0),
        )
        .optional()?;
    let story_type = story_type.ok_or_else(|| Error::not_found("Story not found"))?;
    Ok(OwnedStory {
        story_type: story_type.parse::<StoryType>().unwrap_or_default(),
    })
}

fn chapter_ids(conn: &Connection, story_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT id FROM chapters WHERE story_id = ?1 ORDER BY order_index, created_at_ms")?;
    let ids = stmt
        .query_map(params![story_id], |r| r.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(ids)
}

fn all_chapters(conn: &Connection, story_id: &str, published_only: bool) -> Result<Vec<Chapter>> {
    let filter = if published_only { " AND is_published = 1" } else { "" };
    let mut stmt = conn.prepare(&format!(
        "SELECT {CHAPTER_COLUMNS} FROM chapters WHERE story_id = ?1{filter} ORDER BY order_index, created_at_ms"
    ))?;
    let rows = stmt
        .query_map(params![story_id], map_chapter)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn mark_story_published(conn: &Connection, story_id: &str, now: i64) -> Result<()> {
    conn.execute(
        r#"
        UPDATE stories
        SET is_published = 1, published_at_ms = COALESCE(published_at_ms, ?2), updated_at_ms = ?2
        WHERE id = ?1
        "#,
        params![story_id, now],
    )?;
    Ok(())
}

fn touch_story(conn: &Connection, story_id: &str, now: i64) -> Result<()> {
    conn.execute(
        "UPDATE stories SET updated_at_ms = ?2 WHERE id = ?1",
        params![story_id, now],
    )?;
    Ok(())
}

impl StoryDb {
    pub fn create_chapter(&self, actor: &Actor, story_id: &str, title: &str, content: &str) -> Result<Chapter> {
        let title = clean_title(title)?;
        let id = new_id();
        let now = now_ms();
        let chapter = self.write(|tx| {
            owned_story(tx, actor, story_id)?;
            let next: i64 = tx.query_row(
                "SELECT COALESCE(MAX(order_index) + 1, 0) FROM chapters WHERE story_id = ?1",
                params![story_id],
                |r| r.get(0),
            )?;
            tx.execute(
                r#"
                INSERT INTO chapters(id, story_id, title, content, order_index, is_published, created_at_ms, updated_at_ms)
                VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6)
                "#,
                params![id, story_id, title, content, next, now],
            )?;
            touch_story(tx, story_id, now)?;
            Ok(tx.query_row(
                &format!("SELECT {CHAPTER_COLUMNS} FROM chapters WHERE id = ?1"),
                params![id],
                map_chapter,
            )?)
        })?;
        debug!(story = %story_id, chapter = %chapter.id, index = chapter.order_index, "created chapter");
        Ok(chapter)
    }

    /// Authors see every chapter; readers see published chapters of a
    /// published story.
    pub fn list_chapters(&self, viewer: Option<&Actor>, story_id: &str) -> Result<Vec<Chapter>> {
        let conn = self.conn()?;
        let story = load_story(&conn, story_id)?
            .filter(|s| visible_to(s, viewer))
            .ok_or_else(|| Error::not_found("Story not found"))?;
        let is_author = viewer.is_some_and(|v| v.id == story.author_id);
        all_chapters(&conn, story_id, !is_author)
    }

    /// Assigns `order_index = position` to each chapter. The list must name
    /// every chapter of the story exactly once.
    pub fn reorder_chapters(&self, actor: &Actor, story_id: &str, ordered_ids: &[String]) -> Result<Vec<Chapter>> {
        let now = now_ms();
        let chapters = self.write(|tx| {
            owned_story(tx, actor, story_id)?;
            let existing: HashSet<String> = chapter_ids(tx, story_id)?.into_iter().collect();
            let supplied: HashSet<&str> = ordered_ids.iter().map(String::as_str).collect();
            if supplied.len() != ordered_ids.len() {
                return Err(Error::validation("Chapter ids must not repeat"));
            }
            if supplied.len() != existing.len() || !existing.iter().all(|id| supplied.contains(id.as_str())) {
                return Err(Error::validation(
                    "Chapter ids must match the story's chapters exactly",
                ));
            }
            let mut stmt = tx.prepare(
                "UPDATE chapters SET order_index = ?3, updated_at_ms = ?4 WHERE id = ?1 AND story_id = ?2",
            )?;
            for (index, id) in ordered_ids.iter().enumerate() {
                stmt.execute(params![id, story_id, index as i64, now])?;
            }
            drop(stmt);
            touch_story(tx, story_id, now)?;
            all_chapters(tx, story_id, false)
        })?;
        debug!(story = %story_id, chapters = chapters.len(), "reordered chapters");
        Ok(chapters)
    }

    /// Applies `action` to the listed chapters, or to every chapter of the
    /// story when `ids` is `None`. Returns the number of chapters touched.
    pub fn bulk_chapters(
        &self,
        actor: &Actor,
        story_id: &str,
        action: BulkAction,
        ids: Option<&[String]>,
        is_published: Option<bool>,
    ) -> Result<u64> {
        let publish_flag = match action {
            BulkAction::Publish => Some(true),
            BulkAction::Unpublish => Some(false),
            BulkAction::SetPublished => Some(
                is_published.ok_or_else(|| Error::validation("isPublished is required for setPublished"))?,
            ),
            BulkAction::Delete => None,
        };
        if ids.is_some_and(|v| v.is_empty()) {
            return Err(Error::validation("No chapters selected"));
        }
        let now = now_ms();
        let affected = self.write(|tx| {
            let story = owned_story(tx, actor, story_id)?;
            let existing = chapter_ids(tx, story_id)?;
            let targets: Vec<String> = match ids {
                None => existing.clone(),
                Some(list) => {
                    let known: HashSet<&str> = existing.iter().map(String::as_str).collect();
                    let mut seen = HashSet::new();
                    let mut out = Vec::with_capacity(list.len());
                    for id in list {
                        if !known.contains(id.as_str()) {
                            return Err(Error::validation(format!("Chapter {id} does not belong to this story")));
                        }
                        if seen.insert(id.as_str()) {
                            out.push(id.clone());
                        }
                    }
                    out
                }
            };

            match publish_flag {
                Some(flag) => {
                    if flag && story.story_type == StoryType::Multi && existing.is_empty() {
                        return Err(Error::validation("Cannot publish a story without chapters"));
                    }
                    let mut stmt = tx.prepare(
                        "UPDATE chapters SET is_published = ?3, updated_at_ms = ?4 WHERE id = ?1 AND story_id = ?2",
                    )?;
                    for id in &targets {
                        stmt.execute(params![id, story_id, flag, now])?;
                    }
                    drop(stmt);
                    if flag {
                        mark_story_published(tx, story_id, now)?;
                    } else {
                        touch_story(tx, story_id, now)?;
                    }
                }
                None => {
                    let mut removed_comments = 0usize;
                    for id in &targets {
                        tx.execute(
                            "DELETE FROM comment_likes WHERE comment_id IN (SELECT id FROM comments WHERE chapter_id = ?1)",
                            params![id],
                        )?;
                        removed_comments += tx.execute("DELETE FROM comments WHERE chapter_id = ?1", params![id])?;
                        tx.execute("DELETE FROM chapters WHERE id = ?1 AND story_id = ?2", params![id, story_id])?;
                    }
                    tx.execute(
                        "UPDATE stories SET comment_count = comment_count - ?2, updated_at_ms = ?3 WHERE id = ?1",
                        params![story_id, removed_comments as i64, now],
                    )?;
                    // Close the gaps left behind.
                    let remaining = chapter_ids(tx, story_id)?;
                    let mut stmt = tx.prepare("UPDATE chapters SET order_index = ?2 WHERE id = ?1")?;
                    for (index, id) in remaining.iter().enumerate() {
                        stmt.execute(params![id, index as i64])?;
                    }
                    drop(stmt);
                    // A multi story cannot stay public with nothing to read.
                    if story.story_type == StoryType::Multi && remaining.is_empty() {
                        tx.execute("UPDATE stories SET is_published = 0 WHERE id = ?1", params![story_id])?;
                    }
                }
            }
            Ok(targets.len() as u64)
        })?;
        debug!(story = %story_id, action = ?action, affected, "bulk chapter update");
        Ok(affected)
    }

    /// Publishes or unpublishes a story. Publishing a multi-chapter story
    /// needs at least one chapter; `publish_chapters` also flips every
    /// chapter on.
    pub fn publish_story(&self, actor: &Actor, story_id: &str, publish: bool, publish_chapters: bool) -> Result<bool> {
        let now = now_ms();
        self.write(|tx| {
            let story = owned_story(tx, actor, story_id)?;
            if !publish {
                tx.execute(
                    "UPDATE stories SET is_published = 0, updated_at_ms = ?2 WHERE id = ?1",
                    params![story_id, now],
                )?;
                return Ok(());
            }
            let chapters: i64 = tx.query_row(
                "SELECT COUNT(*) FROM chapters WHERE story_id = ?1",
                params![story_id],
                |r| r.get(0),
            )?;
            if story.story_type == StoryType::Multi && chapters == 0 {
                return Err(Error::validation("Cannot publish a story without chapters"));
            }
            mark_story_published(tx, story_id, now)?;
            if publish_chapters {
                tx.execute(
                    "UPDATE chapters SET is_published = 1, updated_at_ms = ?2 WHERE story_id = ?1",
                    params![story_id, now],
                )?;
            }
            Ok(())
        })?;
        debug!(story = %story_id, publish, publish_chapters, "publish state changed");
        Ok(publish)
    }
}

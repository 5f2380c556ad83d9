/*
 * SPDX-FileCopyrightText: 2026 Nivriti Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::db::{new_id, now_ms, StoryDb};
use crate::error::{Error, Result};
use crate::model::{Actor, Comment};
use crate::stories::{load_story, visible_to};
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

const MAX_COMMENT_LEN: usize = 5_000;

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.story_id, c.chapter_id, c.author_id, u.username, c.content, c.like_count, c.created_at_ms
    FROM comments c JOIN users u ON u.id = c.author_id
"#;

fn map_comment(r: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: r.get(0)?,
        story_id: r.get(1)?,
        chapter_id: r.get(2)?,
        author_id: r.get(3)?,
        author_username: r.get(4)?,
        content: r.get(5)?,
        like_count: r.get(6)?,
        created_at_ms: r.get(7)?,
    })
}

impl StoryDb {
    pub fn add_comment(
        &self,
        actor: &Actor,
        story_id: &str,
        chapter_id: Option<&str>,
        content: &str,
    ) -> Result<Comment> {
        let content = content.trim();
        if content.is_empty() {
            return Err(Error::validation("Comment content is required"));
        }
        if content.chars().count() > MAX_COMMENT_LEN {
            return Err(Error::validation(format!(
                "Comment must be at most {MAX_COMMENT_LEN} characters"
            )));
        }
        let id = new_id();
        let now = now_ms();
        let comment = self.write(|tx| {
            let story = load_story(tx, story_id)?
                .filter(|s| visible_to(s, Some(actor)))
                .ok_or_else(|| Error::not_found("Story not found"))?;
            if let Some(chapter_id) = chapter_id {
                let published: Option<bool> = tx
                    .query_row(
                        "SELECT is_published FROM chapters WHERE id = ?1 AND story_id = ?2",
                        params![chapter_id, story_id],
                        |r| r.get(0),
                    )
                    .optional()?;
                let visible = match published {
                    Some(p) => p || story.author_id == actor.id,
                    None => false,
                };
                if !visible {
                    return Err(Error::not_found("Chapter not found"));
                }
            }
            tx.execute(
                r#"
                INSERT INTO comments(id, story_id, chapter_id, author_id, content, like_count, created_at_ms)
                VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
                "#,
                params![id, story_id, chapter_id, actor.id, content, now],
            )?;
            tx.execute(
                "UPDATE stories SET comment_count = comment_count + 1 WHERE id = ?1",
                params![story_id],
            )?;
            Ok(tx.query_row(&format!("{COMMENT_SELECT} WHERE c.id = ?1"), params![id], map_comment)?)
        })?;
        debug!(story = %story_id, comment = %comment.id, "added comment");
        Ok(comment)
    }

    pub fn list_comments(&self, viewer: Option<&Actor>, story_id: &str) -> Result<Vec<Comment>> {
        let conn = self.conn()?;
        let story = load_story(&conn, story_id)?
            .filter(|s| visible_to(s, viewer))
            .ok_or_else(|| Error::not_found("Story not found"))?;
        let is_author = viewer.is_some_and(|v| v.id == story.author_id);
        // Readers only see comments on chapters they can see.
        let chapter_filter = if is_author {
            ""
        } else {
            "AND (c.chapter_id IS NULL OR EXISTS \
             (SELECT 1 FROM chapters ch WHERE ch.id = c.chapter_id AND ch.is_published = 1))"
        };
        let mut stmt = conn.prepare(&format!(
            "{COMMENT_SELECT} WHERE c.story_id = ?1 {chapter_filter} ORDER BY c.created_at_ms, c.id"
        ))?;
        let rows = stmt
            .query_map(params![story_id], map_comment)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// The comment's author or the story's author may delete it.
    pub fn delete_comment(&self, actor: &Actor, comment_id: &str) -> Result<()> {
        self.write(|tx| {
            let row: Option<(String, String, String)> = tx
                .query_row(
                    r#"
                    SELECT c.author_id, c.story_id, s.author_id
                    FROM comments c JOIN stories s ON s.id = c.story_id
                    WHERE c.id = ?1
                    "#,
                    params![comment_id],
                    |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
                )
                .optional()?;
            let Some((comment_author, story_id, story_author)) = row else {
                return Err(Error::not_found("Comment not found"));
            };
            if actor.id != comment_author && actor.id != story_author {
                return Err(Error::not_found("Comment not found"));
            }
            tx.execute("DELETE FROM comment_likes WHERE comment_id = ?1", params![comment_id])?;
            tx.execute("DELETE FROM comments WHERE id = ?1", params![comment_id])?;
            tx.execute(
                "UPDATE stories SET comment_count = comment_count - 1 WHERE id = ?1",
                params![story_id],
            )?;
            Ok(())
        })?;
        debug!(comment = %comment_id, user = %actor.username, "deleted comment");
        Ok(())
    }
}

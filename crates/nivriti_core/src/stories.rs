/*
 * SPDX-FileCopyrightText: 2026 Nivriti Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::db::{new_id, now_ms, StoryDb};
use crate::error::{Error, Result};
use crate::model::{Actor, Story, StoryView};
use nivriti_protocol::StoryType;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

pub const MAX_TITLE_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 5_000;

pub(crate) const STORY_SELECT: &str = r#"
    SELECT s.id, s.author_id, u.username, s.title, s.description, s.story_type,
           s.is_published, s.published_at_ms, s.like_count, s.bookmark_count, s.comment_count,
           (SELECT COUNT(*) FROM chapters c WHERE c.story_id = s.id),
           s.created_at_ms, s.updated_at_ms
    FROM stories s JOIN users u ON u.id = s.author_id
"#;

pub(crate) fn map_story(r: &Row<'_>) -> rusqlite::Result<Story> {
    let story_type: String = r.get(5)?;
    Ok(Story {
        id: r.get(0)?,
        author_id: r.get(1)?,
        author_username: r.get(2)?,
        title: r.get(3)?,
        description: r.get(4)?,
        story_type: story_type.parse::<StoryType>().unwrap_or_default(),
        is_published: r.get(6)?,
        published_at_ms: r.get(7)?,
        like_count: r.get(8)?,
        bookmark_count: r.get(9)?,
        comment_count: r.get(10)?,
        chapter_count: r.get(11)?,
        created_at_ms: r.get(12)?,
        updated_at_ms: r.get(13)?,
    })
}

pub(crate) fn load_story(conn: &Connection, story_id: &str) -> Result<Option<Story>> {
    Ok(conn
        .query_row(&format!("{STORY_SELECT} WHERE s.id = ?1"), params![story_id], map_story)
        .optional()?)
}

/// Visibility rule shared by stories, chapters and comments: drafts exist
/// only for their author.
pub(crate) fn visible_to(story: &Story, viewer: Option<&Actor>) -> bool {
    story.is_published || viewer.is_some_and(|v| v.id == story.author_id)
}

pub(crate) fn clean_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::validation("Title is required"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(Error::validation(format!("Title must be at most {MAX_TITLE_LEN} characters")));
    }
    Ok(title.to_string())
}

impl StoryDb {
    pub fn create_story(
        &self,
        actor: &Actor,
        title: &str,
        description: Option<&str>,
        story_type: StoryType,
    ) -> Result<Story> {
        let title = clean_title(title)?;
        let description = description.map(str::trim).filter(|s| !s.is_empty());
        if description.is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LEN) {
            return Err(Error::validation("Description is too long"));
        }
        let id = new_id();
        let now = now_ms();
        let story = self.write(|tx| {
            tx.execute(
                r#"
                INSERT INTO stories(id, author_id, title, description, story_type, created_at_ms, updated_at_ms)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                "#,
                params![id, actor.id, title, description, story_type.as_str(), now],
            )?;
            load_story(tx, &id)?.ok_or_else(|| Error::Internal(anyhow::anyhow!("story vanished after insert")))
        })?;
        debug!(story = %story.id, author = %actor.username, "created story");
        Ok(story)
    }

    pub fn get_story(&self, viewer: Option<&Actor>, story_id: &str) -> Result<StoryView> {
        let conn = self.conn()?;
        let story = load_story(&conn, story_id)?
            .filter(|s| visible_to(s, viewer))
            .ok_or_else(|| Error::not_found("Story not found"))?;
        let (liked, bookmarked) = match viewer {
            Some(v) => (
                relation_exists(&conn, "story_likes", &v.id, story_id)?,
                relation_exists(&conn, "story_bookmarks", &v.id, story_id)?,
            ),
            None => (false, false),
        };
        Ok(StoryView { story, liked, bookmarked })
    }

    /// Stories the actor bookmarked, newest bookmark first. Stories that went
    /// back to draft stay hidden unless the actor wrote them.
    pub fn list_bookmarks(&self, actor: &Actor) -> Result<Vec<Story>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "{STORY_SELECT} JOIN story_bookmarks b ON b.story_id = s.id \
             WHERE b.user_id = ?1 AND (s.is_published = 1 OR s.author_id = ?1) \
             ORDER BY b.created_at_ms DESC, s.id"
        ))?;
        let rows = stmt
            .query_map(params![actor.id], map_story)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

fn relation_exists(conn: &Connection, table: &str, user_id: &str, story_id: &str) -> Result<bool> {
    let v: Option<i64> = conn
        .query_row(
            &format!("SELECT 1 FROM {table} WHERE user_id = ?1 AND story_id = ?2"),
            params![user_id, story_id],
            |r| r.get(0),
        )
        .optional()?;
    Ok(v.is_some())
}

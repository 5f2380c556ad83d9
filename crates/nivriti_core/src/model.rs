/*
 * SPDX-FileCopyrightText: 2026 Nivriti Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use nivriti_protocol::StoryType;
use serde::Serialize;

/// Authenticated principal. Built only by `StoryDb::authenticate` and passed
/// explicitly into every operation that acts on someone's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub follower_count: i64,
    pub following_count: i64,
    pub story_count: i64,
    pub created_at_ms: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: String,
    pub author_id: String,
    pub author_username: String,
    pub title: String,
    pub description: Option<String>,
    pub story_type: StoryType,
    pub is_published: bool,
    pub published_at_ms: Option<i64>,
    pub like_count: i64,
    pub bookmark_count: i64,
    pub comment_count: i64,
    pub chapter_count: i64,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

/// A story as seen by a particular viewer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryView {
    #[serde(flatten)]
    pub story: Story,
    pub liked: bool,
    pub bookmarked: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: String,
    pub story_id: String,
    pub title: String,
    pub content: String,
    pub order_index: i64,
    pub is_published: bool,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub story_id: String,
    pub chapter_id: Option<String>,
    pub author_id: String,
    pub author_username: String,
    pub content: String,
    pub like_count: i64,
    pub created_at_ms: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Debug, Clone, Default)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub completed: Option<bool>,
}

/// Outcome of a relation toggle: whether the relation now exists, and the
/// target's counter after the change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toggle {
    pub active: bool,
    pub count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowToggle {
    pub following: bool,
    pub follower_count: i64,
    pub following_count: i64,
}

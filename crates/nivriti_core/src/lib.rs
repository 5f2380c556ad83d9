/*
 * SPDX-FileCopyrightText: 2026 Nivriti Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

pub mod chapters;
pub mod comments;
pub mod db;
pub mod error;
pub mod model;
pub mod social;
pub mod stories;
pub mod todos;
pub mod users;

pub use db::{token_hash_hex, DbOptions, StoryDb};
pub use error::{Error, Result};
pub use model::{Actor, Chapter, Comment, FollowToggle, Profile, Story, StoryView, Todo, TodoPatch, Toggle};

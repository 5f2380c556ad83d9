/*
 * SPDX-FileCopyrightText: 2026 Nivriti Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

pub mod config;
pub mod error;
mod extract;
mod middleware;
mod routes;

use nivriti_core::StoryDb;
use std::sync::Arc;

pub use config::{load_config, ServerConfig};
pub use routes::router;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<ServerConfig>,
    pub db: StoryDb,
}

impl AppState {
    pub fn new(cfg: ServerConfig, db: StoryDb) -> Self {
        Self { cfg: Arc::new(cfg), db }
    }
}

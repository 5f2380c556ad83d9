/*
 * SPDX-FileCopyrightText: 2026 Nivriti Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use anyhow::{Context, Result};
use nivriti_core::DbOptions;
use std::{net::SocketAddr, path::PathBuf};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub db_path: PathBuf,
    pub db_busy_timeout_ms: u64,
    pub db_synchronous: String,
    pub admin_token: Option<String>,
    pub allow_self_register: bool,
    pub max_body_bytes: usize,
}

impl ServerConfig {
    /// Reads `NIVRITI_*` settings through `var`, so tests can feed a map
    /// instead of the process environment.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind = var("NIVRITI_BIND").unwrap_or_else(|| "0.0.0.0:8788".to_string());
        let bind: SocketAddr = bind
            .trim()
            .parse()
            .with_context(|| format!("NIVRITI_BIND invalid: {bind}"))?;
        let db_path = var("NIVRITI_DB")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "nivriti.db".to_string());
        let db_busy_timeout_ms = var("NIVRITI_DB_BUSY_TIMEOUT_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(5_000)
            .clamp(100, 60_000);
        let db_synchronous = var("NIVRITI_DB_SYNC")
            .map(|s| s.trim().to_ascii_uppercase())
            .filter(|s| matches!(s.as_str(), "OFF" | "NORMAL" | "FULL" | "EXTRA"))
            .unwrap_or_else(|| "NORMAL".to_string());
        let admin_token = var("NIVRITI_ADMIN_TOKEN")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let allow_self_register = var("NIVRITI_ALLOW_SELF_REGISTER")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(true);
        let max_body_bytes = var("NIVRITI_MAX_BODY_BYTES")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(1024 * 1024)
            .max(1024);
        Ok(Self {
            bind,
            db_path: PathBuf::from(db_path),
            db_busy_timeout_ms,
            db_synchronous,
            admin_token,
            allow_self_register,
            max_body_bytes,
        })
    }

    pub fn db_options(&self) -> DbOptions {
        DbOptions {
            busy_timeout_ms: self.db_busy_timeout_ms,
            synchronous: self.db_synchronous.clone(),
        }
    }
}

pub fn load_config() -> Result<ServerConfig> {
    ServerConfig::from_lookup(|k| std::env::var(k).ok())
}

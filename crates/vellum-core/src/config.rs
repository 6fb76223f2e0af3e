// SPDX-License-Identifier: MIT
//
// Application configuration. Resolved once at startup from defaults plus
// environment overrides; strategies receive values from here instead of
// reading the environment themselves.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    /// Port the HTTP server listens on.
    pub port: u16,
    /// Shared scratch directory for transient per-request artifacts.
    pub scratch_dir: PathBuf,
    /// Hard timeout for external conversion subprocesses, in seconds.
    pub conversion_timeout_secs: u64,
    /// Explicit path to the document-conversion binary; when unset the
    /// engine is probed from PATH at startup.
    pub soffice_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 8000,
            scratch_dir: std::env::temp_dir().join("vellum-uploads"),
            conversion_timeout_secs: 60,
            soffice_path: None,
        }
    }
}

impl AppConfig {
    /// Build a config from defaults, applying `VELLUM_*` environment
    /// overrides. Unparseable numeric values fall back to the default.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("VELLUM_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(port) = env_parse::<u16>("VELLUM_PORT") {
            config.port = port;
        }
        if let Ok(dir) = std::env::var("VELLUM_SCRATCH_DIR") {
            config.scratch_dir = PathBuf::from(dir);
        }
        if let Some(secs) = env_parse::<u64>("VELLUM_TIMEOUT_SECS") {
            config.conversion_timeout_secs = secs;
        }
        if let Ok(path) = std::env::var("VELLUM_SOFFICE") {
            config.soffice_path = Some(path);
        }

        config
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

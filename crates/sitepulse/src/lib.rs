//! `sitepulse` crate (library surface).
//!
//! The primary entrypoint for end users is the `sitepulse` binary. This module holds the pieces
//! the binary shares with its tests: the interactive session, the text/JSON renderers, and the
//! opt-in env-file loader.

pub use sitepulse_core as core;

pub mod report;
pub mod session;

use std::path::Path;

/// Load `KEY=VALUE` lines from `path` into the process environment.
///
/// Blank lines and `#` comments are skipped. Variables already present in the environment are
/// never overridden. Returns how many variables were set; values are never logged.
pub fn load_env_file(path: &Path) -> std::io::Result<usize> {
    let txt = std::fs::read_to_string(path)?;
    let mut set = 0usize;
    for raw in txt.lines() {
        let s = raw.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let Some((k, v)) = s.split_once('=') else {
            continue;
        };
        let k = k.trim();
        if k.is_empty() {
            continue;
        }
        if std::env::var_os(k).is_none() {
            std::env::set_var(k, v.trim());
            set += 1;
        }
    }
    Ok(set)
}

// src/config.rs
//! Runtime configuration: environment-driven knobs plus the sources file
//! that maps each supported source to its board type and slug.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::posting::Source;

const ENV_SOURCES_PATH: &str = "SOURCES_CONFIG_PATH";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Seconds between scheduled check cycles.
    pub check_interval_secs: u64,
    /// Per-source fetch timeout in seconds.
    pub fetch_timeout_secs: u64,
    /// Seconds between scheduler flush ticks (honors daily/weekly boundaries
    /// between cycles).
    pub flush_tick_secs: u64,
    pub digest_threshold: usize,
    pub digest_max_age_secs: i64,
    pub data_dir: PathBuf,
    pub bind_addr: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            check_interval_secs: env_parse("JOB_CHECK_INTERVAL_SECS", 7_200),
            fetch_timeout_secs: env_parse("FETCH_TIMEOUT_SECS", 60),
            flush_tick_secs: env_parse("FLUSH_TICK_SECS", 60),
            digest_threshold: env_parse("DIGEST_THRESHOLD", 10),
            digest_max_age_secs: env_parse("DIGEST_MAX_AGE_SECS", 24 * 3600),
            data_dir: PathBuf::from(
                std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            ),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string()),
        }
    }

    pub fn seen_path(&self) -> PathBuf {
        self.data_dir.join("seen_jobs.json")
    }

    pub fn prefs_path(&self) -> PathBuf {
        self.data_dir.join("user_preferences.json")
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardKind {
    Greenhouse,
    Lever,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoardEntry {
    pub source: Source,
    pub kind: BoardKind,
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub boards: Vec<BoardEntry>,
}

impl SourcesConfig {
    /// Built-in board mapping for the five supported sources.
    pub fn default_boards() -> Self {
        let gh = |source: Source, slug: &str| BoardEntry {
            source,
            kind: BoardKind::Greenhouse,
            slug: slug.to_string(),
        };
        Self {
            boards: vec![
                gh(Source::Discord, "discord"),
                gh(Source::Reddit, "reddit"),
                gh(Source::Cribl, "cribl"),
                gh(Source::Gitlab, "gitlab"),
                BoardEntry {
                    source: Source::Monarch,
                    kind: BoardKind::Lever,
                    slug: "monarchmoney".to_string(),
                },
            ],
        }
    }

    /// Load from an explicit path. Supports TOML or JSON formats.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading sources config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        Self::parse(&content, &ext)
    }

    /// Load using env var + fallbacks:
    /// 1) $SOURCES_CONFIG_PATH
    /// 2) config/sources.toml
    /// 3) config/sources.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_SOURCES_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("SOURCES_CONFIG_PATH points to non-existent path"));
        }
        let toml_p = PathBuf::from("config/sources.toml");
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        let json_p = PathBuf::from("config/sources.json");
        if json_p.exists() {
            return Self::load_from(&json_p);
        }
        Ok(Self::default_boards())
    }

    fn parse(content: &str, hint_ext: &str) -> Result<Self> {
        let try_toml = hint_ext == "toml" || content.contains("[[boards]]");
        if try_toml {
            if let Ok(v) = toml::from_str::<Self>(content) {
                return Ok(v);
            }
        }
        if let Ok(v) = serde_json::from_str::<Self>(content) {
            return Ok(v);
        }
        if !try_toml {
            if let Ok(v) = toml::from_str::<Self>(content) {
                return Ok(v);
            }
        }
        Err(anyhow!("unsupported sources config format"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    #[test]
    fn toml_and_json_formats_parse() {
        let toml_src = r#"
            [[boards]]
            source = "gitlab"
            kind = "greenhouse"
            slug = "gitlab"

            [[boards]]
            source = "monarch"
            kind = "lever"
            slug = "monarchmoney"
        "#;
        let cfg = SourcesConfig::parse(toml_src, "toml").unwrap();
        assert_eq!(cfg.boards.len(), 2);
        assert_eq!(cfg.boards[1].kind, BoardKind::Lever);

        let json_src = r#"{"boards":[{"source":"cribl","kind":"greenhouse","slug":"cribl"}]}"#;
        let cfg = SourcesConfig::parse(json_src, "json").unwrap();
        assert_eq!(cfg.boards[0].source, Source::Cribl);
    }

    #[test]
    fn default_boards_cover_every_source() {
        let cfg = SourcesConfig::default_boards();
        for s in Source::all() {
            assert!(cfg.boards.iter().any(|b| b.source == s));
        }
    }

    #[serial_test::serial]
    #[test]
    fn load_default_prefers_env_path() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("sources.json");
        fs::write(&p, r#"{"boards":[{"source":"gitlab","kind":"greenhouse","slug":"gl"}]}"#)
            .unwrap();

        env::set_var(ENV_SOURCES_PATH, p.display().to_string());
        let cfg = SourcesConfig::load_default().unwrap();
        env::remove_var(ENV_SOURCES_PATH);

        assert_eq!(cfg.boards.len(), 1);
        assert_eq!(cfg.boards[0].slug, "gl");
    }

    #[serial_test::serial]
    #[test]
    fn env_knobs_override_defaults() {
        env::set_var("JOB_CHECK_INTERVAL_SECS", "60");
        env::set_var("FETCH_TIMEOUT_SECS", "bogus");
        let cfg = AppConfig::from_env();
        env::remove_var("JOB_CHECK_INTERVAL_SECS");
        env::remove_var("FETCH_TIMEOUT_SECS");

        assert_eq!(cfg.check_interval_secs, 60);
        assert_eq!(cfg.fetch_timeout_secs, 60); // unparsable falls back
    }
}

// src/config/sources.rs
use anyhow::{anyhow, bail, Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::Source;

pub const ENV_SOURCES_PATH: &str = "MONITOR_SOURCES_PATH";
pub const DEFAULT_SOURCES_TOML: &str = "config/sources.toml";
pub const DEFAULT_SOURCES_JSON: &str = "config/sources.json";

/// Built-in source list used when no sources file exists.
pub fn default_sources() -> Vec<Source> {
    vec![Source::new("GitHub", "https://github.blog/changelog/")]
}

/// Load sources from an explicit path. Supports TOML (`[[sources]]`) or a JSON array.
pub fn load_sources_from(path: &Path) -> Result<Vec<Source>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading sources from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_sources(&content, ext.as_str())
        .with_context(|| format!("parsing sources from {}", path.display()))
}

/// Load sources using env var + fallbacks:
/// 1) $MONITOR_SOURCES_PATH
/// 2) config/sources.toml
/// 3) config/sources.json
/// 4) built-in default list
pub fn load_sources_default() -> Result<Vec<Source>> {
    if let Ok(p) = std::env::var(ENV_SOURCES_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_sources_from(&pb);
        }
        return Err(anyhow!("{ENV_SOURCES_PATH} points to non-existent path"));
    }
    for candidate in [DEFAULT_SOURCES_TOML, DEFAULT_SOURCES_JSON] {
        let p = PathBuf::from(candidate);
        if p.exists() {
            return load_sources_from(&p);
        }
    }
    Ok(default_sources())
}

fn parse_sources(s: &str, hint_ext: &str) -> Result<Vec<Source>> {
    let parsed = if hint_ext == "json" || s.trim_start().starts_with('[') {
        parse_json(s).or_else(|_| parse_toml(s))
    } else {
        parse_toml(s).or_else(|_| parse_json(s))
    };
    let sources = parsed.map_err(|_| anyhow!("unsupported sources format"))?;
    validate(clean(sources))
}

fn parse_toml(s: &str) -> Result<Vec<Source>> {
    #[derive(serde::Deserialize)]
    struct TomlSources {
        #[serde(default)]
        sources: Vec<Source>,
    }
    let v: TomlSources = toml::from_str(s)?;
    Ok(v.sources)
}

fn parse_json(s: &str) -> Result<Vec<Source>> {
    let v: Vec<Source> = serde_json::from_str(s)?;
    Ok(v)
}

fn clean(items: Vec<Source>) -> Vec<Source> {
    items
        .into_iter()
        .map(|s| Source {
            name: s.name.trim().to_string(),
            changelog: s.changelog.trim().to_string(),
            description: s
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
        })
        .collect()
}

fn validate(items: Vec<Source>) -> Result<Vec<Source>> {
    let mut seen = HashSet::new();
    for s in &items {
        if s.name.is_empty() || s.changelog.is_empty() {
            bail!("every source needs a name and a changelog URL");
        }
        if !seen.insert(s.name.clone()) {
            bail!("duplicate source name '{}'", s.name);
        }
    }
    Ok(items)
}

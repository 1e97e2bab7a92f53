use crate::check::CheckSettings;
use crate::level::CheckLevel;
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_ALIAS_SEARCH_LIMIT: usize = 8;
pub const DEFAULT_LOOP_PASSES: usize = 2;

#[derive(Debug, Default, Deserialize)]
pub struct RefStateConfig {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub checks: ChecksConfig,

    #[serde(default)]
    pub meta_state: Vec<MetaStateDecl>,
}

/// Tuning knobs for the bounded searches.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum structural recursion depth of alias queries.
    pub alias_search_limit: usize,
    /// Number of re-analysis passes over a loop body.
    pub loop_passes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            alias_search_limit: DEFAULT_ALIAS_SEARCH_LIMIT,
            loop_passes: DEFAULT_LOOP_PASSES,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ChecksConfig {
    #[serde(default)]
    pub disabled: Vec<String>,

    #[serde(flatten)]
    pub levels: HashMap<String, CheckLevel>,
}

/// Declaration of an auxiliary meta-state, see [`crate::meta_state`].
#[derive(Debug, Clone, Deserialize)]
pub struct MetaStateDecl {
    pub name: String,
    pub values: Vec<String>,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub transfers: Vec<TableEntryDecl>,
    #[serde(default)]
    pub merges: Vec<TableEntryDecl>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableEntryDecl {
    pub from: String,
    pub to: String,
    pub result: String,
    #[serde(default)]
    pub error: Option<String>,
}

impl RefStateConfig {
    pub fn check_settings(&self) -> CheckSettings {
        CheckSettings::default()
            .with_config_levels(self.checks.levels.clone())
            .disable(self.checks.disabled.iter().cloned())
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.engine.alias_search_limit > 0,
            "engine.alias_search_limit must be at least 1"
        );
        ensure!(
            self.engine.loop_passes > 0,
            "engine.loop_passes must be at least 1"
        );
        Ok(())
    }
}

pub const DEFAULT_CONFIG_FILE_NAME: &str = "refstate.toml";

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut cur = Some(start_dir);
    while let Some(dir) = cur {
        let candidate = dir.join(DEFAULT_CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        cur = dir.parent();
    }
    None
}

pub fn parse_config(raw: &str) -> Result<RefStateConfig> {
    let cfg: RefStateConfig = toml::from_str(raw).context("failed to parse config")?;
    cfg.validate()?;
    Ok(cfg)
}

pub fn load_config_file(path: &Path) -> Result<RefStateConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    parse_config(&raw).with_context(|| format!("invalid config file: {}", path.display()))
}

pub fn load_config(
    explicit_path: Option<&Path>,
    start_dir: &Path,
) -> Result<Option<(PathBuf, RefStateConfig)>> {
    if let Some(p) = explicit_path {
        let cfg = load_config_file(p)?;
        return Ok(Some((p.to_path_buf(), cfg)));
    }

    let Some(p) = find_config_file(start_dir) else {
        return Ok(None);
    };
    let cfg = load_config_file(&p)?;
    Ok(Some((p, cfg)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = parse_config("").expect("empty config parses");
        assert_eq!(cfg.engine.alias_search_limit, DEFAULT_ALIAS_SEARCH_LIMIT);
        assert_eq!(cfg.engine.loop_passes, DEFAULT_LOOP_PASSES);
        assert!(cfg.meta_state.is_empty());
    }

    #[test]
    fn zero_loop_passes_is_rejected() {
        let err = parse_config("[engine]\nloop_passes = 0\n").unwrap_err();
        assert!(format!("{err:#}").contains("loop_passes"));
    }
}

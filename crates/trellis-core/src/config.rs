use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::error::TrellisError;
use crate::store::{SiteContext, StoreRegistry};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrellisConfig {
    #[serde(default)]
    pub publish: PublishConfig,
    #[serde(default)]
    pub context: ContextConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Store that publish requests write into.
    #[serde(default = "default_target_store")]
    pub target_store: String,
    /// What `is_published` answers when the target store is not registered.
    #[serde(default)]
    pub unavailable_target: UnavailableTargetPolicy,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            target_store: default_target_store(),
            unavailable_target: UnavailableTargetPolicy::default(),
        }
    }
}

/// Answer given by `is_published` when the target store cannot be reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableTargetPolicy {
    /// Report the node as published.
    #[default]
    AssumePublished,
    /// Report the node as not published.
    AssumeUnpublished,
}

impl UnavailableTargetPolicy {
    #[must_use]
    pub const fn as_bool(self) -> bool {
        matches!(self, Self::AssumePublished)
    }
}

impl FromStr for UnavailableTargetPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "assume_published" | "published" => Ok(Self::AssumePublished),
            "assume_unpublished" | "unpublished" => Ok(Self::AssumeUnpublished),
            other => bail!("unknown unavailable-target policy '{other}'"),
        }
    }
}

/// Default site context: where the site root lives and which store to read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextConfig {
    #[serde(default)]
    pub root_path: Option<String>,
    #[serde(default)]
    pub store: Option<String>,
}

/// Load `.trellis/config.toml` under `project_root`, or defaults when the
/// file does not exist.
pub fn load_config(project_root: &Path) -> Result<TrellisConfig> {
    let path = project_root.join(".trellis/config.toml");
    if !path.exists() {
        return Ok(TrellisConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<TrellisConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load the project config and apply `TRELLIS_*` environment overrides.
///
/// # Errors
///
/// [`TrellisError::Config`] when the file cannot be read or parsed, or an
/// override holds an invalid value.
pub fn resolve_config(project_root: &Path) -> Result<TrellisConfig, TrellisError> {
    load_config(project_root)
        .and_then(|config| apply_env_overrides(config, |key| std::env::var(key).ok()))
        .map_err(TrellisError::Config)
}

/// Apply overrides from `lookup`:
///
/// - `TRELLIS_TARGET_STORE` replaces `[publish] target_store`
/// - `TRELLIS_UNAVAILABLE_TARGET` replaces `[publish] unavailable_target`
/// - `TRELLIS_SITE_ROOT` replaces `[context] root_path`
pub fn apply_env_overrides(
    mut config: TrellisConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<TrellisConfig> {
    if let Some(target) = lookup("TRELLIS_TARGET_STORE").filter(|v| !v.trim().is_empty()) {
        config.publish.target_store = target.trim().to_string();
    }
    if let Some(policy) = lookup("TRELLIS_UNAVAILABLE_TARGET") {
        config.publish.unavailable_target = policy
            .parse()
            .context("Invalid TRELLIS_UNAVAILABLE_TARGET")?;
    }
    if let Some(root) = lookup("TRELLIS_SITE_ROOT").filter(|v| !v.trim().is_empty()) {
        config.context.root_path = Some(root);
    }
    Ok(config)
}

/// Build a [`SiteContext`] from config. Unset entries stay unset; the
/// operations that need them report the gap.
///
/// # Errors
///
/// [`TrellisError::StoreNotFound`] when a store is named but not registered.
pub fn resolve_site_context(
    config: &ContextConfig,
    registry: &dyn StoreRegistry,
) -> Result<SiteContext, TrellisError> {
    let store = match config.store.as_deref() {
        Some(name) => Some(
            registry
                .get_store_by_name(name)
                .ok_or_else(|| TrellisError::StoreNotFound(name.to_string()))?,
        ),
        None => None,
    };

    Ok(SiteContext {
        root_path: config.root_path.clone(),
        store,
    })
}

fn default_target_store() -> String {
    "web".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryRegistry, MemoryStore};
    use crate::store::ContextService;
    use std::collections::HashMap;

    fn write_config(root: &Path, content: &str) {
        let dir = root.join(".trellis");
        std::fs::create_dir_all(&dir).expect("create config dir");
        std::fs::write(dir.join("config.toml"), content).expect("write config");
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_config_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(dir.path()).expect("load should succeed");
        assert_eq!(cfg.publish.target_store, "web");
        assert_eq!(
            cfg.publish.unavailable_target,
            UnavailableTargetPolicy::AssumePublished
        );
        assert!(cfg.context.root_path.is_none());
    }

    #[test]
    fn parses_full_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_config(
            dir.path(),
            r#"
[publish]
target_store = "live"
unavailable_target = "assume_unpublished"

[context]
root_path = "/sitecore/content/home"
store = "master"
"#,
        );

        let cfg = load_config(dir.path()).expect("load should succeed");
        assert_eq!(cfg.publish.target_store, "live");
        assert_eq!(
            cfg.publish.unavailable_target,
            UnavailableTargetPolicy::AssumeUnpublished
        );
        assert_eq!(cfg.context.root_path.as_deref(), Some("/sitecore/content/home"));
        assert_eq!(cfg.context.store.as_deref(), Some("master"));
    }

    #[test]
    fn partial_sections_fill_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_config(dir.path(), "[context]\nstore = \"master\"\n");
        let cfg = load_config(dir.path()).expect("load should succeed");
        assert_eq!(cfg.publish, PublishConfig::default());
        assert_eq!(cfg.context.store.as_deref(), Some("master"));
    }

    #[test]
    fn malformed_config_reports_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_config(dir.path(), "[publish\ntarget_store = ");
        let err = load_config(dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("config.toml"));
    }

    #[test]
    fn resolve_config_reports_parse_errors_with_code() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_config(dir.path(), "[publish]\ntarget_store = 42\n");
        let err = resolve_config(dir.path()).unwrap_err();
        assert!(matches!(err, TrellisError::Config(_)));
        assert_eq!(err.code(), crate::error::ErrorCode::ConfigParseError);
        assert!(err.hint().is_some());
    }

    #[test]
    fn env_overrides_win() {
        let cfg = apply_env_overrides(
            TrellisConfig::default(),
            env(&[
                ("TRELLIS_TARGET_STORE", " preview "),
                ("TRELLIS_UNAVAILABLE_TARGET", "unpublished"),
                ("TRELLIS_SITE_ROOT", "/sitecore/content/site-b"),
            ]),
        )
        .expect("overrides apply");
        assert_eq!(cfg.publish.target_store, "preview");
        assert_eq!(
            cfg.publish.unavailable_target,
            UnavailableTargetPolicy::AssumeUnpublished
        );
        assert_eq!(cfg.context.root_path.as_deref(), Some("/sitecore/content/site-b"));
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let cfg = apply_env_overrides(
            TrellisConfig::default(),
            env(&[("TRELLIS_TARGET_STORE", "")]),
        )
        .expect("overrides apply");
        assert_eq!(cfg.publish.target_store, "web");
    }

    #[test]
    fn invalid_policy_override_fails() {
        let err = apply_env_overrides(
            TrellisConfig::default(),
            env(&[("TRELLIS_UNAVAILABLE_TARGET", "maybe")]),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("maybe"));
    }

    #[test]
    fn site_context_resolves_named_store() {
        let registry = MemoryRegistry::new();
        registry.register(MemoryStore::new("master"));
        let cfg = ContextConfig {
            root_path: Some("/sitecore/content/home".to_string()),
            store: Some("master".to_string()),
        };
        let ctx = resolve_site_context(&cfg, &registry).expect("resolves");
        assert_eq!(ctx.root_path(), Some("/sitecore/content/home"));
        assert_eq!(ctx.store().map(|s| s.name().to_string()).as_deref(), Some("master"));
    }

    #[test]
    fn site_context_with_unknown_store_fails() {
        let registry = MemoryRegistry::new();
        let cfg = ContextConfig {
            root_path: None,
            store: Some("nope".to_string()),
        };
        let err = resolve_site_context(&cfg, &registry).unwrap_err();
        assert!(matches!(err, TrellisError::StoreNotFound(name) if name == "nope"));
    }

    #[test]
    fn site_context_without_store_stays_unset() {
        let registry = MemoryRegistry::new();
        let ctx = resolve_site_context(&ContextConfig::default(), &registry).expect("resolves");
        assert!(ctx.store().is_none());
        assert!(ctx.root_path().is_none());
    }
}

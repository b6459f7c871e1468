// SPDX-FileCopyrightText: 2026 Onebridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `./onebridge.toml` > `~/.config/onebridge/onebridge.toml` >
//! `/etc/onebridge/onebridge.toml`, with `ONEBRIDGE_` environment overrides on top.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::BridgeConfig;

/// File name looked up in every configuration directory.
pub const CONFIG_FILE_NAME: &str = "onebridge.toml";

const SYSTEM_CONFIG_PATH: &str = "/etc/onebridge/onebridge.toml";

/// Sections whose keys may be set through `ONEBRIDGE_<SECTION>_<KEY>`.
const ENV_SECTIONS: &[&str] = &["bridge", "onebot"];

/// Paths searched for configuration, lowest priority first.
pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(SYSTEM_CONFIG_PATH)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("onebridge").join(CONFIG_FILE_NAME));
    }
    paths.push(PathBuf::from(CONFIG_FILE_NAME));
    paths
}

/// Build the Figment used for the standard lookup (exposed for diagnostic use).
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. Each path from [`config_search_paths`]
/// 3. `ONEBRIDGE_*` environment variables
pub fn build_figment() -> Figment {
    let mut figment = Figment::new().merge(Serialized::defaults(BridgeConfig::default()));
    for path in config_search_paths() {
        tracing::trace!(path = %path.display(), "adding configuration source");
        figment = figment.merge(Toml::file(path));
    }
    figment.merge(env_provider())
}

/// Load configuration from the standard lookup hierarchy with env var overrides.
pub fn load_config() -> Result<BridgeConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from an inline TOML string only (no file lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<BridgeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BridgeConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one explicit file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<BridgeConfig, figment::Error> {
    tracing::debug!(path = %path.display(), "loading configuration from explicit path");
    Figment::new()
        .merge(Serialized::defaults(BridgeConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Environment provider mapping `ONEBRIDGE_ONEBOT_COMMAND_PREFIX` to
/// `onebot.command_prefix`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// keys that contain underscores keep them.
fn env_provider() -> Env {
    Env::prefixed("ONEBRIDGE_").map(|key| {
        let key_str = key.as_str();
        let mapped = ENV_SECTIONS
            .iter()
            .find_map(|section| {
                key_str
                    .strip_prefix(section)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|rest| format!("{section}.{rest}"))
            })
            .unwrap_or_else(|| key_str.to_string());
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_vars_map_to_sections() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("ONEBRIDGE_ONEBOT_COMMAND_PREFIX", "!");
            jail.set_env("ONEBRIDGE_ONEBOT_SEGMENT_DEBOUNCE_SECONDS", "2.5");
            jail.set_env("ONEBRIDGE_BRIDGE_LOG_LEVEL", "debug");

            let config: BridgeConfig = Figment::new()
                .merge(Serialized::defaults(BridgeConfig::default()))
                .merge(env_provider())
                .extract()?;

            assert_eq!(config.onebot.command_prefix, "!");
            assert_eq!(config.onebot.segment_debounce_seconds, 2.5);
            assert_eq!(config.bridge.log_level, "debug");
            Ok(())
        });
    }

    #[test]
    fn explicit_path_is_loaded() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "custom.toml",
                r#"
[onebot]
unique_session = true
"#,
            )?;
            let config = load_config_from_path(Path::new("custom.toml"))?;
            assert!(config.onebot.unique_session);
            Ok(())
        });
    }

    #[test]
    fn search_paths_end_with_local_file() {
        let paths = config_search_paths();
        assert_eq!(paths.first(), Some(&PathBuf::from(SYSTEM_CONFIG_PATH)));
        assert_eq!(paths.last(), Some(&PathBuf::from(CONFIG_FILE_NAME)));
    }
}

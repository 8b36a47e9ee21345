use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

use relay_core::{ProvidersConfig, RouterConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
    #[serde(default = "default_gateway_port")]
    pub port: u16,
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    8790
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_gateway_bind(),
            port: default_gateway_port(),
        }
    }
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".relay")
}

impl RelayConfig {
    pub fn load(custom_path: &Option<PathBuf>) -> Result<Self> {
        let path = custom_path
            .clone()
            .unwrap_or_else(|| config_dir().join("config.toml"));

        // The config may hold secrets; refuse group/other-readable files
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(metadata) = std::fs::metadata(&path) {
                let mode = metadata.permissions().mode();
                if mode & 0o077 != 0 {
                    return Err(anyhow::anyhow!(
                        "Config file {:?} has overly permissive permissions ({:o}). \
                         It may contain API keys. Fix with: chmod 600 {:?}",
                        path,
                        mode & 0o777,
                        path
                    ));
                }
            }
        }

        let content = std::fs::read_to_string(&path).with_context(|| {
            format!(
                "Failed to read config at {}. Run `relay init` first.",
                path.display()
            )
        })?;

        let expanded = expand_env_vars(&content);
        let config: Self = toml::from_str(&expanded)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;

        for (name, key) in [
            ("gemini", config.providers.gemini.as_ref().map(|p| &p.api_key)),
            ("grok", config.providers.grok.as_ref().map(|p| &p.api_key)),
        ] {
            if let Some(key) = key {
                if !key.is_empty() && content.contains(key.as_str()) {
                    warn!(
                        "{} API key is hardcoded in the config file. For security, \
                         use an environment variable placeholder instead.",
                        name
                    );
                }
            }
        }

        Ok(config)
    }

    /// Partitions whose key expanded to empty are disabled, not fatal:
    /// absence of a key kills the partition at startup, never a request.
    pub fn usable_providers(&self) -> ProvidersConfig {
        let mut providers = self.providers.clone();
        let mut prune = |name: &str, slot: &mut Option<relay_core::PartitionConfig>| {
            if slot.as_ref().is_some_and(|p| p.api_key.is_empty()) {
                warn!("No API key for {}; partition disabled", name);
                *slot = None;
            }
        };
        prune("gemini", &mut providers.gemini);
        prune("grok", &mut providers.grok);
        prune("huggingface", &mut providers.huggingface);
        prune("stability", &mut providers.stability);
        providers
    }
}

/// Allowlist of environment variable names that may be expanded in config
/// files, so a writable config cannot exfiltrate arbitrary env vars.
const ALLOWED_ENV_VARS: &[&str] = &[
    "GEMINI_API_KEY",
    "GOOGLE_AI_API_KEY",
    "XAI_API_KEY",
    "GROK_API_KEY",
    "HF_API_KEY",
    "HUGGINGFACE_API_KEY",
    "STABILITY_API_KEY",
    "HOME",
    "USER",
];

fn expand_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    let mut pos = 0;
    while pos < result.len() {
        if let Some(start) = result[pos..].find("${") {
            let abs_start = pos + start;
            if let Some(end) = result[abs_start..].find('}') {
                let var_name = result[abs_start + 2..abs_start + end].to_string();

                let value = if ALLOWED_ENV_VARS.contains(&var_name.as_str()) {
                    std::env::var(&var_name).unwrap_or_default()
                } else {
                    warn!(
                        "Skipping expansion of unrecognized env var '{}' in config (not in allowlist)",
                        var_name
                    );
                    pos = abs_start + end + 1;
                    continue;
                };

                let value_len = value.len();
                result = format!(
                    "{}{}{}",
                    &result[..abs_start],
                    value,
                    &result[abs_start + end + 1..]
                );
                pos = abs_start + value_len;
            } else {
                break;
            }
        } else {
            break;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::PartitionConfig;

    #[test]
    fn test_default_config_parses() {
        let raw = include_str!("../../../config/default.toml");
        let config: RelayConfig = toml::from_str(&expand_env_vars(raw)).unwrap();
        assert!(config.providers.gemini.is_some());
        assert_eq!(config.router.max_attempts, 5);
        assert_eq!(config.router.fallback_provider, "grok");
        assert_eq!(config.gateway.port, 8790);
    }

    #[cfg(unix)]
    fn write_config(dir: &tempfile::TempDir, mode: u32) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[providers.gemini]\napi_key = \"k\"\nchat_models = [\"gemini-2.0-flash\"]\n",
        )
        .unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    #[test]
    #[cfg(unix)]
    fn test_load_from_custom_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, 0o600);
        let config = RelayConfig::load(&Some(path)).unwrap();
        assert_eq!(
            config.providers.gemini.unwrap().chat_models,
            vec!["gemini-2.0-flash"]
        );
        assert_eq!(config.router.max_attempts, 5);
    }

    #[test]
    #[cfg(unix)]
    fn test_load_rejects_world_readable_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, 0o644);
        let err = RelayConfig::load(&Some(path)).unwrap_err();
        assert!(err.to_string().contains("permissions"));
    }

    #[test]
    fn test_expand_env_vars_allowlisted() {
        // HOME is in the allowlist and always set in test environments
        let expanded = expand_env_vars("path = \"${HOME}/x\"");
        assert!(!expanded.contains("${HOME}"));
    }

    #[test]
    fn test_expand_env_vars_rejects_unknown() {
        let expanded = expand_env_vars("key = \"${TOTALLY_UNKNOWN_VAR}\"");
        assert!(expanded.contains("${TOTALLY_UNKNOWN_VAR}"));
    }

    #[test]
    fn test_usable_providers_prunes_keyless() {
        let config = RelayConfig {
            providers: ProvidersConfig {
                gemini: Some(PartitionConfig {
                    api_key: "AIza-key".into(),
                    chat_models: vec!["gemini-2.0-flash".into()],
                    vision_models: vec![],
                    image_models: vec![],
                }),
                grok: Some(PartitionConfig {
                    api_key: String::new(),
                    chat_models: vec!["grok-2-latest".into()],
                    vision_models: vec![],
                    image_models: vec![],
                }),
                huggingface: None,
                stability: None,
            },
            router: RouterConfig::default(),
            gateway: GatewayConfig::default(),
        };
        let usable = config.usable_providers();
        assert!(usable.gemini.is_some());
        assert!(usable.grok.is_none());
    }
}

use anyhow::Context;
use directories::BaseDirs;
use qa_core::model::Model;
use serde::Deserialize;
use std::{fs, path::Path, path::PathBuf, time::Duration};
use tracing::{info, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Settings file layout. The API key is never read from here.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroqFileConfig {
    pub base_url: Option<String>,
    pub model: Option<Model>,
    pub timeout_ms: Option<u64>,
    pub stream_idle_timeout_ms: Option<u64>,
    pub proxy: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GroqConfig {
    pub base_url: String,
    pub model: Model,
    pub timeout: Duration,
    pub stream_idle_timeout: Duration,
    pub proxy: Option<String>,
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: Model::default(),
            timeout: Duration::from_millis(60_000),
            stream_idle_timeout: Duration::from_millis(120_000),
            proxy: None,
        }
    }
}

impl GroqConfig {
    /// Reads the user's config file, falling back to defaults when it is
    /// missing or unreadable.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        match Self::load_from(&path) {
            Ok(Some(cfg)) => {
                info!(target: "providers::groq", "loaded config from {}", path.display());
                cfg
            }
            Ok(None) => Self::default(),
            Err(e) => {
                warn!(target: "providers::groq", "ignoring config {}: {:#}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("read config file: {}", path.display()))?;
        Self::from_toml_str(&text).map(Some)
    }

    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let file_cfg: GroqFileConfig = toml::from_str(text).context("parse config toml")?;
        let mut cfg = Self::default();
        if let Some(u) = file_cfg.base_url {
            cfg.base_url = u;
        }
        if let Some(m) = file_cfg.model {
            cfg.model = m;
        }
        if let Some(t) = file_cfg.timeout_ms {
            cfg.timeout = Duration::from_millis(t);
        }
        if let Some(idle) = file_cfg.stream_idle_timeout_ms {
            cfg.stream_idle_timeout = Duration::from_millis(idle);
        }
        cfg.proxy = file_cfg.proxy;
        Ok(cfg)
    }

    pub fn config_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        let p = if cfg!(target_os = "windows") {
            base.home_dir().join(".qachat").join("config.toml")
        } else {
            base.config_dir().join("qachat").join("config.toml")
        };
        Some(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = GroqConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, GroqConfig::default());
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn file_values_override_defaults() {
        let cfg = GroqConfig::from_toml_str(
            r#"
base_url = "http://localhost:8080/v1"
model = "gemma2-9b-it"
timeout_ms = 5000
stream_idle_timeout_ms = 750
proxy = "http://proxy:3128"
"#,
        )
        .unwrap();
        assert_eq!(cfg.base_url, "http://localhost:8080/v1");
        assert_eq!(cfg.model, Model::Gemma2_9bIt);
        assert_eq!(cfg.timeout, Duration::from_millis(5000));
        assert_eq!(cfg.stream_idle_timeout, Duration::from_millis(750));
        assert_eq!(cfg.proxy.as_deref(), Some("http://proxy:3128"));
    }

    #[test]
    fn api_key_is_not_a_config_field() {
        assert!(GroqConfig::from_toml_str("api_key = \"gsk_x\"").is_err());
    }

    #[test]
    fn unknown_model_is_rejected() {
        assert!(GroqConfig::from_toml_str("model = \"gpt-5\"").is_err());
    }

    #[test]
    fn missing_file_is_none() {
        let p = std::env::temp_dir().join("qachat-missing-config-for-test.toml");
        assert!(GroqConfig::load_from(&p).unwrap().is_none());
    }
}

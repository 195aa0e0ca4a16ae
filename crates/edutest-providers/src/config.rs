//! Provider configuration and factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use edutest_core::traits::{FeedbackRequester, TestGenerator};

use crate::gemini::GeminiProvider;
use crate::mock::MockProvider;
use crate::openai::OpenAiProvider;

/// Configuration for a single AI provider.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Gemini {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
    },
    OpenAI {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        org_id: Option<String>,
    },
    /// Offline provider. `fail = true` makes every call fail and `delay_ms`
    /// holds each reply.
    Mock {
        #[serde(default)]
        feedback: Option<String>,
        #[serde(default)]
        fail: bool,
        #[serde(default)]
        delay_ms: Option<u64>,
    },
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Gemini {
                api_key: _,
                base_url,
            } => f
                .debug_struct("Gemini")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .finish(),
            ProviderConfig::OpenAI {
                api_key: _,
                base_url,
                org_id,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("org_id", org_id)
                .finish(),
            ProviderConfig::Mock {
                feedback,
                fail,
                delay_ms,
            } => f
                .debug_struct("Mock")
                .field("feedback", feedback)
                .field("fail", fail)
                .field("delay_ms", delay_ms)
                .finish(),
        }
    }
}

/// Top-level edutest configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdutestConfig {
    /// Provider configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Provider used when none is named on the command line.
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Model used for test generation.
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Model used for feedback; falls back to `default_model`.
    #[serde(default)]
    pub feedback_model: Option<String>,
    /// Per-request HTTP timeout.
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    /// Minimum score counted as a pass in class summaries.
    #[serde(default = "default_pass_mark")]
    pub pass_mark: f64,
}

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_model() -> String {
    crate::gemini::DEFAULT_MODEL.to_string()
}
fn default_timeout() -> u64 {
    120
}
fn default_pass_mark() -> f64 {
    edutest_core::statistics::DEFAULT_PASS_MARK
}

impl Default for EdutestConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider(),
            default_model: default_model(),
            feedback_model: None,
            request_timeout_secs: default_timeout(),
            pass_mark: default_pass_mark(),
        }
    }
}

impl EdutestConfig {
    pub fn feedback_model(&self) -> &str {
        self.feedback_model.as_deref().unwrap_or(&self.default_model)
    }

    /// Look up a provider by name, or the default provider.
    ///
    /// `mock` is always available, even when not configured.
    pub fn provider(&self, name: Option<&str>) -> Result<(String, ProviderConfig)> {
        let name = name.unwrap_or(self.default_provider.as_str());
        match self.providers.get(name) {
            Some(config) => Ok((name.to_string(), config.clone())),
            None if name == "mock" => Ok((
                name.to_string(),
                ProviderConfig::Mock {
                    feedback: None,
                    fail: false,
                    delay_ms: None,
                },
            )),
            None => {
                let mut known: Vec<&str> = self.providers.keys().map(String::as_str).collect();
                known.sort_unstable();
                anyhow::bail!(
                    "provider '{name}' is not configured (configured: {}). Run `edutest init` \
                     or set EDUTEST_GEMINI_KEY / EDUTEST_OPENAI_KEY",
                    if known.is_empty() {
                        "none".to_string()
                    } else {
                        known.join(", ")
                    }
                )
            }
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + end];
        // Substituted values are not scanned again
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

/// Resolve env vars in a provider config.
fn resolve_provider_config(config: &ProviderConfig) -> ProviderConfig {
    match config {
        ProviderConfig::Gemini { api_key, base_url } => ProviderConfig::Gemini {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
        },
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => ProviderConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
            org_id: org_id.as_ref().map(|o| resolve_env_vars(o)),
        },
        ProviderConfig::Mock { .. } => config.clone(),
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `edutest.toml` in the current directory
/// 2. `~/.config/edutest/config.toml`
///
/// Environment variable overrides: `EDUTEST_GEMINI_KEY`, `EDUTEST_OPENAI_KEY`.
pub fn load_config() -> Result<EdutestConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<EdutestConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("edutest.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|dir| dir.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<EdutestConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => EdutestConfig::default(),
    };

    apply_key_overrides(
        &mut config,
        std::env::var("EDUTEST_GEMINI_KEY").ok(),
        std::env::var("EDUTEST_OPENAI_KEY").ok(),
    );

    // Resolve env vars in all provider configs
    let resolved: HashMap<String, ProviderConfig> = config
        .providers
        .iter()
        .map(|(k, v)| (k.clone(), resolve_provider_config(v)))
        .collect();
    config.providers = resolved;

    Ok(config)
}

/// Install API keys from the environment, creating the provider entry if needed.
fn apply_key_overrides(
    config: &mut EdutestConfig,
    gemini_key: Option<String>,
    openai_key: Option<String>,
) {
    if let Some(key) = gemini_key {
        let entry = config
            .providers
            .entry("gemini".into())
            .or_insert(ProviderConfig::Gemini {
                api_key: String::new(),
                base_url: None,
            });
        if let ProviderConfig::Gemini { api_key, .. } = entry {
            *api_key = key;
        }
    }

    if let Some(key) = openai_key {
        let entry = config
            .providers
            .entry("openai".into())
            .or_insert(ProviderConfig::OpenAI {
                api_key: String::new(),
                base_url: None,
                org_id: None,
            });
        if let ProviderConfig::OpenAI { api_key, .. } = entry {
            *api_key = key;
        }
    }
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("edutest"))
}

fn build_gemini(config: &EdutestConfig, api_key: &str, base_url: &Option<String>) -> GeminiProvider {
    GeminiProvider::new(api_key, base_url.clone())
        .with_timeout(config.request_timeout_secs)
        .with_model(&config.default_model)
        .with_feedback_model(config.feedback_model())
}

fn build_openai(
    config: &EdutestConfig,
    api_key: &str,
    base_url: &Option<String>,
    org_id: &Option<String>,
) -> OpenAiProvider {
    OpenAiProvider::new(api_key, base_url.clone(), org_id.clone())
        .with_timeout(config.request_timeout_secs)
        .with_model(&config.default_model)
        .with_feedback_model(config.feedback_model())
}

fn build_mock(feedback: &Option<String>, fail: bool, delay_ms: Option<u64>) -> MockProvider {
    let mut mock = MockProvider::new();
    if let Some(ms) = delay_ms {
        mock = mock.with_delay(Duration::from_millis(ms));
    }
    if let Some(text) = feedback {
        mock = mock.with_feedback(text);
    }
    if fail {
        mock = mock.failing();
    }
    mock
}

/// Create the test generator for `name` (or the default provider).
pub fn create_generator(
    config: &EdutestConfig,
    name: Option<&str>,
) -> Result<Arc<dyn TestGenerator>> {
    let (name, provider) = config.provider(name)?;
    tracing::debug!(provider = %name, model = %config.default_model, "creating test generator");
    Ok(match &provider {
        ProviderConfig::Gemini { api_key, base_url } => {
            Arc::new(build_gemini(config, api_key, base_url))
        }
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => Arc::new(build_openai(config, api_key, base_url, org_id)),
        ProviderConfig::Mock {
            feedback,
            fail,
            delay_ms,
        } => Arc::new(build_mock(feedback, *fail, *delay_ms)),
    })
}

/// Create the feedback requester for `name` (or the default provider).
pub fn create_feedback_requester(
    config: &EdutestConfig,
    name: Option<&str>,
) -> Result<Arc<dyn FeedbackRequester>> {
    let (name, provider) = config.provider(name)?;
    tracing::debug!(provider = %name, model = %config.feedback_model(), "creating feedback requester");
    Ok(match &provider {
        ProviderConfig::Gemini { api_key, base_url } => {
            Arc::new(build_gemini(config, api_key, base_url))
        }
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => Arc::new(build_openai(config, api_key, base_url, org_id)),
        ProviderConfig::Mock {
            feedback,
            fail,
            delay_ms,
        } => Arc::new(build_mock(feedback, *fail, *delay_ms)),
    })
}

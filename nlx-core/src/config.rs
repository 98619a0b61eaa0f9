//! Configuration system for nlx.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> overrides.
//! Configuration is loaded from `~/.config/nlx/config.toml` and/or `.nlx/config.toml`
//! in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{ExplainError, ExplainResult};
use crate::interaction::InteractionPolicy;
use crate::perturb::Granularity;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NlxConfig {
    /// Model used when a request names none.
    #[serde(default)]
    pub default_model: Option<String>,
    #[serde(default)]
    pub explainer: ExplainerSettings,
    #[serde(default)]
    pub backend: BackendSettings,
    /// Model profiles keyed by model name.
    #[serde(default)]
    pub models: BTreeMap<String, ModelProfile>,
}

impl NlxConfig {
    /// Resolve a model name to its profile.
    ///
    /// Unknown names are treated as a model card with the default label map.
    pub fn model_profile(&self, name: &str) -> ModelProfile {
        match self.models.get(name) {
            Some(profile) => profile.clone(),
            None => {
                tracing::debug!(model = name, "no configured profile, using name as model card");
                ModelProfile::from_card(name)
            }
        }
    }
}

/// Explainer construction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainerSettings {
    /// Baseline substituted for masked units. `attention+<token>` selects
    /// attention masking for the Archipelago explainer.
    #[serde(default = "default_baseline_token")]
    pub baseline_token: String,
    #[serde(default)]
    pub policy: InteractionPolicy,
    #[serde(default)]
    pub granularity: Granularity,
    /// Number of ranked interactions returned (all when unset).
    #[serde(default)]
    pub top_k: Option<usize>,
    /// Candidate bound per side before pairing (no pruning when unset).
    #[serde(default)]
    pub sent_k: Option<usize>,
    /// `arch` or `cross_arch`.
    #[serde(default = "default_explainer_class")]
    pub explainer_class: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for ExplainerSettings {
    fn default() -> Self {
        Self {
            baseline_token: default_baseline_token(),
            policy: InteractionPolicy::default(),
            granularity: Granularity::default(),
            top_k: None,
            sent_k: None,
            explainer_class: default_explainer_class(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_baseline_token() -> String {
    "[MASK]".to_string()
}

fn default_explainer_class() -> String {
    "arch".to_string()
}

fn default_batch_size() -> usize {
    32
}

/// Classifier backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Logits endpoint of the HTTP classifier.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub device: Device,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            device: Device::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_endpoint() -> String {
    "http://127.0.0.1:8008/v1/logits".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Pretrained model record: weights identifier plus label map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelProfile {
    pub model_card: String,
    /// Path to a `tokenizer.json` for this model.
    #[serde(default)]
    pub tokenizer: Option<PathBuf>,
    #[serde(default)]
    pub label_map: LabelMap,
}

impl ModelProfile {
    pub fn from_card(model_card: impl Into<String>) -> Self {
        Self {
            model_card: model_card.into(),
            tokenizer: None,
            label_map: LabelMap::default(),
        }
    }
}

/// Label name -> class index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelMap(BTreeMap<String, usize>);

impl Default for LabelMap {
    fn default() -> Self {
        Self::from_iter([("contradiction", 0), ("entailment", 1), ("neutral", 2)])
    }
}

impl<S: Into<String>> FromIterator<(S, usize)> for LabelMap {
    fn from_iter<I: IntoIterator<Item = (S, usize)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl LabelMap {
    pub fn forward(&self) -> &BTreeMap<String, usize> {
        &self.0
    }

    /// Class index -> label name.
    pub fn inverse(&self) -> BTreeMap<usize, String> {
        self.0.iter().map(|(label, idx)| (*idx, label.clone())).collect()
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.0.get(label).copied()
    }

    pub fn label_of(&self, index: usize) -> Option<&str> {
        self.0
            .iter()
            .find(|(_, idx)| **idx == index)
            .map(|(label, _)| label.as_str())
    }
}

/// Compute device requested from the classifier backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Device {
    #[default]
    Cpu,
    Cuda(usize),
    Mps,
}

impl std::str::FromStr for Device {
    type Err = ExplainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "cpu" => return Ok(Self::Cpu),
            "cuda" => return Ok(Self::Cuda(0)),
            "mps" => return Ok(Self::Mps),
            _ => {}
        }
        lower
            .strip_prefix("cuda:")
            .and_then(|ordinal| ordinal.parse().ok())
            .map(Self::Cuda)
            .ok_or_else(|| ExplainError::InvalidDevice(s.to_string()))
    }
}

impl TryFrom<String> for Device {
    type Error = ExplainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Device> for String {
    fn from(device: Device) -> Self {
        device.to_string()
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda(ordinal) => write!(f, "cuda:{ordinal}"),
            Self::Mps => write!(f, "mps"),
        }
    }
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `NLX_`, nested keys split on `__`)
/// 3. Explicit config file
/// 4. Workspace-local config (`.nlx/config.toml`)
/// 5. User config (`~/.config/nlx/config.toml`)
/// 6. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    config_file: Option<&Path>,
    overrides: Option<&NlxConfig>,
) -> ExplainResult<NlxConfig> {
    let mut figment = Figment::from(Serialized::defaults(NlxConfig::default()));

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(".nlx").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(path) = config_file {
        if !path.exists() {
            return Err(ExplainError::config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        figment = figment.merge(Toml::file(path));
    }

    // NLX_EXPLAINER__TOP_K, NLX_BACKEND__DEVICE, ...
    figment = figment.merge(Env::prefixed("NLX_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    Ok(figment.extract()?)
}

/// `~/.config/nlx/config.toml` (platform equivalent).
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "nlx", "nlx")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

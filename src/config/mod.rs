use crate::agent::{AgentSettings, DEFAULT_MAX_ITERATIONS, PromptRules};
use crate::persona::Persona;
use crate::provider::{Credential, GOOGLE_API_KEY_VARS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Unknown config key '{0}'")]
    UnknownKey(String),

    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Google AI Studio key. Env vars take precedence.
    pub google_api_key: Option<String>,
    pub persona: Persona,
    /// Name the companion introduces herself with.
    pub companion_name: String,
    pub model: String,
    pub temperature: f32,
    /// Model calls allowed per message before giving up.
    pub max_iterations: usize,
    /// Fetch the base prompt template from this URL instead of the built-in one.
    pub base_template_url: Option<String>,
    /// Default number of web search results handed to the model.
    pub search_max_results: usize,
    pub prompt: PromptRules,
}

impl Default for Config {
    fn default() -> Self {
        let agent = AgentSettings::default();
        Self {
            google_api_key: None,
            persona: Persona::default(),
            companion_name: "Aura".to_string(),
            model: agent.model,
            temperature: agent.temperature,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            base_template_url: None,
            search_max_results: 5,
            prompt: PromptRules::default(),
        }
    }
}

/// Keys accepted by `get` and `set`.
pub const KEYS: &[&str] = &[
    "google_api_key",
    "persona",
    "companion_name",
    "model",
    "temperature",
    "max_iterations",
    "base_template_url",
    "search_max_results",
    "prompt.tool_guidance",
    "prompt.greeting",
];

/// Default config file location (`~/.config/aura/config.toml`).
#[must_use]
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("aura").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from(".aura/config.toml"))
}

impl Config {
    /// Load from the default location, or defaults if the file is absent.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(write_err)
    }

    /// API key from the environment first, then the config file.
    #[must_use]
    pub fn api_key(&self) -> Option<Credential> {
        GOOGLE_API_KEY_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .chain(self.google_api_key.clone())
            .find_map(Credential::new)
    }

    #[must_use]
    pub fn agent_settings(&self) -> AgentSettings {
        AgentSettings {
            model: self.model.clone(),
            temperature: self.temperature,
            max_iterations: self.max_iterations.max(1),
        }
    }

    /// Display value for a key. The API key is never shown.
    pub fn get(&self, key: &str) -> Result<String, ConfigError> {
        let value = match key {
            "google_api_key" => match &self.google_api_key {
                Some(k) if !k.trim().is_empty() => "[set]".to_string(),
                _ => "[not set]".to_string(),
            },
            "persona" => self.persona.id().to_string(),
            "companion_name" => self.companion_name.clone(),
            "model" => self.model.clone(),
            "temperature" => self.temperature.to_string(),
            "max_iterations" => self.max_iterations.to_string(),
            "base_template_url" => self.base_template_url.clone().unwrap_or_default(),
            "search_max_results" => self.search_max_results.to_string(),
            "prompt.tool_guidance" => self.prompt.tool_guidance.clone(),
            "prompt.greeting" => self.prompt.greeting.clone(),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        };
        Ok(value)
    }

    /// Set a key from its string form. An empty value clears optional keys.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let optional = |v: &str| {
            let v = v.trim();
            (!v.is_empty()).then(|| v.to_string())
        };

        match key {
            "google_api_key" => self.google_api_key = optional(value),
            "persona" => self.persona = value.parse().map_err(invalid)?,
            "companion_name" => {
                let name = value.trim();
                if name.is_empty() {
                    return Err(invalid("must not be empty".into()));
                }
                self.companion_name = name.to_string();
            }
            "model" => {
                let model = value.trim();
                if model.is_empty() {
                    return Err(invalid("must not be empty".into()));
                }
                self.model = model.to_string();
            }
            "temperature" => {
                let t: f32 = value.trim().parse().map_err(|e| invalid(format!("{e}")))?;
                if !(0.0..=2.0).contains(&t) {
                    return Err(invalid("must be between 0.0 and 2.0".into()));
                }
                self.temperature = t;
            }
            "max_iterations" => {
                let n: usize = value.trim().parse().map_err(|e| invalid(format!("{e}")))?;
                if n == 0 {
                    return Err(invalid("must be at least 1".into()));
                }
                self.max_iterations = n;
            }
            "base_template_url" => self.base_template_url = optional(value),
            "search_max_results" => {
                let n: usize = value.trim().parse().map_err(|e| invalid(format!("{e}")))?;
                if !(1..=20).contains(&n) {
                    return Err(invalid("must be between 1 and 20".into()));
                }
                self.search_max_results = n;
            }
            "prompt.tool_guidance" => self.prompt.tool_guidance = value.to_string(),
            "prompt.greeting" => {
                if value.trim().is_empty() {
                    return Err(invalid("must not be empty".into()));
                }
                self.prompt.greeting = value.to_string();
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }
}

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ERROR_MESSAGE: &str = "Error generating content. Please check your API key.";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("no project directory available")]
    ProjectDir,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditorConfig {
    pub debounce_ms: u64,
    pub model: String,
    pub api_base: String,
    pub api_key_env: String,
    pub error_message: String,
    pub system_instruction: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            model: "gemini-2.5-flash".to_string(),
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key_env: "API_KEY".to_string(),
            error_message: DEFAULT_ERROR_MESSAGE.to_string(),
            system_instruction: crate::generation::SYSTEM_INSTRUCTION.to_string(),
        }
    }
}

impl EditorConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn default_store() -> Result<Self, ConfigError> {
        let project_dirs =
            ProjectDirs::from("app", "quire", "Quire").ok_or(ConfigError::ProjectDir)?;
        Ok(Self::new(project_dirs.config_dir().join("editor.json")))
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub fn load(&self) -> Result<EditorConfig, ConfigError> {
        if !self.config_path.exists() {
            tracing::debug!(path = %self.config_path.display(), "no editor config, using defaults");
            return Ok(EditorConfig::default());
        }
        let raw = fs::read_to_string(&self.config_path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, config: &EditorConfig) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(config)?;
        fs::write(&self.config_path, data)?;
        Ok(())
    }
}

// Language runtime configuration for the execution engine
use anyhow::{bail, Context, Result};
use codebank_common::types::Language;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageConfig {
    pub name: String,
    pub version: String,
    /// Interpreter executable, resolved through PATH
    pub command: String,
    /// Extra interpreter arguments placed before the harness
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LanguagesJson {
    pub languages: Vec<LanguageConfig>,
}

/// Language configuration manager
#[derive(Debug, Clone)]
pub struct LanguageConfigManager {
    configs: HashMap<Language, LanguageConfig>,
}

impl LanguageConfigManager {
    pub fn new(languages: Vec<LanguageConfig>) -> Result<Self> {
        let mut configs = HashMap::new();
        for config in languages {
            let language: Language = config
                .name
                .parse()
                .map_err(|_| anyhow::anyhow!("Unknown language '{}' in languages.json", config.name))?;
            configs.insert(language, config);
        }
        Ok(Self { configs })
    }

    /// Load language configurations from languages.json
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            bail!("Language config file not found: {}", config_path.display());
        }

        let content = fs::read_to_string(config_path).context("Failed to read languages.json")?;

        let languages_json: LanguagesJson =
            serde_json::from_str(&content).context("Failed to parse languages.json")?;

        if languages_json.languages.is_empty() {
            bail!("No languages configured in {}", config_path.display());
        }

        Self::new(languages_json.languages)
    }

    /// Load from `config_path`, or fall back to the built-in table when the file is absent
    pub fn load_or_builtin(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            Self::load(config_path)
        } else {
            warn!(
                path = %config_path.display(),
                "Language config not found, using built-in runtimes"
            );
            Ok(Self::builtin())
        }
    }

    pub fn builtin() -> Self {
        let mut configs = HashMap::new();
        configs.insert(
            Language::JavaScript,
            LanguageConfig {
                name: Language::JavaScript.to_string(),
                version: "20".to_string(),
                command: "node".to_string(),
                args: Vec::new(),
            },
        );
        Self { configs }
    }

    /// The built-in table in the shape of languages.json
    pub fn builtin_json() -> LanguagesJson {
        LanguagesJson {
            languages: Self::builtin().configs.into_values().collect(),
        }
    }

    /// Get configuration for a specific language
    pub fn get_config(&self, language: &Language) -> Option<&LanguageConfig> {
        self.configs.get(language)
    }

    pub fn is_enabled(&self, language: &Language) -> bool {
        self.configs.contains_key(language)
    }

    /// List all configured languages
    pub fn list_languages(&self) -> Vec<String> {
        let mut names: Vec<String> = self.configs.keys().map(|l| l.to_string()).collect();
        names.sort();
        names
    }
}

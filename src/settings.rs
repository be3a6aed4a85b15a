//! Persisted settings and per-invocation overrides.
//!
//! Precedence, highest first:
//!   1. CLI flags
//!   2. `COMMIT_ASSIST_*` environment variables
//!   3. TOML settings file
//!   4. Built-in defaults

use std::collections::HashMap;
use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::dispatch::GenerationRequest;
use crate::error::SettingsError;
use crate::prompt::{CommitType, CommitTypeCatalog};
use crate::provider::{ApiKey, ProviderCredentials, ProviderId};
use crate::schema::FieldFlags;

pub const ENV_PROVIDER: &str = "COMMIT_ASSIST_PROVIDER";
pub const ENV_API_KEY: &str = "COMMIT_ASSIST_API_KEY";
pub const ENV_MODEL: &str = "COMMIT_ASSIST_MODEL";
pub const ENV_BASE_URL: &str = "COMMIT_ASSIST_BASE_URL";

const DEFAULT_PROVIDER: &str = "openai";
const DEFAULT_LANGUAGE: &str = "English";
const DEFAULT_MAX_LENGTH: u32 = 72;

/// Per-provider credentials stored in the settings file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

/// The settings blob.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub provider: String,
    pub language: String,
    /// Positive; zero is rejected when parsing.
    pub max_length: u32,
    /// Gate for diagnostics dumps. Read on every generation.
    pub debug: bool,
    pub fields: FieldFlags,
    pub providers: HashMap<String, ProviderSettings>,
    pub commit_types: Vec<CommitType>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            max_length: DEFAULT_MAX_LENGTH,
            debug: false,
            fields: FieldFlags::default(),
            providers: HashMap::new(),
            commit_types: Vec::new(),
        }
    }
}

/// Values that take precedence over the settings file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub provider: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

impl Overrides {
    /// Read the `COMMIT_ASSIST_*` variables. Empty values count as unset.
    pub fn from_env() -> Self {
        Self {
            provider: env_value(ENV_PROVIDER),
            api_key: env_value(ENV_API_KEY),
            model: env_value(ENV_MODEL),
            base_url: env_value(ENV_BASE_URL),
        }
    }

    /// Fill unset values from `fallback`.
    pub fn or(self, fallback: Overrides) -> Self {
        Self {
            provider: self.provider.or(fallback.provider),
            api_key: self.api_key.or(fallback.api_key),
            model: self.model.or(fallback.model),
            base_url: self.base_url.or(fallback.base_url),
        }
    }
}

fn env_value(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).cloned()
}

/// `$CONFIG_DIR/commit-assist/config.toml`
pub fn default_path() -> Option<PathBuf> {
    Some(dirs::config_dir()?.join("commit-assist").join("config.toml"))
}

impl Settings {
    /// Load settings from `path`, or from [`default_path`] when `None`.
    ///
    /// A missing default file yields defaults; a missing explicit file is an
    /// error.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match default_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound && !explicit => {
                debug!(path = %path.display(), "No settings file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(SettingsError::ReadFailed {
                    path: path.display().to_string(),
                    source,
                });
            }
        };

        let settings = Self::parse(&data, &path)?;
        debug!(path = %path.display(), provider = %settings.provider, "Loaded settings");
        Ok(settings)
    }

    pub fn parse(data: &str, path: &Path) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(data).map_err(|source| SettingsError::ParseFailed {
            path: path.display().to_string(),
            source,
        })?;
        if settings.max_length == 0 {
            return Err(SettingsError::InvalidMaxLength {
                path: path.display().to_string(),
            });
        }
        Ok(settings)
    }

    /// The provider selected by overrides or settings.
    pub fn active_provider(&self, overrides: &Overrides) -> Result<ProviderId, SettingsError> {
        let name = overrides.provider.as_deref().unwrap_or(&self.provider);
        Ok(name.parse()?)
    }

    fn section(&self, provider: ProviderId) -> Option<&ProviderSettings> {
        self.providers.get(provider.as_str())
    }

    pub fn api_key(
        &self,
        provider: ProviderId,
        overrides: &Overrides,
    ) -> Result<ApiKey, SettingsError> {
        non_empty(overrides.api_key.as_ref())
            .or_else(|| non_empty(self.section(provider)?.api_key.as_ref()))
            .map(ApiKey::new)
            .ok_or_else(|| SettingsError::MissingApiKey(provider.to_string()))
    }

    pub fn base_url(&self, provider: ProviderId, overrides: &Overrides) -> Option<String> {
        non_empty(overrides.base_url.as_ref())
            .or_else(|| non_empty(self.section(provider)?.base_url.as_ref()))
    }

    /// Credentials for the active provider.
    pub fn credentials(&self, overrides: &Overrides) -> Result<ProviderCredentials, SettingsError> {
        let provider = self.active_provider(overrides)?;
        let api_key = self.api_key(provider, overrides)?;
        let model = non_empty(overrides.model.as_ref())
            .or_else(|| non_empty(self.section(provider)?.model.as_ref()))
            .ok_or_else(|| SettingsError::MissingModel(provider.to_string()))?;

        let creds = ProviderCredentials::new(provider, api_key, model);
        Ok(match self.base_url(provider, overrides) {
            Some(url) => creds.with_base_url(url),
            None => creds,
        })
    }

    pub fn catalog(&self) -> CommitTypeCatalog {
        CommitTypeCatalog::from_config(Some(self.commit_types.clone()))
    }

    pub fn generation_request(&self, diff: String, fixed_type: Option<String>) -> GenerationRequest {
        GenerationRequest {
            language: self.language.clone(),
            max_length: self.max_length,
            diff,
            catalog: self.catalog(),
            fields: self.fields,
            fixed_type,
        }
    }
}

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use figment::{
    Figment,
    providers::{Format, Json, Serialized},
};
use murmur_llm::{DEFAULT_API_KEY, DEFAULT_BASE_URL, DEFAULT_MODEL_NAME, ProviderConfig};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

pub const SETTINGS_DIRECTORY_NAME: &str = "murmur";
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// User-editable request configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_model_name")]
    pub model_name: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: default_api_key(),
            model_name: default_model_name(),
        }
    }
}

impl ProviderSettings {
    pub fn to_provider_config(&self) -> ProviderConfig {
        ProviderConfig::new(&self.base_url, &self.api_key, &self.model_name)
    }

    /// Trims fields and restores defaults for a blank URL or model.
    ///
    /// The API key is passed through as entered.
    pub fn normalized(mut self) -> Self {
        self.base_url = if self.base_url.trim().is_empty() {
            default_base_url()
        } else {
            self.base_url.trim().to_string()
        };
        self.api_key = self.api_key.trim().to_string();
        self.model_name = if self.model_name.trim().is_empty() {
            default_model_name()
        } else {
            self.model_name.trim().to_string()
        };

        self
    }
}

/// Loads settings at startup and persists every update.
pub struct SettingsStore {
    settings: Arc<ArcSwap<ProviderSettings>>,
    config_path: PathBuf,
}

impl SettingsStore {
    /// Per-user config directory, or `./.murmur` when the platform has none.
    pub fn default_config_dir() -> PathBuf {
        match dirs::config_dir() {
            Some(base) => base.join(SETTINGS_DIRECTORY_NAME),
            None => PathBuf::from(".").join(format!(".{SETTINGS_DIRECTORY_NAME}")),
        }
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    pub fn new(config_path: PathBuf) -> Self {
        let settings = read_settings_file(&config_path);
        Self {
            settings: Arc::new(ArcSwap::from_pointee(settings)),
            config_path,
        }
    }

    pub fn load() -> Self {
        Self::new(Self::default_config_path())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> Arc<ProviderSettings> {
        self.settings.load_full()
    }

    /// Persists then publishes `settings`, returning the stored value.
    pub fn update(
        &self,
        settings: ProviderSettings,
    ) -> Result<Arc<ProviderSettings>, SettingsError> {
        let settings = Arc::new(settings.normalized());
        write_settings_file(&self.config_path, &settings)?;
        self.settings.store(Arc::clone(&settings));
        tracing::info!(
            path = %self.config_path.display(),
            base_url = %settings.base_url,
            model = %settings.model_name,
            "provider settings saved"
        );
        Ok(settings)
    }

    pub fn reset_to_defaults(&self) -> Result<Arc<ProviderSettings>, SettingsError> {
        tracing::info!("restoring default provider settings");
        self.update(ProviderSettings::default())
    }
}

/// Reads the settings file, layering it over defaults.
///
/// A missing or unreadable file is not an error: the app starts on defaults.
fn read_settings_file(path: &Path) -> ProviderSettings {
    if !path.is_file() {
        tracing::info!(path = %path.display(), "no settings file; using defaults");
        return ProviderSettings::default();
    }

    Figment::from(Serialized::defaults(ProviderSettings::default()))
        .merge(Json::file(path))
        .extract::<ProviderSettings>()
        .map(ProviderSettings::normalized)
        .unwrap_or_else(|error| {
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "settings file is invalid; using defaults"
            );
            ProviderSettings::default()
        })
}

// Written beside the target and renamed over it so a crash never leaves a torn file.
fn write_settings_file(path: &Path, settings: &ProviderSettings) -> Result<(), SettingsError> {
    if let Some(directory) = path.parent() {
        std::fs::create_dir_all(directory).context(CreateDirSnafu {
            stage: "create-settings-directory",
            path: directory,
        })?;
    }

    let json = serde_json::to_vec_pretty(settings).context(EncodeSnafu {
        stage: "encode-settings",
    })?;
    let staging_path = path.with_extension("json.tmp");
    std::fs::write(&staging_path, json).context(WriteFileSnafu {
        stage: "write-staging-file",
        path: &staging_path,
    })?;
    std::fs::rename(&staging_path, path).context(ReplaceFileSnafu {
        stage: "replace-settings-file",
        path,
    })?;

    tracing::debug!(path = %path.display(), "settings file replaced");
    Ok(())
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("cannot create {} on `{stage}`: {source}", path.display()))]
    CreateDir {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("cannot encode provider settings on `{stage}`: {source}"))]
    Encode {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("cannot write {} on `{stage}`: {source}", path.display()))]
    WriteFile {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "cannot move staged settings over {} on `{stage}`: {source}",
        path.display()
    ))]
    ReplaceFile {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_api_key() -> String {
    DEFAULT_API_KEY.to_string()
}

fn default_model_name() -> String {
    DEFAULT_MODEL_NAME.to_string()
}

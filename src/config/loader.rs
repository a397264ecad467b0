use crate::config::settings::MerqaConfig;
use crate::error::{MerqaError, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::PathBuf;

/// Get XDG-compliant config directory
pub fn config_dir() -> Result<PathBuf> {
    ProjectDirs::from("", "", "merqa")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| MerqaError::Config("Could not determine config directory".to_string()))
}

/// Get XDG-compliant data directory
pub fn data_dir() -> Result<PathBuf> {
    ProjectDirs::from("", "", "merqa")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| MerqaError::Config("Could not determine data directory".to_string()))
}

/// Get config file path
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Database path, honouring the configured override
pub fn database_path(config: &MerqaConfig) -> Result<PathBuf> {
    match &config.storage.database_path {
        Some(path) => Ok(path.clone()),
        None => Ok(data_dir()?.join("merqa.db")),
    }
}

/// Records root, honouring the configured override
pub fn records_dir(config: &MerqaConfig) -> Result<PathBuf> {
    match &config.records.root_dir {
        Some(path) => Ok(path.clone()),
        None => Ok(data_dir()?.join("records")),
    }
}

/// Load config from file, creating default if not exists
pub fn load_config() -> Result<MerqaConfig> {
    let path = config_path()?;

    if !path.exists() {
        let config = MerqaConfig::default();
        save_config(&config)?;
        return Ok(config);
    }

    let content = fs::read_to_string(&path)?;
    let config: MerqaConfig = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Save config to file
pub fn save_config(config: &MerqaConfig) -> Result<()> {
    let path = config_path()?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let content = toml::to_string_pretty(config)?;
    fs::write(&path, content)?;
    Ok(())
}

/// Ensure all data directories exist
pub fn ensure_directories(config: &MerqaConfig) -> Result<()> {
    fs::create_dir_all(config_dir()?)?;
    fs::create_dir_all(data_dir()?)?;
    fs::create_dir_all(records_dir(config)?)?;
    Ok(())
}

pub fn load_config_with_env() -> Result<MerqaConfig> {
    let config = load_config()?;
    Ok(apply_env_overrides(config, |name| std::env::var(name).ok()))
}

fn apply_env_overrides<F>(mut config: MerqaConfig, var: F) -> MerqaConfig
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = var("MERQA_API_KEY").or_else(|| var("GEMINI_API_KEY")) {
        config.analyzer.api_key = Some(key);
    }
    if let Some(dir) = var("MERQA_RECORDS_DIR") {
        config.records.root_dir = Some(PathBuf::from(dir));
    }
    if let Some(model) = var("MERQA_MODEL") {
        config.analyzer.model = model;
    }
    config
}

fn validate(config: &MerqaConfig) -> Result<()> {
    if config.transcription.chunk_seconds == 0 {
        return Err(MerqaError::InvalidConfig(
            "transcription.chunk_seconds must be greater than zero".to_string(),
        ));
    }
    if config.transcription.max_parallel_chunks == 0 {
        return Err(MerqaError::InvalidConfig(
            "transcription.max_parallel_chunks must be greater than zero".to_string(),
        ));
    }
    if config.records.processed_dir_name.trim().is_empty() {
        return Err(MerqaError::InvalidConfig(
            "records.processed_dir_name must not be empty".to_string(),
        ));
    }
    Ok(())
}

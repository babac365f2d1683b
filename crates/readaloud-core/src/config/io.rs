use super::models::AppConfig;
use super::tables::ConfigTables;
use crate::error::ConfigError;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load configuration from the given path, falling back to defaults on error.
pub fn load_config(path: &Path) -> AppConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded base config");
            data
        }
        Err(err) => {
            let err = ConfigError::Read {
                path: path.display().to_string(),
                source: err,
            };
            warn!("Falling back to default config: {err}");
            return AppConfig::default();
        }
    };

    match parse_config(&contents) {
        Ok(cfg) => {
            debug!(
                engine = %cfg.tts_engine,
                rate = cfg.tts_rate,
                "Parsed configuration from disk"
            );
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), "{err}");
            AppConfig::default()
        }
    }
}

/// Parse sectioned TOML into a sanitized [`AppConfig`].
pub fn parse_config(contents: &str) -> Result<AppConfig, ConfigError> {
    let tables: ConfigTables = toml::from_str(contents)?;
    Ok(AppConfig::from(tables).sanitized())
}

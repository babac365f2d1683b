use super::defaults;
use super::models::{AppConfig, LogLevel, TtsEngineKind};
use serde::Deserialize;

/// On-disk layout: settings grouped into `[logging]`, `[tts]` and
/// `[reading_behavior]` tables.
#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    tts: TtsConfig,
    #[serde(default)]
    reading_behavior: ReadingBehaviorConfig,
}

impl From<ConfigTables> for AppConfig {
    fn from(tables: ConfigTables) -> Self {
        AppConfig {
            log_level: tables.logging.log_level,
            tts_engine: tables.tts.tts_engine,
            tts_model_path: tables.tts.tts_model_path,
            tts_espeak_path: tables.tts.tts_espeak_path,
            espeak_binary: tables.tts.espeak_binary,
            espeak_voice: tables.tts.espeak_voice,
            tts_rate: tables.tts.tts_rate,
            tts_volume: tables.tts.tts_volume,
            pause_after_sentence: tables.reading_behavior.pause_after_sentence,
            continue_to_next_chapter: tables.reading_behavior.continue_to_next_chapter,
        }
    }
}

#[cfg(test)]
impl From<&AppConfig> for ConfigTables {
    fn from(config: &AppConfig) -> Self {
        ConfigTables {
            logging: LoggingConfig {
                log_level: config.log_level,
            },
            tts: TtsConfig {
                tts_engine: config.tts_engine,
                tts_model_path: config.tts_model_path.clone(),
                tts_espeak_path: config.tts_espeak_path.clone(),
                espeak_binary: config.espeak_binary.clone(),
                espeak_voice: config.espeak_voice.clone(),
                tts_rate: config.tts_rate,
                tts_volume: config.tts_volume,
            },
            reading_behavior: ReadingBehaviorConfig {
                pause_after_sentence: config.pause_after_sentence,
                continue_to_next_chapter: config.continue_to_next_chapter,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct TtsConfig {
    #[serde(default = "defaults::default_tts_engine")]
    tts_engine: TtsEngineKind,
    #[serde(default = "defaults::default_tts_model")]
    tts_model_path: String,
    #[serde(default = "defaults::default_tts_espeak_path")]
    tts_espeak_path: String,
    #[serde(default = "defaults::default_espeak_binary")]
    espeak_binary: String,
    #[serde(default = "defaults::default_espeak_voice")]
    espeak_voice: String,
    #[serde(default = "defaults::default_tts_rate")]
    tts_rate: f32,
    #[serde(default = "defaults::default_tts_volume")]
    tts_volume: f32,
}

impl Default for TtsConfig {
    fn default() -> Self {
        TtsConfig {
            tts_engine: defaults::default_tts_engine(),
            tts_model_path: defaults::default_tts_model(),
            tts_espeak_path: defaults::default_tts_espeak_path(),
            espeak_binary: defaults::default_espeak_binary(),
            espeak_voice: defaults::default_espeak_voice(),
            tts_rate: defaults::default_tts_rate(),
            tts_volume: defaults::default_tts_volume(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct ReadingBehaviorConfig {
    #[serde(default = "defaults::default_pause_after_sentence")]
    pause_after_sentence: f32,
    #[serde(default = "defaults::default_continue_to_next_chapter")]
    continue_to_next_chapter: bool,
}

impl Default for ReadingBehaviorConfig {
    fn default() -> Self {
        ReadingBehaviorConfig {
            pause_after_sentence: defaults::default_pause_after_sentence(),
            continue_to_next_chapter: defaults::default_continue_to_next_chapter(),
        }
    }
}

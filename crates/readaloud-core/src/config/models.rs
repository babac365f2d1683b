use serde::Deserialize;

/// High-level app configuration; deserializable from TOML.
#[derive(Debug, Clone, PartialEq, Deserialize, serde::Serialize)]
pub struct AppConfig {
    #[serde(default = "crate::config::defaults::default_log_level")]
    pub log_level: LogLevel,
    #[serde(default = "crate::config::defaults::default_tts_engine")]
    pub tts_engine: TtsEngineKind,
    #[serde(default = "crate::config::defaults::default_tts_model")]
    pub tts_model_path: String,
    #[serde(default = "crate::config::defaults::default_tts_espeak_path")]
    pub tts_espeak_path: String,
    #[serde(default = "crate::config::defaults::default_espeak_binary")]
    pub espeak_binary: String,
    #[serde(default = "crate::config::defaults::default_espeak_voice")]
    pub espeak_voice: String,
    #[serde(default = "crate::config::defaults::default_tts_rate")]
    pub tts_rate: f32,
    #[serde(default = "crate::config::defaults::default_tts_volume")]
    pub tts_volume: f32,
    #[serde(default = "crate::config::defaults::default_pause_after_sentence")]
    pub pause_after_sentence: f32,
    #[serde(default = "crate::config::defaults::default_continue_to_next_chapter")]
    pub continue_to_next_chapter: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            log_level: crate::config::defaults::default_log_level(),
            tts_engine: crate::config::defaults::default_tts_engine(),
            tts_model_path: crate::config::defaults::default_tts_model(),
            tts_espeak_path: crate::config::defaults::default_tts_espeak_path(),
            espeak_binary: crate::config::defaults::default_espeak_binary(),
            espeak_voice: crate::config::defaults::default_espeak_voice(),
            tts_rate: crate::config::defaults::default_tts_rate(),
            tts_volume: crate::config::defaults::default_tts_volume(),
            pause_after_sentence: crate::config::defaults::default_pause_after_sentence(),
            continue_to_next_chapter: crate::config::defaults::default_continue_to_next_chapter(),
        }
    }
}

impl AppConfig {
    /// Pull out-of-range values back into the ranges playback accepts.
    pub fn sanitized(mut self) -> Self {
        self.tts_rate = crate::playback::clamp_rate(self.tts_rate)
            .unwrap_or_else(crate::config::defaults::default_tts_rate);
        self.tts_volume = if self.tts_volume.is_finite() {
            self.tts_volume.clamp(0.0, 2.0)
        } else {
            crate::config::defaults::default_tts_volume()
        };
        self.pause_after_sentence = if self.pause_after_sentence.is_finite() {
            self.pause_after_sentence.clamp(0.0, 2.0)
        } else {
            crate::config::defaults::default_pause_after_sentence()
        };
        self
    }
}

/// Which synthesizer backs the audio engine.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TtsEngineKind {
    Piper,
    Espeak,
}

impl Default for TtsEngineKind {
    fn default() -> Self {
        TtsEngineKind::Piper
    }
}

impl std::fmt::Display for TtsEngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TtsEngineKind::Piper => "piper",
            TtsEngineKind::Espeak => "espeak",
        };
        write!(f, "{}", label)
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Debug
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

use crate::playback::DEFAULT_RATE;

pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Debug
}

pub(crate) fn default_tts_engine() -> crate::config::TtsEngineKind {
    crate::config::TtsEngineKind::Piper
}

pub(crate) fn default_tts_model() -> String {
    "/usr/share/piper-voices/en/en_US/ryan/high/en_US-ryan-high.onnx".to_string()
}

pub(crate) fn default_tts_espeak_path() -> String {
    "/usr/share".to_string()
}

pub(crate) fn default_espeak_binary() -> String {
    "espeak-ng".to_string()
}

pub(crate) fn default_espeak_voice() -> String {
    "en-us".to_string()
}

pub(crate) fn default_tts_rate() -> f32 {
    DEFAULT_RATE
}

pub(crate) fn default_tts_volume() -> f32 {
    1.0
}

pub(crate) fn default_pause_after_sentence() -> f32 {
    0.06
}

pub(crate) fn default_continue_to_next_chapter() -> bool {
    false
}

//! Error taxonomy shared by the core and the front end.

use serde::Serialize;
use thiserror::Error;

/// Failure to turn a chapter id into plain text.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ChapterError {
    #[error("chapter not found: {0}")]
    NotFound(String),

    #[error("failed to parse chapter {chapter}: {message}")]
    Parse { chapter: String, message: String },

    #[error("failed to open book {path}: {message}")]
    Open { path: String, message: String },
}

/// Failure reported by a speech engine for one unit.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SpeechError {
    #[error("speech engine unavailable: {0}")]
    Unavailable(String),

    #[error("synthesis failed: {0}")]
    Synthesis(String),

    #[error("audio output failed: {0}")]
    Output(String),

    #[error("operation cancelled at stage={stage}")]
    Cancelled { stage: &'static str },
}

/// Problems surfaced to the caller as a status, never as a crash.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum PlaybackIssue {
    #[error("No text found in chapter.")]
    NoContent,

    #[error("Error loading chapter: {0}")]
    ChapterLoadFailure(#[from] ChapterError),

    #[error("Speech error on sentence {}: {message}", .ordinal + 1)]
    SynthesisFailure { ordinal: usize, message: String },
}

/// Configuration that could not be read or parsed.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

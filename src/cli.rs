//! Command-line interface for readaloud.

use clap::{Parser, ValueEnum};
use readaloud_core::config::{AppConfig, TtsEngineKind};
use std::path::PathBuf;

/// Read EPUB chapters aloud
#[derive(Parser, Debug)]
#[command(name = "readaloud", version, about = "Read EPUB chapters aloud")]
pub struct Cli {
    /// EPUB (or plain .txt) file to read
    #[arg(value_name = "BOOK")]
    pub book: PathBuf,

    /// Chapter to start from (1-based spine position; default: first)
    #[arg(long, value_name = "ID")]
    pub chapter: Option<String>,

    /// Speech rate multiplier, 1.0 is normal speed
    #[arg(long, value_name = "RATE")]
    pub rate: Option<f32>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", default_value = "conf/config.toml")]
    pub config: PathBuf,

    /// Synthesizer override
    #[arg(long, value_enum, value_name = "ENGINE")]
    pub engine: Option<EngineArg>,

    /// Write each sentence as a WAV file into DIR instead of playing it
    #[arg(long, value_name = "DIR")]
    pub export: Option<PathBuf>,

    /// Print the chapter list and exit
    #[arg(long)]
    pub list: bool,

    /// Emit status updates as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Keep accepting commands after the chapter ends
    #[arg(long)]
    pub stay: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineArg {
    Piper,
    Espeak,
}

impl From<EngineArg> for TtsEngineKind {
    fn from(arg: EngineArg) -> Self {
        match arg {
            EngineArg::Piper => TtsEngineKind::Piper,
            EngineArg::Espeak => TtsEngineKind::Espeak,
        }
    }
}

impl Cli {
    /// Flags win over values from the config file.
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(engine) = self.engine {
            config.tts_engine = engine.into();
        }
        if let Some(rate) = self.rate {
            config.tts_rate = rate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn book_path_is_the_only_required_argument() {
        let cli = Cli::try_parse_from(["readaloud", "novel.epub"]).expect("parse");
        assert_eq!(cli.book, PathBuf::from("novel.epub"));
        assert_eq!(cli.config, PathBuf::from("conf/config.toml"));
        assert!(cli.chapter.is_none());
        assert!(!cli.list && !cli.json && !cli.stay);
    }

    #[test]
    fn missing_book_is_rejected() {
        assert!(Cli::try_parse_from(["readaloud"]).is_err());
    }

    #[test]
    fn flags_override_config_values() {
        let cli = Cli::try_parse_from([
            "readaloud",
            "novel.epub",
            "--engine",
            "espeak",
            "--rate",
            "1.25",
            "--chapter",
            "3",
        ])
        .expect("parse");
        let mut config = AppConfig::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.tts_engine, TtsEngineKind::Espeak);
        assert_eq!(config.tts_rate, 1.25);
        assert_eq!(cli.chapter.as_deref(), Some("3"));
    }

    #[test]
    fn unknown_engine_is_rejected() {
        assert!(Cli::try_parse_from(["readaloud", "b.epub", "--engine", "festival"]).is_err());
    }
}

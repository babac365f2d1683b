//! Voices turn one sentence into WAV bytes.
//!
//! Piper runs in-process through `piper-rs`; espeak-ng is driven as a
//! subprocess writing WAV to stdout. Both are built on the audio worker
//! thread the first time a sentence needs them.

use anyhow::{Context, Result};
use piper_rs::from_config_path;
use piper_rs::synth::{AudioOutputConfig, PiperSpeechSynthesizer};
use readaloud_core::cancellation::CancellationToken;
use readaloud_core::config::{AppConfig, TtsEngineKind};
use readaloud_core::wav::encode_wav;
use std::env;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Words per minute espeak-ng uses at rate 1.0.
const ESPEAK_BASE_WPM: f32 = 175.0;

pub trait Voice {
    fn name(&self) -> &'static str;

    /// Synthesize `text` at `rate` (1.0 = normal) into a complete WAV file.
    fn synthesize(&mut self, text: &str, rate: f32, cancel: &CancellationToken) -> Result<Vec<u8>>;
}

/// Deferred voice construction; runs on the thread that will own the voice.
pub type VoiceFactory = Box<dyn FnOnce() -> Result<Box<dyn Voice>> + Send>;

pub fn voice_factory(config: &AppConfig) -> VoiceFactory {
    match config.tts_engine {
        TtsEngineKind::Piper => {
            let model_path = PathBuf::from(&config.tts_model_path);
            Box::new(move || -> Result<Box<dyn Voice>> {
                Ok(Box::new(PiperVoice::load(&model_path)?))
            })
        }
        TtsEngineKind::Espeak => {
            let voice = EspeakVoice {
                binary: config.espeak_binary.clone(),
                voice: config.espeak_voice.clone(),
            };
            Box::new(move || -> Result<Box<dyn Voice>> { Ok(Box::new(voice)) })
        }
    }
}

/// Point piper's phonemizer at the espeak-ng data root. Must run before any
/// other thread is spawned.
pub fn configure_espeak_data(espeak_path: &Path) {
    let espeak_root = sanitize_espeak_root(espeak_path.to_path_buf());
    if env::var_os("PIPER_ESPEAKNG_DATA_DIRECTORY").is_none() {
        // Safe because this runs during startup before any thread is spawned.
        unsafe {
            env::set_var("PIPER_ESPEAKNG_DATA_DIRECTORY", &espeak_root);
        }
    }
    debug!(espeak_root = %espeak_root.display(), "Configured espeak-ng data root");
}

pub struct PiperVoice {
    piper: PiperSpeechSynthesizer,
}

impl PiperVoice {
    pub fn load(model_path: &Path) -> Result<Self> {
        let config_path = resolve_piper_config(model_path);
        if !config_path.exists() {
            anyhow::bail!(
                "Piper config not found at {} (expected from {})",
                config_path.display(),
                model_path.display()
            );
        }
        info!(model = %model_path.display(), "Loading Piper voice");
        let model = from_config_path(&config_path).context("Loading Piper model config")?;
        let piper = PiperSpeechSynthesizer::new(model).context("Creating Piper synthesizer")?;
        Ok(Self { piper })
    }
}

impl Voice for PiperVoice {
    fn name(&self) -> &'static str {
        "piper"
    }

    fn synthesize(&mut self, text: &str, rate: f32, cancel: &CancellationToken) -> Result<Vec<u8>> {
        debug!(rate, chars = text.len(), "Synthesizing sentence with Piper");
        let output_config = if (rate - 1.0).abs() <= f32::EPSILON {
            None
        } else {
            Some(AudioOutputConfig {
                rate: Some(speed_to_rate_percent(rate)),
                volume: None,
                pitch: None,
                appended_silence_ms: None,
            })
        };

        let mut samples: Vec<f32> = Vec::new();
        let mut sample_rate: Option<u32> = None;
        let mut channels: Option<u16> = None;
        for chunk in self
            .piper
            .synthesize_lazy(text.to_string(), output_config)
            .context("Starting Piper synthesis")?
        {
            cancel.check_cancelled("piper_chunk")?;
            let chunk = chunk.context("Synthesizing audio")?;
            if sample_rate.is_none() {
                sample_rate = Some(chunk.info.sample_rate as u32);
                channels = Some(chunk.info.num_channels as u16);
            }
            samples.extend_from_slice(chunk.samples.as_slice());
        }

        encode_wav(&samples, sample_rate.unwrap_or(22_050), channels.unwrap_or(1))
    }
}

pub struct EspeakVoice {
    binary: String,
    voice: String,
}

impl Voice for EspeakVoice {
    fn name(&self) -> &'static str {
        "espeak"
    }

    fn synthesize(&mut self, text: &str, rate: f32, cancel: &CancellationToken) -> Result<Vec<u8>> {
        let wpm = espeak_words_per_minute(rate);
        debug!(wpm, chars = text.len(), voice = %self.voice, "Synthesizing sentence with espeak-ng");
        let output = Command::new(&self.binary)
            .arg("-v")
            .arg(&self.voice)
            .arg("-s")
            .arg(wpm.to_string())
            .arg("--stdout")
            .arg(text)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("Running {}", self.binary))?;
        cancel.check_cancelled("espeak_output")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("{} exited with {}: {}", self.binary, output.status, stderr.trim());
        }
        if output.stdout.is_empty() {
            anyhow::bail!("{} produced no audio", self.binary);
        }
        Ok(output.stdout)
    }
}

/// Piper expects the parent directory that contains `espeak-ng-data/phonindex`.
/// Users often point directly at `.../espeak-ng-data`; trim that to avoid
/// duplicated segments like `/espeak-ng-data/espeak-ng-data/phonindex`.
fn sanitize_espeak_root(path: PathBuf) -> PathBuf {
    if path
        .file_name()
        .map(|n| n == "espeak-ng-data")
        .unwrap_or(false)
    {
        if let Some(parent) = path.parent() {
            return parent.to_path_buf();
        }
    }
    path
}

fn resolve_piper_config(model_path: &Path) -> PathBuf {
    if model_path
        .extension()
        .map(|ext| ext == "onnx")
        .unwrap_or(false)
    {
        return model_path.with_extension("onnx.json");
    }
    model_path.to_path_buf()
}

fn speed_to_rate_percent(speed: f32) -> u8 {
    let clamped = speed.clamp(0.5, 5.5);
    let percent = ((clamped - 0.5) / 5.0) * 100.0;
    percent.round().clamp(0.0, 100.0) as u8
}

fn espeak_words_per_minute(rate: f32) -> u32 {
    // espeak-ng accepts 80..=450 wpm.
    (ESPEAK_BASE_WPM * rate).round().clamp(80.0, 450.0) as u32
}

//! Minimal PCM WAV container for synthesized speech.

use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Encode f32 samples in `[-1.0, 1.0]` as 16-bit PCM WAV bytes.
pub fn encode_wav(samples: &[f32], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    if samples.is_empty() {
        anyhow::bail!("No speech data to write");
    }
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).context("Creating WAV writer")?;
        for &sample in samples {
            writer
                .write_sample(to_pcm16(sample))
                .context("Writing WAV sample")?;
        }
        writer.finalize().context("Finalizing WAV data")?;
    }
    Ok(cursor.into_inner())
}

/// Write WAV bytes through a temporary sibling so readers never see a partial file.
pub fn write_wav_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create audio dir {}", parent.display()))?;
    }
    let temp_path = unique_temp_wav_path(path);
    fs::write(&temp_path, bytes)
        .with_context(|| format!("Failed to write {}", temp_path.display()))?;
    if fs::rename(&temp_path, path).is_err() {
        fs::copy(&temp_path, path)
            .with_context(|| format!("Failed to copy audio into {}", path.display()))?;
        let _ = fs::remove_file(&temp_path);
    }
    Ok(())
}

fn to_pcm16(sample: f32) -> i16 {
    (sample * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

fn unique_temp_wav_path(path: &Path) -> PathBuf {
    static SEQ: AtomicU64 = AtomicU64::new(0);
    let nonce = SEQ.fetch_add(1, Ordering::Relaxed);
    let ts_nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let mut temp_name = path
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or("unit.wav")
        .to_string();
    temp_name.push_str(&format!(".tmp-{ts_nanos}-{nonce}"));
    path.with_file_name(temp_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::WavReader;

    #[test]
    fn header_describes_mono_pcm16_and_clamps_samples() {
        let samples = vec![0.0, 0.5, -0.5, 2.0, -2.0];
        let bytes = encode_wav(&samples, 22_050, 1).expect("encode");

        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");

        let mut reader = WavReader::new(Cursor::new(bytes)).expect("valid wav");
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 22_050);
        assert_eq!(spec.bits_per_sample, 16);
        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.expect("sample")).collect();
        assert_eq!(decoded[3], i16::MAX);
        assert_eq!(decoded[4], i16::MIN);
    }

    #[test]
    fn empty_audio_is_rejected() {
        assert!(encode_wav(&[], 16_000, 1).is_err());
    }

    #[test]
    fn file_write_lands_at_target_without_temp_leftovers() {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time should be after epoch")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("readaloud-wav-{nonce}"));
        let target = dir.join("unit-0001.wav");
        let bytes = encode_wav(&[0.25; 64], 8_000, 1).expect("encode");

        write_wav_file(&target, &bytes).expect("write");

        assert_eq!(fs::read(&target).expect("read back"), bytes);
        let leftovers = fs::read_dir(&dir)
            .expect("dir exists")
            .flatten()
            .filter(|entry| entry.file_name().to_string_lossy().contains(".tmp-"))
            .count();
        assert_eq!(leftovers, 0);
        let _ = fs::remove_dir_all(&dir);
    }
}

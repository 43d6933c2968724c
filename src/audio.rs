//! Host ⇄ engine audio conversion.
//!
//! The host passes audio around as a multi-dimensional waveform plus a sample
//! rate; the engine only understands flat mono `f32` samples.
//!
//! | Direction       | Function             | Shape                          |
//! |-----------------|----------------------|--------------------------------|
//! | host → engine   | [`to_engine_buffer`] | `[B?, C?, N]` → `[N]` (mono)   |
//! | engine → host   | [`to_host_audio`]    | `[N]` → `[1, 1, N]`            |
//!
//! When the engine needs a file path instead of a buffer, [`StagedWav`]
//! writes the samples to a temporary `.wav` that is deleted when dropped.

use std::{
    fs,
    io::BufWriter,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{NodeError, NodeResult};

/// Reference clips shorter than this are rejected before reaching the engine.
pub const MIN_REFERENCE_SAMPLES: usize = 100;

/// File extensions accepted for reference audio in the input directory.
pub const REFERENCE_EXTENSIONS: [&str; 4] = ["wav", "mp3", "flac", "ogg"];

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// Row-major sample tensor in the host's layout, e.g. `[batch, channels, samples]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waveform {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl Waveform {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Self {
        Self { shape, data }
    }
}

/// The host's audio value: a waveform tensor plus its sample rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostAudio {
    pub waveform: Waveform,
    pub sample_rate: u32,
}

/// Flat mono samples as produced and consumed by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl EngineAudio {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// host → engine
// ─────────────────────────────────────────────────────────────────────────────

/// Collapse a host waveform to mono without length checks.
///
/// Singleton axes are dropped. If a second non-singleton axis remains, the
/// leading one is treated as channels and averaged per sample.
pub fn to_mono(audio: &HostAudio) -> NodeResult<EngineAudio> {
    let Waveform { shape, data } = &audio.waveform;

    if audio.sample_rate == 0 {
        return Err(NodeError::validation("sample rate must be greater than 0"));
    }
    if shape.is_empty() {
        return Err(NodeError::validation("waveform has no dimensions"));
    }
    let expected = shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| NodeError::validation(format!("waveform shape {:?} is too large", shape)))?;
    if expected != data.len() {
        return Err(NodeError::validation(format!(
            "waveform shape {:?} expects {} samples, buffer holds {}",
            shape,
            expected,
            data.len()
        )));
    }

    let dims: Vec<usize> = shape.iter().copied().filter(|&d| d != 1).collect();
    let samples = match dims.as_slice() {
        // An all-singleton shape is a single sample.
        [] | [_] => data.clone(),
        [channels, n] => {
            let (channels, n) = (*channels, *n);
            (0..n)
                .map(|i| (0..channels).map(|c| data[c * n + i]).sum::<f32>() / channels as f32)
                .collect()
        }
        _ => {
            return Err(NodeError::validation(format!(
                "cannot reduce waveform of shape {:?} to mono",
                shape
            )))
        }
    };

    Ok(EngineAudio::new(samples, audio.sample_rate))
}

/// Check that a mono buffer is fit to be used as a voice reference.
pub fn validate_reference(audio: &EngineAudio) -> NodeResult<()> {
    if audio.samples.is_empty() {
        return Err(NodeError::validation("reference audio is empty"));
    }
    if audio.samples.len() < MIN_REFERENCE_SAMPLES {
        return Err(NodeError::validation(format!(
            "reference audio too short: {} samples (minimum {})",
            audio.samples.len(),
            MIN_REFERENCE_SAMPLES
        )));
    }
    if let Some(i) = audio.samples.iter().position(|s| !s.is_finite()) {
        return Err(NodeError::validation(format!(
            "reference audio has a non-finite sample at index {}",
            i
        )));
    }
    Ok(())
}

/// Convert host audio to a validated mono engine buffer.
pub fn to_engine_buffer(audio: &HostAudio) -> NodeResult<EngineAudio> {
    let mono = to_mono(audio)?;
    validate_reference(&mono)?;
    Ok(mono)
}

// ─────────────────────────────────────────────────────────────────────────────
// engine → host
// ─────────────────────────────────────────────────────────────────────────────

/// Wrap engine output as `[1, 1, N]` host audio. Samples are moved, not copied.
pub fn to_host_audio(audio: EngineAudio) -> HostAudio {
    let n = audio.samples.len();
    HostAudio {
        waveform: Waveform::new(vec![1, 1, n], audio.samples),
        sample_rate: audio.sample_rate,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Temporary WAV staging
// ─────────────────────────────────────────────────────────────────────────────

/// A mono 32-bit float WAV in the system temp directory, removed on drop.
///
/// Samples are written as-is, without clamping or quantisation.
#[derive(Debug)]
pub struct StagedWav {
    file: NamedTempFile,
}

impl StagedWav {
    /// Write `audio` to a fresh `*.wav` temp file at its own sample rate.
    pub fn write(audio: &EngineAudio) -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix("pocket-tts-ref-")
            .suffix(".wav")
            .tempfile()
            .context("Cannot create temporary WAV file")?;

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: audio.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::new(BufWriter::new(file.as_file()), spec)
            .with_context(|| format!("Cannot create WAV: {}", file.path().display()))?;
        for &s in &audio.samples {
            writer.write_sample(s).context("WAV write error")?;
        }
        writer.finalize().context("WAV finalise error")?;

        tracing::debug!(
            path = %file.path().display(),
            samples = audio.samples.len(),
            sample_rate = audio.sample_rate,
            "staged reference audio"
        );
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Input directory
// ─────────────────────────────────────────────────────────────────────────────

pub fn has_reference_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| REFERENCE_EXTENSIONS.iter().any(|ok| e.eq_ignore_ascii_case(ok)))
        .unwrap_or(false)
}

/// File names in `dir` with a reference-audio extension, sorted.
///
/// A missing directory yields an empty list.
pub fn list_reference_audio(dir: &Path) -> Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Cannot list {}", dir.display()))? {
        let entry = entry.with_context(|| format!("Cannot list {}", dir.display()))?;
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if has_reference_extension(name) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Join `name` onto `dir` and make sure it points to an existing audio file.
///
/// Names containing path separators are rejected so a node input can't reach
/// outside the input directory.
pub fn resolve_reference_file(dir: &Path, name: &str) -> NodeResult<PathBuf> {
    if name.is_empty() || name.contains(['/', '\\']) || name == ".." {
        return Err(NodeError::validation(format!("invalid reference file name {:?}", name)));
    }
    if !has_reference_extension(name) {
        return Err(NodeError::validation(format!(
            "{:?} is not a reference audio file (expected one of {:?})",
            name, REFERENCE_EXTENSIONS
        )));
    }
    let path = dir.join(name);
    if !path.is_file() {
        return Err(NodeError::NotFound { path });
    }
    Ok(path)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

//! Seam to the external synthesis engine.
//!
//! The engine itself (acoustic model, tokenizer, vocoder, weight download)
//! lives outside this crate. Integrators implement [`EngineLoader`] and
//! [`SynthesisEngine`] over it; everything else in the crate only sequences
//! and caches calls through these traits.
//!
//! | Engine operation                | Trait method                                  |
//! |---------------------------------|-----------------------------------------------|
//! | `load_model()`                  | [`EngineLoader::load_model`]                  |
//! | precision conversion            | [`SynthesisEngine::with_precision`]           |
//! | `get_state_for_audio_prompt(s)` | [`SynthesisEngine::get_state_for_audio_prompt`] |
//! | `generate_audio(state, text)`   | [`SynthesisEngine::generate_audio`]           |
//! | `sample_rate`                   | [`SynthesisEngine::sample_rate`]              |

use std::{fmt, path::Path, str::FromStr, sync::Arc};

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::error::NodeError;

// ─────────────────────────────────────────────────────────────────────────────
// Precision
// ─────────────────────────────────────────────────────────────────────────────

/// Numeric precision of the loaded weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    /// Recommended for CPU inference.
    #[default]
    Float32,
    Float16,
    Bfloat16,
}

impl Precision {
    pub const ALL: [Precision; 3] = [Precision::Float32, Precision::Float16, Precision::Bfloat16];

    pub fn as_str(self) -> &'static str {
        match self {
            Precision::Float32 => "float32",
            Precision::Float16 => "float16",
            Precision::Bfloat16 => "bfloat16",
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Precision {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Precision::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| NodeError::validation(format!("unknown precision {:?}", s)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Audio prompt
// ─────────────────────────────────────────────────────────────────────────────

/// What the engine is asked to derive a voice state from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioPrompt<'a> {
    /// A reference the engine resolves itself, e.g. `hf://org/repo/voice.wav`.
    Reference(&'a str),
    /// A local audio file.
    File(&'a Path),
}

impl fmt::Display for AudioPrompt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioPrompt::Reference(r) => f.write_str(r),
            AudioPrompt::File(p) => write!(f, "{}", p.display()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Traits
// ─────────────────────────────────────────────────────────────────────────────

/// A loaded synthesis model.
///
/// Handles are shared read-only behind an `Arc` once cached, so every method
/// after [`with_precision`](Self::with_precision) takes `&self`.
pub trait SynthesisEngine: Send + Sync + 'static {
    /// Opaque per-voice conditioning computed by the engine.
    type VoiceState: Send + Sync + 'static;

    /// Sample rate of the audio returned by [`generate_audio`](Self::generate_audio).
    fn sample_rate(&self) -> u32;

    /// Convert the weights to `precision`. Called at most once, straight
    /// after loading.
    fn with_precision(self, precision: Precision) -> Result<Self>
    where
        Self: Sized,
    {
        if precision != Precision::Float32 {
            bail!("precision {} is not supported by this engine", precision);
        }
        Ok(self)
    }

    fn get_state_for_audio_prompt(&self, prompt: AudioPrompt<'_>) -> Result<Self::VoiceState>;

    /// Synthesize `text` in the given voice. Returns flat mono samples.
    fn generate_audio(&self, state: &Self::VoiceState, text: &str) -> Result<Vec<f32>>;
}

/// Constructs engines. One loader lives for the whole process.
pub trait EngineLoader: Send + Sync {
    type Engine: SynthesisEngine;

    /// Human-readable name of the engine dependency, used in configuration errors.
    fn dependency(&self) -> &str;

    /// Whether the engine library can be used at all in this process.
    fn is_available(&self) -> bool {
        true
    }

    /// Load a fresh model. Expensive.
    fn load_model(&self) -> Result<Self::Engine>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Model handle
// ─────────────────────────────────────────────────────────────────────────────

/// Cache fingerprint for a loaded model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKey {
    /// Loaded by the model-loader node and converted to the given precision.
    Precision(Precision),
    /// Loaded implicitly by the all-in-one node, no conversion applied.
    Simple,
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKey::Precision(p) => write!(f, "model_{}", p),
            ModelKey::Simple => f.write_str("model_simple"),
        }
    }
}

/// A cached engine together with the key it was loaded under.
///
/// This is the value carried by the host's model slot between nodes. Cloning
/// is cheap and never reloads the model.
pub struct LoadedModel<E> {
    key: ModelKey,
    engine: Arc<E>,
}

impl<E> LoadedModel<E> {
    pub(crate) fn new(key: ModelKey, engine: Arc<E>) -> Self {
        Self { key, engine }
    }

    pub fn key(&self) -> ModelKey {
        self.key
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    /// True if both handles point at the same engine instance.
    pub fn same_engine(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.engine, &other.engine)
    }
}

impl<E> Clone for LoadedModel<E> {
    fn clone(&self) -> Self {
        Self { key: self.key, engine: Arc::clone(&self.engine) }
    }
}

impl<E> fmt::Debug for LoadedModel<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModel").field("key", &self.key).finish_non_exhaustive()
    }
}

//! Node operations.
//!
//! [`PocketTtsNodes`] is built once by the embedding process and shared by
//! every node execution. It owns the model cache, the voice-state cache and
//! the configuration; each public method is one node type.

use std::{sync::Arc, time::Instant};

use anyhow::Result;

use crate::{
    audio::{self, EngineAudio, HostAudio},
    cache::{ModelCache, VoiceCache},
    config::NodeConfig,
    engine::{EngineLoader, LoadedModel, ModelKey, Precision, SynthesisEngine},
    error::{NodeError, NodeResult},
    registry::{self, NodeDefinition, NO_AUDIO_FILES},
    voice::VoiceSource,
};

type Engine<L> = <L as EngineLoader>::Engine;

pub struct PocketTtsNodes<L: EngineLoader> {
    config: NodeConfig,
    models: ModelCache<L>,
    voices: VoiceCache<Engine<L>>,
}

impl<L: EngineLoader> PocketTtsNodes<L> {
    pub fn new(loader: L, config: NodeConfig) -> Self {
        Self { config, models: ModelCache::new(loader), voices: VoiceCache::new() }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn models(&self) -> &ModelCache<L> {
        &self.models
    }

    pub fn voices(&self) -> &VoiceCache<Engine<L>> {
        &self.voices
    }

    pub fn registry(&self) -> Result<Vec<NodeDefinition>> {
        registry::node_registry(&self.config)
    }

    // ── Nodes ─────────────────────────────────────────────────────────────────

    /// `PocketTTSModelLoader`
    pub fn load_model(&self, precision: Precision) -> NodeResult<LoadedModel<Engine<L>>> {
        self.models.get_or_load(ModelKey::Precision(precision))
    }

    /// `PocketTTSGenerate`: speak `text` with a preset voice.
    pub fn generate(
        &self,
        model: &LoadedModel<Engine<L>>,
        text: &str,
        voice: &str,
    ) -> NodeResult<HostAudio> {
        let text = require_text(text)?;
        let source = VoiceSource::preset(voice, &self.config)?;
        self.speak(model, &source, text)
    }

    /// `PocketTTSVoiceClone`: speak `text` in the voice of a file from the input directory.
    pub fn voice_clone(
        &self,
        model: &LoadedModel<Engine<L>>,
        text: &str,
        reference_audio: &str,
    ) -> NodeResult<HostAudio> {
        let text = require_text(text)?;
        if reference_audio == NO_AUDIO_FILES {
            return Err(NodeError::validation("no audio files in input directory"));
        }
        let source = VoiceSource::reference_file(reference_audio, &self.config)?;
        self.speak(model, &source, text)
    }

    /// `PocketTTSClone`: speak `text` in the voice of an audio input, using
    /// the model at the configured default precision.
    pub fn clone_from_audio(&self, audio: &HostAudio, text: &str) -> NodeResult<HostAudio> {
        self.models.ensure_available()?;
        let text = require_text(text)?;
        let source = VoiceSource::reference_audio(audio)?;
        let model = self.models.get_or_load(ModelKey::Precision(self.config.default_precision))?;
        self.speak(&model, &source, text)
    }

    /// `PocketTTSSimple`: preset voice, model loaded on demand.
    pub fn generate_simple(&self, text: &str, voice: &str) -> NodeResult<HostAudio> {
        self.models.ensure_available()?;
        let text = require_text(text)?;
        let source = VoiceSource::preset(voice, &self.config)?;
        let model = self.models.get_or_load(ModelKey::Simple)?;
        self.speak(&model, &source, text)
    }

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn speak(
        &self,
        model: &LoadedModel<Engine<L>>,
        source: &VoiceSource,
        text: &str,
    ) -> NodeResult<HostAudio> {
        let state = self.voices.get_or_build(model, source)?;
        let audio = synthesize(model.engine(), &state, text)?;
        Ok(audio::to_host_audio(audio))
    }
}

fn require_text(text: &str) -> NodeResult<&str> {
    if text.trim().is_empty() {
        return Err(NodeError::MissingInput("text"));
    }
    Ok(text)
}

fn synthesize<E: SynthesisEngine>(
    engine: &Arc<E>,
    state: &E::VoiceState,
    text: &str,
) -> NodeResult<EngineAudio> {
    tracing::info!(chars = text.chars().count(), "generating speech");
    let start = Instant::now();

    let samples = engine.generate_audio(state, text).map_err(NodeError::Engine)?;
    let audio = EngineAudio::new(samples, engine.sample_rate());

    let elapsed = start.elapsed().as_secs_f32();
    let duration = audio.duration_secs();
    let rtf = if duration > 0.0 { elapsed / duration } else { 0.0 };
    tracing::info!(
        duration_s = duration,
        generation_s = elapsed,
        rtf,
        sample_rate = audio.sample_rate,
        "audio generated"
    );
    Ok(audio)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

//! Voice sources — where a voice state is derived from.
//!
//! Each source resolves to exactly one engine prompt and carries a stable
//! identifier used as its cache key:
//!
//! | Source                 | Cache key         | Engine prompt                      |
//! |------------------------|-------------------|------------------------------------|
//! | preset name            | `voice_<name>`    | expanded `voice_prompt_template`   |
//! | file in input dir      | `clone_<file>`    | the file path                      |
//! | in-memory audio buffer | `audio_<xxh3>`    | a staged temporary WAV             |
//!
//! All validation happens in the constructors, so a source that exists is
//! ready to be handed to the cache.

use std::path::PathBuf;

use xxhash_rust::xxh3::Xxh3;

use crate::{
    audio::{self, EngineAudio, HostAudio},
    config::NodeConfig,
    error::{NodeError, NodeResult},
};

#[derive(Debug, Clone, PartialEq)]
pub enum VoiceSource {
    Preset { name: String, prompt: String },
    ReferenceFile { name: String, path: PathBuf },
    ReferenceAudio { audio: EngineAudio, fingerprint: u128 },
}

impl VoiceSource {
    /// A built-in voice, expanded through the configured prompt template.
    pub fn preset(name: &str, config: &NodeConfig) -> NodeResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(NodeError::MissingInput("voice"));
        }
        if !config.accepts_voice(name) {
            return Err(NodeError::validation(format!(
                "unknown voice {:?}; expected one of {:?}",
                name, config.voices
            )));
        }
        Ok(Self::Preset { name: name.to_string(), prompt: config.voice_prompt(name) })
    }

    /// A reference file in the input directory. Fails if the file is absent.
    pub fn reference_file(name: &str, config: &NodeConfig) -> NodeResult<Self> {
        let path = audio::resolve_reference_file(&config.input_dir, name)?;
        Ok(Self::ReferenceFile { name: name.to_string(), path })
    }

    /// An audio buffer from the host, reduced to mono and validated.
    pub fn reference_audio(host: &HostAudio) -> NodeResult<Self> {
        let audio = audio::to_engine_buffer(host)?;
        let fingerprint = fingerprint(&audio);
        Ok(Self::ReferenceAudio { audio, fingerprint })
    }

    pub fn cache_key(&self) -> String {
        match self {
            VoiceSource::Preset { name, .. } => format!("voice_{}", name),
            VoiceSource::ReferenceFile { name, .. } => format!("clone_{}", name),
            VoiceSource::ReferenceAudio { fingerprint, .. } => format!("audio_{:032x}", fingerprint),
        }
    }
}

/// xxh3-128 over the sample rate and raw sample bits.
fn fingerprint(audio: &EngineAudio) -> u128 {
    let mut hasher = Xxh3::new();
    hasher.update(&audio.sample_rate.to_le_bytes());
    for s in &audio.samples {
        hasher.update(&s.to_le_bytes());
    }
    hasher.digest128()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Waveform;

    fn host(data: Vec<f32>, sample_rate: u32) -> HostAudio {
        let n = data.len();
        HostAudio { waveform: Waveform::new(vec![1, 1, n], data), sample_rate }
    }

    #[test]
    fn test_preset_expands_template() {
        let source = VoiceSource::preset(" alba ", &NodeConfig::default()).unwrap();
        assert_eq!(source.cache_key(), "voice_alba");
        match source {
            VoiceSource::Preset { prompt, .. } => {
                assert_eq!(prompt, "hf://kyutai/tts-voices/alba/casual.wav")
            }
            other => panic!("unexpected source {other:?}"),
        }
    }

    #[test]
    fn test_preset_checks_catalog() {
        let config = NodeConfig { voices: vec!["alba".into()], ..NodeConfig::default() };
        assert!(matches!(
            VoiceSource::preset("javert", &config),
            Err(NodeError::Validation(_))
        ));
        assert!(matches!(VoiceSource::preset("  ", &config), Err(NodeError::MissingInput(_))));
    }

    #[test]
    fn test_reference_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = NodeConfig { input_dir: dir.path().to_path_buf(), ..NodeConfig::default() };
        assert!(matches!(
            VoiceSource::reference_file("me.wav", &config),
            Err(NodeError::NotFound { .. })
        ));

        std::fs::write(dir.path().join("me.wav"), b"RIFF").unwrap();
        let source = VoiceSource::reference_file("me.wav", &config).unwrap();
        assert_eq!(source.cache_key(), "clone_me.wav");
    }

    #[test]
    fn test_reference_audio_fingerprint() {
        let a = VoiceSource::reference_audio(&host(vec![0.25; 400], 24_000)).unwrap();
        let b = VoiceSource::reference_audio(&host(vec![0.25; 400], 24_000)).unwrap();
        let c = VoiceSource::reference_audio(&host(vec![0.25; 400], 16_000)).unwrap();
        let d = VoiceSource::reference_audio(&host(vec![0.5; 400], 24_000)).unwrap();
        assert_eq!(a.cache_key(), b.cache_key());
        assert_ne!(a.cache_key(), c.cache_key());
        assert_ne!(a.cache_key(), d.cache_key());
        assert!(a.cache_key().starts_with("audio_"));
    }

    #[test]
    fn test_fingerprint_matches_one_shot_hash() {
        let audio = EngineAudio::new((0..1000).map(|i| i as f32 * 1e-3).collect(), 24_000);
        let mut bytes = audio.sample_rate.to_le_bytes().to_vec();
        for s in &audio.samples {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        assert_eq!(fingerprint(&audio), xxhash_rust::xxh3::xxh3_128(&bytes));
    }

    #[test]
    fn test_reference_audio_validated() {
        assert!(matches!(
            VoiceSource::reference_audio(&host(vec![0.1; 50], 24_000)),
            Err(NodeError::Validation(_))
        ));
    }
}

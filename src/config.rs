//! Node configuration, read from a JSON file next to the plugin.
//!
//! Every field is optional; missing fields fall back to the defaults below.
//!
//! ```json
//! {
//!   "input_dir": "/srv/host/input",
//!   "voice_prompt_template": "hf://kyutai/tts-voices/{voice}/casual.wav",
//!   "voices": ["alba", "marius"],
//!   "default_voice": "alba",
//!   "default_precision": "float32"
//! }
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::engine::Precision;

/// Placeholder substituted with the preset name in `voice_prompt_template`.
pub const VOICE_PLACEHOLDER: &str = "{voice}";

fn default_input_dir() -> PathBuf {
    PathBuf::from("input")
}

fn default_voice_prompt_template() -> String {
    "hf://kyutai/tts-voices/{voice}/casual.wav".to_string()
}

fn default_voice() -> String {
    "alba".to_string()
}

fn default_text() -> String {
    "Hello world, this is a test.".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Host-designated directory holding reference audio files.
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,

    /// Template turning a preset name into a reference the engine resolves.
    #[serde(default = "default_voice_prompt_template")]
    pub voice_prompt_template: String,

    /// Preset names offered by the voice choice. Empty means free-form.
    #[serde(default)]
    pub voices: Vec<String>,

    #[serde(default = "default_voice")]
    pub default_voice: String,

    /// Initial value of the text inputs.
    #[serde(default = "default_text")]
    pub default_text: String,

    /// Precision used by nodes that load the model implicitly.
    #[serde(default)]
    pub default_precision: Precision,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            voice_prompt_template: default_voice_prompt_template(),
            voices: Vec::new(),
            default_voice: default_voice(),
            default_text: default_text(),
            default_precision: Precision::default(),
        }
    }
}

impl NodeConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: NodeConfig = serde_json::from_str(json).context("Failed to parse node config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config: {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("Invalid config: {}", path.display()))
    }

    fn validate(&self) -> Result<()> {
        if !self.voice_prompt_template.contains(VOICE_PLACEHOLDER) {
            bail!(
                "voice_prompt_template {:?} must contain {}",
                self.voice_prompt_template,
                VOICE_PLACEHOLDER
            );
        }
        if !self.voices.is_empty() && !self.voices.contains(&self.default_voice) {
            bail!("default_voice {:?} is not in voices {:?}", self.default_voice, self.voices);
        }
        Ok(())
    }

    /// Expand the prompt template for preset `voice`.
    pub fn voice_prompt(&self, voice: &str) -> String {
        self.voice_prompt_template.replace(VOICE_PLACEHOLDER, voice)
    }

    /// Whether `voice` may be used as a preset.
    pub fn accepts_voice(&self, voice: &str) -> bool {
        self.voices.is_empty() || self.voices.iter().any(|v| v == voice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_gives_defaults() {
        let config = NodeConfig::from_json("{}").unwrap();
        assert_eq!(config, NodeConfig::default());
    }

    #[test]
    fn test_partial_json() {
        let config = NodeConfig::from_json(
            r#"{"voices": ["alba", "jean"], "default_precision": "float16"}"#,
        )
        .unwrap();
        assert_eq!(config.voices, vec!["alba", "jean"]);
        assert_eq!(config.default_precision, Precision::Float16);
        assert_eq!(config.input_dir, PathBuf::from("input"));
    }

    #[test]
    fn test_template_needs_placeholder() {
        let err = NodeConfig::from_json(r#"{"voice_prompt_template": "hf://fixed.wav"}"#)
            .unwrap_err();
        assert!(format!("{err:#}").contains("{voice}"));
    }

    #[test]
    fn test_default_voice_must_be_listed() {
        assert!(NodeConfig::from_json(r#"{"voices": ["jean"]}"#).is_err());
    }

    #[test]
    fn test_voice_prompt() {
        let config = NodeConfig::default();
        assert_eq!(config.voice_prompt("alba"), "hf://kyutai/tts-voices/alba/casual.wav");
    }

    #[test]
    fn test_accepts_voice() {
        let mut config = NodeConfig::default();
        assert!(config.accepts_voice("anyone"));
        config.voices = vec!["alba".into()];
        assert!(config.accepts_voice("alba"));
        assert!(!config.accepts_voice("anyone"));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pocket_tts.json");
        std::fs::write(&path, r#"{"input_dir": "/data/in"}"#).unwrap();
        let config = NodeConfig::from_file(&path).unwrap();
        assert_eq!(config.input_dir, PathBuf::from("/data/in"));

        let err = NodeConfig::from_file(&dir.path().join("missing.json")).unwrap_err();
        assert!(err.to_string().contains("Cannot read config"));
    }
}

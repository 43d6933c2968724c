//! Node declarations handed to the host.
//!
//! The host discovers nodes and draws their input widgets from these
//! definitions; execution goes through [`PocketTtsNodes`](crate::PocketTtsNodes).

use anyhow::Result;
use serde::Serialize;

use crate::{audio, config::NodeConfig, engine::Precision};

pub const CATEGORY: &str = "audio/Pocket-TTS";

/// Shown in the reference-file choice when the input directory has no audio.
pub const NO_AUDIO_FILES: &str = "No audio files found";

pub const MODEL_LOADER: &str = "PocketTTSModelLoader";
pub const GENERATE: &str = "PocketTTSGenerate";
pub const VOICE_CLONE: &str = "PocketTTSVoiceClone";
pub const CLONE_FROM_AUDIO: &str = "PocketTTSClone";
pub const SIMPLE: &str = "PocketTTSSimple";

/// Value type flowing through a slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlotKind {
    Text { default: String, multiline: bool },
    Choice { options: Vec<String>, default: Option<String> },
    Audio,
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputSlot {
    pub name: &'static str,
    #[serde(flatten)]
    pub kind: SlotKind,
    pub tooltip: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDefinition {
    pub type_name: &'static str,
    pub display_name: &'static str,
    pub category: &'static str,
    pub description: &'static str,
    pub inputs: Vec<InputSlot>,
    pub output: SlotKind,
    pub output_name: &'static str,
}

fn text_slot(config: &NodeConfig) -> InputSlot {
    InputSlot {
        name: "text",
        kind: SlotKind::Text { default: config.default_text.clone(), multiline: true },
        tooltip: "Text to convert to speech",
    }
}

fn voice_slot(config: &NodeConfig) -> InputSlot {
    let kind = if config.voices.is_empty() {
        SlotKind::Text { default: config.default_voice.clone(), multiline: false }
    } else {
        SlotKind::Choice {
            options: config.voices.clone(),
            default: Some(config.default_voice.clone()),
        }
    };
    InputSlot { name: "voice", kind, tooltip: "Built-in voice preset" }
}

fn model_slot() -> InputSlot {
    InputSlot { name: "model", kind: SlotKind::Model, tooltip: "Pocket TTS model from loader" }
}

/// All node definitions, with reference-file choices read from the input directory.
pub fn node_registry(config: &NodeConfig) -> Result<Vec<NodeDefinition>> {
    let mut references = audio::list_reference_audio(&config.input_dir)?;
    if references.is_empty() {
        references.push(NO_AUDIO_FILES.to_string());
    }

    Ok(vec![
        NodeDefinition {
            type_name: MODEL_LOADER,
            display_name: "🎙️ Pocket TTS Model Loader",
            category: CATEGORY,
            description: "Load Pocket TTS model (100M params, optimized for CPU)",
            inputs: vec![InputSlot {
                name: "precision",
                kind: SlotKind::Choice {
                    options: Precision::ALL.iter().map(|p| p.as_str().to_string()).collect(),
                    default: Some(Precision::default().as_str().to_string()),
                },
                tooltip: "Model precision (float32 recommended for CPU)",
            }],
            output: SlotKind::Model,
            output_name: "model",
        },
        NodeDefinition {
            type_name: GENERATE,
            display_name: "🎙️ Pocket TTS Generate",
            category: CATEGORY,
            description: "Generate speech using built-in voices",
            inputs: vec![model_slot(), text_slot(config), voice_slot(config)],
            output: SlotKind::Audio,
            output_name: "audio",
        },
        NodeDefinition {
            type_name: VOICE_CLONE,
            display_name: "🎙️ Pocket TTS Voice Clone",
            category: CATEGORY,
            description: "Clone voice from audio file and generate speech",
            inputs: vec![
                model_slot(),
                text_slot(config),
                InputSlot {
                    name: "reference_audio",
                    kind: SlotKind::Choice { options: references, default: None },
                    tooltip: "Reference audio for voice cloning",
                },
            ],
            output: SlotKind::Audio,
            output_name: "audio",
        },
        NodeDefinition {
            type_name: CLONE_FROM_AUDIO,
            display_name: "🎙️ Pocket TTS Clone Voice",
            category: CATEGORY,
            description: "Clone voice from an audio input and generate speech",
            inputs: vec![
                InputSlot {
                    name: "audio",
                    kind: SlotKind::Audio,
                    tooltip: "Reference audio for voice cloning",
                },
                text_slot(config),
            ],
            output: SlotKind::Audio,
            output_name: "audio",
        },
        NodeDefinition {
            type_name: SIMPLE,
            display_name: "🎙️ Pocket TTS (Simple)",
            category: CATEGORY,
            description: "Simple TTS: just text and voice, the model loads automatically",
            inputs: vec![text_slot(config), voice_slot(config)],
            output: SlotKind::Audio,
            output_name: "audio",
        },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find<'a>(defs: &'a [NodeDefinition], name: &str) -> &'a NodeDefinition {
        defs.iter().find(|d| d.type_name == name).unwrap()
    }

    #[test]
    fn test_all_nodes_declared() {
        let dir = tempfile::tempdir().unwrap();
        let config = NodeConfig { input_dir: dir.path().to_path_buf(), ..NodeConfig::default() };
        let defs = node_registry(&config).unwrap();
        let names: Vec<_> = defs.iter().map(|d| d.type_name).collect();
        assert_eq!(names, vec![MODEL_LOADER, GENERATE, VOICE_CLONE, CLONE_FROM_AUDIO, SIMPLE]);
        assert!(defs.iter().all(|d| d.category == CATEGORY));
        assert_eq!(find(&defs, MODEL_LOADER).output, SlotKind::Model);
    }

    #[test]
    fn test_reference_choices_from_input_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = NodeConfig { input_dir: dir.path().to_path_buf(), ..NodeConfig::default() };

        let defs = node_registry(&config).unwrap();
        let slot = &find(&defs, VOICE_CLONE).inputs[2];
        assert_eq!(
            slot.kind,
            SlotKind::Choice { options: vec![NO_AUDIO_FILES.to_string()], default: None }
        );

        std::fs::write(dir.path().join("me.flac"), b"x").unwrap();
        let defs = node_registry(&config).unwrap();
        let slot = &find(&defs, VOICE_CLONE).inputs[2];
        assert_eq!(slot.kind, SlotKind::Choice { options: vec!["me.flac".into()], default: None });
    }

    #[test]
    fn test_voice_slot_follows_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config =
            NodeConfig { input_dir: dir.path().to_path_buf(), ..NodeConfig::default() };
        let defs = node_registry(&config).unwrap();
        assert!(matches!(find(&defs, SIMPLE).inputs[1].kind, SlotKind::Text { .. }));

        config.voices = vec!["alba".into(), "jean".into()];
        let defs = node_registry(&config).unwrap();
        assert_eq!(
            find(&defs, GENERATE).inputs[2].kind,
            SlotKind::Choice {
                options: vec!["alba".into(), "jean".into()],
                default: Some("alba".into())
            }
        );
    }

    #[test]
    fn test_serializes_for_host() {
        let dir = tempfile::tempdir().unwrap();
        let config = NodeConfig { input_dir: dir.path().to_path_buf(), ..NodeConfig::default() };
        let json = serde_json::to_value(node_registry(&config).unwrap()).unwrap();
        let loader = &json[0];
        assert_eq!(loader["type_name"], "PocketTTSModelLoader");
        assert_eq!(loader["inputs"][0]["name"], "precision");
        assert_eq!(loader["inputs"][0]["type"], "choice");
        assert_eq!(loader["inputs"][0]["options"][2], "bfloat16");
        assert_eq!(loader["output"]["type"], "model");
    }
}

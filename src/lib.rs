//! # pocket-tts-nodes
//!
//! Node-graph adapter for the Pocket TTS engine. The crate does no synthesis
//! itself; it caches loaded models and voice states, converts audio between
//! the host's tensor layout and the engine's flat mono buffers, and routes
//! node inputs to engine calls.
//!
//! ## Quick start
//!
//! ```ignore
//! use pocket_tts_nodes::{NodeConfig, PocketTtsNodes, Precision};
//!
//! // `loader` implements `EngineLoader` over the real engine.
//! let nodes = PocketTtsNodes::new(loader, NodeConfig::from_file("pocket_tts.json".as_ref())?);
//!
//! let model = nodes.load_model(Precision::Float32)?;
//! let audio = nodes.generate(&model, "Hello from Rust!", "alba")?;
//! assert_eq!(audio.waveform.shape[..2], [1, 1]);
//! ```
//!
//! ## Nodes
//! | Type name              | Method                                        |
//! |------------------------|-----------------------------------------------|
//! | `PocketTTSModelLoader` | [`PocketTtsNodes::load_model`]                |
//! | `PocketTTSGenerate`    | [`PocketTtsNodes::generate`]                  |
//! | `PocketTTSVoiceClone`  | [`PocketTtsNodes::voice_clone`]               |
//! | `PocketTTSClone`       | [`PocketTtsNodes::clone_from_audio`]          |
//! | `PocketTTSSimple`      | [`PocketTtsNodes::generate_simple`]           |
//!
//! Logging goes through `tracing`; install a subscriber in the host process
//! to see model loads, voice derivations and generation timings.

pub mod audio;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod nodes;
pub mod registry;
pub mod voice;

#[cfg(test)]
pub(crate) mod testing;

// ─── Re-exports for convenience ─────────────────────────────────────────────

pub use audio::{EngineAudio, HostAudio, Waveform};
pub use config::NodeConfig;
pub use engine::{AudioPrompt, EngineLoader, LoadedModel, ModelKey, Precision, SynthesisEngine};
pub use error::{NodeError, NodeResult};
pub use nodes::PocketTtsNodes;
pub use voice::VoiceSource;

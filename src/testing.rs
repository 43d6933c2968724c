//! In-process stand-in for the synthesis engine, used by unit tests.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use anyhow::{bail, Result};
use parking_lot::Mutex;

use crate::engine::{AudioPrompt, EngineLoader, Precision, SynthesisEngine};

pub(crate) const MOCK_SAMPLE_RATE: u32 = 24_000;

/// Counters and switches shared between a loader and every engine it builds.
#[derive(Debug, Default)]
pub(crate) struct MockState {
    pub loads: AtomicUsize,
    pub derivations: AtomicUsize,
    pub generations: AtomicUsize,
    /// Every prompt passed to `get_state_for_audio_prompt`, with whether the
    /// file existed at call time (always `true` for remote references).
    pub prompts: Mutex<Vec<(String, bool)>>,
    pub fail_load: Mutex<bool>,
    pub fail_derive: Mutex<bool>,
    pub fail_generate: Mutex<bool>,
}

impl MockState {
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn derivations(&self) -> usize {
        self.derivations.load(Ordering::SeqCst)
    }

    pub fn generations(&self) -> usize {
        self.generations.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<(String, bool)> {
        self.prompts.lock().last().cloned()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MockVoice {
    pub prompt: String,
    pub precision: Precision,
}

#[derive(Debug)]
pub(crate) struct MockEngine {
    pub precision: Precision,
    state: Arc<MockState>,
}

impl SynthesisEngine for MockEngine {
    type VoiceState = MockVoice;

    fn sample_rate(&self) -> u32 {
        MOCK_SAMPLE_RATE
    }

    fn with_precision(mut self, precision: Precision) -> Result<Self> {
        self.precision = precision;
        Ok(self)
    }

    fn get_state_for_audio_prompt(&self, prompt: AudioPrompt<'_>) -> Result<MockVoice> {
        let existed = match prompt {
            AudioPrompt::Reference(_) => true,
            AudioPrompt::File(path) => path.is_file(),
        };
        self.state.prompts.lock().push((prompt.to_string(), existed));
        self.state.derivations.fetch_add(1, Ordering::SeqCst);
        if *self.state.fail_derive.lock() {
            bail!("mock engine: cannot analyse {}", prompt);
        }
        Ok(MockVoice { prompt: prompt.to_string(), precision: self.precision })
    }

    fn generate_audio(&self, _state: &MockVoice, text: &str) -> Result<Vec<f32>> {
        self.state.generations.fetch_add(1, Ordering::SeqCst);
        if *self.state.fail_generate.lock() {
            bail!("mock engine: generation failed");
        }
        Ok(vec![0.1; text.chars().count() * 10])
    }
}

#[derive(Debug)]
pub(crate) struct MockLoader {
    pub available: bool,
    pub state: Arc<MockState>,
}

impl MockLoader {
    pub fn new() -> Self {
        Self { available: true, state: Arc::new(MockState::default()) }
    }

    pub fn unavailable() -> Self {
        Self { available: false, ..Self::new() }
    }
}

impl EngineLoader for MockLoader {
    type Engine = MockEngine;

    fn dependency(&self) -> &str {
        "pocket-tts"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn load_model(&self) -> Result<MockEngine> {
        self.state.loads.fetch_add(1, Ordering::SeqCst);
        if *self.state.fail_load.lock() {
            bail!("mock engine: weights missing");
        }
        Ok(MockEngine { precision: Precision::Float32, state: Arc::clone(&self.state) })
    }
}

//! Model and voice-state caches.
//!
//! Both caches are plain keyed maps that grow for the lifetime of their owner
//! and are never evicted. Each key owns a [`OnceCell`], so:
//!
//! - a value is built at most once per key, even under concurrent first use;
//! - building one key never blocks lookups of another;
//! - a failed build drops its slot and the next call tries again.

use std::{collections::HashMap, hash::Hash, sync::Arc};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::{
    audio::StagedWav,
    engine::{AudioPrompt, EngineLoader, LoadedModel, ModelKey, Precision, SynthesisEngine},
    error::{NodeError, NodeResult},
    voice::VoiceSource,
};

// ─────────────────────────────────────────────────────────────────────────────
// Keyed once-cells
// ─────────────────────────────────────────────────────────────────────────────

struct KeyedCache<K, V> {
    slots: Mutex<HashMap<K, Arc<OnceCell<Arc<V>>>>>,
}

impl<K: Eq + Hash + Clone, V> KeyedCache<K, V> {
    fn new() -> Self {
        Self { slots: Mutex::new(HashMap::new()) }
    }

    fn get_or_try_init<E>(&self, key: K, init: impl FnOnce() -> Result<V, E>) -> Result<Arc<V>, E> {
        // Hold the map lock only long enough to fetch the slot.
        let slot = Arc::clone(self.slots.lock().entry(key.clone()).or_default());
        let result = slot.get_or_try_init(|| init().map(Arc::new)).cloned();
        if result.is_err() {
            self.discard_empty(&key, &slot);
        }
        result
    }

    /// Remove `slot` if it is still empty and no other caller is waiting on it.
    fn discard_empty(&self, key: &K, slot: &Arc<OnceCell<Arc<V>>>) {
        let mut slots = self.slots.lock();
        let unused = slots.get(key).is_some_and(|current| {
            Arc::ptr_eq(current, slot) && current.get().is_none() && Arc::strong_count(current) == 2
        });
        if unused {
            slots.remove(key);
        }
    }

    fn get(&self, key: &K) -> Option<Arc<V>> {
        self.slots.lock().get(key).and_then(|slot| slot.get().cloned())
    }

    fn len(&self) -> usize {
        self.slots.lock().values().filter(|slot| slot.get().is_some()).count()
    }

    #[cfg(test)]
    fn slot_count(&self) -> usize {
        self.slots.lock().len()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Model cache
// ─────────────────────────────────────────────────────────────────────────────

/// Loads each engine configuration once and hands out shared handles.
pub struct ModelCache<L: EngineLoader> {
    loader: L,
    available: bool,
    models: KeyedCache<ModelKey, L::Engine>,
}

impl<L: EngineLoader> ModelCache<L> {
    /// Probes engine availability once; the answer holds for the cache's lifetime.
    pub fn new(loader: L) -> Self {
        let available = loader.is_available();
        if !available {
            tracing::warn!(dependency = loader.dependency(), "synthesis engine unavailable");
        }
        Self { loader, available, models: KeyedCache::new() }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Fails with a configuration error when the engine is missing.
    pub fn ensure_available(&self) -> NodeResult<()> {
        if self.available {
            Ok(())
        } else {
            Err(NodeError::Configuration { dependency: self.loader.dependency().to_string() })
        }
    }

    pub fn get_or_load(&self, key: ModelKey) -> NodeResult<LoadedModel<L::Engine>> {
        self.ensure_available()?;

        let engine = self.models.get_or_try_init(key, || {
            tracing::info!(model = %key, "loading synthesis model");
            let engine = self.loader.load_model().map_err(NodeError::Engine)?;
            let engine = match key {
                ModelKey::Precision(p) if p != Precision::Float32 => {
                    engine.with_precision(p).map_err(NodeError::Engine)?
                }
                _ => engine,
            };
            tracing::info!(model = %key, sample_rate = engine.sample_rate(), "synthesis model loaded");
            Ok::<_, NodeError>(engine)
        })?;

        Ok(LoadedModel::new(key, engine))
    }

    /// Number of engines loaded so far.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Voice-state cache
// ─────────────────────────────────────────────────────────────────────────────

/// Voice states keyed by the model they were derived with and the source id.
pub struct VoiceCache<E: SynthesisEngine> {
    states: KeyedCache<(ModelKey, String), E::VoiceState>,
}

impl<E: SynthesisEngine> Default for VoiceCache<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: SynthesisEngine> VoiceCache<E> {
    pub fn new() -> Self {
        Self { states: KeyedCache::new() }
    }

    pub fn get_or_build(
        &self,
        model: &LoadedModel<E>,
        source: &VoiceSource,
    ) -> NodeResult<Arc<E::VoiceState>> {
        let id = source.cache_key();
        let key = (model.key(), id.clone());

        if let Some(state) = self.states.get(&key) {
            tracing::debug!(voice = %id, model = %model.key(), "using cached voice state");
            return Ok(state);
        }

        self.states.get_or_try_init(key, || {
            tracing::info!(voice = %id, model = %model.key(), "deriving voice state");
            derive(&**model.engine(), source)
        })
    }

    pub fn get(&self, model: &LoadedModel<E>, source: &VoiceSource) -> Option<Arc<E::VoiceState>> {
        self.states.get(&(model.key(), source.cache_key()))
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn derive<E: SynthesisEngine>(engine: &E, source: &VoiceSource) -> NodeResult<E::VoiceState> {
    match source {
        VoiceSource::Preset { prompt, .. } => engine
            .get_state_for_audio_prompt(AudioPrompt::Reference(prompt))
            .map_err(NodeError::Engine),
        VoiceSource::ReferenceFile { path, .. } => engine
            .get_state_for_audio_prompt(AudioPrompt::File(path))
            .map_err(NodeError::Engine),
        VoiceSource::ReferenceAudio { audio, .. } => {
            // Removed when `staged` drops, whatever the engine returns.
            let staged = StagedWav::write(audio).map_err(NodeError::Staging)?;
            engine
                .get_state_for_audio_prompt(AudioPrompt::File(staged.path()))
                .map_err(NodeError::Engine)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

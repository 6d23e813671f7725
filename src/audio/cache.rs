use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;

use crate::error::{EngineError, Result};
use crate::synth::waveform::render_natural;
use crate::synth::Percussion;

/// Pre-rendered percussion buffers, shared read-only by every playback
pub struct BufferCache {
    sample_rate: f32,
    buffers: HashMap<Percussion, Arc<[f32]>>,
    ready: bool,
}

impl BufferCache {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            buffers: HashMap::new(),
            ready: false,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Render every percussive sound once. Later calls do nothing.
    /// Returns true if this call did the rendering.
    pub fn ensure_ready<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        if self.ready {
            return false;
        }
        for kind in Percussion::all() {
            let buffer = render_natural(kind, self.sample_rate, rng);
            tracing::debug!(sound = kind.name(), samples = buffer.len(), "pre-rendered");
            self.buffers.insert(kind, buffer.into());
        }
        self.ready = true;
        tracing::info!(sounds = self.buffers.len(), "buffer cache ready");
        true
    }

    pub fn get(&self, kind: Percussion) -> Result<Arc<[f32]>> {
        self.buffers
            .get(&kind)
            .cloned()
            .ok_or_else(|| EngineError::MissingResource(kind.name().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::DrumKind;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn miss_before_ready() {
        let cache = BufferCache::new(44100.0);
        assert!(!cache.is_ready());
        assert!(matches!(
            cache.get(Percussion::Drum(DrumKind::Kick)),
            Err(EngineError::MissingResource(_))
        ));
    }

    #[test]
    fn ensure_ready_is_idempotent() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut cache = BufferCache::new(44100.0);
        assert!(cache.ensure_ready(&mut rng));
        let first: Vec<Arc<[f32]>> = Percussion::all().map(|k| cache.get(k).unwrap()).collect();
        for _ in 0..3 {
            assert!(!cache.ensure_ready(&mut rng));
        }
        for (kind, before) in Percussion::all().zip(first) {
            let after = cache.get(kind).unwrap();
            assert!(Arc::ptr_eq(&before, &after));
            assert_eq!(&before[..], &after[..]);
        }
        let kick = cache.get(Percussion::Drum(DrumKind::Kick)).unwrap();
        assert_eq!(kick.len(), 22050);
    }
}

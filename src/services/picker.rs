use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;

/// Chooses which unseen item to introduce next.
pub trait ItemPicker: Send + Sync {
    fn pick(&self, candidates: &[i64]) -> Option<i64>;
}

/// Uniform choice backed by the thread-local generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformPicker;

impl ItemPicker for UniformPicker {
    fn pick(&self, candidates: &[i64]) -> Option<i64> {
        let mut rng = rand::rng();
        candidates.choose(&mut rng).copied()
    }
}

/// Uniform choice with a reproducible sequence.
#[derive(Debug)]
pub struct SeededPicker {
    rng: Mutex<StdRng>,
}

impl SeededPicker {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl ItemPicker for SeededPicker {
    fn pick(&self, candidates: &[i64]) -> Option<i64> {
        let mut rng = self.rng.lock();
        candidates.choose(&mut *rng).copied()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LowestIdPicker;

impl ItemPicker for LowestIdPicker {
    fn pick(&self, candidates: &[i64]) -> Option<i64> {
        candidates.iter().min().copied()
    }
}

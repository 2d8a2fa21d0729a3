use rand::Rng;
use rand::seq::index;
use std::collections::VecDeque;
use std::sync::Arc;

/// Encoded observation: wall flags plus the auxiliary tank/projectile vector.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    /// Row-major wall occupancy; shared between all states of a level.
    pub grid: Arc<[f32]>,
    pub aux: Vec<f32>,
}

/// One transition. Never modified after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Experience {
    pub state: State,
    pub action: usize,
    pub reward: f32,
    pub next_state: State,
}

/// Bounded FIFO of experiences; the oldest entry is evicted on overflow.
#[derive(Debug, Clone)]
pub struct ReplayBuffer {
    capacity: usize,
    entries: VecDeque<Experience>,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        ReplayBuffer {
            capacity,
            entries: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    pub fn push(&mut self, experience: Experience) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(experience);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Experience> {
        self.entries.iter()
    }

    /// Uniform sample of `batch_size` distinct entries, or `None` when the
    /// buffer holds fewer than that.
    pub fn sample<R: Rng>(&self, batch_size: usize, rng: &mut R) -> Option<Vec<&Experience>> {
        if batch_size == 0 || self.entries.len() < batch_size {
            return None;
        }
        let picked = index::sample(rng, self.entries.len(), batch_size);
        Some(picked.iter().map(|i| &self.entries[i]).collect())
    }
}

//! Action-value model seam for the learning tank.
//!
//! The network itself is opaque: anything implementing [`QModel`] can be
//! installed. One model is shared by every learning tank in the process; it
//! is created on first use and can be replaced or dropped explicitly.

use super::replay::{Experience, ReplayBuffer};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Training input with one target value per action.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSample {
    pub grid: Arc<[f32]>,
    pub aux: Vec<f32>,
    pub targets: Vec<f32>,
}

pub trait QModel: Send {
    /// One value per action for the given state.
    fn predict(&self, grid: &[f32], aux: &[f32]) -> Vec<f32>;

    /// Fits the model towards the sample targets.
    fn train(&mut self, batch: &[TrainingSample]);
}

/// Builds training samples with the one-step Bellman backup
/// `reward + gamma * max Q(next_state)` on the taken action. Every other
/// action keeps the model's current prediction as its target.
pub fn bellman_targets(model: &dyn QModel, batch: &[&Experience], gamma: f32) -> Vec<TrainingSample> {
    batch
        .iter()
        .map(|experience| {
            let mut targets = model.predict(&experience.state.grid, &experience.state.aux);
            let next = model.predict(&experience.next_state.grid, &experience.next_state.aux);
            let best_next = next.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let best_next = if best_next.is_finite() { best_next } else { 0.0 };
            if let Some(target) = targets.get_mut(experience.action) {
                *target = experience.reward + gamma * best_next;
            }
            TrainingSample {
                grid: Arc::clone(&experience.state.grid),
                aux: experience.state.aux.clone(),
                targets,
            }
        })
        .collect()
}

/// Linear action-value model over the auxiliary vector plus a bias term.
/// The wall grid is ignored.
#[derive(Debug, Clone)]
pub struct LinearQModel {
    actions: usize,
    features: usize,
    /// `actions` rows of `features + 1` weights, bias last.
    weights: Vec<f32>,
    learning_rate: f32,
}

impl LinearQModel {
    pub fn new(actions: usize, features: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let weights = (0..actions * (features + 1))
            .map(|_| rng.gen_range(-0.01f32..0.01))
            .collect();
        LinearQModel {
            actions,
            features,
            weights,
            learning_rate: 0.001,
        }
    }

    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Aux values truncated or zero-padded to the model width, then the bias.
    fn inputs(&self, aux: &[f32]) -> Vec<f32> {
        let mut x: Vec<f32> = aux.iter().copied().take(self.features).collect();
        x.resize(self.features, 0.0);
        x.push(1.0);
        x
    }

    fn row(&self, action: usize) -> &[f32] {
        let width = self.features + 1;
        &self.weights[action * width..(action + 1) * width]
    }
}

impl QModel for LinearQModel {
    fn predict(&self, _grid: &[f32], aux: &[f32]) -> Vec<f32> {
        let x = self.inputs(aux);
        (0..self.actions)
            .map(|a| self.row(a).iter().zip(&x).map(|(w, v)| w * v).sum::<f32>())
            .collect()
    }

    fn train(&mut self, batch: &[TrainingSample]) {
        if batch.is_empty() {
            return;
        }
        let width = self.features + 1;
        let scale = self.learning_rate / batch.len() as f32;
        for sample in batch {
            let x = self.inputs(&sample.aux);
            let predicted = self.predict(&sample.grid, &sample.aux);
            for (action, (p, t)) in predicted.iter().zip(&sample.targets).enumerate() {
                let error = p - t;
                let row = &mut self.weights[action * width..(action + 1) * width];
                for (w, v) in row.iter_mut().zip(&x) {
                    *w -= scale * error * v;
                }
            }
        }
    }
}

struct ModelSlot {
    model: Box<dyn QModel>,
    passes: u64,
}

/// Cloneable handle to a model shared between learning tanks.
#[derive(Clone)]
pub struct ModelHandle {
    inner: Arc<Mutex<ModelSlot>>,
    training: Arc<AtomicBool>,
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("training", &self.is_training())
            .field("passes", &self.training_passes())
            .finish()
    }
}

/// Holds the training flag for one pass and clears it on drop, unwinding
/// included.
struct TrainingGuard<'a>(&'a AtomicBool);

impl<'a> TrainingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TrainingGuard(flag))
    }
}

impl Drop for TrainingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ModelHandle {
    pub fn new(model: Box<dyn QModel>) -> Self {
        ModelHandle {
            inner: Arc::new(Mutex::new(ModelSlot { model, passes: 0 })),
            training: Arc::new(AtomicBool::new(false)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ModelSlot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn predict(&self, grid: &[f32], aux: &[f32]) -> Vec<f32> {
        self.lock().model.predict(grid, aux)
    }

    /// True while a pass started by [`ModelHandle::train_from`] is running
    /// on any clone of this handle.
    pub fn is_training(&self) -> bool {
        self.training.load(Ordering::Acquire)
    }

    /// Completed training passes.
    pub fn training_passes(&self) -> u64 {
        self.lock().passes
    }

    /// Runs one training pass on a random batch. Returns false, doing
    /// nothing, when another pass holds the training flag or the buffer is
    /// too small. Predictions from other handles wait for the pass to end.
    pub fn train_from<R: Rng>(&self, buffer: &ReplayBuffer, batch_size: usize, gamma: f32, rng: &mut R) -> bool {
        let Some(_guard) = TrainingGuard::acquire(&self.training) else {
            crate::debug_learn!("Training pass skipped, another one is running");
            return false;
        };
        let Some(batch) = buffer.sample(batch_size, rng) else {
            return false;
        };
        let mut slot = self.lock();
        let samples = bellman_targets(slot.model.as_ref(), &batch, gamma);
        slot.model.train(&samples);
        slot.passes += 1;
        info!(target: "learn", "Training pass {} on {} samples", slot.passes, samples.len());
        true
    }
}

static SHARED_MODEL: Mutex<Option<ModelHandle>> = Mutex::new(None);

fn shared_slot() -> MutexGuard<'static, Option<ModelHandle>> {
    SHARED_MODEL.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The process-wide model, creating a [`LinearQModel`] on first use.
pub fn shared_model(actions: usize, features: usize) -> ModelHandle {
    shared_slot()
        .get_or_insert_with(|| {
            info!(target: "learn", "Creating shared linear model ({} actions, {} features)", actions, features);
            ModelHandle::new(Box::new(LinearQModel::new(actions, features, 0)))
        })
        .clone()
}

/// Replaces the process-wide model. Existing handles keep the old one.
pub fn install_shared_model(model: Box<dyn QModel>) -> ModelHandle {
    let handle = ModelHandle::new(model);
    *shared_slot() = Some(handle.clone());
    handle
}

/// Drops the process-wide model; the next [`shared_model`] call builds a new one.
pub fn reset_shared_model() {
    *shared_slot() = None;
}

//! # Range Rescaler
//!
//! Remaps a field's output onto `[-1, 1]` using a scale/bias pair derived
//! in the background from a grid of 2D samples.
//!
//! ## Worker Protocol
//!
//! ```text
//!   trigger ──> idle?  ──yes──> spawn worker ──> sweep ──> commit ──> emit
//!                 │                                 ▲                  │
//!                 no                                │      pending? ───┘
//!                 ▼                                 │        │yes
//!           pending = true ─────────────────────────┴────────┘
//! ```
//!
//! At most one worker thread is alive per rescaler. A trigger that arrives
//! mid-sweep is folded into one more sweep by the running worker, so a
//! change is never lost. Readers copy the scale/bias pair under a read lock
//! and never see a half-written pair.
//!
//! Change listeners of a rescaler run on its worker thread. A sweep that
//! panics commits nothing and leaves the worker idle, so the next trigger
//! starts a fresh one.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::error::{NoiseError, NoiseResult};
use crate::event::{ChangeEvent, Link};
use crate::math::{is_zero_approx, ScaleBias};
use crate::node::{Noise, NoiseRef};

/// Sampling grid of a rescaler.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RescalerConfig {
    /// Grid extent on both axes, starting at 0.
    pub range: f64,
    /// Distance between neighbouring samples.
    pub step: f64,
}

impl Default for RescalerConfig {
    fn default() -> Self {
        Self { range: 16.0, step: 0.5 }
    }
}

/// Upper bound on samples per grid axis.
///
/// A sweep over a denser grid is truncated to this many samples per axis.
pub const MAX_SAMPLES_PER_AXIS: usize = 4096;

impl RescalerConfig {
    /// Checks that a sweep over this grid terminates.
    ///
    /// # Errors
    ///
    /// Returns [`NoiseError::InvalidStep`] unless `step` is finite and
    /// positive, and [`NoiseError::GridTooDense`] if the grid needs more
    /// than [`MAX_SAMPLES_PER_AXIS`] samples per axis.
    #[allow(clippy::cast_precision_loss)]
    pub fn validate(&self) -> NoiseResult<()> {
        validate_step(self.step)?;
        if self.range.is_finite() && (self.range / self.step).ceil() > MAX_SAMPLES_PER_AXIS as f64 {
            return Err(NoiseError::GridTooDense {
                range: self.range,
                step: self.step,
            });
        }
        Ok(())
    }
}

fn validate_step(step: f64) -> NoiseResult<()> {
    if step.is_finite() && step > 0.0 {
        Ok(())
    } else {
        Err(NoiseError::InvalidStep(step))
    }
}

/// Samples per axis for a grid. Non-finite or non-positive ranges are empty.
///
/// Capped at [`MAX_SAMPLES_PER_AXIS`].
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn samples_per_axis(grid: RescalerConfig) -> usize {
    if grid.range.is_finite() && grid.range > 0.0 {
        let wanted = (grid.range / grid.step).ceil();
        if wanted > MAX_SAMPLES_PER_AXIS as f64 {
            tracing::warn!(
                range = grid.range,
                step = grid.step,
                limit = MAX_SAMPLES_PER_AXIS,
                "rescaler grid truncated"
            );
            MAX_SAMPLES_PER_AXIS
        } else {
            wanted as usize
        }
    } else {
        0
    }
}

/// Derives the map sending the sampled `[min, max]` onto `[-1, 1]`.
///
/// Degenerate or empty samples give [`ScaleBias::ZERO`].
fn fit(min: f64, max: f64) -> ScaleBias {
    let span = max - min;
    if !span.is_finite() || is_zero_approx(span) {
        return ScaleBias::ZERO;
    }
    ScaleBias::new(2.0 / span, -((2.0 * min) / span + 1.0))
}

fn join_worker(handle: JoinHandle<()>) {
    if handle.join().is_err() {
        tracing::warn!("rescaler worker panicked; mapping kept from the last completed sweep");
    }
}

/// Marks the worker idle if a sweep unwinds.
struct UnwindGuard<'a>(&'a Shared);

impl Drop for UnwindGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            let mut state = self.0.worker.lock();
            state.running = false;
            state.pending = false;
            self.0.idle.notify_all();
        }
    }
}

#[derive(Default)]
struct WorkerState {
    running: bool,
    pending: bool,
    closed: bool,
    handle: Option<JoinHandle<()>>,
}

struct Shared {
    noise: RwLock<Option<Link>>,
    affine: RwLock<ScaleBias>,
    grid: RwLock<RescalerConfig>,
    worker: Mutex<WorkerState>,
    idle: Condvar,
    sweeps: AtomicU64,
    changed: ChangeEvent,
}

impl Shared {
    fn noise(&self) -> Option<NoiseRef> {
        self.noise.read().as_ref().map(|link| Arc::clone(link.node()))
    }

    /// Starts a worker, or marks the running one for another sweep.
    fn trigger(self: &Arc<Self>) {
        let finished = {
            let mut state = self.worker.lock();
            if state.closed {
                return;
            }
            if state.running {
                state.pending = true;
                tracing::debug!("rescaler sweep coalesced into running worker");
                return;
            }

            let finished = state.handle.take();
            let worker = Arc::clone(self);
            match thread::Builder::new()
                .name("noise-rescaler".into())
                .spawn(move || worker.run())
            {
                Ok(handle) => {
                    state.running = true;
                    state.handle = Some(handle);
                    tracing::debug!("rescaler worker started");
                }
                Err(err) => {
                    tracing::warn!(%err, "failed to spawn rescaler worker");
                }
            }
            finished
        };

        if let Some(handle) = finished {
            join_worker(handle);
        }
    }

    fn run(&self) {
        let _unwind = UnwindGuard(self);
        loop {
            self.sweep();

            let mut state = self.worker.lock();
            if state.pending && !state.closed {
                state.pending = false;
                continue;
            }
            state.running = false;
            state.pending = false;
            self.idle.notify_all();
            return;
        }
    }

    fn sweep(&self) {
        let noise = self.noise();
        let grid = *self.grid.read();
        let count = samples_per_axis(grid);

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut samples = 0usize;
        if let Some(noise) = &noise {
            for i in 0..count {
                #[allow(clippy::cast_precision_loss)]
                let x = i as f64 * grid.step;
                for j in 0..count {
                    #[allow(clippy::cast_precision_loss)]
                    let y = j as f64 * grid.step;
                    let value = noise.noise_2d(x, y);
                    if value < min {
                        min = value;
                    }
                    if value > max {
                        max = value;
                    }
                    samples += 1;
                }
            }
        }

        let affine = if samples == 0 { ScaleBias::ZERO } else { fit(min, max) };
        *self.affine.write() = affine;
        self.sweeps.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(
            samples,
            scale = affine.scale,
            bias = affine.bias,
            "rescaler sweep finished"
        );
        self.changed.emit();
    }
}

/// Node normalizing its wrapped field onto `[-1, 1]`.
///
/// Starts with scale and bias both 0, so it evaluates to 0 until the first
/// sweep commits.
pub struct RescalerNoise {
    shared: Arc<Shared>,
}

impl RescalerNoise {
    /// Creates a rescaler with the default grid.
    #[must_use]
    pub fn new() -> Self {
        Self::from_grid(RescalerConfig::default())
    }

    /// Creates a rescaler with a configured grid.
    ///
    /// # Errors
    ///
    /// Returns [`NoiseError::InvalidStep`] if the step is not finite and
    /// positive.
    pub fn with_config(config: &RescalerConfig) -> NoiseResult<Self> {
        config.validate()?;
        Ok(Self::from_grid(*config))
    }

    fn from_grid(grid: RescalerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                noise: RwLock::new(None),
                affine: RwLock::new(ScaleBias::ZERO),
                grid: RwLock::new(grid),
                worker: Mutex::new(WorkerState::default()),
                idle: Condvar::new(),
                sweeps: AtomicU64::new(0),
                changed: ChangeEvent::new(),
            }),
        }
    }

    /// Replaces the wrapped field and schedules a sweep.
    pub fn set_noise(&self, node: Option<NoiseRef>) {
        let link = node.map(|node| {
            let weak: Weak<Shared> = Arc::downgrade(&self.shared);
            Link::attach(
                node,
                Arc::new(move || {
                    if let Some(shared) = weak.upgrade() {
                        shared.trigger();
                    }
                }),
            )
        });
        let previous = std::mem::replace(&mut *self.shared.noise.write(), link);
        drop(previous);
        self.shared.trigger();
    }

    /// The wrapped field.
    #[must_use]
    pub fn noise(&self) -> Option<NoiseRef> {
        self.shared.noise()
    }

    /// Sets the grid extent and schedules a sweep.
    pub fn set_range(&self, range: f64) {
        self.shared.grid.write().range = range;
        self.shared.trigger();
    }

    /// The grid extent.
    #[must_use]
    pub fn range(&self) -> f64 {
        self.shared.grid.read().range
    }

    /// Sets the sample stride and schedules a sweep.
    ///
    /// # Errors
    ///
    /// Returns [`NoiseError::InvalidStep`] if `step` is not finite and
    /// positive. The stored step is left unchanged.
    pub fn set_step(&self, step: f64) -> NoiseResult<()> {
        validate_step(step)?;
        self.shared.grid.write().step = step;
        self.shared.trigger();
        Ok(())
    }

    /// The sample stride.
    #[must_use]
    pub fn step(&self) -> f64 {
        self.shared.grid.read().step
    }

    /// The multiplier from the last completed sweep.
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.shared.affine.read().scale
    }

    /// The offset from the last completed sweep.
    #[must_use]
    pub fn bias(&self) -> f64 {
        self.shared.affine.read().bias
    }

    /// Whether a worker is currently alive.
    #[must_use]
    pub fn is_working(&self) -> bool {
        self.shared.worker.lock().running
    }

    /// Number of sweeps committed so far.
    #[must_use]
    pub fn sweep_count(&self) -> u64 {
        self.shared.sweeps.load(Ordering::SeqCst)
    }

    /// Blocks until no worker is alive.
    pub fn wait_until_idle(&self) {
        let mut state = self.shared.worker.lock();
        while state.running {
            self.shared.idle.wait(&mut state);
        }
    }

    fn remap(&self, sample: impl FnOnce(&dyn Noise) -> f64) -> f64 {
        let Some(noise) = self.shared.noise() else {
            return 0.0;
        };
        let affine = *self.shared.affine.read();
        affine.apply(sample(noise.as_ref()))
    }
}

impl Default for RescalerNoise {
    fn default() -> Self {
        Self::new()
    }
}

impl Noise for RescalerNoise {
    fn noise_1d(&self, x: f64) -> f64 {
        self.remap(|noise| noise.noise_1d(x))
    }

    fn noise_2d(&self, x: f64, y: f64) -> f64 {
        self.remap(|noise| noise.noise_2d(x, y))
    }

    fn noise_3d(&self, x: f64, y: f64, z: f64) -> f64 {
        self.remap(|noise| noise.noise_3d(x, y, z))
    }

    fn changed(&self) -> &ChangeEvent {
        &self.shared.changed
    }

    fn children(&self) -> Option<Vec<Option<NoiseRef>>> {
        Some(vec![self.noise()])
    }
}

impl Drop for RescalerNoise {
    fn drop(&mut self) {
        let handle = {
            let mut state = self.shared.worker.lock();
            state.closed = true;
            state.handle.take()
        };
        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                tracing::warn!("rescaler dropped from its own worker; not joining");
            } else {
                join_worker(handle);
            }
        }
        let released = self.shared.noise.write().take();
        drop(released);
    }
}

impl fmt::Debug for RescalerNoise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RescalerNoise")
            .field("affine", &*self.shared.affine.read())
            .field("grid", &*self.shared.grid.read())
            .field("working", &self.is_working())
            .field("sweeps", &self.sweep_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_maps_range_onto_unit_interval() {
        let map = fit(-3.0, 5.0);
        assert!((map.apply(5.0) - 1.0).abs() < 1e-12);
        assert!((map.apply(-3.0) + 1.0).abs() < 1e-12);
        assert!(map.apply(1.0).abs() < 1e-12);
    }

    #[test]
    fn test_fit_degenerate_span() {
        assert_eq!(fit(0.25, 0.25), ScaleBias::ZERO);
        assert_eq!(fit(0.25, 0.25 + 1e-7), ScaleBias::ZERO);
    }

    #[test]
    fn test_grid_is_exclusive_of_range() {
        let grid = |range, step| RescalerConfig { range, step };
        assert_eq!(samples_per_axis(grid(16.0, 0.5)), 32);
        assert_eq!(samples_per_axis(grid(1.0, 0.3)), 4);
        assert_eq!(samples_per_axis(grid(0.0, 0.5)), 0);
        assert_eq!(samples_per_axis(grid(-2.0, 0.5)), 0);
        assert_eq!(samples_per_axis(grid(f64::NAN, 0.5)), 0);
    }

    #[test]
    fn test_dense_grid_is_capped_and_rejected() {
        let grid = |range, step| RescalerConfig { range, step };
        assert_eq!(samples_per_axis(grid(1.0e9, 1.0e-9)), MAX_SAMPLES_PER_AXIS);
        assert_eq!(
            samples_per_axis(grid(f64::MAX, f64::MIN_POSITIVE)),
            MAX_SAMPLES_PER_AXIS
        );

        assert!(matches!(
            grid(1.0e9, 1.0e-9).validate(),
            Err(NoiseError::GridTooDense { .. })
        ));
        assert!(grid(4096.0, 1.0).validate().is_ok());
        assert!(grid(4096.5, 1.0).validate().is_err());
    }

    #[test]
    fn test_step_validation() {
        let rescaler = RescalerNoise::new();
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(rescaler.set_step(bad), Err(NoiseError::InvalidStep(_))));
        }
        assert_eq!(rescaler.step(), 0.5);
        assert!(RescalerNoise::with_config(&RescalerConfig { range: 4.0, step: 0.0 }).is_err());
    }

    #[test]
    fn test_defaults() {
        let rescaler = RescalerNoise::default();
        assert_eq!((rescaler.scale(), rescaler.bias()), (0.0, 0.0));
        assert_eq!((rescaler.range(), rescaler.step()), (16.0, 0.5));
        assert!(rescaler.noise().is_none());
        assert_eq!(rescaler.noise_2d(1.0, 1.0), 0.0);
    }

    #[test]
    fn test_unwrapped_sweep_resets_to_zero() {
        let rescaler = RescalerNoise::new();
        rescaler.set_range(2.0);
        rescaler.wait_until_idle();
        assert_eq!(rescaler.sweep_count(), 1);
        assert_eq!((rescaler.scale(), rescaler.bias()), (0.0, 0.0));
        assert!(!rescaler.is_working());
    }
}

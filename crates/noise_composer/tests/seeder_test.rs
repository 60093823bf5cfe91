//! Integration test for deterministic seed propagation.

use noise_composer::{
    AddNoise, ChangeEvent, DeferredQueue, LinearTransformNoise, MixNoise, Noise, NoiseRef,
    NoiseSeeder, ProxyNoise, RescalerConfig, RescalerNoise, Seedable, SimplexNoise, WorldSeed,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Seedable leaf recording every seed it receives.
#[derive(Default)]
struct RecordingLeaf {
    seeds: Mutex<Vec<WorldSeed>>,
    hidden: Option<Arc<RecordingLeaf>>,
    changed: ChangeEvent,
}

impl RecordingLeaf {
    fn received(&self) -> Vec<u64> {
        self.seeds.lock().iter().map(|s| s.value()).collect()
    }
}

impl Noise for RecordingLeaf {
    fn noise_1d(&self, _x: f64) -> f64 {
        0.0
    }

    fn noise_2d(&self, _x: f64, _y: f64) -> f64 {
        0.0
    }

    fn noise_3d(&self, _x: f64, _y: f64, _z: f64) -> f64 {
        0.0
    }

    fn changed(&self) -> &ChangeEvent {
        &self.changed
    }

    fn as_seedable(&self) -> Option<&dyn Seedable> {
        Some(self)
    }
}

impl Seedable for RecordingLeaf {
    fn set_seed(&self, seed: WorldSeed) {
        self.seeds.lock().push(seed);
        self.changed.emit();
    }

    fn seed(&self) -> WorldSeed {
        self.seeds.lock().last().copied().unwrap_or_default()
    }
}

fn leaf() -> Arc<RecordingLeaf> {
    Arc::new(RecordingLeaf::default())
}

/// `Mix(Add(a, shared), Add(shared, b), c)`
fn diamond(a: &Arc<RecordingLeaf>, shared: &Arc<RecordingLeaf>, b: &Arc<RecordingLeaf>, c: &Arc<RecordingLeaf>) -> NoiseRef {
    let left = AddNoise::default();
    left.set_first_noise(Some(Arc::clone(a) as NoiseRef));
    left.set_second_noise(Some(Arc::clone(shared) as NoiseRef));

    let right = AddNoise::default();
    right.set_first_noise(Some(Arc::clone(shared) as NoiseRef));
    right.set_second_noise(Some(Arc::clone(b) as NoiseRef));

    let root = MixNoise::default();
    root.set_first_noise(Some(Arc::new(left) as NoiseRef));
    root.set_second_noise(Some(Arc::new(right) as NoiseRef));
    root.set_selector_noise(Some(Arc::clone(c) as NoiseRef));
    Arc::new(root)
}

#[test]
fn test_shared_leaf_receives_exactly_one_seed() {
    let (a, shared, b, c) = (leaf(), leaf(), leaf(), leaf());
    let mut seeder = NoiseSeeder::new();
    seeder.set_noise(Some(diamond(&a, &shared, &b, &c)));
    assert_eq!(seeder.queue().drain(), 4);

    seeder.set_seed(WorldSeed::new(5));
    assert_eq!(seeder.queue().drain(), 4);

    for node in [&a, &shared, &b, &c] {
        assert_eq!(node.received().len(), 2, "one seed per propagation");
    }
}

#[test]
fn test_same_structure_same_seed_same_assignment() {
    let first = (leaf(), leaf(), leaf(), leaf());
    let second = (leaf(), leaf(), leaf(), leaf());

    let mut seeder_one = NoiseSeeder::new();
    seeder_one.set_noise(Some(diamond(&first.0, &first.1, &first.2, &first.3)));
    seeder_one.set_seed(WorldSeed::new(2024));

    let mut seeder_two = NoiseSeeder::new();
    seeder_two.set_seed(WorldSeed::new(2024));
    seeder_two.set_noise(Some(diamond(&second.0, &second.1, &second.2, &second.3)));

    seeder_one.queue().drain();
    seeder_two.queue().drain();

    let one: Vec<_> = [&first.0, &first.1, &first.2, &first.3].iter().map(|l| l.seed()).collect();
    let two: Vec<_> = [&second.0, &second.1, &second.2, &second.3].iter().map(|l| l.seed()).collect();
    assert_eq!(one, two);

    let distinct: std::collections::HashSet<_> = one.iter().collect();
    assert_eq!(distinct.len(), 4, "each leaf draws its own value");
}

#[test]
fn test_different_seeds_give_different_assignments() {
    let (a, shared, b, c) = (leaf(), leaf(), leaf(), leaf());
    let mut seeder = NoiseSeeder::new();
    seeder.set_noise(Some(diamond(&a, &shared, &b, &c)));
    seeder.set_seed(WorldSeed::new(1));
    seeder.queue().drain();
    let before = a.seed();

    seeder.set_seed(WorldSeed::new(2));
    seeder.queue().drain();
    assert_ne!(a.seed(), before);
}

#[test]
fn test_dispatch_is_deferred() {
    let target = leaf();
    let mut seeder = NoiseSeeder::new();
    seeder.set_noise(Some(Arc::clone(&target) as NoiseRef));
    seeder.set_seed(WorldSeed::new(9));

    assert!(target.received().is_empty(), "nothing applied before drain");
    assert_eq!(seeder.queue().pending(), 2);
    assert_eq!(seeder.queue().drain(), 2);
    assert_eq!(target.received().len(), 2);
    assert_eq!(seeder.queue().drain(), 0);
}

#[test]
fn test_leaf_internals_are_not_expanded() {
    let inner = leaf();
    let outer = Arc::new(RecordingLeaf {
        hidden: Some(Arc::clone(&inner)),
        ..RecordingLeaf::default()
    });
    assert!(outer.hidden.is_some());

    let mut seeder = NoiseSeeder::new();
    seeder.set_noise(Some(Arc::clone(&outer) as NoiseRef));
    seeder.queue().drain();

    assert_eq!(outer.received().len(), 1);
    assert!(inner.received().is_empty());
}

#[test]
fn test_every_structural_kind_is_traversed() {
    let target = Arc::new(SimplexNoise::default());

    let proxy = Arc::new(ProxyNoise::new());
    proxy.set_source(Some(Arc::clone(&target) as NoiseRef));
    let rescaler = Arc::new(
        RescalerNoise::with_config(&RescalerConfig { range: 2.0, step: 1.0 }).unwrap(),
    );
    rescaler.set_noise(Some(Arc::clone(&proxy) as NoiseRef));
    let transform = Arc::new(LinearTransformNoise::default());
    transform.set_inner_noise(Some(Arc::clone(&rescaler) as NoiseRef));

    let mut seeder = NoiseSeeder::new();
    seeder.set_seed(WorldSeed::new(77));
    seeder.set_noise(Some(Arc::clone(&transform) as NoiseRef));
    assert_eq!(seeder.queue().drain(), 1);
    assert_ne!(target.seed(), WorldSeed::default());

    rescaler.wait_until_idle();
}

#[test]
fn test_seeders_can_share_one_queue() {
    let queue = DeferredQueue::new();
    let (x, y) = (leaf(), leaf());

    let mut first = NoiseSeeder::with_queue(queue.clone());
    let mut second = NoiseSeeder::with_queue(queue.clone());
    first.set_noise(Some(Arc::clone(&x) as NoiseRef));
    second.set_noise(Some(Arc::clone(&y) as NoiseRef));

    assert_eq!(queue.pending(), 2);
    assert_eq!(queue.drain(), 2);
    assert_eq!(x.received().len(), 1);
    assert_eq!(y.received().len(), 1);
    assert_eq!(x.seed(), y.seed(), "same seed and shape give the same draw");
}

#[test]
fn test_clearing_root_stops_propagation() {
    let target = leaf();
    let mut seeder = NoiseSeeder::new();
    seeder.set_noise(Some(Arc::clone(&target) as NoiseRef));
    seeder.queue().drain();

    seeder.set_noise(None);
    seeder.set_seed(WorldSeed::new(3));
    assert_eq!(seeder.queue().pending(), 0);
    assert!(seeder.noise().is_none());
    assert_eq!(seeder.seed(), WorldSeed::new(3));
}

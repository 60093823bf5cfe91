//! End-to-end tests over composed noise graphs.

use noise_composer::{
    catalog, AddNoise, AffineNoise, ChangeEvent, ClampNoise, ComposerConfig, ConstantNoise,
    Curve, CurveNoise, LinearTransformNoise, MixNoise, MultiplyNoise, Noise, NoiseError,
    NoiseRef, NoiseSeeder, Operator, ProxyNoise, RescalerNoise, Seedable, SelectNoise,
    SimplexNoise, Transform2D, Vec2, Vec3, WorldSeed,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counts evaluations; the field is `x + 2y + 3z`.
#[derive(Default)]
struct CountingSource {
    calls: AtomicUsize,
    changed: ChangeEvent,
}

impl CountingSource {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Noise for CountingSource {
    fn noise_1d(&self, x: f64) -> f64 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        x
    }

    fn noise_2d(&self, x: f64, y: f64) -> f64 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        x + 2.0 * y
    }

    fn noise_3d(&self, x: f64, y: f64, z: f64) -> f64 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        x + 2.0 * y + 3.0 * z
    }

    fn changed(&self) -> &ChangeEvent {
        &self.changed
    }
}

/// Piecewise-linear curve through `(0, 0)`, `(0.5, 1)`, `(1, 0)`.
#[derive(Default)]
struct TentCurve {
    changed: ChangeEvent,
}

impl Curve for TentCurve {
    fn sample_baked(&self, offset: f64) -> f64 {
        let t = offset.clamp(0.0, 1.0);
        if t < 0.5 {
            t * 2.0
        } else {
            (1.0 - t) * 2.0
        }
    }

    fn changed(&self) -> &ChangeEvent {
        &self.changed
    }
}

fn constant(value: f64) -> NoiseRef {
    Arc::new(ConstantNoise::with_value(value))
}

fn counter_on(node: &dyn Noise) -> Arc<AtomicUsize> {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    node.changed().connect(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    hits
}

#[test]
fn test_proxy_deduplicates_shared_subgraph() {
    let source = Arc::new(CountingSource::default());
    let proxy: NoiseRef = {
        let proxy = ProxyNoise::new();
        proxy.set_source(Some(Arc::clone(&source) as NoiseRef));
        Arc::new(proxy)
    };

    let doubled = AffineNoise::default();
    doubled.set_source(Some(Arc::clone(&proxy)));
    doubled.set_scale(2.0);

    let root = AddNoise::default();
    root.set_first_noise(Some(Arc::clone(&proxy)));
    root.set_second_noise(Some(Arc::new(doubled) as NoiseRef));

    assert_eq!(root.noise_3d(1.0, 1.0, 1.0), 18.0);
    assert_eq!(source.calls(), 1, "shared subgraph evaluated once");

    assert_eq!(root.noise_3dv(Vec3::new(1.0, 1.0, 1.0)), 18.0);
    assert_eq!(source.calls(), 1);

    assert_eq!(root.noise_3d(2.0, 1.0, 1.0), 21.0);
    assert_eq!(source.calls(), 2);
}

#[test]
fn test_change_reaches_root_once_per_parent() {
    let leaf = Arc::new(SimplexNoise::new(WorldSeed::new(3)));
    let shared: NoiseRef = leaf.clone();

    let root = MultiplyNoise::default();
    root.set_first_noise(Some(Arc::clone(&shared)));
    root.set_second_noise(Some(Arc::clone(&shared)));
    let hits = counter_on(&root);

    leaf.set_seed(WorldSeed::new(4));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_change_propagates_through_every_structural_kind() {
    let leaf = Arc::new(ConstantNoise::default());

    let proxy = Arc::new(ProxyNoise::new());
    proxy.set_source(Some(Arc::clone(&leaf) as NoiseRef));

    let transform = Arc::new(LinearTransformNoise::default());
    transform.set_inner_noise(Some(Arc::clone(&proxy) as NoiseRef));

    let clamp = Arc::new(ClampNoise::default());
    clamp.set_source(Some(Arc::clone(&transform) as NoiseRef));

    let root = MixNoise::default();
    root.set_selector_noise(Some(Arc::clone(&clamp) as NoiseRef));
    let hits = counter_on(&root);

    leaf.set_value(0.5);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(proxy.noise_1d(0.0), 0.5, "proxy cache was invalidated");
}

#[test]
fn test_partially_wired_graph_still_evaluates() {
    let select = SelectNoise::default();
    select.set_second_noise(Some(constant(0.9)));
    // Empty selector reads 0, which is not below the default threshold 0
    assert_eq!(select.noise_2d(5.0, 5.0), 0.9);

    let mix = MixNoise::default();
    mix.set_first_noise(Some(constant(1.0)));
    // Empty selector reads 0, so the ratio is one half
    assert_eq!(mix.noise_1d(0.0), 0.5);
}

#[test]
fn test_invalid_operand_index_is_reported() {
    let add = AddNoise::default();
    add.set_operand(0, Some(constant(1.0))).unwrap();

    let err = add.set_operand(2, Some(constant(5.0))).unwrap_err();
    assert_eq!(err, NoiseError::InvalidIndex { index: 2, arity: 2 });
    assert_eq!(add.noise_1d(0.0), 1.0);
}

#[test]
fn test_closure_operator_generalizes_arity() {
    let mean: Operator<4, _> = Operator::new(|a: &[f64; 4]| a.iter().sum::<f64>() / 4.0);
    for (slot, value) in [1.0, 2.0, 3.0, 6.0].into_iter().enumerate() {
        mean.set_operand(slot, Some(constant(value))).unwrap();
    }
    assert_eq!(mean.operand_count(), 4);
    assert_eq!(mean.noise_2d(0.0, 0.0), 3.0);
}

#[test]
fn test_transform_rewrites_before_delegating() {
    let simplex = Arc::new(SimplexNoise::new(WorldSeed::new(11)));
    let transform = LinearTransformNoise::default();
    transform.set_inner_noise(Some(Arc::clone(&simplex) as NoiseRef));
    transform.set_scale(2.0);
    transform.set_bias(0.5);
    transform.set_transform_2d(Transform2D::rotation(std::f64::consts::FRAC_PI_2));

    assert_eq!(transform.noise_1d(1.2), simplex.noise_1d(2.0 * 1.2 + 0.5));
    let rotated = Transform2D::rotation(std::f64::consts::FRAC_PI_2).xform(Vec2::new(0.3, 0.7));
    assert_eq!(transform.noise_2d(0.3, 0.7), simplex.noise_2dv(rotated));
}

#[test]
fn test_curve_modifier_with_stub_curve() {
    let curve = Arc::new(TentCurve::default());
    let source = Arc::new(ConstantNoise::default());
    let node = CurveNoise::default();
    node.set_source(Some(Arc::clone(&source) as NoiseRef));
    node.set_curve(Some(curve.clone() as Arc<dyn Curve>));

    source.set_value(0.0);
    assert_eq!(node.noise_1d(0.0), 1.0);
    source.set_value(-1.0);
    assert_eq!(node.noise_1d(0.0), 0.0);
    source.set_value(0.5);
    assert_eq!(node.noise_1d(0.0), 0.5);

    let hits = counter_on(&node);
    curve.changed.emit();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_normalized_pipeline_end_to_end() {
    let config = ComposerConfig::from_toml_str(
        "[rescaler]\nrange = 8.0\nstep = 0.25\n\n[seeder]\nseed = 1234\n",
    )
    .unwrap();

    let simplex = Arc::new(SimplexNoise::default());
    let rescaler = Arc::new(RescalerNoise::with_config(&config.rescaler).unwrap());
    rescaler.set_noise(Some(Arc::clone(&simplex) as NoiseRef));

    let mut seeder = NoiseSeeder::with_config(&config.seeder);
    seeder.set_noise(Some(Arc::clone(&rescaler) as NoiseRef));
    assert_eq!(seeder.queue().drain(), 1);
    assert_ne!(simplex.seed(), WorldSeed::default());

    rescaler.wait_until_idle();
    for i in 0..32 {
        for j in 0..32 {
            let (x, y) = (f64::from(i) * 0.25, f64::from(j) * 0.25);
            let v = rescaler.noise_2d(x, y);
            assert!((-1.0 - 1e-9..=1.0 + 1e-9).contains(&v), "({x}, {y}) -> {v}");
        }
    }
}

#[test]
fn test_catalog_lists_every_kind() {
    let names: Vec<_> = catalog().iter().map(|d| d.name).collect();
    for expected in [
        "ConstantNoise",
        "ClampNoise",
        "CurveNoise",
        "NoiseProxy",
        "LinearTransformNoise",
        "RescalerNoise",
        "NoiseSeeder",
    ] {
        assert!(names.contains(&expected), "missing {expected}");
    }
}

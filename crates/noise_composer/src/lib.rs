//! # Noise Composer
//!
//! Composable procedural noise graphs.
//!
//! ## Design Principles
//!
//! 1. **Shared DAG**: nodes are `Arc`-shared; one subgraph can feed many parents
//! 2. **Push invalidation**: every mutation emits a change event that travels
//!    up to the root exactly once per parent
//! 3. **Never fails to evaluate**: a missing operand contributes zero
//! 4. **Deterministic**: same graph + same seed = same leaf seeds
//!
//! ## Core Components
//!
//! - [`Noise`]: the evaluable node contract
//! - [`Operator`]: fixed-arity node over a combining function, and the
//!   catalog built on it in [`operators`]
//! - [`ProxyNoise`]: per-coordinate memoization of a shared subgraph
//! - [`LinearTransformNoise`]: coordinate rewriting before delegation
//! - [`RescalerNoise`]: background normalization onto `[-1, 1]`
//! - [`NoiseSeeder`]: deterministic seed propagation to leaf generators
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use noise_composer::{AddNoise, ConstantNoise, Noise, NoiseRef};
//!
//! let add = AddNoise::default();
//! add.set_first_noise(Some(Arc::new(ConstantNoise::with_value(0.25)) as NoiseRef));
//! add.set_second_noise(Some(Arc::new(ConstantNoise::with_value(0.5)) as NoiseRef));
//! assert_eq!(add.noise_2d(3.0, 4.0), 0.75);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod catalog;
pub mod config;
pub mod error;
pub mod event;
pub mod generators;
pub mod math;
pub mod node;
pub mod operator;
pub mod operators;
pub mod proxy;
pub mod rescaler;
pub mod seeder;
pub mod transform;

pub use catalog::{catalog, describe, NodeDescriptor, ParamDescriptor, ParamKind};
pub use config::ComposerConfig;
pub use error::{NoiseError, NoiseResult};
pub use event::{ChangeEvent, Link, Listener, ListenerId};
pub use generators::SimplexNoise;
pub use math::{Transform2D, Transform3D, Vec2, Vec3};
pub use node::{node_id, NodeId, Noise, NoiseRef, Seedable};
pub use operator::{Combine, Operator};
pub use operators::{
    AbsoluteNoise, AddNoise, AffineNoise, ClampNoise, ConstantNoise, Curve, CurveNoise,
    InvertNoise, MaxNoise, MinNoise, MixNoise, MultiplyNoise, PowerNoise, SelectNoise,
};
pub use proxy::ProxyNoise;
pub use rescaler::{RescalerConfig, RescalerNoise, MAX_SAMPLES_PER_AXIS};
pub use seeder::{DeferredQueue, NoiseSeeder, SeederConfig, WorldSeed};
pub use transform::{CoordinateTransform, LinearTransformNoise, TransformNoise};

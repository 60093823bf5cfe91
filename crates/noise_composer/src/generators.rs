//! # Simplex Leaf Generator
//!
//! A seedable leaf for building graphs end to end.
//!
//! ## Determinism Guarantee
//!
//! Given the same [`WorldSeed`], the generator produces exactly the same
//! values on any platform. The permutation table is shuffled with
//! `ChaCha8`, never with an OS entropy source.
//!
//! 1D samples are the `y = 0` slice of the 2D field.

use std::fmt;

use parking_lot::RwLock;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::event::ChangeEvent;
use crate::node::{Noise, Seedable};
use crate::seeder::WorldSeed;

/// Skewing factor for the 2D simplex grid, `(sqrt(3) - 1) / 2`.
const F2: f64 = 0.366_025_403_784_438_6;
/// Unskewing factor for the 2D simplex grid, `(3 - sqrt(3)) / 6`.
const G2: f64 = 0.211_324_865_405_187_1;
/// Skewing factor for the 3D simplex grid.
const F3: f64 = 1.0 / 3.0;
/// Unskewing factor for the 3D simplex grid.
const G3: f64 = 1.0 / 6.0;

/// Vertices of a regular 12-gon.
const GRAD2: [[f64; 2]; 12] = [
    [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [-1.0, 1.0],
    [-1.0, 0.0], [-1.0, -1.0], [0.0, -1.0], [1.0, -1.0],
    [1.0, 0.0], [0.0, 1.0], [-1.0, 0.0], [0.0, -1.0],
];

/// Midpoints of the cube's edges.
const GRAD3: [[f64; 3]; 12] = [
    [1.0, 1.0, 0.0], [-1.0, 1.0, 0.0], [1.0, -1.0, 0.0], [-1.0, -1.0, 0.0],
    [1.0, 0.0, 1.0], [-1.0, 0.0, 1.0], [1.0, 0.0, -1.0], [-1.0, 0.0, -1.0],
    [0.0, 1.0, 1.0], [0.0, -1.0, 1.0], [0.0, 1.0, -1.0], [0.0, -1.0, -1.0],
];

/// Permutation table, doubled to avoid index wrapping.
struct PermutationTable {
    seed: WorldSeed,
    perm: [u8; 512],
}

impl PermutationTable {
    #[allow(clippy::cast_possible_truncation)]
    fn new(seed: WorldSeed) -> Self {
        let mut perm = [0u8; 512];
        for (i, slot) in perm.iter_mut().take(256).enumerate() {
            *slot = i as u8;
        }

        // Fisher-Yates
        let mut rng = ChaCha8Rng::seed_from_u64(seed.value());
        for i in (1..256).rev() {
            let j = rng.gen_range(0..=i);
            perm.swap(i, j);
        }

        perm.copy_within(0..256, 256);
        Self { seed, perm }
    }

    #[inline]
    fn get(&self, index: usize) -> usize {
        usize::from(self.perm[index & 511])
    }
}

/// Lattice cell of a skewed coordinate, wrapped to the table size.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn cell(skewed: f64) -> (i64, usize) {
    let i = skewed.floor() as i64;
    (i, (i & 255) as usize)
}

/// Seedable 2D/3D simplex noise in roughly `[-1, 1]`.
pub struct SimplexNoise {
    table: RwLock<PermutationTable>,
    changed: ChangeEvent,
}

impl SimplexNoise {
    /// Creates a generator from a seed.
    #[must_use]
    pub fn new(seed: WorldSeed) -> Self {
        Self {
            table: RwLock::new(PermutationTable::new(seed)),
            changed: ChangeEvent::new(),
        }
    }

    /// Samples the 2D field.
    #[allow(clippy::cast_precision_loss, clippy::many_single_char_names)]
    #[must_use]
    pub fn sample_2d(&self, x: f64, y: f64) -> f64 {
        let table = self.table.read();

        let skew = (x + y) * F2;
        let (i, ii) = cell(x + skew);
        let (j, jj) = cell(y + skew);

        let unskew = (i + j) as f64 * G2;
        let x0 = x - (i as f64 - unskew);
        let y0 = y - (j as f64 - unskew);

        // Upper or lower triangle
        let (i1, j1) = if x0 > y0 { (1, 0) } else { (0, 1) };

        let x1 = x0 - i1 as f64 + G2;
        let y1 = y0 - j1 as f64 + G2;
        let x2 = x0 - 1.0 + 2.0 * G2;
        let y2 = y0 - 1.0 + 2.0 * G2;

        let gi0 = table.get(ii + table.get(jj));
        let gi1 = table.get(ii + i1 + table.get(jj + j1));
        let gi2 = table.get(ii + 1 + table.get(jj + 1));

        70.0 * (corner_2d(x0, y0, gi0) + corner_2d(x1, y1, gi1) + corner_2d(x2, y2, gi2))
    }

    /// Samples the 3D field.
    #[allow(clippy::cast_precision_loss, clippy::many_single_char_names)]
    #[must_use]
    pub fn sample_3d(&self, x: f64, y: f64, z: f64) -> f64 {
        let table = self.table.read();

        let skew = (x + y + z) * F3;
        let (i, ii) = cell(x + skew);
        let (j, jj) = cell(y + skew);
        let (k, kk) = cell(z + skew);

        let unskew = (i + j + k) as f64 * G3;
        let x0 = x - (i as f64 - unskew);
        let y0 = y - (j as f64 - unskew);
        let z0 = z - (k as f64 - unskew);

        // Which of the six tetrahedra
        let (i1, j1, k1, i2, j2, k2) = if x0 >= y0 {
            if y0 >= z0 {
                (1, 0, 0, 1, 1, 0)
            } else if x0 >= z0 {
                (1, 0, 0, 1, 0, 1)
            } else {
                (0, 0, 1, 1, 0, 1)
            }
        } else if y0 < z0 {
            (0, 0, 1, 0, 1, 1)
        } else if x0 < z0 {
            (0, 1, 0, 0, 1, 1)
        } else {
            (0, 1, 0, 1, 1, 0)
        };

        let x1 = x0 - i1 as f64 + G3;
        let y1 = y0 - j1 as f64 + G3;
        let z1 = z0 - k1 as f64 + G3;
        let x2 = x0 - i2 as f64 + 2.0 * G3;
        let y2 = y0 - j2 as f64 + 2.0 * G3;
        let z2 = z0 - k2 as f64 + 2.0 * G3;
        let x3 = x0 - 1.0 + 3.0 * G3;
        let y3 = y0 - 1.0 + 3.0 * G3;
        let z3 = z0 - 1.0 + 3.0 * G3;

        let gi0 = table.get(ii + table.get(jj + table.get(kk)));
        let gi1 = table.get(ii + i1 + table.get(jj + j1 + table.get(kk + k1)));
        let gi2 = table.get(ii + i2 + table.get(jj + j2 + table.get(kk + k2)));
        let gi3 = table.get(ii + 1 + table.get(jj + 1 + table.get(kk + 1)));

        32.0 * (corner_3d(x0, y0, z0, gi0)
            + corner_3d(x1, y1, z1, gi1)
            + corner_3d(x2, y2, z2, gi2)
            + corner_3d(x3, y3, z3, gi3))
    }
}

#[inline]
fn corner_2d(x: f64, y: f64, hash: usize) -> f64 {
    let t = 0.5 - x * x - y * y;
    if t < 0.0 {
        return 0.0;
    }
    let grad = GRAD2[hash % 12];
    let t2 = t * t;
    t2 * t2 * (x * grad[0] + y * grad[1])
}

#[inline]
fn corner_3d(x: f64, y: f64, z: f64, hash: usize) -> f64 {
    let t = 0.6 - x * x - y * y - z * z;
    if t < 0.0 {
        return 0.0;
    }
    let grad = GRAD3[hash % 12];
    let t2 = t * t;
    t2 * t2 * (x * grad[0] + y * grad[1] + z * grad[2])
}

impl Default for SimplexNoise {
    fn default() -> Self {
        Self::new(WorldSeed::default())
    }
}

impl Noise for SimplexNoise {
    fn noise_1d(&self, x: f64) -> f64 {
        self.sample_2d(x, 0.0)
    }

    fn noise_2d(&self, x: f64, y: f64) -> f64 {
        self.sample_2d(x, y)
    }

    fn noise_3d(&self, x: f64, y: f64, z: f64) -> f64 {
        self.sample_3d(x, y, z)
    }

    fn changed(&self) -> &ChangeEvent {
        &self.changed
    }

    fn as_seedable(&self) -> Option<&dyn Seedable> {
        Some(self)
    }
}

impl Seedable for SimplexNoise {
    fn set_seed(&self, seed: WorldSeed) {
        *self.table.write() = PermutationTable::new(seed);
        self.changed.emit();
    }

    fn seed(&self) -> WorldSeed {
        self.table.read().seed
    }
}

impl fmt::Debug for SimplexNoise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimplexNoise")
            .field("seed", &self.seed())
            .finish_non_exhaustive()
    }
}

// Copyright 2024 Andrew Conway.
// This file is part of ConcreteRLA.
// ConcreteRLA is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteRLA is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteRLA.  If not, see <https://www.gnu.org/licenses/>.


//! Some utility routines using pseudo-random numbers.
//!
//! Everything in this crate takes its random numbers from a caller supplied generator,
//! so that a fixed seed reproduces a run exactly.


use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// The deterministic generator used by the simulation and audit programs.
pub fn seeded_rng(seed:u64) -> ChaCha20Rng { ChaCha20Rng::seed_from_u64(seed) }

/// Derive the seed for the n-th independent stream (e.g. thread or repetition) from a base seed.
/// Uses the splitmix64 finaliser so that nearby inputs give unrelated seeds.
/// ```
/// use rla::random_util::derived_seed;
/// assert_ne!(derived_seed(1,0),derived_seed(1,1));
/// assert_eq!(derived_seed(7,3),derived_seed(7,3));
/// ```
pub fn derived_seed(base:u64,stream:u64) -> u64 {
    let mut z = base.wrapping_add(stream.wrapping_add(1).wrapping_mul(0x9E3779B97F4A7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Make a random permutation of 1..=len, used for imprint identifiers.
/// ```
/// use rla::random_util::{random_permutation_from_one, seeded_rng};
/// let mut p = random_permutation_from_one(10,&mut seeded_rng(3));
/// assert_eq!(10,p.len());
/// p.sort();
/// assert_eq!((1..=10).collect::<Vec<usize>>(),p);
/// ```
pub fn random_permutation_from_one<R:Rng + ?Sized>(len:usize,rng:&mut R) -> Vec<usize> {
    use rand::seq::SliceRandom;
    let mut res : Vec<usize> = (1..=len).collect();
    res.shuffle(rng);
    res
}

/// A uniform draw in [0,1), used for the questionable ballot policies.
pub fn uniform_unit<R:Rng + ?Sized>(rng:&mut R) -> f64 { rng.random::<f64>() }

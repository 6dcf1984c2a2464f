// Copyright 2024 Andrew Conway.
// This file is part of ConcreteRLA.
// ConcreteRLA is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteRLA is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteRLA.  If not, see <https://www.gnu.org/licenses/>.


//! Sampling with replacement, the basic operation of every audit here.


use rand::Rng;
use crate::ballot::BallotId;

/// Draw a ballot uniformly from a population of num_ballots ballots. Successive calls are
/// independent, so the same ballot may come up more than once.
/// ```
/// use rla::monte_carlo::draw_ballot;
/// use rla::random_util::seeded_rng;
/// let mut rng = seeded_rng(1);
/// for _ in 0..100 { assert!(draw_ballot(7,&mut rng).0<7); }
/// ```
pub fn draw_ballot<R:Rng + ?Sized>(num_ballots:usize,rng:&mut R) -> BallotId {
    BallotId(rng.random_range(0..num_ballots))
}

/// Choose an index with probability proportional to its weight. Returns None if all weights are zero.
/// ```
/// use rla::monte_carlo::choose_weighted;
/// use rla::random_util::seeded_rng;
/// let mut rng = seeded_rng(2);
/// assert_eq!(Some(1),choose_weighted(&[0,5,0],&mut rng));
/// assert_eq!(None,choose_weighted(&[0,0],&mut rng));
/// ```
pub fn choose_weighted<R:Rng + ?Sized>(weights:&[usize],rng:&mut R) -> Option<usize> {
    let total : usize = weights.iter().sum();
    if total==0 { return None; }
    let mut togo = rng.random_range(0..total);
    for (i,&w) in weights.iter().enumerate() {
        if togo<w { return Some(i); }
        togo-=w;
    }
    None
}

/// Elements with integer weights, from which weighted choices with replacement are made.
#[derive(Clone)]
pub struct WeightedSampleWithReplacement<E> {
    elements : Vec<E>,
    /// cumulative_weights[i] is the sum of weights of elements 0..=i
    cumulative_weights : Vec<usize>,
}

impl <E> Default for WeightedSampleWithReplacement<E> {
    fn default() -> Self { WeightedSampleWithReplacement{ elements: vec![], cumulative_weights: vec![] } }
}

impl <E:Clone> WeightedSampleWithReplacement<E> {
    /// add an element that could be chosen, with relative weight. Zero weight elements are never chosen.
    pub fn add(&mut self,e:E,weight:usize) {
        let total = self.total_weight();
        self.elements.push(e);
        self.cumulative_weights.push(total+weight);
    }

    pub fn total_weight(&self) -> usize { self.cumulative_weights.last().copied().unwrap_or(0) }

    /// Get a random element. None if nothing has positive weight.
    pub fn get<R:Rng + ?Sized>(&self,rng:&mut R) -> Option<E> {
        let total = self.total_weight();
        if total==0 { return None; }
        let target = rng.random_range(0..total);
        let pos = self.cumulative_weights.partition_point(|&c|c<=target);
        self.elements.get(pos).cloned()
    }
}

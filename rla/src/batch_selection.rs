// Copyright 2024 Andrew Conway.
// This file is part of ConcreteRLA.
// ConcreteRLA is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteRLA is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteRLA.  If not, see <https://www.gnu.org/licenses/>.

//! Choose which batches, and which ballots within them, an audit of real records examines.
//!
//! A lazy comparison audit only needs CVRs for the batches chosen, and a polling audit
//! needs a pull list telling the auditors which ballot to take from which batch.

use std::collections::BTreeMap;
use rand::Rng;
use serde::{Serialize,Deserialize};
use crate::election_records::{BatchKey, CvrRow, ManifestEntry};
use crate::monte_carlo::WeightedSampleWithReplacement;

/// Default seed for choosing batches in a lazy comparison audit.
pub const DEFAULT_BATCH_SEED : u64 = 2368607141;
/// Default seed for choosing ballots within the chosen batches.
pub const DEFAULT_BALLOT_SEED : u64 = 9113645654;

/// The outcome of choosing batches.
#[derive(Debug,Serialize,Deserialize,Clone,PartialEq,Eq,Default)]
pub struct BatchSelection {
    /// How many times each chosen batch was drawn, which is how many ballots to draw from it.
    pub draws : BTreeMap<BatchKey,usize>,
    /// Size of each chosen batch according to the manifest.
    pub sizes : BTreeMap<BatchKey,usize>,
}

impl BatchSelection {
    pub fn num_batches(&self) -> usize { self.draws.len() }
    pub fn contains(&self,batch:&BatchKey) -> bool { self.draws.contains_key(batch) }
    /// Ballots in the chosen batches, i.e. how many CVRs have to be produced.
    pub fn ballots_in_batches(&self) -> usize { self.sizes.values().sum() }
}

/// Make num_draws draws of batches with replacement, with probability proportional to
/// the number of ballots in the batch. This is equivalent to choosing ballots uniformly.
pub fn select_batches<R:Rng + ?Sized>(manifest:&[ManifestEntry],num_draws:usize,rng:&mut R) -> BatchSelection {
    let mut sampler = WeightedSampleWithReplacement::default();
    for entry in manifest { sampler.add(entry,entry.ballot_count); }
    let mut res = BatchSelection::default();
    for _ in 0..num_draws {
        if let Some(entry) = sampler.get(rng) {
            *res.draws.entry(entry.batch.clone()).or_insert(0)+=1;
            res.sizes.insert(entry.batch.clone(),entry.ballot_count);
        }
    }
    res
}

/// For each chosen batch, draw as many positions (1 based) as it had draws, with replacement.
/// Returns the distinct positions chosen, sorted.
pub fn select_ballot_positions<R:Rng + ?Sized>(selection:&BatchSelection,rng:&mut R) -> BTreeMap<BatchKey,Vec<usize>> {
    selection.draws.iter().map(|(batch,&draws)|{
        let size = selection.sizes.get(batch).copied().unwrap_or(0);
        let mut positions : Vec<usize> = if size==0 { vec![] } else { (0..draws).map(|_|rng.random_range(1..=size)).collect() };
        positions.sort_unstable();
        positions.dedup();
        (batch.clone(),positions)
    }).collect()
}

/// One line of a pull sheet.
#[derive(Debug,Serialize,Deserialize,Clone,PartialEq,Eq)]
pub struct PullListEntry {
    #[serde(rename="Batch Name")]
    pub batch : BatchKey,
    #[serde(rename="Ballot Position in Batch")]
    pub position : usize,
}

pub fn pull_list(positions:&BTreeMap<BatchKey,Vec<usize>>) -> Vec<PullListEntry> {
    positions.iter().flat_map(|(batch,p)|p.iter().map(move |&position|PullListEntry{batch:batch.clone(),position})).collect()
}

/// The CVR rows of the chosen batches, as an election office would produce them lazily.
pub fn lazy_cvr(cvr:&[CvrRow],selection:&BatchSelection) -> Vec<CvrRow> {
    cvr.iter().filter(|r|selection.contains(&r.batch)).cloned().collect()
}

/// The rows at the chosen positions. A row's position is its record id; placeholder
/// rows, with non-numeric record ids, are never chosen.
pub fn rows_at_positions(cvr:&[CvrRow],positions:&BTreeMap<BatchKey,Vec<usize>>) -> Vec<CvrRow> {
    cvr.iter().filter(|r|{
        match (positions.get(&r.batch),r.record_id.parse::<usize>()) {
            (Some(p),Ok(position)) => p.binary_search(&position).is_ok(),
            _ => false,
        }
    }).cloned().collect()
}

/// Chosen batches for which there are no CVRs at all.
pub fn batches_missing_cvrs(cvr:&[CvrRow],selection:&BatchSelection) -> Vec<BatchKey> {
    selection.draws.keys().filter(|b|!cvr.iter().any(|r|&r.batch==*b)).cloned().collect()
}

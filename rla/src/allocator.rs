// Copyright 2024 Andrew Conway.
// This file is part of ConcreteRLA.
// ConcreteRLA is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteRLA is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteRLA.  If not, see <https://www.gnu.org/licenses/>.

//! Work out which town, and which batch within that town, a ballot is physically in.
//!
//! Allocation is lazy: a ballot is only placed when an audit or record generation first
//! touches it, and it stays there. Towns are drawn in proportion to the population not
//! yet allocated, so every allocation uses up one voter of the chosen town.
//!
//! An allocator holds mutable counters, so each simulated election needs its own.

use rand::Rng;
use serde::{Serialize,Deserialize};
use thiserror::Error;
use crate::ballot::{Ballot, BallotId, BallotLocation, TownIndex};
use crate::monte_carlo::choose_weighted;
use crate::town_registry::TownRegistry;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AllocationError {
    #[error("Every town has had all its population allocated")]
    PopulationExhausted,
    #[error("Town {0} has no batch with capacity left")]
    NoBatchCapacity(String),
    #[error("Ballot {0} was placed by a polling audit, so has no batch")]
    NoBatchAssigned(BallotId),
}

/// What sort of audit wants the ballot. Only comparison audits need to know the batch.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug,Serialize,Deserialize)]
pub enum AuditKind {
    Polling,
    Comparison,
}

#[derive(Debug,Clone)]
struct BatchState {
    /// Size before any allocation.
    capacity : usize,
    remaining : usize,
    audited : usize,
}

#[derive(Debug,Clone)]
struct TownState {
    remaining_population : usize,
    batches : Vec<BatchState>,
}

/// For one town, the batches that would have to have CVRs produced for a lazy comparison audit.
#[derive(Debug,Serialize,Deserialize,Clone,PartialEq,Eq)]
pub struct FlaggedBatches {
    pub town : String,
    /// Number of batches with at least one audited ballot.
    pub num_batches : usize,
    /// Total static size of those batches.
    pub ballots_in_batches : usize,
}

#[derive(Debug,Clone)]
pub struct StratifiedAllocator {
    registry : TownRegistry,
    towns : Vec<TownState>,
}

impl StratifiedAllocator {
    pub fn new(registry:TownRegistry) -> Self {
        let towns = registry.towns.iter().map(|t|TownState{
            remaining_population: t.population,
            batches: t.batch_sizes().into_iter().map(|capacity|BatchState{capacity,remaining:capacity,audited:0}).collect(),
        }).collect();
        StratifiedAllocator{registry,towns}
    }

    pub fn registry(&self) -> &TownRegistry { &self.registry }

    /// Place the ballot if it has not been placed already, and return where it is.
    pub fn assign_town_and_batch<R:Rng + ?Sized>(&mut self,ballot:&mut Ballot,kind:AuditKind,rng:&mut R) -> Result<BallotLocation,AllocationError> {
        if let Some(location) = ballot.location() { return Ok(location); }
        let town = self.draw_town(rng)?;
        let batch = match kind {
            AuditKind::Polling => None,
            AuditKind::Comparison => Some(self.draw_batch(town,rng)?),
        };
        Ok(ballot.set_location_once(BallotLocation{town,batch}))
    }

    fn draw_town<R:Rng + ?Sized>(&mut self,rng:&mut R) -> Result<TownIndex,AllocationError> {
        let weights : Vec<usize> = self.towns.iter().map(|t|t.remaining_population).collect();
        let town = choose_weighted(&weights,rng).ok_or(AllocationError::PopulationExhausted)?;
        self.towns[town].remaining_population-=1;
        Ok(TownIndex(town))
    }

    /// Uniform over batches, redrawing if the chosen one is full.
    fn draw_batch<R:Rng + ?Sized>(&mut self,town:TownIndex,rng:&mut R) -> Result<usize,AllocationError> {
        let batches = &mut self.towns[town.0].batches;
        if batches.iter().all(|b|b.remaining==0) { return Err(AllocationError::NoBatchCapacity(self.registry.town(town).name.clone())); }
        loop {
            let batch = rng.random_range(0..batches.len());
            let state = &mut batches[batch];
            if state.remaining>0 {
                state.remaining-=1;
                state.audited+=1;
                return Ok(batch);
            }
        }
    }

    pub fn remaining_population(&self,town:TownIndex) -> usize { self.towns[town.0].remaining_population }

    /// (capacity, audited) for each batch in the town.
    pub fn batch_usage(&self,town:TownIndex) -> Vec<(usize,usize)> {
        self.towns[town.0].batches.iter().map(|b|(b.capacity,b.audited)).collect()
    }

    /// For each town in registry order, the batches with at least one audited ballot and
    /// the sum of their original sizes.
    pub fn batches_flagged_for_audit(&self) -> Vec<FlaggedBatches> {
        self.towns.iter().zip(self.registry.towns.iter()).map(|(state,town)|{
            let flagged = state.batches.iter().filter(|b|b.audited>0);
            let (num_batches,ballots_in_batches) = flagged.fold((0,0),|(n,s),b|(n+1,s+b.capacity));
            FlaggedBatches{town:town.name.clone(),num_batches,ballots_in_batches}
        }).collect()
    }
}

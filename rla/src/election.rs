// Copyright 2024 Andrew Conway.
// This file is part of ConcreteRLA.
// ConcreteRLA is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteRLA is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteRLA.  If not, see <https://www.gnu.org/licenses/>.

//! A simulated election: its ballots, and the allocator that knows where they are stored.

use rand::Rng;
use crate::allocator::{AuditKind, StratifiedAllocator};
use crate::ballot::{Ballot, BallotId, BallotLocation};
use crate::population::Population;
use crate::sequential_audit::AuditError;
use crate::town_registry::TownRegistry;

pub struct SimulatedElection {
    pub population : Population,
    pub ballots : Vec<Ballot>,
    /// Owned by this election alone.
    pub allocator : StratifiedAllocator,
}

impl SimulatedElection {
    /// Generate the ballots. If the towns have fewer voters than there are ballots, their
    /// populations are scaled up to match so that every ballot has somewhere to live.
    pub fn new<R:Rng + ?Sized>(population:Population,towns:&TownRegistry,rng:&mut R) -> Self {
        let ballots = population.generate_ballots(rng);
        let towns = if towns.total_population()<population.num_ballots { towns.scaled_to(population.num_ballots) } else { towns.clone() };
        SimulatedElection{population,ballots,allocator:StratifiedAllocator::new(towns)}
    }

    pub fn num_ballots(&self) -> usize { self.ballots.len() }

    /// Find where a ballot is, allocating it if this is the first time it has been touched.
    pub fn locate<R:Rng + ?Sized>(&mut self,id:BallotId,kind:AuditKind,rng:&mut R) -> Result<BallotLocation,AuditError> {
        Ok(self.allocator.assign_town_and_batch(&mut self.ballots[id.0],kind,rng)?)
    }

    /// Give every ballot a town and batch, in id order.
    pub fn locate_all<R:Rng + ?Sized>(&mut self,rng:&mut R) -> Result<(),AuditError> {
        for ballot in &mut self.ballots {
            self.allocator.assign_town_and_batch(ballot,AuditKind::Comparison,rng)?;
        }
        Ok(())
    }
}

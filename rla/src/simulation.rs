// Copyright 2024 Andrew Conway.
// This file is part of ConcreteRLA.
// ConcreteRLA is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteRLA is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteRLA.  If not, see <https://www.gnu.org/licenses/>.

//! Simulate one election and audit it both ways, recording how much work each audit
//! would take and where the ballots would have to be fetched from.

use log::debug;
use rand::Rng;
use serde::{Serialize,Deserialize};
use thiserror::Error;
use crate::allocator::{AuditKind, FlaggedBatches};
use crate::ballot::BallotId;
use crate::ballot_comparison::{ballot_comparison_audit, ComparisonOptions};
use crate::ballot_polling::ballot_polling_audit;
use crate::election::SimulatedElection;
use crate::population::{DiscrepancyCounts, Population, PopulationError};
use crate::sequential_audit::{AuditError, AuditOutcome, AuditParameters, AuditState};
use crate::town_registry::TownRegistry;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    #[error("Invalid population : {0}")]
    Population(#[from] PopulationError),
    #[error("{0}")]
    Audit(#[from] AuditError),
}

/// Everything needed to simulate one election.
#[derive(Clone, Debug, PartialEq,Serialize,Deserialize)]
pub struct SimulationParameters {
    pub num_ballots : usize,
    /// Winner's lead as a percentage of the ballots that are not errors.
    pub margin_percent : f64,
    pub discrepancies : DiscrepancyCounts,
    pub questionable : usize,
    pub audit : AuditParameters,
    pub comparison : ComparisonOptions,
    /// Ballot polling is optional as it is slow for small margins.
    pub run_polling : bool,
}

impl SimulationParameters {
    pub fn population(&self) -> Result<Population,PopulationError> {
        Population::from_margin(self.num_ballots,self.margin_percent,self.discrepancies,self.questionable)
    }
}

/// How one audit method fared on one election.
#[derive(Clone, Debug,Serialize,Deserialize)]
pub struct MethodResult {
    pub state : AuditState,
    pub ballots_audited : usize,
    pub rounds : usize,
    pub statistic : f64,
    /// Ballots fetched from each town, in registry order. Duplicate draws count each time.
    pub ballots_per_town : Vec<usize>,
}

impl MethodResult {
    pub fn success(&self) -> bool { self.state==AuditState::Success }
    pub fn towns_touched(&self) -> usize { self.ballots_per_town.iter().filter(|&&n|n>0).count() }
}

#[derive(Clone, Debug,Serialize,Deserialize)]
pub struct SimulationRun {
    pub comparison : MethodResult,
    pub polling : Option<MethodResult>,
    /// Batches a lazy comparison audit would need CVRs for.
    pub flagged_batches : Vec<FlaggedBatches>,
}

/// Generate an election from the parameters, audit it, and place the audited ballots.
/// Comparison ballots are placed first as they need batches.
pub fn simulate_election<R:Rng + ?Sized>(params:&SimulationParameters,towns:&TownRegistry,rng:&mut R) -> Result<SimulationRun,SimulationError> {
    let population = params.population()?;
    params.audit.validate(population.num_ballots)?;
    let mut election = SimulatedElection::new(population,towns,rng);
    let comparison = ballot_comparison_audit(&election.population,&election.ballots,&params.audit,&params.comparison,rng)?;
    let polling = if params.run_polling { Some(ballot_polling_audit(&election.population,&election.ballots,&params.audit,rng)?) } else { None };
    let comparison = place_sampled(&mut election,comparison,AuditKind::Comparison,rng)?;
    let polling = match polling {
        Some(outcome) => Some(place_sampled(&mut election,outcome,AuditKind::Polling,rng)?),
        None => None,
    };
    debug!("Simulated election : comparison {} ballots, polling {:?} ballots",comparison.ballots_audited,polling.as_ref().map(|p|p.ballots_audited));
    Ok(SimulationRun{comparison,polling,flagged_batches:election.allocator.batches_flagged_for_audit()})
}

fn place_sampled<R:Rng + ?Sized>(election:&mut SimulatedElection,outcome:AuditOutcome,kind:AuditKind,rng:&mut R) -> Result<MethodResult,AuditError> {
    let ballots_per_town = if outcome.ballots_audited==election.num_ballots() {
        // a full hand count touches everyone.
        election.allocator.registry().towns.iter().map(|t|t.population).collect()
    } else {
        count_per_town(election,&outcome.sampled,kind,rng)?
    };
    Ok(MethodResult{state:outcome.state,ballots_audited:outcome.ballots_audited,rounds:outcome.rounds,statistic:outcome.statistic,ballots_per_town})
}

fn count_per_town<R:Rng + ?Sized>(election:&mut SimulatedElection,sampled:&[BallotId],kind:AuditKind,rng:&mut R) -> Result<Vec<usize>,AuditError> {
    let mut res = vec![0;election.allocator.registry().len()];
    for &id in sampled {
        let location = election.locate(id,kind,rng)?;
        res[location.town.0]+=1;
    }
    Ok(res)
}

// Copyright 2024 Andrew Conway.
// This file is part of ConcreteRLA.
// ConcreteRLA is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteRLA is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteRLA.  If not, see <https://www.gnu.org/licenses/>.

//! Produce the records an election office would publish for a simulated election,
//! so that the reconciliation and lazy comparison audit can be exercised.
//!
//! Two sets of CVRs are produced. The first is what is really on the ballots. The second
//! is what the machines recorded, which has the population's discrepancies injected.
//! The manifest comes from the first, the tabulation from the second.

use std::collections::BTreeMap;
use rand::Rng;
use crate::allocator::AllocationError;
use crate::ballot::{Ballot, ErrorKind, TrueVote};
use crate::election::SimulatedElection;
use crate::election_records::{BatchKey, CvrRow, ElectionRecords, ManifestEntry, RecordedChoice, TabulationEntry};
use crate::population::DiscrepancyCounts;
use crate::random_util::random_permutation_from_one;
use crate::sequential_audit::AuditError;

pub const TABULATOR : &str = "TABULATOR1";
pub const COUNTING_GROUP : &str = "Pilot";
pub const BALLOT_TYPE : &str = "BallotType";
pub const MANIFEST_CONTAINER : &str = "Box 1";
pub const MANIFEST_TABULATOR : &str = "Tabulator 1";

/// Everything produced for one simulated election.
#[derive(Debug,Clone)]
pub struct GeneratedRecords {
    /// The truth, as a careful human would read every ballot.
    pub true_cvr : Vec<CvrRow>,
    /// The published records, with the machine's CVRs.
    pub published : ElectionRecords,
}

/// What is really on the ballot, as a CVR would show it.
fn true_choice(ballot:&Ballot) -> RecordedChoice {
    match (ballot.true_vote,ballot.error_kind) {
        (TrueVote::Winner,_) => RecordedChoice::Winner,
        (TrueVote::RunnerUp,_) => RecordedChoice::Loser,
        (_,ErrorKind::Overstatement1) | (_,ErrorKind::Overstatement2) => RecordedChoice::Overvote,
        _ => RecordedChoice::Undervote,
    }
}

/// Allocate every ballot to a batch and produce all the records.
pub fn generate_records<R:Rng + ?Sized>(election:&mut SimulatedElection,rng:&mut R) -> Result<GeneratedRecords,AuditError> {
    election.locate_all(rng)?;
    let imprints = random_permutation_from_one(election.num_ballots(),rng);
    let registry = election.allocator.registry();
    let mut positions : BTreeMap<BatchKey,usize> = BTreeMap::new();
    let mut true_cvr = Vec::with_capacity(election.num_ballots());
    for (ballot,imprint) in election.ballots.iter().zip(imprints) {
        let location = ballot.location().ok_or(AllocationError::NoBatchAssigned(ballot.id))?;
        let batch_index = location.batch.ok_or(AllocationError::NoBatchAssigned(ballot.id))?;
        let town = &registry.town(location.town).name;
        let batch = BatchKey::new(town,batch_index);
        let position = positions.entry(batch.clone()).or_insert(0);
        *position+=1;
        let (winner_flag,runner_up_flag) = true_choice(ballot).flags();
        true_cvr.push(CvrRow{
            sequence_number: (ballot.id.0+1).to_string(),
            tabulator: TABULATOR.to_string(),
            batch,
            record_id: position.to_string(),
            imprint_id: format!("Test-{}-{}",batch_index,imprint),
            counting_group: COUNTING_GROUP.to_string(),
            precinct: town.clone(),
            ballot_type: BALLOT_TYPE.to_string(),
            winner_flag,
            runner_up_flag,
        });
    }
    let machine_cvr = inject_discrepancies(&true_cvr,&election.population.discrepancies);
    let manifest = make_manifest(&true_cvr);
    let tabulation = make_tabulation(&machine_cvr);
    Ok(GeneratedRecords{true_cvr,published:ElectionRecords{manifest,tabulation,cvr:machine_cvr}})
}

/// Change winner and runner up rows in file order until the requested numbers of each
/// discrepancy have been made.
/// ```
/// use rla::election_records::{BatchKey, CvrRow, RecordedChoice};
/// use rla::population::DiscrepancyCounts;
/// use rla::record_generation::inject_discrepancies;
/// let row = |w,r| CvrRow{sequence_number:"1".to_string(),tabulator:"T".to_string(),batch:BatchKey::new("A",0),
///     record_id:"1".to_string(),imprint_id:"x".to_string(),counting_group:"".to_string(),precinct:"".to_string(),
///     ballot_type:"".to_string(),winner_flag:w,runner_up_flag:r};
/// let rows = vec![row(1,0),row(0,1),row(1,0)];
/// let counts = DiscrepancyCounts{overstatement1:1,understatement2:1,..Default::default()};
/// let changed = inject_discrepancies(&rows,&counts);
/// assert_eq!(Some(RecordedChoice::Loser),changed[0].choice());
/// assert_eq!(Some(RecordedChoice::Overvote),changed[1].choice());
/// assert_eq!(Some(RecordedChoice::Winner),changed[2].choice());
/// ```
pub fn inject_discrepancies(rows:&[CvrRow],counts:&DiscrepancyCounts) -> Vec<CvrRow> {
    let mut togo = *counts;
    let mut res = rows.to_vec();
    for row in &mut res {
        match row.choice() {
            Some(RecordedChoice::Winner) => {
                if togo.understatement1>0 { togo.understatement1-=1; row.set_choice(RecordedChoice::Undervote); }
                else if togo.understatement2>0 { togo.understatement2-=1; row.set_choice(RecordedChoice::Loser); }
            }
            Some(RecordedChoice::Loser) => {
                if togo.overstatement1>0 { togo.overstatement1-=1; row.set_choice(RecordedChoice::Overvote); }
                else if togo.overstatement2>0 { togo.overstatement2-=1; row.set_choice(RecordedChoice::Winner); }
            }
            _ => {}
        }
    }
    res
}

/// One manifest line per batch, in batch order.
pub fn make_manifest(cvr:&[CvrRow]) -> Vec<ManifestEntry> {
    let mut counts : BTreeMap<BatchKey,usize> = BTreeMap::new();
    for row in cvr { *counts.entry(row.batch.clone()).or_insert(0)+=1; }
    counts.into_iter().map(|(batch,ballot_count)|ManifestEntry{
        container: MANIFEST_CONTAINER.to_string(),
        tabulator: MANIFEST_TABULATOR.to_string(),
        batch,
        ballot_count,
    }).collect()
}

/// One tabulation line per batch, in batch order. An overvote counts for both candidates.
pub fn make_tabulation(cvr:&[CvrRow]) -> Vec<TabulationEntry> {
    let mut counts : BTreeMap<BatchKey,(usize,usize,usize)> = BTreeMap::new();
    for row in cvr {
        let entry = counts.entry(row.batch.clone()).or_insert((0,0,0));
        entry.0+=1;
        entry.1+=row.winner_flag as usize;
        entry.2+=row.runner_up_flag as usize;
    }
    counts.into_iter().map(|(batch,(size,winner,loser))|TabulationEntry{town:batch.town.clone(),batch,size,winner,loser}).collect()
}

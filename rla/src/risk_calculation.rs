// Copyright 2024 Andrew Conway.
// This file is part of ConcreteRLA.
// ConcreteRLA is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteRLA is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteRLA.  If not, see <https://www.gnu.org/licenses/>.

//! Compute the observed risk of a comparison audit from auditors' manual
//! interpretations of the sampled ballots and the published records.

use std::collections::HashMap;
use log::warn;
use serde::{Serialize,Deserialize};
use crate::ballot_comparison::risk_factor;
use crate::election_records::{BatchKey, CvrRow, ElectionRecords, RecordedChoice};
use crate::population::DiscrepancyCounts;
use crate::reconciliation::{ElectionBatches, RepairLog};
use crate::sequential_audit::AuditError;

/// The discrepancy for a ballot recorded one way and read by the auditors another.
/// Positive means the record overstated the winner's margin.
///
/// The value is how much the winner's margin shrinks going from the record to the manual
/// reading; overvotes and undervotes count for neither candidate.
/// ```
/// use rla::election_records::RecordedChoice::*;
/// use rla::risk_calculation::discrepancy;
/// assert_eq!(2,discrepancy(Winner,Loser));
/// assert_eq!(-1,discrepancy(Undervote,Winner));
/// assert_eq!(1,discrepancy(Overvote,Loser));
/// ```
pub fn discrepancy(recorded:RecordedChoice,manual:RecordedChoice) -> i32 {
    use RecordedChoice::*;
    match (recorded,manual) {
        (Winner,Winner) => 0,
        (Winner,Loser) => 2,
        (Winner,Overvote) => 1,
        (Winner,Undervote) => 1,
        (Loser,Winner) => -2,
        (Loser,Loser) => 0,
        (Loser,Overvote) => -1,
        (Loser,Undervote) => -1,
        (Overvote,Winner) => -1,
        (Overvote,Loser) => 1,
        (Overvote,Overvote) => 0,
        (Overvote,Undervote) => 0,
        (Undervote,Winner) => -1,
        (Undervote,Loser) => 1,
        (Undervote,Overvote) => 0,
        (Undervote,Undervote) => 0,
    }
}

/// A manual interpretation that could not be compared automatically.
#[derive(Debug,Serialize,Deserialize,Clone,PartialEq,Eq)]
pub struct ReviewRequired {
    pub batch : BatchKey,
    pub sequence_number : String,
    /// (winner flag, runner up flag) of the record and of the manual reading.
    pub recorded_flags : (u8,u8),
    pub manual_flags : (u8,u8),
}

#[derive(Debug,Serialize,Deserialize,Clone)]
pub struct RiskCalculation {
    pub observed_risk : f64,
    pub diluted_margin : f64,
    pub gamma : f64,
    pub ballots_compared : usize,
    pub discrepancies : DiscrepancyCounts,
    /// Pairs of flags outside the table. Charged as two vote overstatements until a person looks.
    pub review_required : Vec<ReviewRequired>,
    /// Ballots charged as two vote overstatements because their batch could not be reconciled.
    pub penalised : usize,
    /// Manual interpretations with no matching CVR row. These are not counted.
    pub unmatched : usize,
    pub repair_log : RepairLog,
}

impl RiskCalculation {
    pub fn risk_limit_met(&self,risk_limit:f64) -> bool { self.observed_risk<risk_limit }
}

/// Reconcile the records, then compare each manual interpretation with the matching CVR
/// row (same batch and sequence number), accumulating the Kaplan-Markov risk. The diluted
/// margin comes from the reconciled tabulation. Gamma must be greater than 1.
pub fn calculate_risk(manual:&[CvrRow],records:&ElectionRecords,gamma:f64) -> Result<RiskCalculation,AuditError> {
    check_gamma(gamma)?;
    let mut batches = ElectionBatches::new(records);
    let repair_log = batches.force_consistent();
    let (ballots,winner,loser) = batches.batches.values().fold((0,0,0),|(b,w,l),batch|(b+batch.tabulated.size,w+batch.tabulated.winner,l+batch.tabulated.loser));
    let diluted_margin = if ballots==0 { 0.0 } else { (winner as f64-loser as f64)/ballots as f64 };
    Ok(compare(manual,&batches,repair_log,diluted_margin,gamma))
}

/// As [calculate_risk], for records covering only some batches, as in a lazy audit.
/// The margin must then come from the whole election's tabulation.
pub fn calculate_risk_with_margin(manual:&[CvrRow],records:&ElectionRecords,diluted_margin:f64,gamma:f64) -> Result<RiskCalculation,AuditError> {
    check_gamma(gamma)?;
    let mut batches = ElectionBatches::new(records);
    let repair_log = batches.force_consistent();
    Ok(compare(manual,&batches,repair_log,diluted_margin,gamma))
}

/// A two vote overstatement divides by 1-1/gamma.
fn check_gamma(gamma:f64) -> Result<(),AuditError> {
    if gamma>1.0 && gamma.is_finite() { Ok(()) } else { Err(AuditError::InvalidGamma(gamma)) }
}

fn compare(manual:&[CvrRow],batches:&ElectionBatches,repair_log:RepairLog,diluted_margin:f64,gamma:f64) -> RiskCalculation {
    let mut res = RiskCalculation{observed_risk:1.0,diluted_margin,gamma,ballots_compared:0,discrepancies:DiscrepancyCounts::default(),review_required:vec![],penalised:0,unmatched:0,repair_log};
    let by_sequence : HashMap<&BatchKey,HashMap<&str,&CvrRow>> = batches.batches.iter().map(|(key,b)|(key,b.cvr.iter().map(|r|(r.sequence_number.as_str(),r)).collect())).collect();
    for m in manual {
        let d = if batches.unreconcilable.contains_key(&m.batch) || batches.batches.get(&m.batch).is_some_and(|b|!b.check_consistent()) {
            res.penalised+=1;
            2
        } else if let Some(recorded) = by_sequence.get(&m.batch).and_then(|rows|rows.get(m.sequence_number.as_str())) {
            match (recorded.choice(),m.choice()) {
                (Some(r),Some(h)) => discrepancy(r,h),
                _ => {
                    warn!("Ballot {} in batch {} needs review : recorded ({},{}) manual ({},{})",m.sequence_number,m.batch,recorded.winner_flag,recorded.runner_up_flag,m.winner_flag,m.runner_up_flag);
                    res.review_required.push(ReviewRequired{batch:m.batch.clone(),sequence_number:m.sequence_number.clone(),recorded_flags:(recorded.winner_flag,recorded.runner_up_flag),manual_flags:(m.winner_flag,m.runner_up_flag)});
                    2
                }
            }
        } else {
            warn!("No CVR for manually interpreted ballot {} in batch {}",m.sequence_number,m.batch);
            res.unmatched+=1;
            continue;
        };
        res.ballots_compared+=1;
        res.discrepancies.record(d as f64);
        res.observed_risk*=risk_factor(diluted_margin,gamma,d as f64);
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use RecordedChoice::*;

    #[test]
    fn every_recorded_and_manual_pair() {
        // (recorded, manual, discrepancy)
        let table = [
            (Winner,Winner,0), (Winner,Loser,2), (Winner,Overvote,1), (Winner,Undervote,1),
            (Loser,Winner,-2), (Loser,Loser,0), (Loser,Overvote,-1), (Loser,Undervote,-1),
            (Overvote,Winner,-1), (Overvote,Loser,1), (Overvote,Overvote,0), (Overvote,Undervote,0),
            (Undervote,Winner,-1), (Undervote,Loser,1), (Undervote,Overvote,0), (Undervote,Undervote,0),
        ];
        for (recorded,manual,expected) in table {
            assert_eq!(expected,discrepancy(recorded,manual),"recorded {:?} manual {:?}",recorded,manual);
            assert_eq!(recorded.margin_contribution()-manual.margin_contribution(),discrepancy(recorded,manual));
            assert_eq!(-expected,discrepancy(manual,recorded));
        }
    }
}

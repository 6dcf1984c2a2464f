// Copyright 2024 Andrew Conway.
// This file is part of ConcreteRLA.
// ConcreteRLA is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteRLA is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteRLA.  If not, see <https://www.gnu.org/licenses/>.

//! The BRAVO ballot polling audit.
//!
//! The likelihood ratio T starts at 1 and is multiplied by sw/0.5 for each sampled
//! ballot for the reported winner and (1-sw)/0.5 for each for the runner up, where sw
//! is the winner's reported share of all ballots. The audit succeeds once T ≥ 1/α.

use rand::Rng;
use crate::ballot::{Ballot, ErrorKind, TrueVote};
use crate::population::Population;
use crate::sample_size::average_sample_number;
use crate::sequential_audit::{run_sequential_audit, AuditError, AuditOutcome, AuditParameters, RoundDecision, SequentialTest};

#[derive(Clone,Debug)]
pub struct BallotPollingTest {
    num_ballots : usize,
    reported_winner : usize,
    reported_runner_up : usize,
    /// sw, the reported share of all ballots for the winner.
    winner_share : f64,
    risk_limit : f64,
    /// T
    likelihood_ratio : f64,
    winner_seen : usize,
    runner_up_seen : usize,
}

impl BallotPollingTest {
    pub fn new(population:&Population,risk_limit:f64) -> Self {
        Self::from_reported(population.num_ballots,population.winner,population.runner_up,risk_limit)
    }

    /// From a tabulation's totals rather than a simulated population.
    pub fn from_reported(num_ballots:usize,winner:usize,runner_up:usize,risk_limit:f64) -> Self {
        BallotPollingTest{
            num_ballots,
            reported_winner: winner,
            reported_runner_up: runner_up,
            winner_share: if num_ballots==0 { 0.0 } else { winner as f64/num_ballots as f64 },
            risk_limit,
            likelihood_ratio: 1.0,
            winner_seen: 0,
            runner_up_seen: 0,
        }
    }

    /// Resume a round based audit from a previously reported T.
    pub fn with_statistic(self,likelihood_ratio:f64) -> Self { BallotPollingTest{likelihood_ratio,..self} }

    /// (winner, runner up) ballots seen so far.
    pub fn tally(&self) -> (usize,usize) { (self.winner_seen,self.runner_up_seen) }

    /// Apply a whole round's worth of observed ballots at once.
    /// ```
    /// use rla::ballot_polling::BallotPollingTest;
    /// use rla::population::{DiscrepancyCounts, Population};
    /// let population = Population::new(100,60,40,DiscrepancyCounts::default(),0).unwrap();
    /// let mut test = BallotPollingTest::new(&population,0.1);
    /// test.observe_tally(1,1);
    /// assert!((test.likelihood_ratio()-1.2*0.8).abs()<1e-12);
    /// ```
    pub fn observe_tally(&mut self,winner:usize,runner_up:usize) {
        self.likelihood_ratio*=(self.winner_share/0.5).powi(winner as i32)*((1.0-self.winner_share)/0.5).powi(runner_up as i32);
        self.winner_seen+=winner;
        self.runner_up_seen+=runner_up;
    }

    pub fn likelihood_ratio(&self) -> f64 { self.likelihood_ratio }

    /// The tally so far shows more ballots for the runner up than the winner.
    pub fn favours_runner_up(&self) -> bool { self.runner_up_seen>self.winner_seen }
}

impl SequentialTest for BallotPollingTest {
    fn observe<R:Rng + ?Sized>(&mut self,ballot:&Ballot,_rng:&mut R) {
        // error ballots and filler use up a draw without telling us anything.
        if ballot.error_kind!=ErrorKind::None { return; }
        match ballot.true_vote {
            TrueVote::Winner => self.observe_tally(1,0),
            TrueVote::RunnerUp => self.observe_tally(0,1),
            TrueVote::Undetermined => {}
        }
    }

    fn statistic(&self) -> f64 { self.likelihood_ratio }

    fn risk_limit_met(&self) -> bool { self.likelihood_ratio>=1.0/self.risk_limit }

    fn first_round_size(&self) -> Result<usize,AuditError> {
        Ok(average_sample_number(self.num_ballots,self.reported_winner,self.reported_runner_up,self.risk_limit))
    }

    /// The next round's size is the ASN using the tally seen so far in place of the reported results.
    fn next_round(&self,audited:usize) -> Result<RoundDecision,AuditError> {
        if self.favours_runner_up() || self.likelihood_ratio<1.0 { return Ok(RoundDecision::RecountRequired); }
        let size = if self.winner_seen+self.runner_up_seen==0 { self.first_round_size()? } else {
            average_sample_number(audited,self.winner_seen,self.runner_up_seen,self.risk_limit)
        };
        Ok(RoundDecision::Continue(size.min(self.num_ballots)))
    }

    fn evidence_favours_runner_up(&self) -> bool { self.favours_runner_up() }
}

/// Run a BRAVO audit of the ballots, which should have been generated from population.
pub fn ballot_polling_audit<R:Rng + ?Sized>(population:&Population,ballots:&[Ballot],params:&AuditParameters,rng:&mut R) -> Result<AuditOutcome,AuditError> {
    let mut test = BallotPollingTest::new(population,params.risk_limit);
    run_sequential_audit(&mut test,ballots,params,rng)
}

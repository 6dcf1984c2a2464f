// Copyright 2024 Andrew Conway.
// This file is part of ConcreteRLA.
// ConcreteRLA is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteRLA is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteRLA.  If not, see <https://www.gnu.org/licenses/>.

//! The machinery shared by the ballot polling and ballot comparison audits:
//! parameters, the stopping rule state machine, and the result of an audit.
//!
//! A particular test (BRAVO or Kaplan-Markov) plugs in through [SequentialTest]; the
//! driver [run_sequential_audit] does the drawing, bounds and round bookkeeping.

use log::{debug, info};
use rand::Rng;
use serde::{Serialize,Deserialize};
use thiserror::Error;
use crate::allocator::AllocationError;
use crate::ballot::{Ballot, BallotId};
use crate::monte_carlo::draw_ballot;
use crate::population::DiscrepancyCounts;

/// More rounds than this means certification is hopeless.
pub const MAX_ROUNDS : usize = 10;

/// The canonical inflation factor for comparison audits.
pub const DEFAULT_GAMMA : f64 = 1.1;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuditError {
    #[error("Risk limit {0} should be strictly between 0 and 1")]
    InvalidRiskLimit(f64),
    #[error("Gamma {0} should be greater than 1")]
    InvalidGamma(f64),
    #[error("Minimum ballots {min} is more than maximum ballots {max}")]
    MinimumExceedsMaximum{min:usize,max:usize},
    #[error("Ballot bound {bound} is outside 1 to {num_ballots}")]
    BoundOutOfRange{bound:usize,num_ballots:usize},
    #[error("There are no ballots to audit")]
    NoBallots,
    #[error("The discrepancies have erased the margin. Recommend a full hand recount")]
    MarginErased,
    #[error("More than {0} rounds were needed, the discrepancy rate is too high to certify")]
    ExcessiveRounds(usize),
    #[error("Auditing needs {needed} ballots but there are only {available}. Recommend a full hand recount")]
    SampleSizeExceedsPopulation{needed:usize,available:usize},
    #[error("Allocating ballots to towns : {0}")]
    Allocation(#[from] AllocationError),
}

/// Whether the audit draws one ballot at a time until a stop, or in rounds of a precomputed size.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default,Serialize,Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingMode {
    #[default]
    Incremental,
    Rounds,
}

#[derive(Clone, Copy, PartialEq, Debug,Serialize,Deserialize)]
pub struct AuditParameters {
    /// α, the largest acceptable chance of certifying a wrong outcome.
    pub risk_limit : f64,
    /// γ, only used by comparison audits.
    pub gamma : f64,
    /// Never stop before this many ballots. Defaults to 1.
    pub min_ballots : Option<usize>,
    /// Never audit more than this many ballots. Defaults to all of them.
    pub max_ballots : Option<usize>,
    pub mode : SamplingMode,
}

impl AuditParameters {
    pub fn new(risk_limit:f64) -> Self {
        AuditParameters{risk_limit,gamma:DEFAULT_GAMMA,min_ballots:None,max_ballots:None,mode:SamplingMode::Incremental}
    }

    pub fn with_gamma(self,gamma:f64) -> Self { AuditParameters{gamma,..self} }
    pub fn with_bounds(self,min_ballots:Option<usize>,max_ballots:Option<usize>) -> Self { AuditParameters{min_ballots,max_ballots,..self} }
    pub fn with_mode(self,mode:SamplingMode) -> Self { AuditParameters{mode,..self} }

    /// Equal bounds mean a fixed number of ballots is drawn.
    pub fn is_fixed_size(&self) -> bool { self.min_ballots.is_some() && self.min_ballots==self.max_ballots }

    /// Check the parameters make sense for an election with num_ballots ballots.
    pub fn validate(&self,num_ballots:usize) -> Result<(),AuditError> {
        self.resolved_bounds(num_ballots).map(|_|())
    }

    /// The (min,max) bounds with defaults filled in.
    pub fn resolved_bounds(&self,num_ballots:usize) -> Result<(usize,usize),AuditError> {
        if num_ballots==0 { return Err(AuditError::NoBallots); }
        if !(self.risk_limit>0.0 && self.risk_limit<1.0) { return Err(AuditError::InvalidRiskLimit(self.risk_limit)); }
        if !(self.gamma>1.0) { return Err(AuditError::InvalidGamma(self.gamma)); }
        let min = self.min_ballots.unwrap_or(1);
        let max = self.max_ballots.unwrap_or(num_ballots);
        for bound in [min,max] {
            if bound==0 || bound>num_ballots { return Err(AuditError::BoundOutOfRange{bound,num_ballots}); }
        }
        if min>max { return Err(AuditError::MinimumExceedsMaximum{min,max}); }
        Ok((min,max))
    }
}

/// Where an audit is in its life.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug,Serialize,Deserialize)]
pub enum AuditState {
    Sampling,
    /// A round's ballots have all been examined without meeting the risk limit.
    RoundBoundary,
    Success,
    /// The evidence favours the runner up; only a full hand count can settle it.
    RecountRequired,
    /// Ran out of ballots allowed without meeting the risk limit.
    Failed,
}

/// What to do at the end of a round that did not meet the risk limit.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RoundDecision {
    /// Keep going with a round of this many ballots.
    Continue(usize),
    RecountRequired,
}

/// A sequential test of the reported outcome, fed one sampled ballot at a time.
pub trait SequentialTest {
    /// Update the test statistic with a sampled ballot.
    fn observe<R:Rng + ?Sized>(&mut self,ballot:&Ballot,rng:&mut R);
    /// T for ballot polling, R for ballot comparison.
    fn statistic(&self) -> f64;
    fn risk_limit_met(&self) -> bool;
    /// Size of the first round when auditing in rounds.
    fn first_round_size(&self) -> Result<usize,AuditError>;
    /// Called at a round boundary, after audited ballots have been examined in total.
    fn next_round(&self,audited:usize) -> Result<RoundDecision,AuditError>;
    /// Discrepancies seen so far. Ballot polling does not see any.
    fn discrepancies(&self) -> DiscrepancyCounts { DiscrepancyCounts::default() }
    /// Whether the ballots seen so far favour the reported runner up. Consulted when the
    /// audit stops at its maximum without meeting the risk limit.
    fn evidence_favours_runner_up(&self) -> bool { false }
}

/// The end result of one audit.
#[derive(Clone,Debug,Serialize,Deserialize)]
pub struct AuditOutcome {
    /// One of the terminal states.
    pub state : AuditState,
    pub ballots_audited : usize,
    pub rounds : usize,
    /// Final value of the test statistic.
    pub statistic : f64,
    pub discrepancies : DiscrepancyCounts,
    /// The ballots drawn, in order, duplicates included.
    pub sampled : Vec<BallotId>,
}

impl AuditOutcome {
    pub fn success(&self) -> bool { self.state==AuditState::Success }
    pub fn recount_required(&self) -> bool { self.state==AuditState::RecountRequired }
}

/// Draw ballots with replacement from ballots and feed them to test until it stops.
///
/// Stops with success as soon as the risk limit is met once at least the minimum number
/// of ballots have been audited. Stops when the maximum is reached, successful only if the
/// risk limit is met at that point, and requiring a recount if the evidence then favours the
/// runner up. In [SamplingMode::Rounds] the ballots are drawn in rounds,
/// and the test decides at each boundary whether another round is worthwhile.
pub fn run_sequential_audit<T:SequentialTest,R:Rng + ?Sized>(test:&mut T,ballots:&[Ballot],params:&AuditParameters,rng:&mut R) -> Result<AuditOutcome,AuditError> {
    let (min,max) = params.resolved_bounds(ballots.len())?;
    let use_rounds = params.mode==SamplingMode::Rounds && !params.is_fixed_size();
    let mut round_end = if use_rounds { test.first_round_size()?.clamp(1,max) } else { max };
    let mut rounds = 1;
    let mut audited = 0;
    let mut sampled = vec![];
    let mut state = AuditState::Sampling;
    loop {
        match state {
            AuditState::Sampling => {
                if audited>=min && test.risk_limit_met() { state=AuditState::Success; }
                else if audited>=max { state = if test.evidence_favours_runner_up() { AuditState::RecountRequired } else { AuditState::Failed }; }
                else if audited>=round_end { state=AuditState::RoundBoundary; }
                else {
                    let id = draw_ballot(ballots.len(),rng);
                    let ballot = &ballots[id.0];
                    test.observe(ballot,rng);
                    audited+=1;
                    sampled.push(id);
                    debug!("Audited ballot {} ({:?}, {:?}), statistic now {}",id,ballot.true_vote,ballot.error_kind,test.statistic());
                }
            }
            AuditState::RoundBoundary => {
                rounds+=1;
                if rounds>MAX_ROUNDS { return Err(AuditError::ExcessiveRounds(MAX_ROUNDS)); }
                match test.next_round(audited)? {
                    RoundDecision::Continue(size) => {
                        info!("Round {} after {} ballots with statistic {}, auditing {} more",rounds,audited,test.statistic(),size);
                        round_end=(audited+size.max(1)).min(max);
                        state=AuditState::Sampling;
                    }
                    RoundDecision::RecountRequired => { state=AuditState::RecountRequired; }
                }
            }
            AuditState::Success | AuditState::Failed | AuditState::RecountRequired => break,
        }
    }
    info!("Audit stopped in state {:?} after {} ballots and {} round(s), statistic {}",state,audited,rounds,test.statistic());
    Ok(AuditOutcome{state,ballots_audited:audited,rounds,statistic:test.statistic(),discrepancies:test.discrepancies(),sampled})
}

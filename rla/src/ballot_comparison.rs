// Copyright 2024 Andrew Conway.
// This file is part of ConcreteRLA.
// ConcreteRLA is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteRLA is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteRLA.  If not, see <https://www.gnu.org/licenses/>.

//! The Kaplan-Markov ballot comparison audit.
//!
//! The risk bound R starts at 1. Each sampled ballot with discrepancy d multiplies it by
//! (1-m/(2γ))/(1-d/(2γ)) where m is the diluted margin. The audit succeeds once R < α.

use rand::Rng;
use serde::{Serialize,Deserialize};
use crate::ballot::{Ballot, ErrorKind};
use crate::population::{DiscrepancyCounts, Population};
use crate::random_util::uniform_unit;
use crate::sample_size::kaplan_markov_sample_size;
use crate::sequential_audit::{run_sequential_audit, AuditError, AuditOutcome, AuditParameters, RoundDecision, SequentialTest};

/// How auditors treat a questionable mark, which may or may not have been read as a
/// vote for the winner by the machine. One uniform draw c per ballot decides.
#[derive(Clone, Copy, PartialEq, Debug,Serialize,Deserialize)]
#[serde(tag="approach")]
pub enum QuestionablePolicy {
    /// +1 if c ≤ as_mark·(1-auditor_rate), -1 if c ≥ 1-auditor_rate·(1-as_mark), otherwise 0.
    Baseline{as_mark:f64,auditor_rate:f64},
    /// 1-as_mark if c ≤ auditor_rate, otherwise -as_mark.
    Bayesian{as_mark:f64,auditor_rate:f64},
    /// -1 if c ≤ as_mark, otherwise 0.
    Conservative{as_mark:f64},
}

impl QuestionablePolicy {
    /// The discrepancy given the uniform draw c in [0,1).
    /// ```
    /// use rla::ballot_comparison::QuestionablePolicy;
    /// let p = QuestionablePolicy::Baseline{as_mark:0.5,auditor_rate:0.5};
    /// assert_eq!(1.0,p.discrepancy_for_draw(0.1));
    /// assert_eq!(0.0,p.discrepancy_for_draw(0.5));
    /// assert_eq!(-1.0,p.discrepancy_for_draw(0.9));
    /// ```
    pub fn discrepancy_for_draw(&self,c:f64) -> f64 {
        match *self {
            QuestionablePolicy::Baseline{as_mark,auditor_rate} => {
                if c<=as_mark*(1.0-auditor_rate) { 1.0 } else if c>=1.0-auditor_rate*(1.0-as_mark) { -1.0 } else { 0.0 }
            }
            QuestionablePolicy::Bayesian{as_mark,auditor_rate} => if c<=auditor_rate { 1.0-as_mark } else { -as_mark },
            QuestionablePolicy::Conservative{as_mark} => if c<=as_mark { -1.0 } else { 0.0 },
        }
    }
}

/// Factor by which one ballot with discrepancy d multiplies the risk bound.
/// ```
/// use rla::ballot_comparison::risk_factor;
/// assert!(risk_factor(0.1,1.1,0.0)<1.0);
/// assert!(risk_factor(0.1,1.1,2.0)>1.0);
/// ```
pub fn risk_factor(diluted_margin:f64,gamma:f64,discrepancy:f64) -> f64 {
    (1.0-diluted_margin/(2.0*gamma))/(1.0-discrepancy/(2.0*gamma))
}

#[derive(Clone,Debug)]
pub struct BallotComparisonTest {
    diluted_margin : f64,
    gamma : f64,
    risk_limit : f64,
    /// R
    observed_risk : f64,
    /// Discrepancies assumed when sizing the first round.
    assumed : DiscrepancyCounts,
    observed : DiscrepancyCounts,
    questionable : Option<QuestionablePolicy>,
}

impl BallotComparisonTest {
    pub fn new(diluted_margin:f64,params:&AuditParameters) -> Self {
        BallotComparisonTest{
            diluted_margin,
            gamma: params.gamma,
            risk_limit: params.risk_limit,
            observed_risk: 1.0,
            assumed: DiscrepancyCounts::default(),
            observed: DiscrepancyCounts::default(),
            questionable: None,
        }
    }

    pub fn with_assumed_discrepancies(self,assumed:DiscrepancyCounts) -> Self { BallotComparisonTest{assumed,..self} }
    pub fn with_questionable_policy(self,questionable:Option<QuestionablePolicy>) -> Self { BallotComparisonTest{questionable,..self} }

    pub fn observed_risk(&self) -> f64 { self.observed_risk }
    pub fn diluted_margin(&self) -> f64 { self.diluted_margin }

    /// Update R for a ballot with the given discrepancy.
    pub fn observe_discrepancy(&mut self,discrepancy:f64) {
        self.observed_risk*=risk_factor(self.diluted_margin,self.gamma,discrepancy);
        self.observed.record(discrepancy);
    }

    fn discrepancy<R:Rng + ?Sized>(&self,ballot:&Ballot,rng:&mut R) -> f64 {
        match (ballot.error_kind,self.questionable) {
            (ErrorKind::Questionable,Some(policy)) => policy.discrepancy_for_draw(uniform_unit(rng)),
            (kind,_) => kind.discrepancy() as f64,
        }
    }
}

impl SequentialTest for BallotComparisonTest {
    fn observe<R:Rng + ?Sized>(&mut self,ballot:&Ballot,rng:&mut R) {
        let d = self.discrepancy(ballot,rng);
        self.observe_discrepancy(d);
    }

    fn statistic(&self) -> f64 { self.observed_risk }

    fn risk_limit_met(&self) -> bool { self.observed_risk<self.risk_limit }

    fn first_round_size(&self) -> Result<usize,AuditError> {
        kaplan_markov_sample_size(self.risk_limit,self.gamma,self.diluted_margin,&self.assumed)
    }

    /// The next round is as big as the Kaplan-Markov estimate using the discrepancies seen so far.
    fn next_round(&self,_audited:usize) -> Result<RoundDecision,AuditError> {
        Ok(RoundDecision::Continue(kaplan_markov_sample_size(self.risk_limit,self.gamma,self.diluted_margin,&self.observed)?))
    }

    fn discrepancies(&self) -> DiscrepancyCounts { self.observed }
}

/// Options for a comparison audit beyond the common parameters.
#[derive(Clone, Copy, PartialEq, Debug, Default,Serialize,Deserialize)]
pub struct ComparisonOptions {
    /// Audit against this diluted margin rather than the population's.
    pub diluted_margin : Option<f64>,
    /// Discrepancies assumed when sizing the first round.
    #[serde(default)]
    pub assumed_discrepancies : DiscrepancyCounts,
    pub questionable_policy : Option<QuestionablePolicy>,
}

/// Run a Kaplan-Markov audit of the ballots, which should have been generated from population.
pub fn ballot_comparison_audit<R:Rng + ?Sized>(population:&Population,ballots:&[Ballot],params:&AuditParameters,options:&ComparisonOptions,rng:&mut R) -> Result<AuditOutcome,AuditError> {
    let margin = options.diluted_margin.unwrap_or_else(||population.diluted_margin());
    let mut test = BallotComparisonTest::new(margin,params)
        .with_assumed_discrepancies(options.assumed_discrepancies)
        .with_questionable_policy(options.questionable_policy);
    run_sequential_audit(&mut test,ballots,params,rng)
}

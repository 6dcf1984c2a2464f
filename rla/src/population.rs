// Copyright 2024 Andrew Conway.
// This file is part of ConcreteRLA.
// ConcreteRLA is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteRLA is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteRLA.  If not, see <https://www.gnu.org/licenses/>.

//! The universe of ballots in a simulated two candidate election, and how many
//! of each kind there are.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Serialize,Deserialize};
use thiserror::Error;
use crate::ballot::{Ballot, BallotId, ErrorKind, TrueVote};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PopulationError {
    #[error("An election needs at least one ballot")]
    NoBallots,
    #[error("Margin {0}% should be between 0 and 100")]
    MarginOutOfRange(f64),
    #[error("Category counts add up to {0} which is more than the {1} ballots")]
    CountsExceedBallots(usize,usize),
}

/// Counts of one and two vote overstatements and understatements, as
/// observed in an audit or assumed in advance.
#[derive(Debug,Serialize,Deserialize,Clone,Copy,Default,PartialEq,Eq)]
pub struct DiscrepancyCounts {
    #[serde(default)]
    pub overstatement1 : usize,
    #[serde(default)]
    pub overstatement2 : usize,
    #[serde(default)]
    pub understatement1 : usize,
    #[serde(default)]
    pub understatement2 : usize,
}

impl DiscrepancyCounts {
    pub fn total(&self) -> usize { self.overstatement1+self.overstatement2+self.understatement1+self.understatement2 }

    /// Note that a discrepancy of the given size was seen. Non-integer or zero discrepancies are not counted.
    pub fn record(&mut self,discrepancy:f64) {
        if discrepancy==2.0 { self.overstatement2+=1 }
        else if discrepancy==1.0 { self.overstatement1+=1 }
        else if discrepancy==-1.0 { self.understatement1+=1 }
        else if discrepancy==-2.0 { self.understatement2+=1 }
    }

    /// How many of the given error kind.
    pub fn count(&self,kind:ErrorKind) -> usize {
        match kind {
            ErrorKind::Overstatement1 => self.overstatement1,
            ErrorKind::Overstatement2 => self.overstatement2,
            ErrorKind::Understatement1 => self.understatement1,
            ErrorKind::Understatement2 => self.understatement2,
            ErrorKind::None | ErrorKind::Questionable => 0,
        }
    }
}

/// How many ballots of each category an election has.
#[derive(Debug,Serialize,Deserialize,Clone,PartialEq)]
pub struct Population {
    pub num_ballots : usize,
    pub winner : usize,
    pub runner_up : usize,
    pub discrepancies : DiscrepancyCounts,
    pub questionable : usize,
}

impl Population {
    /// Specify every count explicitly.
    pub fn new(num_ballots:usize,winner:usize,runner_up:usize,discrepancies:DiscrepancyCounts,questionable:usize) -> Result<Self,PopulationError> {
        if num_ballots==0 { return Err(PopulationError::NoBallots); }
        let res = Population{num_ballots,winner,runner_up,discrepancies,questionable};
        let assigned = res.num_assigned();
        if assigned>num_ballots { return Err(PopulationError::CountsExceedBallots(assigned,num_ballots)); }
        Ok(res)
    }

    /// Split the ballots that are not errors between winner and runner up so that
    /// the winner leads by margin_percent percent of them.
    ///
    /// Halves are rounded to even. If rounding would produce one ballot more than is
    /// available, the runner up loses it.
    /// ```
    /// use rla::population::{DiscrepancyCounts, Population};
    /// let p = Population::from_margin(1000,10.0,DiscrepancyCounts::default(),0).unwrap();
    /// assert_eq!(550,p.winner);
    /// assert_eq!(450,p.runner_up);
    /// let errors = DiscrepancyCounts{overstatement1:10,..Default::default()};
    /// let p = Population::from_margin(1010,10.0,errors,0).unwrap();
    /// assert_eq!(550,p.winner);
    /// ```
    pub fn from_margin(num_ballots:usize,margin_percent:f64,discrepancies:DiscrepancyCounts,questionable:usize) -> Result<Self,PopulationError> {
        if num_ballots==0 { return Err(PopulationError::NoBallots); }
        if !(0.0..=100.0).contains(&margin_percent) { return Err(PopulationError::MarginOutOfRange(margin_percent)); }
        let errors = discrepancies.total()+questionable;
        if errors>num_ballots { return Err(PopulationError::CountsExceedBallots(errors,num_ballots)); }
        let effective = num_ballots-errors;
        let delta = effective as f64*margin_percent/100.0;
        let winner = ((effective as f64+delta)/2.0).round_ties_even() as usize;
        let runner_up = ((effective as f64-delta)/2.0).round_ties_even() as usize;
        let winner = winner.min(effective);
        let runner_up = runner_up.min(effective-winner);
        Population::new(num_ballots,winner,runner_up,discrepancies,questionable)
    }

    /// Ballots in some category other than undetermined filler.
    pub fn num_assigned(&self) -> usize { self.winner+self.runner_up+self.discrepancies.total()+self.questionable }

    /// Ballots left over after all categories are filled.
    pub fn num_undetermined(&self) -> usize { self.num_ballots-self.num_assigned() }

    /// (winner - runner up)/all ballots.
    pub fn diluted_margin(&self) -> f64 { (self.winner as f64-self.runner_up as f64)/self.num_ballots as f64 }

    /// Share of all ballots, not just two way ones, that are for the winner.
    pub fn winner_share(&self) -> f64 { self.winner as f64/self.num_ballots as f64 }

    /// The categories in priority order, before shuffling.
    fn labels(&self) -> Vec<(TrueVote,ErrorKind)> {
        let d = &self.discrepancies;
        let buckets = [
            ((TrueVote::Winner,ErrorKind::None),self.winner),
            ((TrueVote::RunnerUp,ErrorKind::None),self.runner_up),
            ((TrueVote::Undetermined,ErrorKind::Overstatement1),d.overstatement1),
            ((TrueVote::Undetermined,ErrorKind::Understatement1),d.understatement1),
            ((TrueVote::Undetermined,ErrorKind::Overstatement2),d.overstatement2),
            ((TrueVote::Undetermined,ErrorKind::Understatement2),d.understatement2),
            ((TrueVote::Undetermined,ErrorKind::Questionable),self.questionable),
        ];
        let mut res = Vec::with_capacity(self.num_ballots);
        for (label,n) in buckets {
            res.extend(std::iter::repeat_n(label,n));
        }
        res.resize(self.num_ballots,(TrueVote::Undetermined,ErrorKind::None));
        res
    }

    /// Make the ballots, with categories assigned to ids by a uniformly random permutation.
    pub fn generate_ballots<R:Rng + ?Sized>(&self,rng:&mut R) -> Vec<Ballot> {
        let mut labels = self.labels();
        labels.shuffle(rng);
        labels.into_iter().enumerate().map(|(i,(true_vote,error_kind))|Ballot::new(BallotId(i),true_vote,error_kind)).collect()
    }
}

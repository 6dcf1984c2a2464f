// Copyright 2024 Andrew Conway.
// This file is part of ConcreteRLA.
// ConcreteRLA is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteRLA is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteRLA.  If not, see <https://www.gnu.org/licenses/>.

//! Individual ballots in a simulated election, what is really on them, and
//! how that differs from what a machine recorded.

use serde::{Serialize,Deserialize};
use std::fmt;

/// a ballot, referred to by position in the (shuffled) population, 0 being first
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,Serialize,Deserialize)]
pub struct BallotId(pub usize);
// type alias really, don't want long display
impl fmt::Display for BallotId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}", self.0) }
}
// type alias really, don't want long display
impl fmt::Debug for BallotId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "#{}", self.0) }
}

/// a town, referred to by position in the town registry, 0 being first
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,Serialize,Deserialize)]
pub struct TownIndex(pub usize);
// type alias really, don't want long display
impl fmt::Display for TownIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}", self.0) }
}
// type alias really, don't want long display
impl fmt::Debug for TownIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "Town#{}", self.0) }
}

/// What the voter actually meant.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug,Serialize,Deserialize)]
pub enum TrueVote {
    Winner,
    RunnerUp,
    /// Neither of the two candidates, or something only a human can sort out.
    Undetermined,
}

/// How the machine record of a ballot differs from the truth.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug,Serialize,Deserialize)]
pub enum ErrorKind {
    None,
    /// The record overstates the winner's margin by one vote.
    Overstatement1,
    /// The record overstates the winner's margin by two votes.
    Overstatement2,
    Understatement1,
    Understatement2,
    /// A mark the auditors may or may not count.
    Questionable,
}

impl ErrorKind {
    /// The signed discrepancy a comparison audit would observe, in units of votes of margin.
    /// Questionable ballots have no fixed discrepancy; see [crate::ballot_comparison::QuestionablePolicy].
    /// ```
    /// use rla::ballot::ErrorKind;
    /// assert_eq!(2,ErrorKind::Overstatement2.discrepancy());
    /// assert_eq!(-1,ErrorKind::Understatement1.discrepancy());
    /// assert_eq!(0,ErrorKind::None.discrepancy());
    /// ```
    pub fn discrepancy(self) -> i32 {
        match self {
            ErrorKind::None => 0,
            ErrorKind::Overstatement1 => 1,
            ErrorKind::Overstatement2 => 2,
            ErrorKind::Understatement1 => -1,
            ErrorKind::Understatement2 => -2,
            ErrorKind::Questionable => 0,
        }
    }

    pub fn is_error(self) -> bool { self!=ErrorKind::None }
}

/// Where a ballot is physically stored.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug,Serialize,Deserialize)]
pub struct BallotLocation {
    pub town : TownIndex,
    /// Only set for ballots touched by a comparison audit or record generation.
    pub batch : Option<usize>,
}

#[derive(Clone,Debug,Serialize,Deserialize)]
pub struct Ballot {
    pub id : BallotId,
    pub true_vote : TrueVote,
    pub error_kind : ErrorKind,
    /// Set once, the first time the ballot is allocated to a town. Never changed afterwards.
    location : Option<BallotLocation>,
}

impl Ballot {
    pub fn new(id:BallotId,true_vote:TrueVote,error_kind:ErrorKind) -> Self {
        Ballot{id,true_vote,error_kind,location:None}
    }

    pub fn location(&self) -> Option<BallotLocation> { self.location }

    /// Record where the ballot lives. Returns the location actually stored, which is the
    /// earlier one if the ballot had already been placed.
    pub fn set_location_once(&mut self,location:BallotLocation) -> BallotLocation {
        *self.location.get_or_insert(location)
    }
}

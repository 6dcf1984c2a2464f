// Copyright 2024 Andrew Conway.
// This file is part of ConcreteRLA.
// ConcreteRLA is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteRLA is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteRLA.  If not, see <https://www.gnu.org/licenses/>.

//! The three independently produced records of an election: the ballot manifest,
//! the tabulation, and the cast vote records (CVRs).

use std::collections::BTreeMap;
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;
use serde::{Serialize,Deserialize};

/// A batch, identified by town and index within the town. Written as the town name
/// immediately followed by the index, e.g. `Avon3`. This only reads back unchanged when
/// the town name does not end in a digit, which [crate::town_registry::TownRegistry] enforces.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord,Serialize,Deserialize)]
#[serde(into="String",try_from="String")]
pub struct BatchKey {
    pub town : String,
    pub batch : usize,
}

impl BatchKey {
    pub fn new(town:&str,batch:usize) -> Self { BatchKey{town:town.to_string(),batch} }
}

impl fmt::Display for BatchKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}{}", self.town,self.batch) }
}
impl fmt::Debug for BatchKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}{}", self.town,self.batch) }
}

impl FromStr for BatchKey {
    type Err = ParseIntError;

    /// ```
    /// use rla::election_records::BatchKey;
    /// let key : BatchKey = "New Haven12".parse().unwrap();
    /// assert_eq!("New Haven",key.town);
    /// assert_eq!(12,key.batch);
    /// assert!("Avon".parse::<BatchKey>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let town = s.trim_end_matches(|c:char|c.is_ascii_digit());
        let batch = s[town.len()..].parse::<usize>()?;
        Ok(BatchKey{town:town.to_string(),batch})
    }
}

impl From<BatchKey> for String {
    fn from(key: BatchKey) -> Self { key.to_string() }
}

impl TryFrom<String> for BatchKey {
    type Error = ParseIntError;
    fn try_from(value: String) -> Result<Self, Self::Error> { value.parse() }
}

/// One line of the ballot manifest: how many ballots are physically in a batch.
#[derive(Debug,Serialize,Deserialize,Clone,PartialEq,Eq)]
pub struct ManifestEntry {
    #[serde(rename="Container")]
    pub container : String,
    #[serde(rename="Tabulator")]
    pub tabulator : String,
    #[serde(rename="Batch Name")]
    pub batch : BatchKey,
    #[serde(rename="Number of Ballots")]
    pub ballot_count : usize,
}

/// One line of the tabulation: the machine count for a batch.
#[derive(Debug,Serialize,Deserialize,Clone,PartialEq,Eq)]
pub struct TabulationEntry {
    #[serde(rename="Town")]
    pub town : String,
    #[serde(rename="BatchNum")]
    pub batch : BatchKey,
    #[serde(rename="Size")]
    pub size : usize,
    #[serde(rename="Winner")]
    pub winner : usize,
    #[serde(rename="Loser")]
    pub loser : usize,
}

/// One cast vote record. Manual interpretations use the same shape.
#[derive(Debug,Serialize,Deserialize,Clone,PartialEq,Eq)]
pub struct CvrRow {
    pub sequence_number : String,
    pub tabulator : String,
    pub batch : BatchKey,
    pub record_id : String,
    pub imprint_id : String,
    pub counting_group : String,
    pub precinct : String,
    pub ballot_type : String,
    pub winner_flag : u8,
    pub runner_up_flag : u8,
}

/// What a CVR row or manual interpretation says about the contest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug,Serialize,Deserialize)]
pub enum RecordedChoice {
    Winner,
    Loser,
    /// Marked for both.
    Overvote,
    /// Marked for neither.
    Undervote,
}

impl RecordedChoice {
    /// Interpret the pair of flags. None if they are not both 0 or 1.
    pub fn from_flags(winner_flag:u8,runner_up_flag:u8) -> Option<Self> {
        match (winner_flag,runner_up_flag) {
            (1,0) => Some(RecordedChoice::Winner),
            (0,1) => Some(RecordedChoice::Loser),
            (1,1) => Some(RecordedChoice::Overvote),
            (0,0) => Some(RecordedChoice::Undervote),
            _ => None,
        }
    }

    pub fn flags(self) -> (u8,u8) {
        match self {
            RecordedChoice::Winner => (1,0),
            RecordedChoice::Loser => (0,1),
            RecordedChoice::Overvote => (1,1),
            RecordedChoice::Undervote => (0,0),
        }
    }

    /// Contribution to the winner's margin. Overvotes and undervotes count for neither.
    pub fn margin_contribution(self) -> i32 {
        match self {
            RecordedChoice::Winner => 1,
            RecordedChoice::Loser => -1,
            RecordedChoice::Overvote | RecordedChoice::Undervote => 0,
        }
    }
}

impl CvrRow {
    pub fn choice(&self) -> Option<RecordedChoice> { RecordedChoice::from_flags(self.winner_flag,self.runner_up_flag) }

    pub fn set_choice(&mut self,choice:RecordedChoice) {
        (self.winner_flag,self.runner_up_flag) = choice.flags();
    }
}

/// Totals over a tabulation, as used to compute the reported margin.
#[derive(Debug,Serialize,Deserialize,Clone,Copy,PartialEq,Eq,Default)]
pub struct TabulationTotals {
    pub ballots : usize,
    pub winner : usize,
    pub loser : usize,
}

impl TabulationTotals {
    pub fn new(tabulation:&[TabulationEntry]) -> Self {
        tabulation.iter().fold(TabulationTotals::default(),|t,e|TabulationTotals{ballots:t.ballots+e.size,winner:t.winner+e.winner,loser:t.loser+e.loser})
    }
    pub fn diluted_margin(&self) -> f64 {
        if self.ballots==0 { 0.0 } else { (self.winner as f64-self.loser as f64)/self.ballots as f64 }
    }
}

/// All three records for an election.
#[derive(Debug,Serialize,Deserialize,Clone,Default)]
pub struct ElectionRecords {
    pub manifest : Vec<ManifestEntry>,
    pub tabulation : Vec<TabulationEntry>,
    pub cvr : Vec<CvrRow>,
}

impl ElectionRecords {
    pub fn manifest_count(&self) -> usize { self.manifest.iter().map(|m|m.ballot_count).sum() }

    /// CVR rows grouped by batch, in file order within each batch.
    pub fn cvr_by_batch(&self) -> BTreeMap<BatchKey,Vec<CvrRow>> {
        group_by_batch(&self.cvr)
    }
}

/// Group rows by batch, keeping file order within each batch.
pub fn group_by_batch(rows:&[CvrRow]) -> BTreeMap<BatchKey,Vec<CvrRow>> {
    let mut res : BTreeMap<BatchKey,Vec<CvrRow>> = BTreeMap::new();
    for row in rows {
        res.entry(row.batch.clone()).or_default().push(row.clone());
    }
    res
}

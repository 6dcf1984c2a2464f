// Copyright 2024 Andrew Conway.
// This file is part of ConcreteRLA.
// ConcreteRLA is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteRLA is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteRLA.  If not, see <https://www.gnu.org/licenses/>.

//! Information about the towns ballots are stored in, and how each town splits
//! its ballots into batches.

use std::fs::File;
use std::path::Path;
use serde::{Serialize,Deserialize};
use thiserror::Error;
use crate::ballot::TownIndex;

/// The proportion of a town's population voting absentee, all stored in one batch.
pub const ABSENTEE_FRACTION : f64 = 0.05;

/// One town, in the format of the published town data files.
#[derive(Debug,Serialize,Deserialize,Clone,PartialEq)]
pub struct Town {
    #[serde(rename="Town")]
    pub name : String,
    #[serde(rename="Voter Population")]
    pub population : usize,
    #[serde(rename="Polling Places")]
    pub polling_places : usize,
}

impl Town {
    /// Capacities of the batches. One per polling place, then the absentee batch last.
    ///
    /// Polling place batches are rounded up so the capacities never add up to less than
    /// the population; the excess is less than the number of polling places.
    /// ```
    /// use rla::town_registry::Town;
    /// let town = Town{name:"Avon".to_string(),population:1000,polling_places:3};
    /// assert_eq!(vec![317,317,317,50],town.batch_sizes());
    /// ```
    pub fn batch_sizes(&self) -> Vec<usize> {
        if self.polling_places==0 { return vec![self.population]; }
        let absentee = (self.population as f64*ABSENTEE_FRACTION).round() as usize;
        let in_person = self.population-absentee;
        let per_place = in_person.div_ceil(self.polling_places);
        let mut res = vec![per_place;self.polling_places];
        res.push(absentee);
        res
    }

    pub fn num_batches(&self) -> usize { self.polling_places+1 }
}

/// Town names that would make batch names ambiguous. A batch name is the town name
/// followed by the batch index, so `Town2` batch 1 and `Town` batch 21 would collide.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TownRegistryError {
    #[error("Town name {0:?} ends in a digit, which would make its batch names ambiguous")]
    NameEndsInDigit(String),
    #[error("Town {0} is listed more than once")]
    DuplicateName(String),
}

/// The ordered list of towns in an election.
#[derive(Debug,Serialize,Deserialize,Clone,PartialEq)]
#[serde(transparent)]
pub struct TownRegistry {
    pub towns : Vec<Town>,
}

impl TownRegistry {
    pub fn new(towns:Vec<Town>) -> Result<Self,TownRegistryError> {
        let res = TownRegistry{towns};
        res.check_names()?;
        Ok(res)
    }

    /// Read the JSON town data file.
    pub fn load(path:&Path) -> anyhow::Result<Self> {
        let res : TownRegistry = serde_json::from_reader(File::open(path)?)?;
        res.check_names()?;
        Ok(res)
    }

    /// Every town must be distinguishable by the batch names it produces.
    pub fn check_names(&self) -> Result<(),TownRegistryError> {
        for (i,town) in self.towns.iter().enumerate() {
            if town.name.ends_with(|c:char|c.is_ascii_digit()) { return Err(TownRegistryError::NameEndsInDigit(town.name.clone())); }
            if self.towns[..i].iter().any(|t|t.name==town.name) { return Err(TownRegistryError::DuplicateName(town.name.clone())); }
        }
        Ok(())
    }

    pub fn len(&self) -> usize { self.towns.len() }
    pub fn is_empty(&self) -> bool { self.towns.is_empty() }
    pub fn town(&self,index:TownIndex) -> &Town { &self.towns[index.0] }
    pub fn find(&self,name:&str) -> Option<TownIndex> { self.towns.iter().position(|t|t.name==name).map(TownIndex) }
    pub fn total_population(&self) -> usize { self.towns.iter().map(|t|t.population).sum() }

    /// Scale the town populations so they add up to exactly num_ballots, keeping
    /// their proportions as well as integers allow (largest remainder).
    /// Needed when simulating an election with a different number of ballots than voters on the rolls.
    /// ```
    /// use rla::town_registry::{Town, TownRegistry};
    /// let registry = TownRegistry::new(vec![
    ///     Town{name:"A".to_string(),population:600,polling_places:1},
    ///     Town{name:"B".to_string(),population:400,polling_places:1}]).unwrap();
    /// let scaled = registry.scaled_to(10);
    /// assert_eq!(6,scaled.towns[0].population);
    /// assert_eq!(4,scaled.towns[1].population);
    /// ```
    pub fn scaled_to(&self,num_ballots:usize) -> TownRegistry {
        let total = self.total_population();
        if total==num_ballots || total==0 { return self.clone(); }
        let exact : Vec<f64> = self.towns.iter().map(|t|t.population as f64*num_ballots as f64/total as f64).collect();
        let mut populations : Vec<usize> = exact.iter().map(|e|e.floor() as usize).collect();
        let mut short = num_ballots-populations.iter().sum::<usize>();
        let mut by_remainder : Vec<usize> = (0..exact.len()).collect();
        by_remainder.sort_by(|&a,&b|(exact[b]-exact[b].floor()).total_cmp(&(exact[a]-exact[a].floor())).then(a.cmp(&b)));
        for i in by_remainder {
            if short==0 { break; }
            populations[i]+=1;
            short-=1;
        }
        TownRegistry{ towns: self.towns.iter().zip(populations).map(|(t,population)|Town{name:t.name.clone(),population,polling_places:t.polling_places}).collect() }
    }
}

// Copyright 2024 Andrew Conway.
// This file is part of ConcreteRLA.
// ConcreteRLA is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteRLA is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteRLA.  If not, see <https://www.gnu.org/licenses/>.

//! The JSON file describing a batch of simulations.

use std::fs::File;
use std::path::Path;
use serde::{Serialize,Deserialize};
use thiserror::Error;
use rla::ballot_comparison::{ComparisonOptions, QuestionablePolicy};
use rla::population::{DiscrepancyCounts, PopulationError};
use rla::sequential_audit::{AuditError, AuditParameters, SamplingMode, DEFAULT_GAMMA};
use rla::simulation::SimulationParameters;

/// Seed used when the input file does not give one.
pub const DEFAULT_SEED : u64 = 1;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("The number of simulations should be positive")]
    NoSimulations,
    #[error("No margins were given")]
    NoMargins,
    #[error("Margin {margin}% : {source}")]
    Population{margin:f64,source:PopulationError},
    #[error("Margin {margin}% : {source}")]
    Audit{margin:f64,source:AuditError},
}

/// One margin to simulate, with optional bounds on the number of ballots audited.
#[derive(Debug,Serialize,Deserialize,Clone,Copy,PartialEq)]
pub struct MarginSpec {
    /// Percentage of the non-error ballots.
    pub margin : f64,
    #[serde(default)]
    pub min_ballots : Option<usize>,
    #[serde(default)]
    pub max_ballots : Option<usize>,
}

impl MarginSpec {
    pub fn unbounded(margin:f64) -> Self { MarginSpec{margin,min_ballots:None,max_ballots:None} }
}

fn default_gamma() -> f64 { DEFAULT_GAMMA }
fn default_true() -> bool { true }

#[derive(Debug,Serialize,Deserialize,Clone,PartialEq)]
pub struct SimulationInput {
    pub ballots : usize,
    pub overvotes1 : usize,
    pub undervotes1 : usize,
    pub overvotes2 : usize,
    pub undervotes2 : usize,
    #[serde(default)]
    pub questionable : usize,
    pub risk_limit : f64,
    #[serde(default="default_gamma")]
    pub gamma : f64,
    /// How many times to simulate each margin.
    pub simulations : usize,
    pub margins : Vec<MarginSpec>,
    #[serde(default)]
    pub sampling : SamplingMode,
    #[serde(default)]
    pub questionable_policy : Option<QuestionablePolicy>,
    /// Audit against this diluted margin instead of the generated one.
    #[serde(default)]
    pub diluted_margin : Option<f64>,
    #[serde(default)]
    pub seed : Option<u64>,
    #[serde(default="default_true")]
    pub run_polling : bool,
}

impl SimulationInput {
    /// Read and validate.
    pub fn load(path:&Path) -> anyhow::Result<Self> {
        let file = File::open(path).map_err(|e|anyhow::anyhow!("Could not read {} : {}",path.display(),e))?;
        let res : SimulationInput = serde_json::from_reader(file)?;
        res.validate()?;
        Ok(res)
    }

    pub fn discrepancies(&self) -> DiscrepancyCounts {
        DiscrepancyCounts{overstatement1:self.overvotes1,overstatement2:self.overvotes2,understatement1:self.undervotes1,understatement2:self.undervotes2}
    }

    pub fn seed(&self) -> u64 { self.seed.unwrap_or(DEFAULT_SEED) }

    pub fn parameters(&self,margin:&MarginSpec) -> SimulationParameters {
        SimulationParameters{
            num_ballots: self.ballots,
            margin_percent: margin.margin,
            discrepancies: self.discrepancies(),
            questionable: self.questionable,
            audit: AuditParameters::new(self.risk_limit).with_gamma(self.gamma).with_bounds(margin.min_ballots,margin.max_ballots).with_mode(self.sampling),
            comparison: ComparisonOptions{diluted_margin:self.diluted_margin,assumed_discrepancies:DiscrepancyCounts::default(),questionable_policy:self.questionable_policy},
            run_polling: self.run_polling,
        }
    }

    /// Check everything that could stop a simulation, before any simulation starts.
    pub fn validate(&self) -> Result<(),ConfigError> {
        if self.simulations==0 { return Err(ConfigError::NoSimulations); }
        if self.margins.is_empty() { return Err(ConfigError::NoMargins); }
        for margin in &self.margins {
            let params = self.parameters(margin);
            params.population().map_err(|source|ConfigError::Population{margin:margin.margin,source})?;
            params.audit.validate(self.ballots).map_err(|source|ConfigError::Audit{margin:margin.margin,source})?;
        }
        Ok(())
    }
}

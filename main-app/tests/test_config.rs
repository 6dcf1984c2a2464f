// Copyright 2024 Andrew Conway.
// This file is part of ConcreteRLA.
// ConcreteRLA is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteRLA is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteRLA.  If not, see <https://www.gnu.org/licenses/>.



use main_app::config::{ConfigError, MarginSpec, SimulationInput, DEFAULT_SEED};
use rla::population::PopulationError;
use rla::sequential_audit::{AuditError, SamplingMode, DEFAULT_GAMMA};

const MINIMAL : &str = r#"{
    "ballots" : 1000,
    "overvotes1" : 2,
    "undervotes1" : 1,
    "overvotes2" : 0,
    "undervotes2" : 3,
    "risk_limit" : 0.05,
    "simulations" : 10,
    "margins" : [ { "margin" : 5 }, { "margin" : 2, "min_ballots" : 80, "max_ballots" : 500 } ]
}"#;

fn minimal() -> SimulationInput { serde_json::from_str(MINIMAL).unwrap() }

#[test]
fn missing_fields_take_defaults() {
    let input = minimal();
    assert_eq!(DEFAULT_GAMMA,input.gamma);
    assert_eq!(0,input.questionable);
    assert_eq!(SamplingMode::Incremental,input.sampling);
    assert!(input.run_polling);
    assert_eq!(None,input.diluted_margin);
    assert_eq!(DEFAULT_SEED,input.seed());
    assert_eq!(MarginSpec::unbounded(5.0),input.margins[0]);
    input.validate().unwrap();
}

#[test]
fn parameters_carry_the_margin_and_discrepancies() {
    let input = minimal();
    let params = input.parameters(&input.margins[1]);
    assert_eq!(1000,params.num_ballots);
    assert_eq!(2.0,params.margin_percent);
    assert_eq!(2,params.discrepancies.overstatement1);
    assert_eq!(1,params.discrepancies.understatement1);
    assert_eq!(3,params.discrepancies.understatement2);
    assert_eq!(Some(80),params.audit.min_ballots);
    assert_eq!(Some(500),params.audit.max_ballots);
    assert_eq!(0,params.comparison.assumed_discrepancies.total());
    assert!(params.run_polling);
}

#[test]
fn sampling_mode_and_seed_can_be_given() {
    let mut input = minimal();
    input.sampling = SamplingMode::Rounds;
    input.seed = Some(7);
    let text = serde_json::to_string(&input).unwrap();
    assert!(text.contains("\"rounds\""));
    let back : SimulationInput = serde_json::from_str(&text).unwrap();
    assert_eq!(input,back);
    assert_eq!(7,back.seed());
    assert_eq!(SamplingMode::Rounds,back.parameters(&back.margins[0]).audit.mode);
}

#[test]
fn bad_inputs_are_rejected_before_simulating() {
    let mut input = minimal();
    input.simulations = 0;
    assert_eq!(Err(ConfigError::NoSimulations),input.validate());
    let mut input = minimal();
    input.margins.clear();
    assert_eq!(Err(ConfigError::NoMargins),input.validate());
    let mut input = minimal();
    input.margins.push(MarginSpec::unbounded(150.0));
    assert_eq!(Err(ConfigError::Population{margin:150.0,source:PopulationError::MarginOutOfRange(150.0)}),input.validate());
    let mut input = minimal();
    input.risk_limit = 1.5;
    assert_eq!(Err(ConfigError::Audit{margin:5.0,source:AuditError::InvalidRiskLimit(1.5)}),input.validate());
}

#[test]
fn load_reads_and_validates() {
    let path = std::env::temp_dir().join(format!("rla_config_test_{}.json",std::process::id()));
    std::fs::write(&path,MINIMAL).unwrap();
    let input = SimulationInput::load(&path).unwrap();
    assert_eq!(10,input.simulations);
    std::fs::write(&path,MINIMAL.replace("\"simulations\" : 10","\"simulations\" : 0")).unwrap();
    assert!(SimulationInput::load(&path).is_err());
    std::fs::remove_file(&path).unwrap();
    assert!(SimulationInput::load(&path).is_err());
}

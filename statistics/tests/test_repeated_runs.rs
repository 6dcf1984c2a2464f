// Copyright 2024 Andrew Conway.
// This file is part of ConcreteRLA.
// ConcreteRLA is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteRLA is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteRLA.  If not, see <https://www.gnu.org/licenses/>.


use rla::ballot_comparison::ComparisonOptions;
use rla::population::DiscrepancyCounts;
use rla::random_util::seeded_rng;
use rla::sequential_audit::AuditParameters;
use rla::simulation::SimulationParameters;
use rla::town_registry::{Town, TownRegistry};
use statistics::repeated_runs::RepeatedRuns;

fn towns() -> TownRegistry {
    TownRegistry::new(vec![
        Town{name:"Avon".to_string(),population:600,polling_places:3},
        Town{name:"Berlin".to_string(),population:400,polling_places:2},
    ]).unwrap()
}

fn params(run_polling:bool) -> SimulationParameters {
    SimulationParameters{
        num_ballots: 1000,
        margin_percent: 10.0,
        discrepancies: DiscrepancyCounts::default(),
        questionable: 0,
        audit: AuditParameters::new(0.05),
        comparison: ComparisonOptions::default(),
        run_polling,
    }
}

#[test]
fn clean_comparison_audits_always_take_the_same_work() {
    let runs = RepeatedRuns::new_from_runs(&params(false),&towns(),20,&mut seeded_rng(1)).unwrap();
    assert_eq!(20,runs.num_runs);
    assert_eq!(0,runs.polling.num_runs());
    let summary = runs.comparison.sample_size();
    assert_eq!(65.0,summary.mean);
    assert_eq!(0.0,summary.stdev);
    assert_eq!(1.0,runs.comparison.success_rate());
    assert!(runs.comparison.is_close_to_expected_success_rate(1.0));
    for run in 0..20 {
        let in_towns : usize = runs.comparison.ballots_per_town.iter().map(|t|t[run]).sum();
        assert_eq!(65,in_towns);
    }
    let towns_touched = runs.comparison.average_towns_touched();
    assert!(towns_touched>1.0 && towns_touched<=2.0);
    assert!(runs.average_flagged_batches_total()>=1.0);
    assert!(runs.average_flagged_batches_total()<=7.0);
}

#[test]
fn threads_share_the_runs_and_are_reproducible() {
    let a = RepeatedRuns::new_from_runs_multithreaded(&params(true),&towns(),10,3,42).unwrap();
    let b = RepeatedRuns::new_from_runs_multithreaded(&params(true),&towns(),10,3,42).unwrap();
    assert_eq!(10,a.num_runs);
    assert_eq!(10,a.comparison.num_runs());
    assert_eq!(10,a.polling.num_runs());
    assert_eq!(a.polling.ballots_audited,b.polling.ballots_audited);
    assert_eq!(a.comparison.ballots_per_town,b.comparison.ballots_per_town);
    assert_eq!(a.flagged,b.flagged);
    assert!(a.polling.sample_size().mean>0.0);
}

#[test]
fn summary_serialises() {
    let runs = RepeatedRuns::new_from_runs(&params(false),&towns(),2,&mut seeded_rng(2)).unwrap();
    let json = serde_json::to_string(&runs).unwrap();
    assert!(json.contains("\"Avon\""));
}

#[test]
fn invalid_parameters_stop_every_thread() {
    let bad = SimulationParameters{audit:AuditParameters::new(0.0),..params(false)};
    assert!(RepeatedRuns::new_from_runs_multithreaded(&bad,&towns(),4,2,1).is_err());
}

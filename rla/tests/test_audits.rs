// Copyright 2024 Andrew Conway.
// This file is part of ConcreteRLA.
// ConcreteRLA is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteRLA is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteRLA.  If not, see <https://www.gnu.org/licenses/>.

//! The two sequential audits and the stopping rules they share.

use rla::ballot::{Ballot, BallotId, ErrorKind, TrueVote};
use rla::ballot_comparison::{ballot_comparison_audit, BallotComparisonTest, ComparisonOptions, QuestionablePolicy};
use rla::ballot_polling::{ballot_polling_audit, BallotPollingTest};
use rla::population::{DiscrepancyCounts, Population};
use rla::random_util::{derived_seed, seeded_rng};
use rla::sample_size::{average_sample_number, kaplan_markov_sample_size};
use rla::sequential_audit::{run_sequential_audit, AuditError, AuditParameters, AuditState, SamplingMode, SequentialTest, MAX_ROUNDS};

fn population(num_ballots:usize,winner:usize,runner_up:usize) -> Population {
    Population::new(num_ballots,winner,runner_up,DiscrepancyCounts::default(),0).unwrap()
}

fn all_the_same(num_ballots:usize,true_vote:TrueVote,error_kind:ErrorKind) -> Vec<Ballot> {
    (0..num_ballots).map(|i|Ballot::new(BallotId(i),true_vote,error_kind)).collect()
}

#[test]
fn bravo_stops_within_population_and_is_reproducible() {
    let population = population(1000,550,450);
    let params = AuditParameters::new(0.05);
    let run = |seed:u64| {
        let mut rng = seeded_rng(seed);
        let ballots = population.generate_ballots(&mut rng);
        ballot_polling_audit(&population,&ballots,&params,&mut rng).unwrap()
    };
    let first = run(42);
    let again = run(42);
    assert!(first.ballots_audited<=1000);
    assert!(first.ballots_audited>0);
    assert_eq!(first.ballots_audited,again.ballots_audited);
    assert_eq!(first.sampled,again.sampled);
    assert_eq!(first.state,again.state);
    assert_eq!(first.success(),first.statistic>=20.0);
    assert!(matches!(first.state,AuditState::Success|AuditState::Failed));
}

#[test]
fn bravo_certifies_clear_winners() {
    let population = population(1000,700,300);
    let params = AuditParameters::new(0.05);
    let mut successes = 0;
    for run in 0..50 {
        let mut rng = seeded_rng(derived_seed(700,run));
        let ballots = population.generate_ballots(&mut rng);
        if ballot_polling_audit(&population,&ballots,&params,&mut rng).unwrap().success() { successes+=1; }
    }
    assert!(successes>=48,"only {} successes",successes);
}

/// Reported 55:45 but really tied. The risk limit bounds how often this is certified.
#[test]
fn bravo_rarely_certifies_wrong_outcome() {
    let reported = population(1000,550,450);
    let truth = population(1000,500,500);
    let params = AuditParameters::new(0.05);
    let runs = 400;
    let mut successes = 0;
    for run in 0..runs {
        let mut rng = seeded_rng(derived_seed(500,run));
        let ballots = truth.generate_ballots(&mut rng);
        let mut test = BallotPollingTest::new(&reported,params.risk_limit);
        if run_sequential_audit(&mut test,&ballots,&params,&mut rng).unwrap().success() { successes+=1; }
    }
    let expected = 0.05*runs as f64;
    let sd = (expected*0.95).sqrt();
    assert!((successes as f64)<expected+5.0*sd,"{} wrong certifications",successes);
}

#[test]
fn fixed_size_audit_draws_exactly_that_many() {
    let population = population(1000,550,450);
    let params = AuditParameters::new(0.05).with_bounds(Some(50),Some(50));
    let mut rng = seeded_rng(9);
    let ballots = population.generate_ballots(&mut rng);
    let outcome = ballot_polling_audit(&population,&ballots,&params,&mut rng).unwrap();
    assert_eq!(50,outcome.ballots_audited);
    assert_eq!(50,outcome.sampled.len());
    assert_eq!(outcome.success(),outcome.statistic>=20.0);
}

#[test]
fn runner_up_tally_requires_recount_at_round_boundary() {
    let reported = population(1000,600,400);
    let ballots = all_the_same(1000,TrueVote::RunnerUp,ErrorKind::None);
    let params = AuditParameters::new(0.05).with_mode(SamplingMode::Rounds);
    let outcome = ballot_polling_audit(&reported,&ballots,&params,&mut seeded_rng(1)).unwrap();
    assert!(outcome.recount_required());
    assert_eq!(2,outcome.rounds);
    assert_eq!(average_sample_number(1000,600,400,0.05),outcome.ballots_audited);
    assert!(outcome.ballots_audited<1000);
}

#[test]
fn running_out_with_runner_up_ahead_requires_recount() {
    let reported = population(1000,600,400);
    let params = AuditParameters::new(0.05);
    let ballots = all_the_same(1000,TrueVote::RunnerUp,ErrorKind::None);
    let outcome = ballot_polling_audit(&reported,&ballots,&params,&mut seeded_rng(1)).unwrap();
    assert_eq!(AuditState::RecountRequired,outcome.state);
    assert_eq!(1000,outcome.ballots_audited);
    // no evidence either way is a failure to certify, not a recount.
    let ballots = all_the_same(1000,TrueVote::Undetermined,ErrorKind::None);
    let outcome = ballot_polling_audit(&reported,&ballots,&params,&mut seeded_rng(1)).unwrap();
    assert_eq!(AuditState::Failed,outcome.state);
    assert_eq!(1000,outcome.ballots_audited);
    let params = AuditParameters::new(0.05).with_bounds(Some(30),Some(30));
    let ballots = all_the_same(1000,TrueVote::RunnerUp,ErrorKind::None);
    let outcome = ballot_polling_audit(&reported,&ballots,&params,&mut seeded_rng(1)).unwrap();
    assert_eq!(AuditState::RecountRequired,outcome.state);
    assert_eq!(30,outcome.ballots_audited);
}

#[test]
fn too_many_rounds_is_an_error() {
    let reported = population(10000,9000,1000);
    let ballots = all_the_same(10000,TrueVote::Undetermined,ErrorKind::None);
    let params = AuditParameters::new(0.05).with_mode(SamplingMode::Rounds);
    let mut test = BallotPollingTest::new(&reported,0.05);
    let res = run_sequential_audit(&mut test,&ballots,&params,&mut seeded_rng(2));
    assert_eq!(Err(AuditError::ExcessiveRounds(MAX_ROUNDS)),res.map(|o|o.state));
}

#[test]
fn comparison_risk_strictly_decreases_without_discrepancies() {
    let params = AuditParameters::new(0.05).with_gamma(1.1);
    let mut test = BallotComparisonTest::new(0.10,&params);
    let ballot = Ballot::new(BallotId(0),TrueVote::Winner,ErrorKind::None);
    let mut rng = seeded_rng(0);
    let mut previous = test.observed_risk();
    assert_eq!(1.0,previous);
    for _ in 0..100 {
        test.observe(&ballot,&mut rng);
        assert!(test.observed_risk()<previous);
        previous=test.observed_risk();
    }
}

#[test]
fn comparison_needs_more_ballots_for_smaller_risk_limit() {
    let population = population(1000,550,450);
    let ballots = population.generate_ballots(&mut seeded_rng(3));
    let audited = |risk_limit:f64| {
        let outcome = ballot_comparison_audit(&population,&ballots,&AuditParameters::new(risk_limit),&ComparisonOptions::default(),&mut seeded_rng(4)).unwrap();
        assert!(outcome.success());
        outcome.ballots_audited
    };
    let loose = audited(0.10);
    let tight = audited(0.01);
    assert_eq!(50,loose);
    assert!(tight>loose);
    let needed = |risk_limit:f64| kaplan_markov_sample_size(risk_limit,1.1,0.1,&DiscrepancyCounts::default()).unwrap();
    assert!(needed(0.01)>needed(0.10));
}

#[test]
fn minimum_bound_delays_success() {
    let population = population(1000,550,450);
    let ballots = population.generate_ballots(&mut seeded_rng(5));
    let params = AuditParameters::new(0.10).with_bounds(Some(80),None);
    let outcome = ballot_comparison_audit(&population,&ballots,&params,&ComparisonOptions::default(),&mut seeded_rng(6)).unwrap();
    assert!(outcome.success());
    assert_eq!(80,outcome.ballots_audited);
}

#[test]
fn overstatements_are_counted_and_raise_risk() {
    let population = population(1000,550,450);
    let ballots = all_the_same(1000,TrueVote::Undetermined,ErrorKind::Overstatement2);
    let params = AuditParameters::new(0.05).with_bounds(None,Some(10));
    let outcome = ballot_comparison_audit(&population,&ballots,&params,&ComparisonOptions::default(),&mut seeded_rng(7)).unwrap();
    assert_eq!(AuditState::Failed,outcome.state);
    assert_eq!(10,outcome.discrepancies.overstatement2);
    assert!(outcome.statistic>1.0);
}

#[test]
fn erased_margin_stops_round_based_comparison() {
    let population = population(1000,500,500);
    let ballots = population.generate_ballots(&mut seeded_rng(8));
    let params = AuditParameters::new(0.05).with_mode(SamplingMode::Rounds);
    let res = ballot_comparison_audit(&population,&ballots,&params,&ComparisonOptions::default(),&mut seeded_rng(8));
    assert_eq!(Err(AuditError::MarginErased),res.map(|o|o.state));
}

#[test]
fn questionable_policy_decides_discrepancy() {
    let population = Population::new(1000,0,0,DiscrepancyCounts::default(),1000).unwrap();
    let ballots = population.generate_ballots(&mut seeded_rng(9));
    let params = AuditParameters::new(0.10);
    let plain = ComparisonOptions{diluted_margin:Some(0.1),..Default::default()};
    let outcome = ballot_comparison_audit(&population,&ballots,&params,&plain,&mut seeded_rng(10)).unwrap();
    assert_eq!(50,outcome.ballots_audited);
    assert_eq!(0,outcome.discrepancies.total());
    let conservative = ComparisonOptions{questionable_policy:Some(QuestionablePolicy::Conservative{as_mark:1.0}),..plain};
    let outcome = ballot_comparison_audit(&population,&ballots,&params,&conservative,&mut seeded_rng(10)).unwrap();
    assert!(outcome.success());
    assert!(outcome.ballots_audited<50);
    assert_eq!(outcome.ballots_audited,outcome.discrepancies.understatement1);
}

#[test]
fn invalid_parameters_rejected_before_sampling() {
    let population = population(100,60,40);
    let ballots = population.generate_ballots(&mut seeded_rng(11));
    let run = |params:AuditParameters| ballot_polling_audit(&population,&ballots,&params,&mut seeded_rng(12)).map(|o|o.ballots_audited);
    assert_eq!(Err(AuditError::InvalidRiskLimit(0.0)),run(AuditParameters::new(0.0)));
    assert_eq!(Err(AuditError::InvalidRiskLimit(1.0)),run(AuditParameters::new(1.0)));
    assert_eq!(Err(AuditError::InvalidGamma(1.0)),run(AuditParameters::new(0.05).with_gamma(1.0)));
    assert_eq!(Err(AuditError::MinimumExceedsMaximum{min:20,max:10}),run(AuditParameters::new(0.05).with_bounds(Some(20),Some(10))));
    assert_eq!(Err(AuditError::BoundOutOfRange{bound:101,num_ballots:100}),run(AuditParameters::new(0.05).with_bounds(None,Some(101))));
}

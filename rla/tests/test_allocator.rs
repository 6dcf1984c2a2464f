// Copyright 2024 Andrew Conway.
// This file is part of ConcreteRLA.
// ConcreteRLA is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteRLA is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteRLA.  If not, see <https://www.gnu.org/licenses/>.

//! Towns are chosen in proportion to their population, and batches never overflow.

use rla::allocator::{AllocationError, AuditKind, StratifiedAllocator};
use rla::ballot::{Ballot, BallotId, ErrorKind, TownIndex, TrueVote};
use rla::random_util::seeded_rng;
use rla::town_registry::{Town, TownRegistry};

fn two_towns() -> TownRegistry {
    TownRegistry::new(vec![
        Town{name:"Avon".to_string(),population:600,polling_places:3},
        Town{name:"Berlin".to_string(),population:400,polling_places:2},
    ]).unwrap()
}

fn ballots(n:usize) -> Vec<Ballot> {
    (0..n).map(|i|Ballot::new(BallotId(i),TrueVote::Winner,ErrorKind::None)).collect()
}

/// Check the number of standard deviations of a binomial distribution is < 5 away from expected.
fn is_close_to_expected(observed:usize,trials:usize,p:f64) -> bool {
    let expected = p*trials as f64;
    let sd = (expected*(1.0-p)).sqrt();
    let sigmas = (observed as f64-expected)/sd;
    println!("expected={:.1} actual={} sd={:.1} sigmas={:.1}",expected,observed,sd,sigmas);
    sigmas.abs()<5.0
}

#[test]
fn town_frequencies_follow_population() {
    let mut rng = seeded_rng(600400);
    let mut in_avon = 0;
    let runs = 200;
    let per_run = 100;
    for _ in 0..runs {
        let mut allocator = StratifiedAllocator::new(two_towns());
        for mut ballot in ballots(per_run) {
            let location = allocator.assign_town_and_batch(&mut ballot,AuditKind::Comparison,&mut rng).unwrap();
            if location.town==TownIndex(0) { in_avon+=1; }
        }
    }
    assert!(is_close_to_expected(in_avon,runs*per_run,0.6));
}

#[test]
fn full_allocation_uses_whole_population_without_overflow() {
    let mut rng = seeded_rng(3);
    for _ in 0..20 {
        let mut allocator = StratifiedAllocator::new(two_towns());
        let mut counts = [0,0];
        for mut ballot in ballots(1000) {
            let location = allocator.assign_town_and_batch(&mut ballot,AuditKind::Comparison,&mut rng).unwrap();
            assert!(location.batch.is_some());
            counts[location.town.0]+=1;
        }
        assert_eq!([600,400],counts);
        for town in [TownIndex(0),TownIndex(1)] {
            assert_eq!(0,allocator.remaining_population(town));
            for (capacity,audited) in allocator.batch_usage(town) {
                assert!(audited<=capacity);
            }
        }
    }
}

#[test]
fn allocation_is_memoized() {
    let mut rng = seeded_rng(4);
    let mut allocator = StratifiedAllocator::new(two_towns());
    let mut ballot = Ballot::new(BallotId(7),TrueVote::RunnerUp,ErrorKind::None);
    let first = allocator.assign_town_and_batch(&mut ballot,AuditKind::Comparison,&mut rng).unwrap();
    let remaining = allocator.remaining_population(first.town);
    for _ in 0..10 {
        assert_eq!(first,allocator.assign_town_and_batch(&mut ballot,AuditKind::Comparison,&mut rng).unwrap());
        assert_eq!(first,allocator.assign_town_and_batch(&mut ballot,AuditKind::Polling,&mut rng).unwrap());
    }
    assert_eq!(remaining,allocator.remaining_population(first.town));
    assert_eq!(Some(first),ballot.location());
}

#[test]
fn polling_allocation_has_no_batch() {
    let mut rng = seeded_rng(5);
    let mut allocator = StratifiedAllocator::new(two_towns());
    let mut ballot = Ballot::new(BallotId(0),TrueVote::Winner,ErrorKind::None);
    let location = allocator.assign_town_and_batch(&mut ballot,AuditKind::Polling,&mut rng).unwrap();
    assert_eq!(None,location.batch);
    assert!(allocator.batches_flagged_for_audit().iter().all(|f|f.num_batches==0));
}

#[test]
fn exhausted_population_is_an_error() {
    let mut rng = seeded_rng(6);
    let mut allocator = StratifiedAllocator::new(TownRegistry::new(vec![Town{name:"Tiny".to_string(),population:2,polling_places:1}]).unwrap());
    let mut b = ballots(3);
    assert!(allocator.assign_town_and_batch(&mut b[0],AuditKind::Polling,&mut rng).is_ok());
    assert!(allocator.assign_town_and_batch(&mut b[1],AuditKind::Polling,&mut rng).is_ok());
    assert_eq!(Err(AllocationError::PopulationExhausted),allocator.assign_town_and_batch(&mut b[2],AuditKind::Polling,&mut rng));
}

#[test]
fn flagged_batches_use_static_sizes() {
    let mut rng = seeded_rng(7);
    let registry = TownRegistry::new(vec![Town{name:"Canton".to_string(),population:100,polling_places:1}]).unwrap();
    assert_eq!(vec![95,5],registry.towns[0].batch_sizes());
    let mut allocator = StratifiedAllocator::new(registry);
    let mut ballot = Ballot::new(BallotId(0),TrueVote::Winner,ErrorKind::None);
    let location = allocator.assign_town_and_batch(&mut ballot,AuditKind::Comparison,&mut rng).unwrap();
    let flagged = allocator.batches_flagged_for_audit();
    assert_eq!(1,flagged.len());
    assert_eq!("Canton",flagged[0].town);
    assert_eq!(1,flagged[0].num_batches);
    let expected = if location.batch==Some(0) { 95 } else { 5 };
    assert_eq!(expected,flagged[0].ballots_in_batches);
}

#[test]
fn batch_sizes_cover_population() {
    for population in [0,1,7,100,999,12345] {
        for polling_places in 0..6 {
            let town = Town{name:"T".to_string(),population,polling_places};
            let sizes = town.batch_sizes();
            let total : usize = sizes.iter().sum();
            assert!(total>=population);
            assert!(total-population<=sizes.len());
        }
    }
}

// Copyright 2024 Andrew Conway.
// This file is part of ConcreteRLA.
// ConcreteRLA is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteRLA is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteRLA.  If not, see <https://www.gnu.org/licenses/>.

//! Generating published records for a simulated election, and auditing them.

use std::collections::HashSet;
use rla::batch_selection::{batches_missing_cvrs, lazy_cvr, pull_list, rows_at_positions, select_ballot_positions, select_batches};
use rla::csv_io::{read_cvr_from, read_election_records, read_manifest, write_cvr_to, write_election_records, write_records, write_repair_log, CHANGES_FILE};
use rla::election::SimulatedElection;
use rla::election_records::{BatchKey, ManifestEntry, TabulationTotals};
use rla::population::{DiscrepancyCounts, Population};
use rla::random_util::seeded_rng;
use rla::record_generation::{generate_records, GeneratedRecords};
use rla::reconciliation::ElectionBatches;
use rla::risk_calculation::{calculate_risk, calculate_risk_with_margin};
use rla::sequential_audit::AuditError;
use rla::town_registry::{Town, TownRegistry, TownRegistryError};

fn towns() -> TownRegistry {
    TownRegistry::new(vec![
        Town{name:"Avon".to_string(),population:600,polling_places:3},
        Town{name:"Berlin".to_string(),population:400,polling_places:2},
    ]).unwrap()
}

fn generated(discrepancies:DiscrepancyCounts,seed:u64) -> GeneratedRecords {
    let population = Population::from_margin(1000,10.0,discrepancies,0).unwrap();
    let mut rng = seeded_rng(seed);
    let mut election = SimulatedElection::new(population,&towns(),&mut rng);
    generate_records(&mut election,&mut rng).unwrap()
}

#[test]
fn clean_election_records_agree() {
    let records = generated(DiscrepancyCounts::default(),1);
    assert_eq!(records.true_cvr,records.published.cvr);
    assert_eq!(1000,records.published.manifest_count());
    assert!(records.published.manifest.len()<=7);
    assert!(ElectionBatches::new(&records.published).all_consistent());
    assert_eq!(TabulationTotals{ballots:1000,winner:550,loser:450},TabulationTotals::new(&records.published.tabulation));
    let imprints : HashSet<&String> = records.true_cvr.iter().map(|r|&r.imprint_id).collect();
    assert_eq!(1000,imprints.len());
    assert!(records.true_cvr.iter().all(|r|r.batch.town=="Avon" || r.batch.town=="Berlin"));
}

#[test]
fn machine_records_contain_injected_discrepancies() {
    let discrepancies = DiscrepancyCounts{overstatement2:5,understatement1:3,..Default::default()};
    let records = generated(discrepancies,2);
    assert!(ElectionBatches::new(&records.published).all_consistent());
    let risk = calculate_risk(&records.true_cvr,&records.published,1.1).unwrap();
    assert_eq!(1000,risk.ballots_compared);
    assert_eq!(discrepancies,risk.discrepancies);
    assert_eq!(0,risk.penalised);
    assert!(risk.repair_log.no_changes());
}

#[test]
fn risk_from_clean_sample_matches_kaplan_markov() {
    let records = generated(DiscrepancyCounts::default(),3);
    let manual = &records.true_cvr[..100];
    let risk = calculate_risk(manual,&records.published,1.1).unwrap();
    assert!((risk.diluted_margin-0.1).abs()<1e-12);
    let expected = (1.0-0.1/2.2f64).powi(100);
    assert!((risk.observed_risk-expected).abs()<1e-9*expected);
    assert!(risk.risk_limit_met(0.05));
    assert_eq!(0,risk.discrepancies.total());
}

#[test]
fn gamma_must_exceed_one_to_compute_risk() {
    let records = generated(DiscrepancyCounts{overstatement2:1,..Default::default()},2);
    assert_eq!(1,calculate_risk(&records.true_cvr,&records.published,1.1).unwrap().discrepancies.overstatement2);
    for gamma in [0.9,1.0,-1.1,f64::INFINITY] {
        assert_eq!(Some(AuditError::InvalidGamma(gamma)),calculate_risk(&records.true_cvr,&records.published,gamma).err());
        assert_eq!(Some(AuditError::InvalidGamma(gamma)),calculate_risk_with_margin(&records.true_cvr,&records.published,0.1,gamma).err());
    }
}

#[test]
fn unusual_manual_readings_are_charged() {
    let mut records = generated(DiscrepancyCounts::default(),4);
    let mut unreadable = records.true_cvr[0].clone();
    unreadable.winner_flag=2;
    let mut unknown = records.true_cvr[1].clone();
    unknown.sequence_number="999999".to_string();
    let mut stray = records.true_cvr[2].clone();
    stray.batch=BatchKey::new("Nowhere",0);
    records.published.cvr.push(stray.clone());
    let risk = calculate_risk(&[unreadable,unknown,stray],&records.published,1.1).unwrap();
    assert_eq!(1,risk.review_required.len());
    assert_eq!((2,0),risk.review_required[0].manual_flags);
    assert_eq!(1,risk.unmatched);
    assert_eq!(1,risk.penalised);
    assert_eq!(2,risk.ballots_compared);
    assert_eq!(2,risk.discrepancies.overstatement2);
    assert!(risk.observed_risk>1.0);
}

#[test]
fn lazy_selection_only_needs_chosen_batches() {
    let records = generated(DiscrepancyCounts::default(),5);
    let mut rng = seeded_rng(6);
    let selection = select_batches(&records.published.manifest,30,&mut rng);
    assert_eq!(30,selection.draws.values().sum::<usize>());
    for (batch,size) in &selection.sizes {
        let entry = records.published.manifest.iter().find(|m|&m.batch==batch).unwrap();
        assert_eq!(entry.ballot_count,*size);
    }
    let cvr = lazy_cvr(&records.published.cvr,&selection);
    assert_eq!(selection.ballots_in_batches(),cvr.len());
    assert!(batches_missing_cvrs(&cvr,&selection).is_empty());
    assert_eq!(selection.num_batches(),batches_missing_cvrs(&[],&selection).len());
    let positions = select_ballot_positions(&selection,&mut rng);
    let mut total = 0;
    for (batch,p) in &positions {
        assert!(p.windows(2).all(|w|w[0]<w[1]));
        assert!(p.iter().all(|&i|i>=1 && i<=selection.sizes[batch]));
        assert!(p.len()<=selection.draws[batch]);
        total+=p.len();
    }
    assert_eq!(total,pull_list(&positions).len());
    assert_eq!(total,rows_at_positions(&cvr,&positions).len());
}

#[test]
fn batches_drawn_in_proportion_to_size() {
    let manifest = vec![
        ManifestEntry{container:"Box 1".to_string(),tabulator:"Tabulator 1".to_string(),batch:BatchKey::new("Avon",0),ballot_count:900},
        ManifestEntry{container:"Box 1".to_string(),tabulator:"Tabulator 1".to_string(),batch:BatchKey::new("Avon",1),ballot_count:100},
    ];
    let draws = 10000;
    let selection = select_batches(&manifest,draws,&mut seeded_rng(7));
    let big = selection.draws[&BatchKey::new("Avon",0)] as f64;
    let sd = (draws as f64*0.9*0.1).sqrt();
    assert!((big-0.9*draws as f64).abs()<5.0*sd);
}

#[test]
fn cvr_survives_writing_and_reading() {
    let records = generated(DiscrepancyCounts{overstatement1:2,..Default::default()},8);
    let mut buffer : Vec<u8> = vec![];
    write_cvr_to(&mut buffer,&records.published.cvr[..20]).unwrap();
    let text = String::from_utf8(buffer.clone()).unwrap();
    assert_eq!(Some("Test"),text.lines().next());
    assert_eq!(24,text.lines().count());
    assert_eq!(&records.published.cvr[..20],&read_cvr_from(&buffer[..]).unwrap()[..]);
}

#[test]
fn election_directory_written_and_read() {
    let records = generated(DiscrepancyCounts::default(),9);
    let dir = std::env::temp_dir().join(format!("rla_records_test_{}",std::process::id()));
    write_election_records(&dir,&records.published,Some(&records.true_cvr)).unwrap();
    let read = read_election_records(&dir).unwrap();
    assert_eq!(records.published.manifest,read.manifest);
    assert_eq!(records.published.tabulation,read.tabulation);
    assert_eq!(records.published.cvr,read.cvr);
    let changes = dir.join(CHANGES_FILE);
    write_repair_log(&changes,&[]).unwrap();
    let text = std::fs::read_to_string(&changes).unwrap();
    assert!(text.contains("No batches were forced consistent."));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn towns_load_from_json() {
    let path = std::env::temp_dir().join(format!("rla_towns_test_{}.json",std::process::id()));
    std::fs::write(&path,r#"[{"Town":"Avon","Voter Population":600,"Polling Places":3},{"Town":"Berlin","Voter Population":400,"Polling Places":2}]"#).unwrap();
    let registry = TownRegistry::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(towns(),registry);
    assert_eq!(1000,registry.total_population());
    assert_eq!(Some(rla::ballot::TownIndex(1)),registry.find("Berlin"));
}

#[test]
fn batch_names_read_back_unchanged() {
    let keys = vec![BatchKey::new("Avon",0),BatchKey::new("New Haven",12),BatchKey::new("Route 9 North",3),BatchKey::new("A",10)];
    let manifest : Vec<ManifestEntry> = keys.iter().map(|batch|ManifestEntry{container:"C".to_string(),tabulator:"T".to_string(),batch:batch.clone(),ballot_count:5}).collect();
    let path = std::env::temp_dir().join(format!("rla_batch_names_test_{}.csv",std::process::id()));
    write_records(&path,&manifest).unwrap();
    let read = read_manifest(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(manifest,read);
}

#[test]
fn towns_with_ambiguous_batch_names_are_rejected() {
    let town = |name:&str| Town{name:name.to_string(),population:100,polling_places:1};
    assert_eq!(Err(TownRegistryError::NameEndsInDigit("Town2".to_string())),TownRegistry::new(vec![town("Avon"),town("Town2")]));
    assert_eq!(Err(TownRegistryError::DuplicateName("Avon".to_string())),TownRegistry::new(vec![town("Avon"),town("Berlin"),town("Avon")]));
    assert!(TownRegistry::new(vec![town("Route 9 North")]).is_ok());
    let path = std::env::temp_dir().join(format!("rla_digit_towns_test_{}.json",std::process::id()));
    std::fs::write(&path,r#"[{"Town":"A1","Voter Population":600,"Polling Places":3}]"#).unwrap();
    let loaded = TownRegistry::load(&path);
    std::fs::remove_file(&path).unwrap();
    assert!(loaded.is_err());
}

// Copyright 2024 Andrew Conway.
// This file is part of ConcreteRLA.
// ConcreteRLA is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteRLA is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteRLA.  If not, see <https://www.gnu.org/licenses/>.

//! Check that the manifest, tabulation and CVRs of a batch agree with each other, and
//! if they do not, force them to agree in a deterministic, logged way.
//!
//! Repairs happen in a fixed order. Sizes are fixed first, so that the vote counts are
//! stable; then winner and runner up flags; then duplicate identifiers, last so that
//! placeholder rows added for size cannot collide.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use log::{info, warn};
use serde::{Serialize,Deserialize};
use crate::election_records::{BatchKey, CvrRow, ElectionRecords, ManifestEntry, TabulationEntry};

/// The tabulation's claims about one batch.
#[derive(Debug,Serialize,Deserialize,Clone,Copy,PartialEq,Eq,Default)]
pub struct TabulatedCounts {
    pub size : usize,
    pub winner : usize,
    pub loser : usize,
}

impl From<&TabulationEntry> for TabulatedCounts {
    fn from(e: &TabulationEntry) -> Self { TabulatedCounts{size:e.size,winner:e.winner,loser:e.loser} }
}

/// A way in which a batch's records disagree.
#[derive(Debug,Serialize,Deserialize,Clone,PartialEq,Eq)]
pub enum Inconsistency {
    SizeMismatch{manifest:usize,tabulated:usize,cvr_rows:usize},
    WinnerCountMismatch{tabulated:usize,cvr:usize},
    LoserCountMismatch{tabulated:usize,cvr:usize},
    DuplicateRecordId(String),
    DuplicateImprintId(String),
}

/// Which piece of data a repair changed.
#[derive(Debug,Serialize,Deserialize,Clone,PartialEq,Eq)]
pub enum RepairField {
    TabulatedSize,
    TabulatedWinner,
    TabulatedLoser,
    CvrRowCount,
    /// The row is identified by its record id.
    WinnerFlag(String),
    RunnerUpFlag(String),
    /// The row is identified by its position in the batch, starting at 1.
    RecordId(usize),
    ImprintId(usize),
}

impl fmt::Display for RepairField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RepairField::TabulatedSize => write!(f,"tabulated size"),
            RepairField::TabulatedWinner => write!(f,"tabulated winner count"),
            RepairField::TabulatedLoser => write!(f,"tabulated loser count"),
            RepairField::CvrRowCount => write!(f,"CVR row count"),
            RepairField::WinnerFlag(record) => write!(f,"winner flag of record {}",record),
            RepairField::RunnerUpFlag(record) => write!(f,"runner up flag of record {}",record),
            RepairField::RecordId(row) => write!(f,"record id of row {}",row),
            RepairField::ImprintId(row) => write!(f,"imprint id of row {}",row),
        }
    }
}

#[derive(Debug,Serialize,Deserialize,Clone,PartialEq,Eq)]
pub struct RepairAction {
    pub batch : BatchKey,
    pub field : RepairField,
    pub before : String,
    pub after : String,
}

#[derive(Debug,Serialize,Deserialize,Clone,PartialEq,Eq)]
pub enum RepairLogEntry {
    Changed(RepairAction),
    NoChanges(BatchKey),
}

impl fmt::Display for RepairLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RepairLogEntry::Changed(a) => write!(f,"{} : {} changed from {} to {}",a.batch,a.field,a.before,a.after),
            RepairLogEntry::NoChanges(batch) => write!(f,"{} : no changes were made",batch),
        }
    }
}

/// The trail of every repair made, for transparency.
#[derive(Debug,Serialize,Deserialize,Clone,PartialEq,Eq,Default)]
pub struct RepairLog {
    pub entries : Vec<RepairLogEntry>,
}

impl RepairLog {
    pub fn change(&mut self,batch:&BatchKey,field:RepairField,before:impl ToString,after:impl ToString) {
        let action = RepairAction{batch:batch.clone(),field,before:before.to_string(),after:after.to_string()};
        info!("{}",RepairLogEntry::Changed(action.clone()));
        self.entries.push(RepairLogEntry::Changed(action));
    }
    pub fn no_changes(&self) -> bool { self.entries.iter().all(|e|matches!(e,RepairLogEntry::NoChanges(_))) }
    pub fn changes_for<'a>(&'a self,batch:&'a BatchKey) -> impl Iterator<Item=&'a RepairAction> + 'a {
        self.entries.iter().filter_map(move |e|match e { RepairLogEntry::Changed(a) if &a.batch==batch => Some(a), _ => None })
    }
    /// One line per entry, as written to the changes file.
    pub fn lines(&self) -> Vec<String> { self.entries.iter().map(|e|e.to_string()).collect() }
    pub fn extend(&mut self,other:RepairLog) { self.entries.extend(other.entries) }
}

/// Everything known about one batch.
#[derive(Debug,Serialize,Deserialize,Clone,PartialEq,Eq)]
pub struct BatchRecords {
    pub key : BatchKey,
    pub manifest_count : usize,
    pub tabulated : TabulatedCounts,
    pub cvr : Vec<CvrRow>,
}

impl BatchRecords {
    pub fn cvr_winner_count(&self) -> usize { self.cvr.iter().filter(|r|r.winner_flag==1).count() }
    pub fn cvr_loser_count(&self) -> usize { self.cvr.iter().filter(|r|r.runner_up_flag==1).count() }

    /// All the ways the records disagree. Empty if consistent.
    pub fn inconsistencies(&self) -> Vec<Inconsistency> {
        let mut res = vec![];
        let cvr_rows = self.cvr.len();
        if self.manifest_count!=self.tabulated.size || self.manifest_count!=cvr_rows {
            res.push(Inconsistency::SizeMismatch{manifest:self.manifest_count,tabulated:self.tabulated.size,cvr_rows});
        }
        let cvr = self.cvr_winner_count();
        if cvr!=self.tabulated.winner { res.push(Inconsistency::WinnerCountMismatch{tabulated:self.tabulated.winner,cvr}); }
        let cvr = self.cvr_loser_count();
        if cvr!=self.tabulated.loser { res.push(Inconsistency::LoserCountMismatch{tabulated:self.tabulated.loser,cvr}); }
        for id in duplicates(self.cvr.iter().map(|r|&r.record_id)) { res.push(Inconsistency::DuplicateRecordId(id)); }
        for id in duplicates(self.cvr.iter().map(|r|&r.imprint_id)) { res.push(Inconsistency::DuplicateImprintId(id)); }
        res
    }

    pub fn check_consistent(&self) -> bool { self.inconsistencies().is_empty() }

    /// Make the batch consistent, logging what was done. Afterwards [Self::check_consistent] is true.
    pub fn force_consistent(&mut self,log:&mut RepairLog) {
        if self.check_consistent() {
            log.entries.push(RepairLogEntry::NoChanges(self.key.clone()));
            return;
        }
        warn!("Batch {} is inconsistent : {:?}",self.key,self.inconsistencies());
        self.repair_size(log);
        self.repair_votes(log);
        self.repair_uniqueness(log);
    }

    fn repair_size(&mut self,log:&mut RepairLog) {
        let target = self.manifest_count;
        if self.tabulated.size!=target {
            log.change(&self.key,RepairField::TabulatedSize,self.tabulated.size,target);
            self.tabulated.size=target;
        }
        if self.tabulated.winner>target {
            log.change(&self.key,RepairField::TabulatedWinner,self.tabulated.winner,target);
            self.tabulated.winner=target;
        }
        if self.tabulated.loser>target {
            log.change(&self.key,RepairField::TabulatedLoser,self.tabulated.loser,target);
            self.tabulated.loser=target;
        }
        let before = self.cvr.len();
        if before>target {
            self.cvr.truncate(target);
        } else if before<target {
            let tabulator = self.cvr.first().map(|r|r.tabulator.clone()).unwrap_or_default();
            for k in 1..=target-before {
                self.cvr.push(CvrRow{
                    sequence_number: format!("nullBallot-{}-{}",self.key,k),
                    tabulator: tabulator.clone(),
                    batch: self.key.clone(),
                    record_id: format!("nullRecordID-{}-{}",self.key,k),
                    imprint_id: format!("nullImprintedID-{}-{}",self.key,k),
                    counting_group: String::new(),
                    precinct: self.key.town.clone(),
                    ballot_type: String::new(),
                    winner_flag: 0,
                    runner_up_flag: 0,
                });
            }
        }
        if before!=target { log.change(&self.key,RepairField::CvrRowCount,before,target); }
    }

    fn repair_votes(&mut self,log:&mut RepairLog) {
        let key = self.key.clone();
        let target = self.tabulated.winner;
        force_flag_count(&mut self.cvr,target,|r|&mut r.winner_flag,|r|RepairField::WinnerFlag(r.record_id.clone()),&key,log);
        let target = self.tabulated.loser;
        force_flag_count(&mut self.cvr,target,|r|&mut r.runner_up_flag,|r|RepairField::RunnerUpFlag(r.record_id.clone()),&key,log);
    }

    fn repair_uniqueness(&mut self,log:&mut RepairLog) {
        let key = self.key.clone();
        replace_duplicates(&mut self.cvr,|r|&mut r.record_id,RepairField::RecordId,&format!("nullRecordID-{}-dup",key),&key,log);
        replace_duplicates(&mut self.cvr,|r|&mut r.imprint_id,RepairField::ImprintId,&format!("nullImprintedID-{}-dup",key),&key,log);
    }
}

/// Values occurring more than once, in order of second occurrence.
fn duplicates<'a>(values:impl Iterator<Item=&'a String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    let mut res = vec![];
    for v in values {
        if !seen.insert(v) && reported.insert(v) { res.push(v.clone()); }
    }
    res
}

/// Flip flags in file order until exactly target rows have the flag set to 1.
fn force_flag_count(rows:&mut [CvrRow],target:usize,flag:impl Fn(&mut CvrRow)->&mut u8,field:impl Fn(&CvrRow)->RepairField,key:&BatchKey,log:&mut RepairLog) {
    let mut count = 0;
    for row in rows.iter_mut() { if *flag(row)==1 { count+=1; } }
    for row in rows.iter_mut() {
        if count==target { break; }
        let before = *flag(row);
        let after : u8 = if count>target && before==1 { 0 } else if count<target && before!=1 { 1 } else { continue };
        *flag(row)=after;
        log.change(key,field(row),before,after);
        if after==1 { count+=1 } else { count-=1 }
    }
}

/// Replace the second and later occurrences of an identifier with fresh placeholders.
fn replace_duplicates(rows:&mut [CvrRow],id:impl Fn(&mut CvrRow)->&mut String,field:impl Fn(usize)->RepairField,prefix:&str,key:&BatchKey,log:&mut RepairLog) {
    let mut taken : HashSet<String> = rows.iter_mut().map(|r|id(r).clone()).collect();
    let mut seen : HashSet<String> = HashSet::new();
    let mut next = 1;
    for (i,row) in rows.iter_mut().enumerate() {
        let current = id(row).clone();
        if seen.insert(current.clone()) { continue; }
        let fresh = loop {
            let candidate = format!("{}{}",prefix,next);
            next+=1;
            if !taken.contains(&candidate) { break candidate; }
        };
        taken.insert(fresh.clone());
        seen.insert(fresh.clone());
        log.change(key,field(i+1),&current,&fresh);
        *id(row)=fresh;
    }
}

/// The batches of an election, split into those with all three records and those missing
/// a manifest or tabulation entry, which cannot be reconciled.
#[derive(Debug,Clone,Default)]
pub struct ElectionBatches {
    pub batches : BTreeMap<BatchKey,BatchRecords>,
    /// CVR rows for batches not in both the manifest and the tabulation.
    pub unreconcilable : BTreeMap<BatchKey,Vec<CvrRow>>,
}

impl ElectionBatches {
    /// Group the records by batch. Batches in the manifest and tabulation with no CVR rows are included.
    pub fn new(records:&ElectionRecords) -> Self {
        let manifest : HashMap<&BatchKey,usize> = records.manifest.iter().map(|m|(&m.batch,m.ballot_count)).collect();
        let tabulation : HashMap<&BatchKey,TabulatedCounts> = records.tabulation.iter().map(|t|(&t.batch,t.into())).collect();
        let mut res = ElectionBatches::default();
        let mut cvr = records.cvr_by_batch();
        for (key,&manifest_count) in &manifest {
            if let Some(&tabulated) = tabulation.get(key) {
                let rows = cvr.remove(*key).unwrap_or_default();
                res.batches.insert((*key).clone(),BatchRecords{key:(*key).clone(),manifest_count,tabulated,cvr:rows});
            }
        }
        for (key,rows) in cvr {
            warn!("Batch {} has CVRs but is missing from the manifest or tabulation",key);
            res.unreconcilable.insert(key,rows);
        }
        res
    }

    /// Force every batch to be consistent.
    pub fn force_consistent(&mut self) -> RepairLog {
        let mut log = RepairLog::default();
        for batch in self.batches.values_mut() { batch.force_consistent(&mut log); }
        log
    }

    pub fn all_consistent(&self) -> bool { self.unreconcilable.is_empty() && self.batches.values().all(|b|b.check_consistent()) }
}

/// Make the tabulation agree with the manifest on batch sizes, and cap vote counts at the batch size.
/// Tabulation lines for batches not in the manifest are left alone.
pub fn correct_tabulation(manifest:&[ManifestEntry],tabulation:&[TabulationEntry],log:&mut RepairLog) -> Vec<TabulationEntry> {
    let sizes : HashMap<&BatchKey,usize> = manifest.iter().map(|m|(&m.batch,m.ballot_count)).collect();
    let mut changed = false;
    let res : Vec<TabulationEntry> = tabulation.iter().map(|t|{
        let mut t = t.clone();
        match sizes.get(&t.batch) {
            None => warn!("Tabulated batch {} is not in the manifest",t.batch),
            Some(&size) => {
                if t.size!=size { log.change(&t.batch,RepairField::TabulatedSize,t.size,size); t.size=size; changed=true; }
                if t.winner>size { log.change(&t.batch,RepairField::TabulatedWinner,t.winner,size); t.winner=size; changed=true; }
                if t.loser>size { log.change(&t.batch,RepairField::TabulatedLoser,t.loser,size); t.loser=size; changed=true; }
            }
        }
        t
    }).collect();
    if !changed { info!("Tabulation agrees with manifest, no changes were made"); }
    res
}

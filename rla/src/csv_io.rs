// Copyright 2024 Andrew Conway.
// This file is part of ConcreteRLA.
// ConcreteRLA is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteRLA is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteRLA.  If not, see <https://www.gnu.org/licenses/>.


//! Reading and writing the CSV files election offices exchange.
//!
//! Manifest and tabulation files have a single header line. CVR files have the four line
//! header produced by the tabulators, which the csv crate cannot describe, so it is written
//! and skipped by hand.


use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use anyhow::anyhow;
use serde::Serialize;
use serde::de::DeserializeOwned;
use crate::batch_selection::PullListEntry;
use crate::election_records::{group_by_batch, BatchKey, CvrRow, ElectionRecords, ManifestEntry, TabulationEntry};

pub const MANIFEST_FILE : &str = "electionManifest.csv";
pub const TABULATION_FILE : &str = "electionTabulation.csv";
/// CVRs as the ballots truly are.
pub const TRUE_CVR_FILE : &str = "electionCVR1.csv";
/// CVRs as the machines recorded them.
pub const MACHINE_CVR_FILE : &str = "electionCVR2.csv";
pub const CHANGES_FILE : &str = "forceConsistentChanges.txt";
pub const TABULATION_CHANGES_FILE : &str = "electionTabulationChanges.txt";
/// Subdirectory holding the per batch files of a lazy comparison audit.
pub const LAZY_CVR_DIR : &str = "lazy_rla_cvr";

/// CVRs an election office produced for one selected batch.
pub fn lazy_cvr_path(dir:&Path,batch:&BatchKey) -> PathBuf { dir.join(LAZY_CVR_DIR).join(format!("{}CVR.csv",batch)) }
/// The selected ballots of a batch, for auditors to fill in.
pub fn blank_sheet_path(dir:&Path,batch:&BatchKey) -> PathBuf { dir.join(LAZY_CVR_DIR).join(format!("{}CVR_blank.csv",batch)) }
/// The selected ballots of a batch as the auditors read them.
pub fn check_sheet_path(dir:&Path,batch:&BatchKey) -> PathBuf { dir.join(LAZY_CVR_DIR).join(format!("{}CVR_check.csv",batch)) }
pub fn pull_sheet_path(dir:&Path,batch:&BatchKey) -> PathBuf { dir.join(format!("{}_Pull_Sheet.csv",batch)) }

const CVR_HEADER_LINES : [&[&str];4] = [
    &["Test"],
    &["","","","","","","","","Contest 1 (vote for = 1)","Contest 1 (vote for = 1)"],
    &["","","","","","","","","Winner","Runner-Up"],
    &["CVRNumber","TabulatorNumber","BatchID","RecordID","ImprintedID","CountingGroup","PrecinctPortion","BallotType","",""],
];

/// Read a CSV file with a single header line into records.
pub fn read_records<T:DeserializeOwned>(path:&Path) -> anyhow::Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e|anyhow!("Could not read {} : {}",path.display(),e))?;
    let mut res = vec![];
    for record in reader.deserialize() { res.push(record?); }
    Ok(res)
}

/// Write records to a CSV file with a single header line.
pub fn write_records<T:Serialize>(path:&Path,records:&[T]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for record in records { writer.serialize(record)?; }
    writer.flush()?;
    Ok(())
}

pub fn read_manifest(path:&Path) -> anyhow::Result<Vec<ManifestEntry>> { read_records(path) }
pub fn read_tabulation(path:&Path) -> anyhow::Result<Vec<TabulationEntry>> { read_records(path) }

/// Read CVR rows from anything, skipping the four header lines.
pub fn read_cvr_from<R:Read>(source:R) -> anyhow::Result<Vec<CvrRow>> {
    let mut reader = csv::ReaderBuilder::new().has_headers(false).flexible(true).from_reader(source);
    let mut res = vec![];
    for (line,record) in reader.records().enumerate() {
        let record = record?;
        if line<CVR_HEADER_LINES.len() { continue; }
        res.push(record.deserialize(None)?);
    }
    Ok(res)
}

pub fn read_cvr(path:&Path) -> anyhow::Result<Vec<CvrRow>> {
    let file = File::open(path).map_err(|e|anyhow!("Could not read {} : {}",path.display(),e))?;
    read_cvr_from(file)
}

fn cvr_writer<W:Write>(sink:W) -> anyhow::Result<csv::Writer<W>> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).flexible(true).from_writer(sink);
    for line in CVR_HEADER_LINES { writer.write_record(line)?; }
    Ok(writer)
}

/// Write CVR rows with the four header lines.
pub fn write_cvr_to<W:Write>(sink:W,rows:&[CvrRow]) -> anyhow::Result<()> {
    let mut writer = cvr_writer(sink)?;
    for row in rows { writer.serialize(row)?; }
    writer.flush()?;
    Ok(())
}

pub fn write_cvr(path:&Path,rows:&[CvrRow]) -> anyhow::Result<()> { write_cvr_to(File::create(path)?,rows) }

/// Write CVR rows without the vote columns, for auditors to fill in.
pub fn write_blank_audit_sheet(path:&Path,rows:&[CvrRow]) -> anyhow::Result<()> {
    let mut writer = cvr_writer(File::create(path)?)?;
    for r in rows {
        writer.write_record([&r.sequence_number,&r.tabulator,&r.batch.to_string(),&r.record_id,&r.imprint_id,&r.counting_group,&r.precinct,&r.ballot_type])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_pull_sheet(path:&Path,entries:&[PullListEntry]) -> anyhow::Result<()> { write_records(path,entries) }

/// Read the manifest, tabulation and machine CVRs from a directory.
pub fn read_election_records(dir:&Path) -> anyhow::Result<ElectionRecords> {
    Ok(ElectionRecords{
        manifest: read_manifest(&dir.join(MANIFEST_FILE))?,
        tabulation: read_tabulation(&dir.join(TABULATION_FILE))?,
        cvr: read_cvr(&dir.join(MACHINE_CVR_FILE))?,
    })
}

/// Write the published records, and the true CVRs if given, to a directory.
pub fn write_election_records(dir:&Path,records:&ElectionRecords,true_cvr:Option<&[CvrRow]>) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)?;
    write_records(&dir.join(MANIFEST_FILE),&records.manifest)?;
    write_records(&dir.join(TABULATION_FILE),&records.tabulation)?;
    write_cvr(&dir.join(MACHINE_CVR_FILE),&records.cvr)?;
    if let Some(true_cvr) = true_cvr { write_cvr(&dir.join(TRUE_CVR_FILE),true_cvr)?; }
    Ok(())
}

/// Write each batch's rows to the file path_for gives it, creating directories as needed.
/// Returns the batches written.
pub fn write_cvr_per_batch(rows:&[CvrRow],path_for:impl Fn(&BatchKey)->PathBuf,blank:bool) -> anyhow::Result<Vec<BatchKey>> {
    let mut res = vec![];
    for (batch,rows) in group_by_batch(rows) {
        let path = path_for(&batch);
        if let Some(parent) = path.parent() { std::fs::create_dir_all(parent)? }
        if blank { write_blank_audit_sheet(&path,&rows)? } else { write_cvr(&path,&rows)? }
        res.push(batch);
    }
    Ok(res)
}

/// Read and concatenate the per batch files that exist. Missing files are skipped.
pub fn read_cvr_per_batch<'a>(batches:impl IntoIterator<Item=&'a BatchKey>,path_for:impl Fn(&BatchKey)->PathBuf) -> anyhow::Result<Vec<CvrRow>> {
    let mut res = vec![];
    for batch in batches {
        let path = path_for(batch);
        if path.exists() { res.extend(read_cvr(&path)?); }
    }
    Ok(res)
}

/// Write the repair log as text, one change per line.
pub fn write_repair_log(path:&Path,lines:&[String]) -> anyhow::Result<()> {
    let mut file = File::create(path)?;
    writeln!(file,"Batches that were forced consistent are logged here.")?;
    if lines.is_empty() { writeln!(file,"No batches were forced consistent.")?; }
    for line in lines { writeln!(file,"{}",line)?; }
    Ok(())
}

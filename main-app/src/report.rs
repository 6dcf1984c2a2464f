// Copyright 2024 Andrew Conway.
// This file is part of ConcreteRLA.
// ConcreteRLA is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteRLA is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteRLA.  If not, see <https://www.gnu.org/licenses/>.

//! Tables summarising repeated simulations, printed and written as CSV.

use std::path::{Path, PathBuf};
use serde::Serialize;
use rla::csv_io::write_records;
use statistics::repeated_runs::{MethodRuns, RepeatedRuns};

#[derive(Debug,Serialize,Clone,PartialEq)]
pub struct MethodReportRow {
    #[serde(rename="Margin")]
    pub margin : f64,
    #[serde(rename="Method")]
    pub method : String,
    #[serde(rename="Runs")]
    pub runs : usize,
    #[serde(rename="Mean Ballots")]
    pub mean : f64,
    #[serde(rename="Stdev")]
    pub stdev : f64,
    #[serde(rename="Variance")]
    pub variance : f64,
    #[serde(rename="Median")]
    pub median : f64,
    #[serde(rename="Observed 95%")]
    pub percentile_95 : f64,
    #[serde(rename="Normal 75%")]
    pub normal_75 : f64,
    #[serde(rename="Normal 90%")]
    pub normal_90 : f64,
    #[serde(rename="Normal 95%")]
    pub normal_95 : f64,
    #[serde(rename="Success Rate")]
    pub success_rate : f64,
    #[serde(rename="Recounts")]
    pub recounts : usize,
    #[serde(rename="Average Non-Zero Towns")]
    pub average_towns : f64,
}

#[derive(Debug,Serialize,Clone,PartialEq)]
pub struct TownReportRow {
    #[serde(rename="Margin")]
    pub margin : f64,
    #[serde(rename="Method")]
    pub method : String,
    #[serde(rename="Town")]
    pub town : String,
    #[serde(rename="Mean Ballots")]
    pub mean : f64,
    #[serde(rename="Stdev")]
    pub stdev : f64,
    #[serde(rename="Variance")]
    pub variance : f64,
}

#[derive(Debug,Serialize,Clone,PartialEq)]
pub struct FlaggedReportRow {
    #[serde(rename="Margin")]
    pub margin : f64,
    #[serde(rename="Town")]
    pub town : String,
    #[serde(rename="Average Number of Precincts Flagged for Audit")]
    pub average_batches : f64,
    #[serde(rename="Average Flagged Precinct Population")]
    pub average_population : f64,
}

/// All the rows for every margin simulated.
#[derive(Debug,Clone,Default)]
pub struct SimulationReport {
    pub methods : Vec<MethodReportRow>,
    pub towns : Vec<TownReportRow>,
    pub flagged : Vec<FlaggedReportRow>,
}

fn method_row(margin:f64,method:&str,runs:&MethodRuns) -> MethodReportRow {
    let s = runs.sample_size();
    MethodReportRow{
        margin,
        method: method.to_string(),
        runs: runs.num_runs(),
        mean: s.mean,
        stdev: s.stdev,
        variance: s.variance,
        median: s.median,
        percentile_95: s.percentile_95,
        normal_75: s.normal_75,
        normal_90: s.normal_90,
        normal_95: s.normal_95,
        success_rate: runs.success_rate(),
        recounts: runs.num_recounts,
        average_towns: runs.average_towns_touched(),
    }
}

impl SimulationReport {
    pub fn add(&mut self,margin:f64,runs:&RepeatedRuns) {
        let mut methods = vec![("Ballot Comparison",&runs.comparison)];
        if runs.polling.num_runs()>0 { methods.push(("Ballot Polling",&runs.polling)); }
        for (method,method_runs) in methods {
            self.methods.push(method_row(margin,method,method_runs));
            for (i,town) in runs.towns.iter().enumerate() {
                let s = method_runs.town_summary(i);
                self.towns.push(TownReportRow{margin,method:method.to_string(),town:town.clone(),mean:s.mean,stdev:s.stdev,variance:s.variance});
            }
        }
        for (town,average_batches,average_population) in runs.average_flagged() {
            self.flagged.push(FlaggedReportRow{margin,town,average_batches,average_population});
        }
    }

    /// Print the method rows as a table.
    pub fn print_table(&self) {
        println!("{:>8} {:>18} {:>6} {:>10} {:>9} {:>9} {:>9} {:>8} {:>8}","Margin","Method","Runs","Mean","Stdev","Median","Norm 95%","Success","Towns");
        for r in &self.methods {
            println!("{:>8.3} {:>18} {:>6} {:>10.2} {:>9.2} {:>9.1} {:>9.2} {:>8.2} {:>8.2}",r.margin,r.method,r.runs,r.mean,r.stdev,r.median,r.normal_95,r.success_rate,r.average_towns);
        }
    }

    /// Write the method rows to path, and the town and flagged batch rows alongside it.
    /// Returns the files written.
    pub fn write(&self,path:&Path) -> anyhow::Result<Vec<PathBuf>> {
        let towns = sibling(path,"_towns");
        let flagged = sibling(path,"_flagged");
        write_records(path,&self.methods)?;
        write_records(&towns,&self.towns)?;
        write_records(&flagged,&self.flagged)?;
        Ok(vec![path.to_path_buf(),towns,flagged])
    }
}

/// report.csv -> report{suffix}.csv
fn sibling(path:&Path,suffix:&str) -> PathBuf {
    let stem = path.file_stem().map(|s|s.to_string_lossy().to_string()).unwrap_or_default();
    let extension = path.extension().map(|s|s.to_string_lossy().to_string()).unwrap_or_else(||"csv".to_string());
    path.with_file_name(format!("{}{}.{}",stem,suffix,extension))
}

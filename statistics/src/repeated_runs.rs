// Copyright 2024 Andrew Conway.
// This file is part of ConcreteRLA.
// ConcreteRLA is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteRLA is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteRLA.  If not, see <https://www.gnu.org/licenses/>.

//! Run simulated elections lots of times and see how much work the audits take.

use std::sync::Arc;
use std::thread;
use log::info;
use rand::Rng;
use serde::{Serialize,Deserialize};
use rla::allocator::FlaggedBatches;
use rla::random_util::{derived_seed, seeded_rng};
use rla::sequential_audit::AuditState;
use rla::simulation::{simulate_election, MethodResult, SimulationError, SimulationParameters, SimulationRun};
use rla::town_registry::TownRegistry;
use crate::simple_statistics::SampleSummary;

/// Everything remembered about one audit method over many runs.
#[derive(Debug,Serialize,Deserialize,Clone,Default)]
pub struct MethodRuns {
    /// Ballots audited in each run.
    pub ballots_audited : Vec<usize>,
    pub num_successes : usize,
    pub num_recounts : usize,
    /// Number of towns with at least one ballot audited, in each run.
    pub towns_touched : Vec<usize>,
    /// For each town, the ballots audited there in each run.
    pub ballots_per_town : Vec<Vec<usize>>,
}

impl MethodRuns {
    pub fn new(num_towns:usize) -> Self {
        MethodRuns{ballots_per_town:vec![vec![];num_towns],..Default::default()}
    }

    pub fn num_runs(&self) -> usize { self.ballots_audited.len() }

    pub fn add_run(&mut self,result:&MethodResult) {
        self.ballots_audited.push(result.ballots_audited);
        if result.success() { self.num_successes+=1; }
        if result.state==AuditState::RecountRequired { self.num_recounts+=1; }
        self.towns_touched.push(result.towns_touched());
        for (town,&n) in self.ballots_per_town.iter_mut().zip(result.ballots_per_town.iter()) { town.push(n); }
    }

    fn merge(&mut self,other:&MethodRuns) {
        self.ballots_audited.extend_from_slice(&other.ballots_audited);
        self.num_successes+=other.num_successes;
        self.num_recounts+=other.num_recounts;
        self.towns_touched.extend_from_slice(&other.towns_touched);
        for (mine,theirs) in self.ballots_per_town.iter_mut().zip(other.ballots_per_town.iter()) { mine.extend_from_slice(theirs); }
    }

    pub fn sample_size(&self) -> SampleSummary { SampleSummary::from_counts(&self.ballots_audited) }

    pub fn success_rate(&self) -> f64 {
        if self.num_runs()==0 { 0.0 } else { self.num_successes as f64/self.num_runs() as f64 }
    }

    pub fn average_towns_touched(&self) -> f64 { SampleSummary::from_counts(&self.towns_touched).mean }

    pub fn town_summary(&self,town:usize) -> SampleSummary { SampleSummary::from_counts(&self.ballots_per_town[town]) }

    /// Check the number of standard deviations of a binomial distribution is < 5 away from expected.
    /// A probability of 1 or 0 requires an exact match.
    pub fn is_close_to_expected_success_rate(&self,expected_prob:f64) -> bool {
        let runs = self.num_runs() as f64;
        let expected = expected_prob*runs;
        let expected_sd = f64::sqrt(expected*(1.0-expected_prob));
        let diff = self.num_successes as f64-expected;
        let sigmas = if expected_sd==0.0 { if diff==0.0 {0.0} else {f64::INFINITY} } else { diff/expected_sd };
        println!("expected={:.1} actual={} diff={:.1} sd={:.1} sigmas={:.1}",expected,self.num_successes,diff,expected_sd,sigmas);
        sigmas.abs()<5.0
    }
}

/// Batches flagged for CVR production in one town, summed over runs.
#[derive(Debug,Serialize,Deserialize,Clone,PartialEq)]
pub struct FlaggedTotals {
    pub town : String,
    pub num_batches : usize,
    pub ballots_in_batches : usize,
}

/// The results of running the same simulated election many times.
#[derive(Debug,Serialize,Deserialize,Clone)]
pub struct RepeatedRuns {
    pub num_runs : usize,
    pub towns : Vec<String>,
    pub comparison : MethodRuns,
    /// Empty if ballot polling was not simulated.
    pub polling : MethodRuns,
    pub flagged : Vec<FlaggedTotals>,
}

impl RepeatedRuns {
    pub fn new(towns:&TownRegistry) -> Self {
        let names : Vec<String> = towns.towns.iter().map(|t|t.name.clone()).collect();
        RepeatedRuns{
            num_runs: 0,
            comparison: MethodRuns::new(names.len()),
            polling: MethodRuns::new(names.len()),
            flagged: names.iter().map(|town|FlaggedTotals{town:town.clone(),num_batches:0,ballots_in_batches:0}).collect(),
            towns: names,
        }
    }

    pub fn add_run(&mut self,run:&SimulationRun) {
        self.num_runs+=1;
        self.comparison.add_run(&run.comparison);
        if let Some(polling) = &run.polling { self.polling.add_run(polling); }
        for (total,flagged) in self.flagged.iter_mut().zip(run.flagged_batches.iter()) { total.add(flagged); }
    }

    /// Simulate the election some number of times, and add each.
    pub fn add_run_times<R:Rng + ?Sized>(&mut self,params:&SimulationParameters,towns:&TownRegistry,times:usize,rng:&mut R) -> Result<(),SimulationError> {
        for _ in 0..times {
            let run = simulate_election(params,towns,rng)?;
            self.add_run(&run);
        }
        Ok(())
    }

    pub fn new_from_runs<R:Rng + ?Sized>(params:&SimulationParameters,towns:&TownRegistry,times:usize,rng:&mut R) -> Result<Self,SimulationError> {
        let mut res = RepeatedRuns::new(towns);
        res.add_run_times(params,towns,times,rng)?;
        Ok(res)
    }

    /// add in other to the cumulative sum of self.
    pub fn merge(&mut self,other:&RepeatedRuns) {
        self.num_runs+=other.num_runs;
        self.comparison.merge(&other.comparison);
        self.polling.merge(&other.polling);
        for (mine,theirs) in self.flagged.iter_mut().zip(other.flagged.iter()) {
            mine.num_batches+=theirs.num_batches;
            mine.ballots_in_batches+=theirs.ballots_in_batches;
        }
    }

    /// Run the simulation the given number of times, split amongst num_threads threads.
    /// Thread i uses a generator seeded from seed and i, so the result depends only on
    /// the arguments.
    pub fn new_from_runs_multithreaded(params:&SimulationParameters,towns:&TownRegistry,times:usize,num_threads:usize,seed:u64) -> Result<Self,SimulationError> {
        let num_threads = num_threads.max(1);
        let shared = Arc::new((params.clone(),towns.clone()));
        let mut handles = vec![];
        for thread_no in 0..num_threads {
            let num_to_do = times / num_threads + (if times % num_threads > thread_no { 1 } else { 0 });
            let shared = shared.clone();
            let handle = thread::spawn(move || {
                let (params,towns) = &*shared;
                let mut rng = seeded_rng(derived_seed(seed,thread_no as u64));
                Self::new_from_runs(params,towns,num_to_do,&mut rng)
            });
            handles.push(handle);
        }
        let mut res = RepeatedRuns::new(towns);
        for handle in handles {
            let partial = handle.join().unwrap_or_else(|e|std::panic::resume_unwind(e))?;
            res.merge(&partial);
        }
        info!("Finished {} simulations of a {}% margin",res.num_runs,params.margin_percent);
        Ok(res)
    }

    /// Average number of batches flagged in each town, and their average total population.
    pub fn average_flagged(&self) -> Vec<(String,f64,f64)> {
        let runs = self.num_runs.max(1) as f64;
        self.flagged.iter().map(|f|(f.town.clone(),f.num_batches as f64/runs,f.ballots_in_batches as f64/runs)).collect()
    }

    pub fn average_flagged_batches_total(&self) -> f64 {
        self.average_flagged().iter().map(|(_,batches,_)|batches).sum()
    }
}

impl FlaggedTotals {
    fn add(&mut self,flagged:&FlaggedBatches) {
        self.num_batches+=flagged.num_batches;
        self.ballots_in_batches+=flagged.ballots_in_batches;
    }
}

// Copyright 2024 Andrew Conway.
// This file is part of ConcreteRLA.
// ConcreteRLA is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteRLA is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteRLA.  If not, see <https://www.gnu.org/licenses/>.


use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use anyhow::anyhow;
use log::warn;
use rla::ballot_polling::BallotPollingTest;
use rla::batch_selection::{batches_missing_cvrs, lazy_cvr, pull_list, rows_at_positions, select_ballot_positions, select_batches, DEFAULT_BALLOT_SEED, DEFAULT_BATCH_SEED};
use rla::csv_io::{blank_sheet_path, check_sheet_path, lazy_cvr_path, pull_sheet_path, read_cvr, read_cvr_per_batch, read_election_records, read_manifest, read_tabulation, write_cvr_per_batch, write_pull_sheet, write_repair_log, CHANGES_FILE, MANIFEST_FILE, TABULATION_CHANGES_FILE, TABULATION_FILE, TRUE_CVR_FILE};
use rla::election_records::{ElectionRecords, TabulationTotals};
use rla::population::DiscrepancyCounts;
use rla::random_util::seeded_rng;
use rla::reconciliation::{correct_tabulation, RepairLog};
use rla::risk_calculation::calculate_risk_with_margin;
use rla::sample_size::{initial_comparison_sample_size, kaplan_markov_sample_size};
use rla::sequential_audit::{AuditParameters, RoundDecision, SequentialTest, DEFAULT_GAMMA};

#[derive(Parser)]
#[clap(version, author = "Andrew Conway", name="rla_audit")]
/// Run a risk limiting audit on an election's published records: a manifest, a tabulation and,
/// for a comparison audit, cast vote records.
struct Opts {
    #[clap(subcommand)]
    command : Command,

    /// The risk limit α: the largest acceptable chance of certifying a wrong outcome.
    #[clap(long,default_value_t=0.05,global=true)]
    risk_limit : f64,

    #[clap(long,global=true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Lazy ballot comparison audit. Selects batches, writes their CVRs and blank audit sheets
    /// to the lazy_rla_cvr subdirectory, then compares the auditors' readings with the CVRs.
    Comparison {
        /// Directory containing electionManifest.csv, electionTabulation.csv and electionCVR2.csv.
        #[clap(short, long)]
        dir : PathBuf,
        /// Seed for selecting batches.
        #[clap(long,default_value_t=DEFAULT_BATCH_SEED)]
        seed1 : u64,
        /// Seed for selecting ballots within the batches.
        #[clap(long,default_value_t=DEFAULT_BALLOT_SEED)]
        seed2 : u64,
        /// Directory with a lazy_rla_cvr subdirectory of the auditors' readings, one {batch}CVR_check.csv per batch.
        /// If not given, the readings are taken from electionCVR1.csv in the records directory, and written there.
        #[clap(long)]
        manual : Option<PathBuf>,
        #[clap(long,default_value_t=DEFAULT_GAMMA)]
        gamma : f64,
    },
    /// Ballot polling audit. Writes a pull sheet for each batch listing the ballots to examine.
    /// After a round, run again with the counts seen and the statistic reported last time.
    Polling {
        /// Directory containing electionManifest.csv and electionTabulation.csv.
        #[clap(short, long)]
        dir : PathBuf,
        #[clap(long,default_value_t=DEFAULT_BATCH_SEED)]
        seed : u64,
        /// Ballots for the reported winner seen in the round just audited.
        #[clap(long,requires="runner_up")]
        winner : Option<usize>,
        /// Ballots for the reported runner up seen in the round just audited.
        #[clap(long,requires="winner")]
        runner_up : Option<usize>,
        /// The test statistic T reported at the end of the previous round.
        #[clap(long,default_value_t=1.0)]
        statistic : f64,
    },
}

fn main() -> anyhow::Result<()> {
    let opt : Opts = Opts::parse();
    main_app::init_logging(opt.verbose);
    match &opt.command {
        Command::Comparison{dir,seed1,seed2,manual,gamma} => comparison(dir,*seed1,*seed2,manual.as_deref(),opt.risk_limit,*gamma),
        Command::Polling{dir,seed,winner,runner_up,statistic} => polling(dir,*seed,opt.risk_limit,*winner,*runner_up,*statistic),
    }
}

fn comparison(dir:&Path,seed1:u64,seed2:u64,manual:Option<&Path>,risk_limit:f64,gamma:f64) -> anyhow::Result<()> {
    let records = read_election_records(dir)?;
    AuditParameters::new(risk_limit).with_gamma(gamma).validate(records.manifest_count())?;
    let mut tabulation_log = RepairLog::default();
    let tabulation = correct_tabulation(&records.manifest,&records.tabulation,&mut tabulation_log);
    write_repair_log(&dir.join(TABULATION_CHANGES_FILE),&tabulation_log.lines())?;
    let diluted_margin = TabulationTotals::new(&tabulation).diluted_margin();
    let assumed = DiscrepancyCounts{overstatement1:1,overstatement2:1,understatement1:1,understatement2:1};
    let sample_size = initial_comparison_sample_size(risk_limit,gamma,diluted_margin,&assumed,records.manifest_count())?;
    println!("Diluted margin {:.4}. Auditing {} ballots.",diluted_margin,sample_size);
    let selection = select_batches(&records.manifest,sample_size,&mut seeded_rng(seed1));
    println!("Selected {} batches containing {} ballots, which need CVRs.",selection.num_batches(),selection.ballots_in_batches());
    let lazy = lazy_cvr(&records.cvr,&selection);
    for batch in batches_missing_cvrs(&lazy,&selection) { warn!("There are no CVRs for selected batch {}",batch); }
    write_cvr_per_batch(&lazy,|b|lazy_cvr_path(dir,b),false)?;
    let positions = select_ballot_positions(&selection,&mut seeded_rng(seed2));
    let sampled = rows_at_positions(&lazy,&positions);
    write_cvr_per_batch(&sampled,|b|blank_sheet_path(dir,b),true)?;
    let manual_rows = match manual {
        Some(manual_dir) => read_cvr_per_batch(selection.draws.keys(),|b|check_sheet_path(manual_dir,b))?,
        None => {
            let truth = read_cvr(&dir.join(TRUE_CVR_FILE))?;
            let check = rows_at_positions(&truth,&positions);
            write_cvr_per_batch(&check,|b|check_sheet_path(dir,b),false)?;
            check
        }
    };
    let lazy_records = ElectionRecords{
        manifest: records.manifest.iter().filter(|m|selection.contains(&m.batch)).cloned().collect(),
        tabulation: tabulation.iter().filter(|t|selection.contains(&t.batch)).cloned().collect(),
        cvr: lazy,
    };
    let risk = calculate_risk_with_margin(&manual_rows,&lazy_records,diluted_margin,gamma)?;
    write_repair_log(&dir.join(CHANGES_FILE),&risk.repair_log.lines())?;
    println!("Compared {} ballots. Discrepancies o1={} o2={} u1={} u2={}.",risk.ballots_compared,risk.discrepancies.overstatement1,risk.discrepancies.overstatement2,risk.discrepancies.understatement1,risk.discrepancies.understatement2);
    if !risk.review_required.is_empty() { println!("{} ballots need review by a person, and were counted as two vote overstatements.",risk.review_required.len()); }
    if risk.unmatched>0 { println!("{} manual interpretations had no matching CVR and were ignored.",risk.unmatched); }
    println!("Observed risk {:.6}",risk.observed_risk);
    if risk.risk_limit_met(risk_limit) {
        println!("The risk limit of {} is met. The audit is complete.",risk_limit);
    } else {
        match kaplan_markov_sample_size(risk_limit,gamma,diluted_margin,&risk.discrepancies) {
            Ok(n) => println!("The risk limit of {} is not met. Given the discrepancies seen, about {} ballots are needed in total.",risk_limit,n),
            Err(e) => println!("The risk limit of {} is not met. {}",risk_limit,e),
        }
    }
    Ok(())
}

fn polling(dir:&Path,seed:u64,risk_limit:f64,winner:Option<usize>,runner_up:Option<usize>,statistic:f64) -> anyhow::Result<()> {
    let manifest = read_manifest(&dir.join(MANIFEST_FILE))?;
    let mut tabulation_log = RepairLog::default();
    let tabulation = correct_tabulation(&manifest,&read_tabulation(&dir.join(TABULATION_FILE))?,&mut tabulation_log);
    write_repair_log(&dir.join(TABULATION_CHANGES_FILE),&tabulation_log.lines())?;
    let num_ballots : usize = manifest.iter().map(|m|m.ballot_count).sum();
    AuditParameters::new(risk_limit).validate(num_ballots)?;
    let totals = TabulationTotals::new(&tabulation);
    let mut test = BallotPollingTest::from_reported(num_ballots,totals.winner,totals.loser,risk_limit).with_statistic(statistic);
    let round_size = match (winner,runner_up) {
        (Some(w),Some(l)) => {
            test.observe_tally(w,l);
            println!("The test statistic T is now {}.",test.likelihood_ratio());
            if test.risk_limit_met() {
                println!("T is at least {}, so the risk limit of {} is met. The audit is complete.",1.0/risk_limit,risk_limit);
                return Ok(());
            }
            match test.next_round(w+l)? {
                RoundDecision::RecountRequired => {
                    println!("The ballots seen favour the reported runner up. A full hand recount is required.");
                    return Ok(());
                }
                RoundDecision::Continue(size) => size,
            }
        }
        (None,None) => test.first_round_size()?,
        _ => return Err(anyhow!("Give both the winner and runner up counts, or neither")),
    };
    let mut rng = seeded_rng(seed);
    let selection = select_batches(&manifest,round_size,&mut rng);
    let positions = select_ballot_positions(&selection,&mut rng);
    let entries = pull_list(&positions);
    for batch in positions.keys() {
        let for_batch : Vec<_> = entries.iter().filter(|e|&e.batch==batch).cloned().collect();
        write_pull_sheet(&pull_sheet_path(dir,batch),&for_batch)?;
    }
    println!("Audit {} ballot draws from {} batches ({} distinct ballots), listed in the pull sheets in {}.",round_size,selection.num_batches(),entries.len(),dir.display());
    println!("Then run again with --winner, --runner-up and --statistic {}",test.likelihood_ratio());
    Ok(())
}

// Copyright 2024 Andrew Conway.
// This file is part of ConcreteRLA.
// ConcreteRLA is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteRLA is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteRLA.  If not, see <https://www.gnu.org/licenses/>.


use clap::Parser;
use std::path::PathBuf;
use main_app::config::{MarginSpec, SimulationInput};
use rla::csv_io::{write_election_records, MANIFEST_FILE, MACHINE_CVR_FILE, TABULATION_FILE, TRUE_CVR_FILE};
use rla::election::SimulatedElection;
use rla::election_records::TabulationTotals;
use rla::random_util::seeded_rng;
use rla::record_generation::generate_records;
use rla::town_registry::TownRegistry;

#[derive(Parser)]
#[clap(version, author = "Andrew Conway", name="rla_setup")]
/// Simulate one election and write the records an election office would publish,
/// plus the true cast vote records, so that the audit program can be tried on them.
struct Opts {
    /// JSON file describing the election. The ballot and discrepancy counts are used.
    #[clap(short, long)]
    input : PathBuf,

    /// JSON file listing each town's name, voter population and number of polling places.
    #[clap(short, long)]
    towns : PathBuf,

    /// Winner's margin as a percentage of the non-error ballots.
    #[clap(short, long)]
    margin : f64,

    /// Directory to write the records to.
    #[clap(short, long)]
    dir : PathBuf,

    /// Seed for the random number generator. Defaults to the one in the input file.
    #[clap(long)]
    seed : Option<u64>,

    #[clap(long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let opt : Opts = Opts::parse();
    main_app::init_logging(opt.verbose);
    let input = SimulationInput::load(&opt.input)?;
    let towns = TownRegistry::load(&opt.towns)?;
    let population = input.parameters(&MarginSpec::unbounded(opt.margin)).population()?;
    let mut rng = seeded_rng(opt.seed.unwrap_or(input.seed()));
    let mut election = SimulatedElection::new(population,&towns,&mut rng);
    let records = generate_records(&mut election,&mut rng)?;
    write_election_records(&opt.dir,&records.published,Some(&records.true_cvr))?;
    let totals = TabulationTotals::new(&records.published.tabulation);
    println!("{} ballots in {} batches, tabulated {} for the winner and {} for the runner up.",totals.ballots,records.published.manifest.len(),totals.winner,totals.loser);
    for file in [MANIFEST_FILE,TABULATION_FILE,TRUE_CVR_FILE,MACHINE_CVR_FILE] {
        println!("Wrote {}",opt.dir.join(file).display());
    }
    Ok(())
}

// Copyright 2024 Andrew Conway.
// This file is part of ConcreteRLA.
// ConcreteRLA is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteRLA is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteRLA.  If not, see <https://www.gnu.org/licenses/>.


use clap::Parser;
use std::path::PathBuf;
use log::info;
use main_app::config::{MarginSpec, SimulationInput};
use main_app::report::SimulationReport;
use rla::town_registry::TownRegistry;
use statistics::repeated_runs::RepeatedRuns;

#[derive(Parser)]
#[clap(version, author = "Andrew Conway", name="rla_simulate")]
/// Simulate risk limiting audits of a two candidate contest many times, to see how many
/// ballots a ballot polling or ballot comparison audit would need, and where they would come from.
struct Opts {
    /// JSON file describing the election and the simulations to run.
    #[clap(short, long)]
    input : PathBuf,

    /// JSON file listing each town's name, voter population and number of polling places.
    #[clap(short, long)]
    towns : PathBuf,

    /// Optional CSV file to write the summary to. Per town summaries are written next to it,
    /// with _towns and _flagged added to the name.
    #[clap(short, long)]
    out : Option<PathBuf>,

    /// Number of threads to split the simulations between. Defaults to the number of processors.
    #[clap(long)]
    threads : Option<usize>,

    /// Simulate these margins (comma separated percentages) instead of those in the input file.
    #[clap(long)]
    margins : Option<String>,

    /// Log every ballot audited.
    #[clap(long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let opt : Opts = Opts::parse();
    main_app::init_logging(opt.verbose);
    let mut input = SimulationInput::load(&opt.input)?;
    if let Some(margins) = &opt.margins {
        input.margins = main_app::try_parse_margin_list(margins)?.into_iter().map(MarginSpec::unbounded).collect();
        input.validate()?;
    }
    let towns = TownRegistry::load(&opt.towns)?;
    let threads = opt.threads.unwrap_or_else(||std::thread::available_parallelism().map(|n|n.get()).unwrap_or(1));
    let mut report = SimulationReport::default();
    for margin in &input.margins {
        info!("Simulating a {}% margin {} times",margin.margin,input.simulations);
        let runs = RepeatedRuns::new_from_runs_multithreaded(&input.parameters(margin),&towns,input.simulations,threads,input.seed())?;
        report.add(margin.margin,&runs);
    }
    report.print_table();
    if let Some(out) = &opt.out {
        if let Some(parent) = out.parent() { std::fs::create_dir_all(parent)? }
        for file in report.write(out)? { println!("Wrote {}",file.display()); }
    }
    Ok(())
}

// Copyright 2024 Andrew Conway.
// This file is part of ConcreteRLA.
// ConcreteRLA is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteRLA is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteRLA.  If not, see <https://www.gnu.org/licenses/>.

//! Configuration and reporting shared by the binaries, which are also in this crate.

use std::num::ParseFloatError;

pub mod config;
pub mod report;

/// Start env_logger. Shows debug messages if verbose, otherwise info, unless RUST_LOG says otherwise.
pub fn init_logging(verbose:bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Utility that is helpful for parsing in clap a comma separated list of margins.
/// ```
/// assert_eq!(vec![0.5,2.0],main_app::try_parse_margin_list("0.5, 2").unwrap());
/// ```
pub fn try_parse_margin_list(s:&str) -> Result<Vec<f64>,ParseFloatError> {
    s.split(',').map(|s|s.trim().parse::<f64>()).collect()
}

// Copyright 2024 Andrew Conway.
// This file is part of ConcreteRLA.
// ConcreteRLA is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteRLA is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteRLA.  If not, see <https://www.gnu.org/licenses/>.

//! Risk limiting audits of two candidate contests: simulating elections, the
//! ballot polling and ballot comparison audits, and reconciling published records.


pub mod ballot;
pub mod population;
pub mod town_registry;
pub mod allocator;
pub mod monte_carlo;
pub mod random_util;
pub mod sequential_audit;
pub mod sample_size;
pub mod ballot_polling;
pub mod ballot_comparison;
pub mod election;
pub mod election_records;
pub mod record_generation;
pub mod reconciliation;
pub mod risk_calculation;
pub mod batch_selection;
pub mod csv_io;
pub mod simulation;

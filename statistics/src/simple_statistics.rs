// Copyright 2024 Andrew Conway.
// This file is part of ConcreteRLA.
// ConcreteRLA is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteRLA is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteRLA.  If not, see <https://www.gnu.org/licenses/>.


use serde::{Serialize,Deserialize};

/// Standard normal quantiles used for the "you pull this many ballots or fewer x% of the time" estimates.
pub const NORMAL_QUANTILE_75 : f64 = 0.6744897501960817;
pub const NORMAL_QUANTILE_90 : f64 = 1.2815515655446004;
pub const NORMAL_QUANTILE_95 : f64 = 1.6448536269514722;

/// Summary of a list of numbers, such as the number of ballots audited in each run.
#[derive(Debug,Serialize,Deserialize,Clone,Copy,PartialEq,Default)]
pub struct SampleSummary {
    pub count : usize,
    pub mean : f64,
    /// Population standard deviation, dividing by count.
    pub stdev : f64,
    pub variance : f64,
    pub median : f64,
    /// The observation 95% of the way through the sorted list.
    pub percentile_95 : f64,
    /// mean + z·stdev for a normal distribution. Equal to the mean if there is no spread.
    pub normal_75 : f64,
    pub normal_90 : f64,
    pub normal_95 : f64,
}

impl SampleSummary {
    /// Summarise the values. All fields are zero if there are none.
    /// ```
    /// use statistics::simple_statistics::SampleSummary;
    /// let s = SampleSummary::new(&[2.0,4.0,4.0,4.0,5.0,5.0,7.0,9.0]);
    /// assert_eq!(5.0,s.mean);
    /// assert_eq!(2.0,s.stdev);
    /// assert_eq!(4.5,s.median);
    /// ```
    pub fn new(values:&[f64]) -> Self {
        if values.is_empty() { return SampleSummary::default(); }
        let count = values.len();
        let mean = values.iter().sum::<f64>()/count as f64;
        let variance = values.iter().map(|v|(v-mean)*(v-mean)).sum::<f64>()/count as f64;
        let stdev = variance.sqrt();
        let mut sorted = values.to_vec();
        sorted.sort_unstable_by(|a,b|a.total_cmp(b));
        let median = if count%2==1 { sorted[count/2] } else { (sorted[count/2-1]+sorted[count/2])/2.0 };
        let index_95 = ((0.95*count as f64).round_ties_even() as usize).min(count-1);
        SampleSummary{
            count,
            mean,
            stdev,
            variance,
            median,
            percentile_95: sorted[index_95],
            normal_75: mean+NORMAL_QUANTILE_75*stdev,
            normal_90: mean+NORMAL_QUANTILE_90*stdev,
            normal_95: mean+NORMAL_QUANTILE_95*stdev,
        }
    }

    pub fn from_counts(values:&[usize]) -> Self {
        Self::new(&values.iter().map(|&v|v as f64).collect::<Vec<_>>())
    }
}

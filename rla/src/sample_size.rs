// Copyright 2024 Andrew Conway.
// This file is part of ConcreteRLA.
// ConcreteRLA is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteRLA is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteRLA.  If not, see <https://www.gnu.org/licenses/>.

//! Estimates of how many ballots an audit will need.

use crate::population::DiscrepancyCounts;
use crate::sequential_audit::AuditError;

/// The Kaplan-Markov sample size for a comparison audit, given observed or assumed
/// discrepancy counts.
///
/// Fails with [AuditError::MarginErased] when the discrepancies leave nothing to certify.
/// ```
/// use rla::population::DiscrepancyCounts;
/// use rla::sample_size::kaplan_markov_sample_size;
/// let n = kaplan_markov_sample_size(0.05,1.1,0.05,&DiscrepancyCounts::default()).unwrap();
/// assert_eq!(132,n);
/// ```
pub fn kaplan_markov_sample_size(risk_limit:f64,gamma:f64,diluted_margin:f64,counts:&DiscrepancyCounts) -> Result<usize,AuditError> {
    if !(risk_limit>0.0 && risk_limit<1.0) { return Err(AuditError::InvalidRiskLimit(risk_limit)); }
    if !(gamma>1.0) { return Err(AuditError::InvalidGamma(gamma)); }
    if !(diluted_margin>0.0) { return Err(AuditError::MarginErased); }
    let inv = 1.0/(2.0*gamma);
    let log_evidence = risk_limit.ln()
        + counts.overstatement1 as f64*(1.0-inv).ln()
        + counts.overstatement2 as f64*(1.0-2.0*inv).ln()
        + counts.understatement1 as f64*(1.0+inv).ln()
        + counts.understatement2 as f64*(1.0+2.0*inv).ln();
    if !(log_evidence<0.0) { return Err(AuditError::MarginErased); }
    let n = (-2.0*gamma*log_evidence/diluted_margin).ceil();
    if !n.is_finite() { return Err(AuditError::MarginErased); }
    Ok(n as usize)
}

/// The sample size for starting a lazy comparison audit of num_ballots ballots. This is
/// the Kaplan-Markov size for the assumed discrepancies, but at least enough ballots
/// to contain them.
pub fn initial_comparison_sample_size(risk_limit:f64,gamma:f64,diluted_margin:f64,assumed:&DiscrepancyCounts,num_ballots:usize) -> Result<usize,AuditError> {
    let n = kaplan_markov_sample_size(risk_limit,gamma,diluted_margin,assumed)?.max(assumed.total());
    if n>num_ballots { Err(AuditError::SampleSizeExceedsPopulation{needed:n,available:num_ballots}) } else { Ok(n) }
}

/// The BRAVO average sample number for num_ballots ballots of which winner and runner_up
/// were for the two candidates. Clamped to num_ballots, which is also the answer when
/// the winner does not lead.
/// ```
/// use rla::sample_size::average_sample_number;
/// assert_eq!(608,average_sample_number(1000,550,450,0.05));
/// assert_eq!(1000,average_sample_number(1000,450,550,0.05));
/// ```
pub fn average_sample_number(num_ballots:usize,winner:usize,runner_up:usize,risk_limit:f64) -> usize {
    let two_way = winner+runner_up;
    if two_way==0 || winner<=runner_up { return num_ballots; }
    let pw = winner as f64/two_way as f64;
    let pl = 1.0-pw;
    let sw = pw/(pw+pl);
    let loser_term = if runner_up==0 { 0.0 } else { pl*(2.0-2.0*sw).ln() };
    let denominator = pw*(2.0*sw).ln()+loser_term;
    let numerator = (1.0/risk_limit).ln()+(2.0*sw).ln()/2.0;
    let asn = (num_ballots as f64/two_way as f64)*numerator/denominator;
    if asn.is_finite() && asn>0.0 { (asn.ceil() as usize).min(num_ballots) } else { num_ballots }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_overstatement_needs_more_ballots() {
        let none = kaplan_markov_sample_size(0.05,1.1,0.05,&DiscrepancyCounts::default()).unwrap();
        let one = kaplan_markov_sample_size(0.05,1.1,0.05,&DiscrepancyCounts{overstatement1:1,..Default::default()}).unwrap();
        assert!(one>none);
    }

    #[test]
    fn understatements_need_fewer_ballots() {
        let none = kaplan_markov_sample_size(0.05,1.1,0.05,&DiscrepancyCounts::default()).unwrap();
        let one = kaplan_markov_sample_size(0.05,1.1,0.05,&DiscrepancyCounts{understatement2:1,..Default::default()}).unwrap();
        assert!(one<none);
    }

    #[test]
    fn initial_size_too_big() {
        let res = initial_comparison_sample_size(0.05,1.1,0.05,&DiscrepancyCounts::default(),100);
        assert_eq!(Err(AuditError::SampleSizeExceedsPopulation{needed:132,available:100}),res);
    }
}

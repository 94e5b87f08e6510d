//! The statistics surface.

use std::fmt;

/// Cumulative solver statistics.
///
/// `Solver::read_stats` adds the solver's counters into a `Stats` and resets
/// the cumulative ones, so repeated reads report deltas; `pinned` and
/// `inc_pinned` are last-known values, not sums.
#[derive(Debug, Default, Clone)]
pub struct Stats {
    /// Restarts performed.
    pub restarts: u64,
    /// Solves that ended SAT.
    pub sat: u64,
    /// Solves that ended UNSAT.
    pub unsat: u64,
    /// Solves that were cancelled.
    pub ended: u64,
    /// Propagated literals.
    pub props: u64,
    /// Decisions made.
    pub guesses: u64,
    /// Conflicts found.
    pub conflicts: u64,
    /// Clauses learned.
    pub learnts: u64,
    /// Learned clauses removed by reduction.
    pub removed: u64,
    /// Clause-db compactions.
    pub compactions: u64,
    /// Assumptions made.
    pub assumptions: u64,
    /// Failed assumptions reported.
    pub failed: u64,
    /// Last-known count of permanent (level 0) assignments.
    pub pinned: usize,
    /// Last-known count of assignments pinned under assumptions.
    pub inc_pinned: usize,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "restarts: {} sat: {} unsat: {} ended: {} props: {} guesses: {} \
             conflicts: {} learnts: {} removed: {} assumptions: {} failed: {} pinned: {}",
            self.restarts,
            self.sat,
            self.unsat,
            self.ended,
            self.props,
            self.guesses,
            self.conflicts,
            self.learnts,
            self.removed,
            self.assumptions,
            self.failed,
            self.pinned
        )
    }
}

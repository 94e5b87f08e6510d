//! Capability traits for the solver surface.
//!
//! External components (the parser, encoders, drivers) depend on these small
//! capability sets rather than on the concrete solver, so substitutes (a
//! remote solver, a logging wrapper) can implement the same contracts.

use crate::arena::{CRef, CRemap};
use crate::ctl::SolveCtl;
use crate::lit::{Lit, Var};

/// Something to which clauses can be streamed as null-terminated literal
/// sequences.
pub trait Adder {
    /// Append `m` to the open clause; `Lit::NULL` closes it.
    ///
    /// Must not be called under assumptions or inside a test scope.
    fn add(&mut self, m: Lit);
}

/// Produces fresh variables, returned as their positive literal.
pub trait Liter {
    fn new_lit(&mut self) -> Lit;
}

/// Tracks the maximum variable referenced so far.
pub trait MaxVar {
    fn max_var(&self) -> Var;
}

/// A decision procedure which may run for a long time.
///
/// `solve` returns 1 if SAT, -1 if UNSAT and 0 if undetermined (cancelled).
pub trait Solvable {
    fn solve(&mut self) -> i32;
}

/// A solve running in its own thread, reached through a control handle.
pub trait GoSolvable: Sized {
    fn go_solve(self) -> SolveCtl;
}

/// Extraction of a satisfying assignment.
pub trait Model {
    fn value(&self, m: Lit) -> bool;
}

/// Assumptions and failed-assumption extraction.
pub trait Assumable {
    /// Assume `m` true for the next solve or test.
    fn assume(&mut self, m: Lit);

    /// Append a minimized subset of the assumptions that made the previous
    /// call UNSAT.
    fn why(&mut self, dst: &mut Vec<Lit>);
}

/// Scoped assumptions: light-weight BCP probing with nestable bookmarks.
///
/// Solve consumes and forgets untested assumptions; tested assumptions
/// persist until the matching `untest`.
pub trait Testable: Assumable {
    /// Check the pending assumptions under unit propagation and open a test
    /// scope.  Fills `dst` with the literals assigned since the last test.
    /// Returns 1 (all variables assigned: SAT), -1 (UNSAT) or 0 (unknown).
    fn test(&mut self, dst: &mut Vec<Lit>) -> i32;

    /// Close the innermost test scope.  Returns -1 if the solver is
    /// inconsistent under unit propagation afterwards, 0 otherwise.
    fn untest(&mut self) -> i32;

    /// Append the antecedents of a literal propagated under test.
    fn reasons(&mut self, dst: &mut Vec<Lit>, implied: Lit);
}

/// An external clause simplifier attached to the solver.
///
/// The solver reports every successfully added problem clause through
/// `on_added` (inline unit/binary clauses carry `CRef::INF`) and every
/// compaction through `on_remap`.  `Solver::simplify` calls `simplify`,
/// which returns a status like solve plus the clauses to remove.
pub trait CnfSimp {
    fn on_added(&mut self, c: CRef, ms: &[Lit]);

    fn on_remap(&mut self, map: &CRemap);

    /// Run the simplification.  Returns (status, clauses to remove); the
    /// provided scratch vector may be reused for the removal list.
    fn simplify(&mut self, rm_space: Vec<CRef>) -> (i32, Vec<CRef>);
}

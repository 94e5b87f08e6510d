/*****************************************************************************************[lib.rs]
Copyright (c) 2024-2025, The incsat authors

Permission is hereby granted, free of charge, to any person obtaining a copy of this software and
associated documentation files (the "Software"), to deal in the Software without restriction,
including without limitation the rights to use, copy, modify, merge, publish, distribute,
sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all copies or
substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT
NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT
OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.
**************************************************************************************************/

//! An incremental CDCL SAT solver.
//!
//! The engine decides satisfiability of CNF formulas under temporary unit
//! assumptions, keeps learned knowledge across solves, and supports scoped
//! assumptions via the test/untest discipline.  A background handle
//! ([`SolveCtl`]) runs the solver in its own thread with cooperative
//! cancellation and pause.

//======== LOG ============

// stubs when logging is not enabled
#[cfg(not(feature = "logging"))]
#[macro_use]
pub(crate) mod log {
    macro_rules! trace {
        ($( $x:expr ),*) => {};
    }
    macro_rules! debug {
        ($( $x:expr ),*) => {};
    }
    macro_rules! info {
        ($( $x:expr ),*) => {};
    }
}

#[cfg(feature = "logging")]
#[macro_use]
pub extern crate log;

//======== PUBLIC INTERFACE ============

pub mod active;
pub mod arena;
pub mod cdb;
pub mod ctl;
pub mod derive;
pub mod dimacs;
pub mod guess;
pub mod inter;
pub mod intmap;
pub mod lit;
pub mod luby;
pub mod solver;
pub mod stats;
pub mod trail;
pub mod vars;
pub mod watch;

pub use crate::{
    arena::{CRef, CRemap},
    ctl::SolveCtl,
    inter::{Adder, Assumable, CnfSimp, GoSolvable, Liter, MaxVar, Model, Solvable, Testable},
    lit::{LMap, LSet, Lit, VMap, Var},
    solver::Solver,
    stats::Stats,
};

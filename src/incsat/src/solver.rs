/*****************************************************************************************[solver.rs]
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

//! The solver: the CDCL loop, the assumption and test-scope discipline, and
//! the public incremental interface.

use crate::active::{Active, Gated};
use crate::arena::{CRef, CRemap};
use crate::cdb::{Added, Cdb};
use crate::ctl::{CtlShared, SolveCtl};
use crate::derive::{Derived, Deriver};
use crate::guess::Guess;
use crate::inter::{Adder, Assumable, CnfSimp, GoSolvable, Liter, MaxVar, Model, Solvable, Testable};
use crate::lit::{Lit, Var};
use crate::luby::Luby;
use crate::stats::Stats;
use crate::trail::{Conflict, Trail};
use crate::vars::{Reason, Vars};
use std::cmp;

/// Per-solve minimum number of conflicts before the first restart; good for
/// incremental solving.
const RESTART_AFTER: u64 = 1000;
/// Conflict budget between restarts is the Luby term times this.
const RESTART_FACTOR: u64 = 768;
/// Cancellation, pause and stats requests are observed every this many
/// propagations.
const PROP_TICK: u64 = 20_000;

/// How a solve step left the solver (internal; pause is only reachable
/// through a background handle).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SolveOut {
    Done(i32),
    Paused,
}

/// An incremental CDCL solver.
///
/// Clauses are streamed in with [`Solver::add`], assumptions with
/// [`Solver::assume`].  [`Solver::solve`] returns 1 (SAT), -1 (UNSAT) or 0
/// (cancelled).  After SAT, [`Solver::value`] reads the model; after UNSAT,
/// [`Solver::why`] gives a minimized failing assumption set.  `test`/`untest`
/// bookmark assumption scopes, and `go_solve` moves the solve to a
/// background thread.
pub struct Solver {
    vars: Vars,
    cdb: Cdb,
    trail: Trail,
    guess: Guess,
    deriver: Deriver,
    active: Option<Active>,
    luby: Luby,

    /// Last conflict, pending resolution.
    x: Option<Conflict>,
    /// If assumptions were trivially inconsistent, the first failing one.
    x_lit: Lit,

    /// Trail level at the start of each open test scope.
    test_levels: Vec<u32>,
    end_test_level: u32,
    /// Can be above `end_test_level` for untested assumptions.
    assumpt_level: u32,
    /// Pending assumptions for the next solve or test.
    assumes: Vec<Lit>,

    restart_stopwatch: i64,

    simp: Option<Box<dyn CnfSimp + Send>>,

    st: Stats,
    props_mark: u64,
}

impl Solver {
    /// A solver with default (relatively small) capacity.
    pub fn new() -> Solver {
        Solver::with_capacity(128, 768)
    }

    /// A solver with capacity hints for the variable and clause counts.
    pub fn with_capacity(v_cap: u32, c_cap: usize) -> Solver {
        let vars = Vars::new(cmp::max(v_cap, 2));
        let cdb = Cdb::new(&vars, c_cap);
        let guess = Guess::new(vars.top);
        let trail = Trail::new(vars.top);
        let deriver = Deriver::new(vars.top);
        Solver {
            vars,
            cdb,
            trail,
            guess,
            deriver,
            active: None,
            luby: Luby::new(),
            x: None,
            x_lit: Lit::NULL,
            test_levels: Vec::with_capacity(128),
            end_test_level: 0,
            assumpt_level: 0,
            assumes: Vec::with_capacity(1024),
            restart_stopwatch: 0,
            simp: None,
            st: Stats::default(),
            props_mark: 0,
        }
    }

    /// An independent copy of the solver.  Everything is duplicated except a
    /// registered simplifier, which is dropped.
    pub fn copy(&self) -> Solver {
        Solver {
            vars: self.vars.clone(),
            cdb: self.cdb.clone(),
            trail: self.trail.clone(),
            guess: self.guess.clone(),
            deriver: self.deriver.clone(),
            active: self.active.clone(),
            luby: self.luby.clone(),
            x: self.x,
            x_lit: self.x_lit,
            test_levels: self.test_levels.clone(),
            end_test_level: self.end_test_level,
            assumpt_level: self.assumpt_level,
            assumes: self.assumes.clone(),
            restart_stopwatch: self.restart_stopwatch,
            simp: None,
            st: self.st.clone(),
            props_mark: self.props_mark,
        }
    }

    /// Stream one literal of a clause; `Lit::NULL` closes the clause.
    ///
    /// Closing a clause is only legal at level 0 outside test scopes; any
    /// pending conflict state is discarded and the trail is rewound first.
    /// Duplicate literals, tautologies and literals false at level 0 are
    /// filtered; a unit is enqueued as a fact; an empty clause makes the
    /// formula permanently false.
    pub fn add(&mut self, m: Lit) {
        self.ensure_lit_cap(m);
        if m == Lit::NULL {
            self.ensure0();
        }
        match self.cdb.add(&self.vars, m) {
            Added::Pending | Added::Dropped | Added::Bot => {}
            Added::Unit(u) => {
                self.trail
                    .assign(&mut self.vars, u, Reason::Clause(CRef::INF));
                self.notify_added(CRef::INF);
            }
            Added::Binary(_, _) => self.notify_added(CRef::INF),
            Added::Clause(cr) => self.notify_added(cr),
        }
    }

    fn notify_added(&mut self, cr: CRef) {
        if let Some(simp) = self.simp.as_mut() {
            simp.on_added(cr, self.cdb.last_filtered());
        }
    }

    /// Assume `m` true for the next solve or test.
    ///
    /// Solve consumes untested assumptions; tested assumptions persist until
    /// the matching `untest`.
    pub fn assume(&mut self, m: Lit) {
        self.ensure_lit_cap(m);
        self.st.assumptions += 1;
        self.assumes.push(m);
    }

    /// Decide satisfiability under the pending assumptions.
    /// Returns 1 (SAT), -1 (UNSAT) or 0 (cancelled).
    pub fn solve(&mut self) -> i32 {
        match self.run_solve(None, false) {
            SolveOut::Done(r) => r,
            SolveOut::Paused => unreachable!("paused without a control handle"),
        }
    }

    /// Value of `m` under the current assignment.  Meaningful after a SAT
    /// solve (the whole model) or after a test (the propagated literals).
    pub fn value(&self, m: Lit) -> bool {
        self.vars.value(m) == 1
    }

    /// Maximum variable added or assumed so far.
    pub fn max_var(&self) -> Var {
        self.vars.max
    }

    /// The positive literal of a fresh variable.
    pub fn new_lit(&mut self) -> Lit {
        let m = Var::new(self.vars.max.idx() + 1).pos();
        self.ensure_lit_cap(m);
        m
    }

    /// Append a minimized subset of the assumptions under which the previous
    /// call was UNSAT.  Empty if the formula is unsatisfiable on its own.
    pub fn why(&mut self, dst: &mut Vec<Lit>) {
        if self.x_lit != Lit::NULL {
            let seed = [self.x_lit];
            dst.push(self.x_lit);
            self.st.failed += 1;
            self.final_walk(&seed, dst);
        } else if let Some(x) = self.x {
            let mut seed = Vec::new();
            match x {
                Conflict::Clause(cr) => self.cdb.arena.load(cr, &mut seed),
                Conflict::Binary(a, b) => {
                    seed.push(a);
                    seed.push(b);
                }
            }
            self.final_walk(&seed, dst);
        } else {
            panic!("why without a preceding unsat result");
        }
    }

    /// Walk the reason graph from the conflict side; every literal whose
    /// variable was assigned by assumption is a failed assumption.
    fn final_walk(&mut self, seed: &[Lit], dst: &mut Vec<Lit>) {
        let mut marks = vec![false; self.vars.max.idx() as usize + 1];
        let mut stack: Vec<Lit> = seed.to_vec();
        let mut scratch = Vec::new();
        while let Some(m) = stack.pop() {
            let v = m.var();
            if marks[v.idx() as usize] {
                continue;
            }
            marks[v.idx() as usize] = true;
            match self.vars.reason(v) {
                Reason::None => {
                    if self.vars.level(v) > 0 {
                        dst.push(!m);
                        self.st.failed += 1;
                    }
                }
                Reason::Clause(cr) if cr == CRef::INF => {}
                Reason::Clause(cr) => {
                    scratch.clear();
                    self.cdb.arena.load(cr, &mut scratch);
                    // slot 0 holds the implied literal itself
                    for &l in scratch.iter().skip(1) {
                        stack.push(l);
                    }
                }
                Reason::Binary(o) => stack.push(o),
            }
        }
    }

    /// Append the antecedents of a literal propagated under test.  Empty for
    /// decisions, assumptions and facts.
    pub fn reasons(&mut self, dst: &mut Vec<Lit>, m: Lit) {
        match self.vars.reason(m.var()) {
            Reason::None => {}
            Reason::Clause(cr) if cr == CRef::INF => {}
            Reason::Binary(o) => dst.push(!o),
            Reason::Clause(cr) => {
                let mut k = 1;
                loop {
                    let l = self.cdb.arena.get(cr, k);
                    if l == Lit::NULL {
                        break;
                    }
                    dst.push(!l);
                    k += 1;
                }
            }
        }
    }

    /// Check the pending assumptions under unit propagation and open a test
    /// scope.  Fills `dst` with all literals assigned since the last test,
    /// including the assumptions.  Returns 1 if a full model was found, -1
    /// on conflict and 0 otherwise.
    ///
    /// After a -1 from `test` or `solve`, `test` must not be called again
    /// until `untest` returns 0.
    pub fn test(&mut self, dst: &mut Vec<Lit>) -> i32 {
        dst.clear();
        self.cleanup_solve();
        self.test_levels.push(self.trail.level);
        let start = self.trail.tail();
        if self.make_assumptions() == -1 {
            return -1;
        }
        self.end_test_level = self.trail.level;
        for i in start..self.trail.tail() {
            dst.push(self.trail.d[i]);
        }
        if !self.guess.has(self.vars.vals()) {
            debug_assert!(
                self.cdb.check_model(&self.vars).is_empty(),
                "internal error: sat model"
            );
            self.st.sat += 1;
            return 1;
        }
        0
    }

    /// Close the innermost test scope.  A pending conflict is derived
    /// exactly once; its implied unit is re-pinned below the bookmark when
    /// it belongs there.  Returns -1 if the solver is inconsistent under
    /// unit propagation afterwards, 0 otherwise.
    ///
    /// A conflict that reaches across several test scopes unwinds one
    /// derivation per untest: each call returns -1 and leaves the next
    /// conflict pending, until a call returns 0.
    pub fn untest(&mut self) -> i32 {
        if self.test_levels.is_empty() {
            panic!("untest without test");
        }
        let last = self.test_levels.pop().unwrap();
        let late = match self.x.take() {
            Some(x) if self.cdb.bot.is_none() => Some(self.deriver.derive(
                &self.vars,
                &self.trail,
                &mut self.guess,
                &mut self.cdb,
                x,
            )),
            _ => None,
        };
        self.end_test_level = last;
        self.trail.back(&mut self.vars, &mut self.guess, last);
        if let Some(d) = late {
            // the derived unit survives the backtrack only where its
            // backjump target does; a late implication is re-pinned at the
            // bookmark
            if d.unit != Lit::NULL && d.target_level <= last {
                match self.vars.value(d.unit) {
                    0 => self.trail.assign(&mut self.vars, d.unit, d.reason),
                    -1 => {
                        // the learned clause is false under the surviving
                        // trail; the next untest derives it further
                        self.x = Some(conflict_of(&d));
                        return -1;
                    }
                    _ => {}
                }
            }
        }
        if let Some(x) = self.trail.prop(&mut self.vars, &mut self.cdb) {
            self.x = Some(x);
            return -1;
        }
        self.x = None;
        self.x_lit = Lit::NULL;
        0
    }

    /// Fresh activation literal gating the currently staged clause: the
    /// clause is closed with the literal's negation appended, so it is
    /// disabled unless the literal is assumed true.  Returns the literal.
    pub fn activate(&mut self) -> Lit {
        let act = self.activation_lit();
        self.gate_clause(act);
        act
    }

    /// Allocate (or recycle) an activation literal without gating anything.
    pub fn activation_lit(&mut self) -> Lit {
        self.ensure0();
        self.ensure_active();
        let act = match self.active.as_mut().unwrap().recycle() {
            Some(m) => m,
            None => self.new_lit(),
        };
        self.active.as_mut().unwrap().mark_active(act);
        act
    }

    /// Close the currently staged clause gated by `act` (obtained from
    /// `activation_lit`).
    pub fn activate_with(&mut self, act: Lit) {
        self.ensure0();
        self.ensure_active();
        self.active.as_mut().unwrap().mark_active(act);
        self.gate_clause(act);
    }

    fn gate_clause(&mut self, act: Lit) {
        let gate = !act.var().pos();
        self.add(gate);
        self.ensure0();
        match self.cdb.add(&self.vars, Lit::NULL) {
            Added::Unit(_) | Added::Bot => panic!("activated empty clause"),
            Added::Pending => unreachable!(),
            Added::Dropped => {}
            Added::Binary(a, b) => {
                let other = if a == gate { b } else { a };
                self.active
                    .as_mut()
                    .unwrap()
                    .note_gated(act, Gated::Binary(other));
                self.notify_added(CRef::INF);
            }
            Added::Clause(cr) => {
                self.active
                    .as_mut()
                    .unwrap()
                    .note_gated(act, Gated::Arena(cr));
                self.notify_added(cr);
            }
        }
    }

    /// Remove every clause gated by `m` and retire the activation literal
    /// for reuse.  Only legal at level 0 outside test scopes.
    pub fn deactivate(&mut self, m: Lit) {
        self.ensure0();
        self.ensure_active();
        let act = m.var().pos();
        let occs = self.active.as_mut().unwrap().retire(act);
        let mut rm = Vec::new();
        for g in occs {
            match g {
                Gated::Arena(cr) => rm.push(cr),
                Gated::Binary(_) => {} // swept with the variable below
            }
        }
        // learned clauses mention the retired variable only if they were
        // derived with a gated clause in place; they go too, which keeps
        // recycling the literal sound
        let mut ms = Vec::new();
        for i in 0..self.cdb.learnts.len() {
            let cr = self.cdb.learnts[i];
            ms.clear();
            self.cdb.arena.load(cr, &mut ms);
            if ms.iter().any(|l| l.var() == act.var()) {
                rm.push(cr);
            }
        }
        self.cdb.purge_binaries_of(act.var());
        if !rm.is_empty() {
            let map = self.cdb.remove(&rm);
            self.apply_remap(&map);
        }
    }

    fn ensure_active(&mut self) {
        if self.active.is_none() {
            self.active = Some(Active::new(self.vars.top));
        }
    }

    /// Attach an external simplifier.  It observes added clauses and handle
    /// remaps, and drives clause removal through [`Solver::simplify`].
    pub fn set_simplifier(&mut self, simp: Box<dyn CnfSimp + Send>) {
        self.simp = Some(simp);
    }

    /// Run the attached simplifier and remove the clauses it returns.
    /// Returns the simplifier's status (1 SAT, -1 UNSAT, 0 unknown), or 0
    /// when no simplifier is attached.
    pub fn simplify(&mut self) -> i32 {
        let mut simp = match self.simp.take() {
            Some(s) => s,
            None => return 0,
        };
        self.ensure0();
        let (status, rms) = simp.simplify(Vec::new());
        self.simp = Some(simp);
        let rms: Vec<CRef> = rms
            .into_iter()
            .filter(|&c| c != CRef::NONE && c != CRef::INF)
            .collect();
        if !rms.is_empty() {
            let map = self.cdb.remove(&rms);
            self.apply_remap(&map);
        }
        status
    }

    /// Read cumulative statistics into `st`, resetting the solver's
    /// counters.
    pub fn read_stats(&mut self, st: &mut Stats) {
        st.restarts += self.st.restarts;
        self.st.restarts = 0;
        st.sat += self.st.sat;
        self.st.sat = 0;
        st.unsat += self.st.unsat;
        self.st.unsat = 0;
        st.ended += self.st.ended;
        self.st.ended = 0;
        st.assumptions += self.st.assumptions;
        self.st.assumptions = 0;
        st.failed += self.st.failed;
        self.st.failed = 0;
        st.props += self.trail.props - self.props_mark;
        self.props_mark = self.trail.props;
        st.guesses += self.guess.num_guesses();
        self.guess.reset_guesses();
        st.conflicts += self.deriver.conflicts;
        self.deriver.conflicts = 0;
        st.learnts += self.cdb.st_learnts;
        self.cdb.st_learnts = 0;
        st.removed += self.cdb.st_removed;
        self.cdb.st_removed = 0;
        st.compactions += self.cdb.st_compactions;
        self.cdb.st_compactions = 0;
        st.pinned = self.st.pinned;
        st.inc_pinned = self.st.inc_pinned;
    }

    // ---- the solve loop ----

    pub(crate) fn run_solve(&mut self, ctl: Option<&CtlShared>, resume: bool) -> SolveOut {
        if !resume {
            if self.solve_init() == -1 {
                self.st.unsat += 1;
                return self.done(-1);
            }
        }
        let a_level = self.assumpt_level;
        let mut nxt_tick = self.trail.props + PROP_TICK;

        loop {
            if let Some(x) = self.trail.prop(&mut self.vars, &mut self.cdb) {
                // conflict
                if self.trail.level <= a_level {
                    self.x = Some(x);
                    self.st.unsat += 1;
                    return self.done(-1);
                }
                let d = self
                    .deriver
                    .derive(&self.vars, &self.trail, &mut self.guess, &mut self.cdb, x);
                debug_assert_ne!(d.unit, Lit::NULL);
                let target = cmp::max(d.target_level, a_level);
                self.trail.back(&mut self.vars, &mut self.guess, target);
                self.trail.assign(&mut self.vars, d.unit, d.reason);
                self.guess.decay();
                self.cdb.decay();
                if target == 0 {
                    self.st.pinned = self.trail.tail();
                } else if target <= a_level {
                    self.st.inc_pinned = self.trail.tail();
                }
                self.restart_stopwatch -= 1;
                continue;
            }

            // propagation ticker: stats, cancellation and pause
            if self.trail.props > nxt_tick {
                nxt_tick += PROP_TICK;
                if let Some(ctl) = ctl {
                    if ctl.stats_requested() {
                        let mut st = Stats::default();
                        self.read_stats(&mut st);
                        ctl.send_stats(st);
                    }
                    if ctl.stopped() {
                        self.st.ended += 1;
                        let lvl = self.end_test_level;
                        self.trail.back(&mut self.vars, &mut self.guess, lvl);
                        return self.done(0);
                    }
                    if ctl.pause_requested() {
                        return SolveOut::Paused;
                    }
                }
            }

            // maybe restart
            if self.restart_stopwatch <= 0 {
                let nxt = self.luby.next();
                self.restart_stopwatch = (nxt * RESTART_FACTOR) as i64;
                self.trail.back(&mut self.vars, &mut self.guess, a_level);
                self.st.restarts += 1;
            }

            // maybe reduce the learned set; a stable point, right before a
            // decision
            if let Some(map) = self.cdb.maybe_reduce(&self.vars) {
                self.apply_remap(&map);
            }

            // guess
            let m = self.guess.guess(self.vars.vals());
            if m == Lit::NULL {
                debug_assert!(
                    self.cdb.check_model(&self.vars).is_empty(),
                    "internal error: sat model"
                );
                self.st.sat += 1;
                // the model is read from the live assignment; the next call
                // backtracks instead
                return self.done(1);
            }
            self.trail.assign(&mut self.vars, m, Reason::None);
        }
    }

    fn done(&mut self, code: i32) -> SolveOut {
        self.assumpt_level = 0;
        self.assumes.clear();
        debug!("solve done: {}", code);
        SolveOut::Done(code)
    }

    /// Returns -1 if known inconsistent by BCP, 0 otherwise.
    fn solve_init(&mut self) -> i32 {
        self.luby = Luby::new();
        loop {
            let r = self.luby.next() * RESTART_FACTOR;
            if r >= RESTART_AFTER {
                self.restart_stopwatch = r as i64;
                break;
            }
        }
        self.cleanup_solve();
        info!("solve.start");
        if self.make_assumptions() == -1 {
            return -1;
        }
        self.phase_init();
        0
    }

    /// Rewind the effects of the previous solve: resolve a pending conflict
    /// into learned clauses and return to the bottom of the open test scope.
    fn cleanup_solve(&mut self) {
        let floor = self.end_test_level;
        self.resolve_pending(floor);
        self.x_lit = Lit::NULL;
    }

    /// Resolve the pending conflict, if any, by repeated derivation, never
    /// backjumping below `floor`; then backtrack to `floor`.
    fn resolve_pending(&mut self, floor: u32) {
        while let Some(x) = self.x.take() {
            if self.cdb.bot.is_some() {
                break;
            }
            let d = self
                .deriver
                .derive(&self.vars, &self.trail, &mut self.guess, &mut self.cdb, x);
            if d.unit == Lit::NULL {
                break; // derived the empty clause
            }
            if d.target_level < floor {
                break;
            }
            self.trail
                .back(&mut self.vars, &mut self.guess, d.target_level);
            self.trail.assign(&mut self.vars, d.unit, d.reason);
            self.x = self.trail.prop(&mut self.vars, &mut self.cdb);
        }
        self.trail.back(&mut self.vars, &mut self.guess, floor);
    }

    /// Force the pending assumptions.  Returns -1 on conflict (recording it
    /// in `x` or `x_lit`), 0 otherwise.  Consumes the pending buffer.
    fn make_assumptions(&mut self) -> i32 {
        self.assumpt_level = self.trail.level;
        self.st.pinned = self.trail.tail();
        if let Some(bot) = self.cdb.bot {
            self.x = Some(Conflict::Clause(bot));
            self.assumes.clear();
            return -1;
        }
        if let Some(x) = self.trail.prop(&mut self.vars, &mut self.cdb) {
            self.x = Some(x);
            self.assumes.clear();
            return -1;
        }
        for i in 0..self.assumes.len() {
            let m = self.assumes[i];
            match self.vars.value(m) {
                0 => {
                    self.assumpt_level += 1;
                    self.trail.assign(&mut self.vars, m, Reason::None);
                    if let Some(x) = self.trail.prop(&mut self.vars, &mut self.cdb) {
                        self.x = Some(x);
                        self.assumes.clear();
                        return -1;
                    }
                    self.st.inc_pinned = self.trail.tail();
                }
                1 => {}
                _ => {
                    self.x_lit = m;
                    self.st.failed += 1;
                    self.assumes.clear();
                    return -1;
                }
            }
        }
        self.assumes.clear();
        0
    }

    /// Set each variable's preferred phase to its more frequent polarity in
    /// short problem clauses, weighted by `2^(16 - size)`.
    fn phase_init(&mut self) {
        const BOUND: u32 = 16;
        let max = self.vars.max.idx();
        if max == 0 {
            return;
        }
        let mut counts = vec![0u64; 2 * (max as usize + 1)];
        let mut bump = |m: Lit, sz: u32| {
            counts[m.raw() as usize] += 1 << (BOUND - sz) as u64;
        };
        for i in 0..self.cdb.added.len() {
            let cr = self.cdb.added[i];
            let sz = self.cdb.arena.size(cr);
            if sz >= BOUND {
                continue;
            }
            let mut k = 0;
            loop {
                let m = self.cdb.arena.get(cr, k);
                if m == Lit::NULL {
                    break;
                }
                bump(m, sz);
                k += 1;
            }
        }
        for &(a, b) in &self.cdb.bins {
            bump(a, 2);
            bump(b, 2);
        }
        for i in 1..=max {
            let v = Var::new(i);
            let phase = if counts[v.pos().raw() as usize] > counts[v.neg().raw() as usize] {
                1
            } else {
                -1
            };
            self.guess.set_phase(v, phase);
        }
    }

    /// Apply a compaction remap to every stored handle outside the clause
    /// database: trail reasons, the activation facet, the simplifier and the
    /// pending conflict.
    fn apply_remap(&mut self, map: &CRemap) {
        for i in 0..self.trail.d.len() {
            let v = self.trail.d[i].var();
            if let Reason::Clause(cr) = self.vars.reason(v) {
                if cr == CRef::INF {
                    continue;
                }
                let r = match map[&cr] {
                    // the reason was removed at level 0: the literal stays a
                    // fact with no stored body
                    CRef::NONE => Reason::Clause(CRef::INF),
                    nc => Reason::Clause(nc),
                };
                self.vars.set_reason(v, r);
            }
        }
        if let Some(a) = self.active.as_mut() {
            a.remap(map);
        }
        if let Some(s) = self.simp.as_mut() {
            s.on_remap(map);
        }
        if let Some(Conflict::Clause(cr)) = self.x {
            debug_assert_ne!(map[&cr], CRef::NONE);
            self.x = Some(Conflict::Clause(map[&cr]));
        }
    }

    /// Level-0 guard for structural operations: panics inside a test scope,
    /// rewinds the trail and forgets any pending conflict.
    fn ensure0(&mut self) {
        if !self.test_levels.is_empty() {
            panic!("invalid operation under test scope");
        }
        if self.trail.level != 0 {
            self.trail.back(&mut self.vars, &mut self.guess, 0);
        }
        self.x = None;
        self.x_lit = Lit::NULL;
    }

    /// Grow every component when a new maximum variable appears.
    fn ensure_lit_cap(&mut self, m: Lit) {
        if m == Lit::NULL {
            return;
        }
        let mv = m.var();
        let mut top = self.vars.top;
        if mv.idx() >= top {
            while top <= mv.idx() {
                top *= 2;
            }
            self.vars.grow_to(top);
            self.cdb.grow_to(top);
            self.trail.grow_to(top);
            self.guess.grow_to(top);
            self.deriver.grow_to(top);
            if let Some(a) = self.active.as_mut() {
                a.grow_to(top);
            }
        }
        if mv.idx() > self.vars.max.idx() {
            for i in self.vars.max.idx() + 1..=mv.idx() {
                self.guess.push(Var::new(i));
            }
            self.vars.max = mv;
        }
    }

    #[cfg(test)]
    pub(crate) fn parts(&self) -> (&Vars, &Cdb, &Trail) {
        (&self.vars, &self.cdb, &self.trail)
    }
}

/// The learned clause of a derivation, viewed as a conflict when it is
/// false under the trail.
fn conflict_of(d: &Derived) -> Conflict {
    match d.reason {
        Reason::Clause(cr) if cr != CRef::INF => Conflict::Clause(cr),
        Reason::Binary(o) => Conflict::Binary(d.unit, o),
        // a learned unit clause has no stored body; both slots carry its
        // only literal
        _ => Conflict::Binary(d.unit, d.unit),
    }
}

impl Default for Solver {
    fn default() -> Self {
        Solver::new()
    }
}

impl Adder for Solver {
    fn add(&mut self, m: Lit) {
        Solver::add(self, m)
    }
}

impl Liter for Solver {
    fn new_lit(&mut self) -> Lit {
        Solver::new_lit(self)
    }
}

impl MaxVar for Solver {
    fn max_var(&self) -> Var {
        Solver::max_var(self)
    }
}

impl Model for Solver {
    fn value(&self, m: Lit) -> bool {
        Solver::value(self, m)
    }
}

impl Solvable for Solver {
    fn solve(&mut self) -> i32 {
        Solver::solve(self)
    }
}

impl GoSolvable for Solver {
    fn go_solve(self) -> SolveCtl {
        SolveCtl::spawn(self)
    }
}

impl Assumable for Solver {
    fn assume(&mut self, m: Lit) {
        Solver::assume(self, m)
    }
    fn why(&mut self, dst: &mut Vec<Lit>) {
        Solver::why(self, dst)
    }
}

impl Testable for Solver {
    fn test(&mut self, dst: &mut Vec<Lit>) -> i32 {
        Solver::test(self, dst)
    }
    fn untest(&mut self) -> i32 {
        Solver::untest(self)
    }
    fn reasons(&mut self, dst: &mut Vec<Lit>, implied: Lit) {
        Solver::reasons(self, dst, implied)
    }
}

/*****************************************************************************************[cdb.rs]
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

//! The clause database: arena storage, watch index, root lists, learned
//! clause reduction and compaction.

use crate::arena::{Arena, CRef, CRemap, ClauseHeader};
use crate::intmap::IntMapBool;
use crate::lit::{LMap, Lit, Var};
use crate::vars::{Reason, Vars};
use crate::watch::{Watch, WatchList};
use std::cmp;

/// Result of closing a streamed clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Added {
    /// Still inside a clause.
    Pending,
    /// The clause was a tautology or already satisfied at level 0.
    Dropped,
    /// The clause was empty after filtering: the formula is permanently false.
    Bot,
    /// The clause reduced to one literal; the caller should enqueue it.
    Unit(Lit),
    /// A binary clause, kept inline in the watch lists.
    Binary(Lit, Lit),
    /// A stored clause.
    Clause(CRef),
}

/// Decay all learned-clause heat every this many conflicts.
const HEAT_DECAY_TICKS: u64 = 128;
/// Smallest learned-clause count that can trigger a reduction.
const MIN_GC_LIM: usize = 1000;

#[derive(Debug, Clone)]
pub struct Cdb {
    pub arena: Arena,
    pub watches: LMap<WatchList>,
    /// Handles of stored problem clauses, in add order.
    pub added: Vec<CRef>,
    /// Handles of stored learned clauses.
    pub learnts: Vec<CRef>,
    /// Inline binary problem clauses (learned binaries are only in watches).
    pub bins: Vec<(Lit, Lit)>,
    /// The permanently false clause, if an empty clause was ever added or
    /// learned.
    pub bot: Option<CRef>,

    staged: Vec<Lit>,
    filtered: Vec<Lit>,
    marks: IntMapBool<Lit>,

    gc_lim: usize,
    decay_tick: u64,

    pub(crate) st_learnts: u64,
    pub(crate) st_removed: u64,
    pub(crate) st_compactions: u64,
}

impl Cdb {
    pub fn new(vars: &Vars, cap_hint: usize) -> Cdb {
        let mut cdb = Cdb {
            arena: Arena::with_capacity(cap_hint),
            watches: LMap::new(),
            added: Vec::new(),
            learnts: Vec::new(),
            bins: Vec::new(),
            bot: None,
            staged: Vec::new(),
            filtered: Vec::new(),
            marks: IntMapBool::new(),
            gc_lim: MIN_GC_LIM,
            decay_tick: 0,
            st_learnts: 0,
            st_removed: 0,
            st_compactions: 0,
        };
        cdb.grow_to(vars.top);
        cdb
    }

    pub fn grow_to(&mut self, top: u32) {
        if top == 0 {
            return;
        }
        let last = Var::new(top - 1).neg();
        self.watches.reserve(last, WatchList::new());
        self.marks.reserve(last);
    }

    /// Stream one literal of a clause; `Lit::NULL` closes the clause.
    ///
    /// At close time duplicates are dropped, tautologies and clauses
    /// satisfied at level 0 are discarded, and literals false at level 0 are
    /// elided.
    pub fn add(&mut self, vars: &Vars, m: Lit) -> Added {
        if m != Lit::NULL {
            self.staged.push(m);
            return Added::Pending;
        }

        self.filtered.clear();
        let mut dropped = false;
        for i in 0..self.staged.len() {
            let m = self.staged[i];
            self.marks.reserve(m.var().neg());
            if self.marks[m] {
                continue; // duplicate
            }
            if self.marks[!m] {
                dropped = true; // tautology
                break;
            }
            let v = vars.value(m);
            if v != 0 && vars.level_lit(m) == 0 {
                if v == 1 {
                    dropped = true; // satisfied at level 0
                    break;
                }
                continue; // false at level 0, elide
            }
            self.marks.set(m, true);
            self.filtered.push(m);
        }
        for &m in &self.filtered {
            self.marks.set(m, false);
        }
        self.staged.clear();
        if dropped {
            return Added::Dropped;
        }

        match self.filtered.len() {
            0 => {
                self.ensure_bot(false);
                Added::Bot
            }
            1 => Added::Unit(self.filtered[0]),
            2 => {
                let (a, b) = (self.filtered[0], self.filtered[1]);
                self.attach_binary(a, b);
                self.bins.push((a, b));
                Added::Binary(a, b)
            }
            n => {
                let hd = ClauseHeader::new(false, 0, n as u32);
                let lits = std::mem::take(&mut self.filtered);
                let cr = self.arena.add_lits(hd, &lits);
                self.attach(cr, lits[0], lits[1]);
                self.filtered = lits;
                self.added.push(cr);
                Added::Clause(cr)
            }
        }
    }

    /// The literals of the clause most recently closed by `add`.
    pub fn last_filtered(&self) -> &[Lit] {
        &self.filtered
    }

    /// Insert a learned clause and return the reason justifying its first
    /// literal.  The caller guarantees the asserting literal is first and the
    /// literal of the second-highest level is second.
    pub fn learn(&mut self, lits: &[Lit], lbd: u32) -> Reason {
        self.st_learnts += 1;
        match lits.len() {
            0 => {
                self.ensure_bot(true);
                Reason::None
            }
            1 => Reason::Clause(CRef::INF),
            2 => {
                self.attach_binary(lits[0], lits[1]);
                Reason::Binary(lits[1])
            }
            n => {
                let hd = ClauseHeader::new(true, lbd, n as u32).bump(1);
                let cr = self.arena.add_lits(hd, lits);
                self.attach(cr, lits[0], lits[1]);
                self.learnts.push(cr);
                Reason::Clause(cr)
            }
        }
    }

    fn ensure_bot(&mut self, learnt: bool) {
        if self.bot.is_none() {
            let hd = ClauseHeader::new(learnt, 0, 0);
            self.bot = Some(self.arena.add_lits(hd, &[]));
        }
    }

    fn attach(&mut self, cr: CRef, l0: Lit, l1: Lit) {
        self.watches[l0].push(Watch::new(cr, l1, false));
        self.watches[l1].push(Watch::new(cr, l0, false));
    }

    fn attach_binary(&mut self, a: Lit, b: Lit) {
        self.watches[a].push(Watch::new(CRef::INF, b, true));
        self.watches[b].push(Watch::new(CRef::INF, a, true));
    }

    /// Drop every inline binary clause involving `v`, mirrors included.
    pub(crate) fn purge_binaries_of(&mut self, v: Var) {
        for side in [v.pos(), v.neg()] {
            let mut ws = std::mem::take(&mut self.watches[side]);
            for i in 0..ws.len() {
                let w = ws[i];
                if w.is_binary() {
                    let o = w.blocker();
                    self.watches[o].retain(|x| !(x.is_binary() && x.blocker() == side));
                }
            }
            ws.retain(|w| !w.is_binary());
            self.watches[side] = ws;
        }
        self.bins
            .retain(|&(a, b)| a.var() != v && b.var() != v);
    }

    /// Bump the heat of a stored learned clause.
    pub fn bump_heat(&mut self, cr: CRef) {
        let hd = self.arena.header(cr);
        if hd.learnt() {
            self.arena.set_header(cr, hd.bump(1));
        }
    }

    /// Amortized heat decay: halve every learned clause's heat once per
    /// `HEAT_DECAY_TICKS` calls.
    pub fn decay(&mut self) {
        self.decay_tick += 1;
        if self.decay_tick % HEAT_DECAY_TICKS != 0 {
            return;
        }
        for i in 0..self.learnts.len() {
            let cr = self.learnts[i];
            let hd = self.arena.header(cr);
            self.arena.set_header(cr, hd.decay());
        }
    }

    /// Whether `cr` is the reason of its first literal's assignment.  Such
    /// clauses are immovable until the assignment is undone.
    pub fn locked(&self, vars: &Vars, cr: CRef) -> bool {
        let m0 = self.arena.get(cr, 0);
        vars.value(m0) == 1 && vars.reason(m0.var()) == Reason::Clause(cr)
    }

    /// Reduce the learned-clause set if it grew past the limit.  Returns the
    /// handle remap to broadcast, or None if nothing was done.
    ///
    /// Must only be called at a stable point: no propagation or analysis in
    /// progress.
    pub fn maybe_reduce(&mut self, vars: &Vars) -> Option<CRemap> {
        let lim = cmp::max(self.gc_lim, self.added.len() / 3);
        if self.learnts.len() < lim {
            return None;
        }
        let min_lbd = self
            .learnts
            .iter()
            .map(|&c| self.arena.header(c).lbd())
            .min()?;

        // candidates, worst first: high LBD, then low heat
        let arena = &self.arena;
        let mut cands: Vec<CRef> = self
            .learnts
            .iter()
            .cloned()
            .filter(|&c| arena.header(c).lbd() > min_lbd && !self.locked(vars, c))
            .collect();
        cands.sort_by(|&a, &b| {
            let (ha, hb) = (arena.header(a), arena.header(b));
            hb.lbd().cmp(&ha.lbd()).then(ha.heat().cmp(&hb.heat()))
        });

        let n_rm = cmp::min(self.learnts.len() / 2, cands.len());
        if n_rm == 0 {
            // nothing removable; raise the limit so we don't spin here
            self.gc_lim = lim + lim / 10;
            return None;
        }
        cands.truncate(n_rm);
        let map = self.remove(&cands);
        self.st_removed += n_rm as u64;
        self.gc_lim = lim + lim / 10;
        debug!("reduced clause db: removed {}", n_rm);
        Some(map)
    }

    /// Remove the given stored clauses and compact the arena.  All
    /// outstanding handles are invalidated; the caller must apply the
    /// returned remap to reasons and to any other observer.
    pub fn remove(&mut self, rm: &[CRef]) -> CRemap {
        let map = self.arena.compact(rm);
        self.st_compactions += 1;

        // watches: drop removed clauses, forward the rest
        for (_, ws) in self.watches.iter_mut() {
            ws.retain(|w| {
                if w.is_binary() {
                    return true;
                }
                match map[&w.cref()] {
                    CRef::NONE => false,
                    nc => {
                        *w = w.relocate(nc);
                        true
                    }
                }
            });
        }

        // root lists
        for list in [&mut self.added, &mut self.learnts] {
            let mut j = 0;
            for i in 0..list.len() {
                match map[&list[i]] {
                    CRef::NONE => {}
                    nc => {
                        list[j] = nc;
                        j += 1;
                    }
                }
            }
            list.truncate(j);
        }

        if let Some(b) = self.bot {
            self.bot = Some(map[&b]);
            debug_assert_ne!(self.bot, Some(CRef::NONE));
        }
        map
    }

    /// Visit every stored clause (problem and learned) with its handle,
    /// header and literals.
    pub fn forall<F: FnMut(CRef, ClauseHeader, &[Lit])>(&self, mut f: F) {
        let mut ms = Vec::new();
        for &cr in self.added.iter().chain(self.learnts.iter()) {
            ms.clear();
            self.arena.load(cr, &mut ms);
            f(cr, self.arena.header(cr), &ms);
        }
    }

    /// Verify the watch invariant: a stored clause is watched exactly by its
    /// first two literals, with each other as blockers allowed to go stale.
    /// Returns human-readable violations.
    pub fn check_watches(&self) -> Vec<String> {
        let mut errs = Vec::new();
        let mut ms = Vec::new();
        for &cr in self.added.iter().chain(self.learnts.iter()) {
            ms.clear();
            self.arena.load(cr, &mut ms);
            for (i, &m) in ms.iter().enumerate() {
                let n = self.watches[m]
                    .iter()
                    .filter(|w| !w.is_binary() && w.cref() == cr)
                    .count();
                let want = if i < 2 { 1 } else { 0 };
                if n != want {
                    errs.push(format!(
                        "clause {:?} lit {:?} at {} has {} watches, want {}",
                        cr, m, i, n, want
                    ));
                }
            }
        }
        for (m, ws) in self.watches.iter() {
            for w in ws.iter().filter(|w| w.is_binary()) {
                let o = w.blocker();
                let back = self.watches[o]
                    .iter()
                    .filter(|x| x.is_binary() && x.blocker() == m)
                    .count();
                if back == 0 {
                    errs.push(format!("binary ({:?} {:?}) missing mirror watch", m, o));
                }
            }
        }
        errs
    }

    /// Verify that every problem clause is satisfied under the current
    /// assignment.  Returns human-readable violations.
    pub fn check_model(&self, vars: &Vars) -> Vec<String> {
        let mut errs = Vec::new();
        let mut ms = Vec::new();
        for &cr in &self.added {
            ms.clear();
            self.arena.load(cr, &mut ms);
            if !ms.iter().any(|&m| vars.value(m) == 1) {
                errs.push(format!("unsatisfied clause {:?}: {:?}", cr, ms));
            }
        }
        for &(a, b) in &self.bins {
            if vars.value(a) != 1 && vars.value(b) != 1 {
                errs.push(format!("unsatisfied binary ({:?} {:?})", a, b));
            }
        }
        errs
    }
}

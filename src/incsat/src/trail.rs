/*****************************************************************************************[trail.rs]
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

//! The assignment trail and the boolean constraint propagation engine.

use crate::arena::CRef;
use crate::cdb::Cdb;
use crate::guess::Guess;
use crate::lit::Lit;
use crate::vars::{Reason, Vars};
use crate::watch::Watch;
use std::mem;

/// A falsified clause found by propagation.  Binary clauses have no arena
/// body, so their two literals are carried directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    Clause(CRef),
    Binary(Lit, Lit),
}

/// The ordered sequence of assigned literals.
///
/// Literals before `head` are fully propagated; `level_starts[i]` is the
/// trail index at which decision level i+1 began.  Level-0 assignments are
/// permanent.
#[derive(Debug, Clone)]
pub struct Trail {
    pub d: Vec<Lit>,
    head: usize,
    level_starts: Vec<usize>,
    /// Current decision level.
    pub level: u32,
    /// Cumulative propagation count.
    pub props: u64,
}

impl Trail {
    pub fn new(cap_hint: u32) -> Trail {
        Trail {
            d: Vec::with_capacity(cap_hint as usize),
            head: 0,
            level_starts: Vec::with_capacity(128),
            level: 0,
            props: 0,
        }
    }

    /// Number of assigned literals.
    #[inline(always)]
    pub fn tail(&self) -> usize {
        self.d.len()
    }

    pub fn grow_to(&mut self, top: u32) {
        let want = top as usize;
        if self.d.capacity() < want {
            self.d.reserve(want - self.d.len());
        }
    }

    /// Record `m` as true.  A `Reason::None` assignment is a decision or an
    /// assumption and opens a new decision level.
    pub fn assign(&mut self, vars: &mut Vars, m: Lit, reason: Reason) {
        debug_assert_ne!(m, Lit::NULL);
        if let Reason::None = reason {
            self.level_starts.push(self.d.len());
            self.level += 1;
        }
        vars.set(m);
        vars.set_level(m.var(), self.level);
        vars.set_reason(m.var(), reason);
        self.d.push(m);
    }

    /// Unassign everything above `level`, saving phases and returning the
    /// variables to the order heap in LIFO order.
    pub fn back(&mut self, vars: &mut Vars, guess: &mut Guess, level: u32) {
        if level >= self.level {
            return;
        }
        let start = self.level_starts[level as usize];
        for i in (start..self.d.len()).rev() {
            let m = self.d[i];
            vars.unset(m);
            vars.set_reason(m.var(), Reason::None);
            guess.save_phase(m);
            guess.push(m.var());
        }
        self.d.truncate(start);
        self.head = start;
        self.level_starts.truncate(level as usize);
        self.level = level;
    }

    /// Propagate all enqueued facts.  Returns the conflict if one arises;
    /// the propagation queue is drained either way.
    pub fn prop(&mut self, vars: &mut Vars, cdb: &mut Cdb) -> Option<Conflict> {
        let mut confl = None;
        while self.head < self.d.len() {
            let p = self.d[self.head];
            self.head += 1;
            self.props += 1;
            let false_lit = !p;

            // scan the watches of the newly false literal
            let mut ws = mem::take(&mut cdb.watches[false_lit]);
            let end = ws.len();
            let mut i = 0;
            let mut j = 0;
            'watches: while i < end {
                let w = ws[i];
                if w.is_binary() {
                    // whole clause is (blocker | false_lit), inline
                    let other = w.blocker();
                    ws[j] = w;
                    j += 1;
                    i += 1;
                    match vars.value(other) {
                        1 => {}
                        0 => self.assign(vars, other, Reason::Binary(false_lit)),
                        _ => {
                            confl = Some(Conflict::Binary(other, false_lit));
                            self.head = self.d.len();
                            while i < end {
                                ws[j] = ws[i];
                                j += 1;
                                i += 1;
                            }
                        }
                    }
                    continue;
                }

                // blocking literal short-circuit: skip the arena load
                let blocker = w.blocker();
                if vars.value(blocker) == 1 {
                    ws[j] = w;
                    j += 1;
                    i += 1;
                    continue;
                }

                // make sure the false literal is at slot 1
                let cr = w.cref();
                if cdb.arena.get(cr, 0) == false_lit {
                    cdb.arena.swap(cr, 0, 1);
                }
                debug_assert_eq!(cdb.arena.get(cr, 1), false_lit);
                i += 1;

                let first = cdb.arena.get(cr, 0);
                let w2 = Watch::new(cr, first, false);
                if first != blocker && vars.value(first) == 1 {
                    ws[j] = w2;
                    j += 1;
                    continue;
                }

                // look for a new literal to watch
                let mut k = 2;
                loop {
                    let q = cdb.arena.get(cr, k);
                    if q == Lit::NULL {
                        break;
                    }
                    if vars.value(q) != -1 {
                        cdb.arena.set(cr, 1, q);
                        cdb.arena.set(cr, k, false_lit);
                        debug_assert_ne!(q, false_lit);
                        cdb.watches[q].push(w2);
                        continue 'watches;
                    }
                    k += 1;
                }

                // no new watch: the clause is unit or false
                ws[j] = w2;
                j += 1;
                if vars.value(first) == -1 {
                    confl = Some(Conflict::Clause(cr));
                    self.head = self.d.len();
                    while i < end {
                        ws[j] = ws[i];
                        j += 1;
                        i += 1;
                    }
                } else {
                    self.assign(vars, first, Reason::Clause(cr));
                }
            }
            ws.truncate(j);
            cdb.watches[false_lit] = ws;

            if confl.is_some() {
                break;
            }
        }
        confl
    }
}

/*****************************************************************************************[derive.rs]
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

//! First-UIP conflict analysis: derives a learned clause from a conflict,
//! minimizes it, scores it and determines the backjump level.

use crate::arena::CRef;
use crate::cdb::Cdb;
use crate::guess::Guess;
use crate::lit::{Lit, VMap, Var};
use crate::trail::{Conflict, Trail};
use crate::vars::{Reason, Vars};
use std::cmp;

/// Result of analyzing one conflict.
#[derive(Debug, Clone, Copy)]
pub struct Derived {
    /// The asserted literal (the negated First-UIP), `Lit::NULL` if the
    /// empty clause was derived.
    pub unit: Lit,
    /// Level to backjump to before asserting `unit`.
    pub target_level: u32,
    /// Reason justifying `unit` once asserted: the learned clause.
    pub reason: Reason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum Seen {
    Undef,
    Source,
    Removable,
}

impl Default for Seen {
    fn default() -> Self {
        Seen::Undef
    }
}

#[derive(Clone, Copy)]
enum Resolving {
    Init(Conflict),
    With(Lit, Reason),
}

/// The analyzer.  Scratch buffers are kept across calls.
#[derive(Debug, Clone)]
pub struct Deriver {
    seen: VMap<Seen>,
    learnt: Vec<Lit>,
    to_clear: Vec<Lit>,
    min_stack: Vec<Lit>,
    levels: Vec<u32>,
    pub(crate) conflicts: u64,
}

impl Deriver {
    pub fn new(cap_hint: u32) -> Deriver {
        let mut d = Deriver {
            seen: VMap::new(),
            learnt: Vec::new(),
            to_clear: Vec::new(),
            min_stack: Vec::new(),
            levels: Vec::new(),
            conflicts: 0,
        };
        d.grow_to(cap_hint);
        d
    }

    pub fn grow_to(&mut self, top: u32) {
        if top > 0 {
            self.seen.reserve(Var::new(top - 1), Seen::Undef);
        }
    }

    /// Analyze the conflict `x`, insert the learned clause into `cdb` and
    /// return the asserting literal with its backjump level.
    ///
    /// Precondition: `x` is false in the current trail.  The conflict level
    /// is the highest level among `x`'s literals; a conflict whose literals
    /// all sit at level 0 derives the empty clause.  A conflict carried over
    /// from an unwound scope can sit strictly below the trail's own level.
    pub fn derive(
        &mut self,
        vars: &Vars,
        trail: &Trail,
        guess: &mut Guess,
        cdb: &mut Cdb,
        x: Conflict,
    ) -> Derived {
        self.conflicts += 1;
        let conflict_level = match x {
            Conflict::Binary(a, b) => cmp::max(vars.level_lit(a), vars.level_lit(b)),
            Conflict::Clause(cr) => {
                let mut lvl = 0;
                let mut k = 0;
                loop {
                    let q = cdb.arena.get(cr, k);
                    if q == Lit::NULL {
                        break;
                    }
                    lvl = cmp::max(lvl, vars.level_lit(q));
                    k += 1;
                }
                lvl
            }
        };
        debug_assert!(conflict_level <= trail.level);
        if conflict_level == 0 {
            cdb.learn(&[], 0);
            return Derived {
                unit: Lit::NULL,
                target_level: 0,
                reason: Reason::None,
            };
        }

        self.learnt.clear();
        self.learnt.push(Lit::NULL); // room for the asserted literal

        let mut path_c: u32 = 0;
        let mut index = trail.d.len();
        let mut p = Lit::NULL;
        let mut cur = Resolving::Init(x);

        // resolve backwards over the implication graph until one literal of
        // the conflict level remains
        loop {
            let mut side: [Lit; 2] = [Lit::NULL; 2];
            // the literals to resolve with; for a reason clause the pivot
            // sits at slot 0 and is skipped
            let (cr, n_side, start) = match cur {
                Resolving::Init(Conflict::Binary(a, b)) => {
                    side[0] = a;
                    side[1] = b;
                    (None, 2usize, 0u32)
                }
                Resolving::Init(Conflict::Clause(cr)) => (Some(cr), 0, 0),
                Resolving::With(_, Reason::Binary(o)) => {
                    side[0] = o;
                    (None, 1, 0)
                }
                Resolving::With(m, Reason::Clause(cr)) => {
                    debug_assert_ne!(cr, CRef::INF, "fact reached during resolution");
                    debug_assert_eq!(cdb.arena.get(cr, 0).var(), m.var());
                    (Some(cr), 0, 1)
                }
                Resolving::With(m, Reason::None) => {
                    panic!("analysis reached decision {:?} with path_c={}", m, path_c)
                }
            };
            if let Some(cr) = cr {
                if cdb.arena.header(cr).learnt() {
                    cdb.bump_heat(cr);
                }
            }

            let mut k = start;
            loop {
                let q = match cr {
                    Some(cr) => {
                        let q = cdb.arena.get(cr, k);
                        if q == Lit::NULL {
                            break;
                        }
                        q
                    }
                    None => {
                        if k as usize >= n_side {
                            break;
                        }
                        side[k as usize]
                    }
                };
                k += 1;
                let v = q.var();
                let lvl = vars.level(v);
                debug_assert!(lvl <= conflict_level);
                debug_assert_eq!(vars.value(q), -1);
                if self.seen[v] == Seen::Undef && lvl > 0 {
                    guess.bump(v);
                    self.seen[v] = Seen::Source;
                    if lvl == conflict_level {
                        path_c += 1;
                    } else {
                        self.learnt.push(q);
                    }
                }
            }

            // next marked literal up the trail becomes the pivot
            while self.seen[trail.d[index - 1].var()] == Seen::Undef {
                index -= 1;
            }
            p = trail.d[index - 1];
            index -= 1;
            cur = Resolving::With(p, vars.reason(p.var()));
            self.seen[p.var()] = Seen::Removable;
            path_c -= 1;
            if path_c == 0 {
                break;
            }
        }

        // clear the pivot marks left on the trail
        let mut i = trail.d.len() - 1;
        loop {
            let q = trail.d[i];
            if self.seen[q.var()] == Seen::Removable {
                self.seen[q.var()] = Seen::Undef;
            }
            if q == p {
                break;
            }
            i -= 1;
        }

        debug_assert_ne!(p, Lit::NULL);
        debug_assert_eq!(vars.value(p), 1);
        self.learnt[0] = !p;

        self.minimize(vars, cdb);

        // position 1 must hold the second-highest level for watching
        let target_level = if self.learnt.len() == 1 {
            0
        } else {
            let mut max_i = 1;
            let mut max_level = vars.level_lit(self.learnt[1]);
            for i in 2..self.learnt.len() {
                let lvl = vars.level_lit(self.learnt[i]);
                if lvl > max_level {
                    max_i = i;
                    max_level = lvl;
                }
            }
            self.learnt.swap(1, max_i);
            max_level
        };

        let lbd = self.lbd(vars);

        for i in 0..self.to_clear.len() {
            self.seen[self.to_clear[i].var()] = Seen::Undef;
        }
        self.to_clear.clear();

        debug_assert!(self.learnt.iter().all(|&m| vars.value(m) == -1));
        trace!(
            "derived {:?} target {} lbd {}",
            self.learnt,
            target_level,
            lbd
        );

        let reason = cdb.learn(&self.learnt, lbd);
        Derived {
            unit: self.learnt[0],
            target_level,
            reason,
        }
    }

    /// Number of distinct decision levels among the learned literals.
    fn lbd(&mut self, vars: &Vars) -> u32 {
        self.levels.clear();
        for &m in &self.learnt {
            self.levels.push(vars.level_lit(m));
        }
        self.levels.sort_unstable();
        self.levels.dedup();
        self.levels.len() as u32
    }

    /// Remove learned literals that are implied by the rest of the clause
    /// through the reason graph.
    fn minimize(&mut self, vars: &Vars, cdb: &Cdb) {
        self.to_clear.clear();
        self.to_clear.extend_from_slice(&self.learnt);

        let mut abstract_levels: u32 = 0;
        for &m in &self.learnt[1..] {
            abstract_levels |= abstract_level(vars, m.var());
        }

        let mut j = 1;
        for i in 1..self.learnt.len() {
            let m = self.learnt[i];
            // a decision cannot be eliminated
            let keep = vars.reason(m.var()) == Reason::None
                || !self.lit_redundant(vars, cdb, m, abstract_levels);
            if keep {
                self.learnt[j] = m;
                j += 1;
            }
        }
        self.learnt.truncate(j);
    }

    /// Whether `p` is implied by level-0 facts and literals already in the
    /// learned clause, following reasons recursively.
    fn lit_redundant(&mut self, vars: &Vars, cdb: &Cdb, p: Lit, abstract_levels: u32) -> bool {
        self.min_stack.clear();
        self.min_stack.push(p);
        let top = self.to_clear.len();

        while let Some(q) = self.min_stack.pop() {
            let ok = match vars.reason(q.var()) {
                Reason::None => unreachable!("redundancy check reached a decision"),
                Reason::Clause(cr) if cr == CRef::INF => true,
                Reason::Binary(o) => self.min_check(vars, o, abstract_levels),
                Reason::Clause(cr) => {
                    let mut ok = true;
                    let mut k = 1;
                    loop {
                        let l = cdb.arena.get(cr, k);
                        if l == Lit::NULL {
                            break;
                        }
                        k += 1;
                        if !self.min_check(vars, l, abstract_levels) {
                            ok = false;
                            break;
                        }
                    }
                    ok
                }
            };
            if !ok {
                // undo speculative marks
                for i in top..self.to_clear.len() {
                    self.seen[self.to_clear[i].var()] = Seen::Undef;
                }
                self.to_clear.truncate(top);
                return false;
            }
        }
        true
    }

    /// One antecedent step of the redundancy check.  True when `l` needs no
    /// further justification or was queued for one.
    fn min_check(&mut self, vars: &Vars, l: Lit, abstract_levels: u32) -> bool {
        if vars.level_lit(l) == 0 || self.seen[l.var()] == Seen::Source {
            return true;
        }
        if vars.reason(l.var()) != Reason::None
            && (abstract_level(vars, l.var()) & abstract_levels) != 0
        {
            self.seen[l.var()] = Seen::Source;
            self.min_stack.push(l);
            self.to_clear.push(l);
            return true;
        }
        false
    }
}

#[inline]
fn abstract_level(vars: &Vars, v: Var) -> u32 {
    1 << (vars.level(v) & 31)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cdb::Added;

    fn add_all(cdb: &mut Cdb, vars: &Vars, ds: &[i32]) -> Added {
        for &i in ds {
            cdb.add(vars, Lit::from_dimacs(i));
        }
        cdb.add(vars, Lit::NULL)
    }

    // (-1 -2 3), (-1 -2 -3): deciding 1 then 2 conflicts; the First-UIP
    // clause is (-1 -2) or a subset, asserting at level 1.
    #[test]
    fn test_first_uip_backjump() {
        let mut vars = Vars::new(8);
        let mut cdb = Cdb::new(&vars, 64);
        let mut guess = Guess::new(8);
        let mut trail = Trail::new(8);
        let mut deriver = Deriver::new(8);
        add_all(&mut cdb, &vars, &[-1, -2, 3]);
        add_all(&mut cdb, &vars, &[-1, -2, -3]);

        trail.assign(&mut vars, Var::new(1).pos(), Reason::None);
        assert_eq!(trail.prop(&mut vars, &mut cdb), None);
        trail.assign(&mut vars, Var::new(2).pos(), Reason::None);
        let x = trail.prop(&mut vars, &mut cdb).expect("conflict");

        let d = deriver.derive(&vars, &trail, &mut guess, &mut cdb, x);
        assert_eq!(d.unit, Var::new(2).neg(), "asserted literal");
        assert_eq!(d.target_level, 1);
        match d.reason {
            Reason::Binary(o) => assert_eq!(o, Var::new(1).neg()),
            r => panic!("expected learnt binary, got {:?}", r),
        }
    }

    // a conflict whose every antecedent is at the conflict level collapses
    // to a unit clause
    #[test]
    fn test_unit_learnt() {
        let mut vars = Vars::new(8);
        let mut cdb = Cdb::new(&vars, 64);
        let mut guess = Guess::new(8);
        let mut trail = Trail::new(8);
        let mut deriver = Deriver::new(8);
        add_all(&mut cdb, &vars, &[-1, 2]);
        add_all(&mut cdb, &vars, &[-1, -2]);

        trail.assign(&mut vars, Var::new(1).pos(), Reason::None);
        let x = trail.prop(&mut vars, &mut cdb).expect("conflict");
        let d = deriver.derive(&vars, &trail, &mut guess, &mut cdb, x);
        assert_eq!(d.unit, Var::new(1).neg());
        assert_eq!(d.target_level, 0);
        assert_eq!(d.reason, Reason::Clause(CRef::INF));
    }

    #[test]
    fn test_level0_conflict_derives_bot() {
        let mut vars = Vars::new(4);
        let mut cdb = Cdb::new(&vars, 16);
        let mut guess = Guess::new(4);
        let mut trail = Trail::new(4);
        let mut deriver = Deriver::new(4);
        add_all(&mut cdb, &vars, &[-1, 2]);
        trail.assign(&mut vars, Var::new(1).pos(), Reason::Clause(CRef::INF));
        trail.prop(&mut vars, &mut cdb);
        // fake a conflict at level 0
        let x = Conflict::Binary(Var::new(2).neg(), Var::new(1).neg());
        let d = deriver.derive(&vars, &trail, &mut guess, &mut cdb, x);
        assert_eq!(d.unit, Lit::NULL);
        assert!(cdb.bot.is_some());
    }
}

//! The variable table: current values, decision levels and reasons.

use crate::arena::CRef;
use crate::lit::{LMap, Lit, VMap, Var};

/// Why a variable got its value.
///
/// `None` marks decisions and assumptions.  `Clause(CRef::INF)` marks a fact
/// with no stored body (a unit clause).  `Binary(other)` is the rest of an
/// inline binary clause: the reason clause of the implied literal `m` is
/// `(m | other)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    None,
    Clause(CRef),
    Binary(Lit),
}

impl Default for Reason {
    fn default() -> Self {
        Reason::None
    }
}

/// Per-variable storage.  Values are indexed by literal so both polarities
/// can be looked up directly; for any variable v, `value(pos(v)) ==
/// -value(neg(v))` and 0 encodes unassigned.
#[derive(Debug, Clone)]
pub struct Vars {
    vals: LMap<i8>,
    levels: VMap<u32>,
    reasons: VMap<Reason>,
    /// Variable/literal capacity all components are grown to.
    pub top: u32,
    /// Maximum variable referenced so far.
    pub max: Var,
}

impl Vars {
    pub fn new(cap_hint: u32) -> Vars {
        let top = if cap_hint < 2 { 2 } else { cap_hint };
        let mut vars = Vars {
            vals: LMap::new(),
            levels: VMap::new(),
            reasons: VMap::new(),
            top: 0,
            max: Var::NULL,
        };
        vars.grow_to(top);
        vars
    }

    /// Value of a literal: +1 true, -1 false, 0 unassigned.
    #[inline(always)]
    pub fn value(&self, m: Lit) -> i8 {
        self.vals[m]
    }

    /// Raw value table, indexed by literal.
    #[inline(always)]
    pub fn vals(&self) -> &LMap<i8> {
        &self.vals
    }

    /// Make `m` true (and `!m` false).
    #[inline(always)]
    pub fn set(&mut self, m: Lit) {
        debug_assert_eq!(self.vals[m], 0, "assigning an assigned literal");
        self.vals[m] = 1;
        self.vals[!m] = -1;
    }

    #[inline(always)]
    pub fn unset(&mut self, m: Lit) {
        self.vals[m] = 0;
        self.vals[!m] = 0;
    }

    #[inline(always)]
    pub fn level(&self, v: Var) -> u32 {
        self.levels[v]
    }

    #[inline(always)]
    pub fn level_lit(&self, m: Lit) -> u32 {
        self.levels[m.var()]
    }

    #[inline(always)]
    pub fn set_level(&mut self, v: Var, lvl: u32) {
        self.levels[v] = lvl;
    }

    #[inline(always)]
    pub fn reason(&self, v: Var) -> Reason {
        self.reasons[v]
    }

    #[inline(always)]
    pub fn set_reason(&mut self, v: Var, r: Reason) {
        self.reasons[v] = r;
    }

    /// Grow per-variable storage to hold variables up to `top` exclusive.
    pub fn grow_to(&mut self, top: u32) {
        if top <= self.top {
            return;
        }
        let last = Var::new(top - 1);
        self.vals.reserve(last.neg(), 0);
        self.levels.reserve(last, 0);
        self.reasons.reserve(last, Reason::None);
        self.top = top;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_value_symmetry() {
        let mut vars = Vars::new(64);
        let little: Vec<Lit> = [3i32, -17, 7, 8].iter().map(|&i| Lit::from_dimacs(i)).collect();
        for &m in &little {
            vars.set(m);
        }
        for &m in &little {
            assert_eq!(vars.value(m), 1);
            assert_eq!(vars.value(!m), -1);
        }

        vars.grow_to(128);
        let bigger: Vec<Lit> = [99i32, -101, 127].iter().map(|&i| Lit::from_dimacs(i)).collect();
        for &m in &bigger {
            vars.set(m);
        }
        for &m in little.iter().chain(bigger.iter()) {
            assert_eq!(vars.value(m), 1, "value survives growth");
        }
    }

    #[test]
    fn test_unset() {
        let mut vars = Vars::new(8);
        let m = Var::new(3).neg();
        vars.set(m);
        assert_eq!(vars.value(m), 1);
        vars.unset(m);
        assert_eq!(vars.value(m), 0);
        assert_eq!(vars.value(!m), 0);
    }
}

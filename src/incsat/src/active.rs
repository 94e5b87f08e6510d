//! The activation facet: clauses gated by a fresh literal so they can be
//! switched on by assumption and removed later.

use crate::arena::{CRef, CRemap};
use crate::lit::{Lit, VMap, Var};

/// One clause gated by an activation literal.  Stored clauses are tracked by
/// handle; binary gated clauses live inline in the watch lists, so the other
/// literal is recorded instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gated {
    Arena(CRef),
    Binary(Lit),
}

/// Activation state: recycled activation literals and, per variable, the
/// clauses it gates.
#[derive(Debug, Clone)]
pub struct Active {
    free: Vec<Lit>,
    occs: VMap<Vec<Gated>>,
    is_active: VMap<bool>,
}

impl Active {
    pub fn new(cap_hint: u32) -> Active {
        let mut a = Active {
            free: Vec::new(),
            occs: VMap::new(),
            is_active: VMap::new(),
        };
        a.grow_to(cap_hint);
        a
    }

    pub fn grow_to(&mut self, top: u32) {
        if top == 0 {
            return;
        }
        let last = Var::new(top - 1);
        self.occs.reserve(last, Vec::new());
        self.is_active.reserve(last, false);
    }

    /// Take a recycled activation literal if one is available.
    pub fn recycle(&mut self) -> Option<Lit> {
        self.free.pop()
    }

    pub fn mark_active(&mut self, act: Lit) {
        self.is_active.reserve(act.var(), false);
        self.is_active[act.var()] = true;
        self.occs.reserve(act.var(), Vec::new());
    }

    pub fn is_active(&self, act: Lit) -> bool {
        self.is_active.has(act.var()) && self.is_active[act.var()]
    }

    /// Record a clause gated by `act`.
    pub fn note_gated(&mut self, act: Lit, g: Gated) {
        self.occs[act.var()].push(g);
    }

    /// Drop and return the clauses gated by `act`, retiring the literal into
    /// the free list.
    pub fn retire(&mut self, act: Lit) -> Vec<Gated> {
        let v = act.var();
        let occs = std::mem::take(&mut self.occs[v]);
        self.free.push(v.pos());
        self.is_active[v] = false;
        occs
    }

    /// Apply a compaction remap to the gated-occurrence lists.
    pub fn remap(&mut self, map: &CRemap) {
        for (_, occs) in self.occs.iter_mut() {
            occs.retain(|g| match g {
                Gated::Binary(_) => true,
                Gated::Arena(c) => map.get(c) != Some(&CRef::NONE),
            });
            for g in occs.iter_mut() {
                if let Gated::Arena(c) = g {
                    if let Some(&nc) = map.get(c) {
                        *g = Gated::Arena(nc);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use fnv::FnvHashMap;

    #[test]
    fn test_retire_recycles() {
        let mut a = Active::new(16);
        let act = Var::new(5).pos();
        a.mark_active(act);
        a.note_gated(act, Gated::Arena(CRef::new(10)));
        a.note_gated(act, Gated::Binary(Var::new(2).pos()));
        assert!(a.is_active(act));
        let occs = a.retire(act);
        assert_eq!(occs.len(), 2);
        assert!(!a.is_active(act));
        assert_eq!(a.recycle(), Some(act));
        assert_eq!(a.recycle(), None);
    }

    #[test]
    fn test_remap() {
        let mut a = Active::new(16);
        let act = Var::new(3).pos();
        a.mark_active(act);
        a.note_gated(act, Gated::Arena(CRef::new(10)));
        a.note_gated(act, Gated::Arena(CRef::new(20)));
        a.note_gated(act, Gated::Binary(Var::new(9).neg()));
        let mut map = FnvHashMap::default();
        map.insert(CRef::new(10), CRef::NONE);
        map.insert(CRef::new(20), CRef::new(4));
        a.remap(&map);
        let occs = a.retire(act);
        assert_eq!(
            occs,
            vec![Gated::Arena(CRef::new(4)), Gated::Binary(Var::new(9).neg())]
        );
    }
}

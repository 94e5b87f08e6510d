/*****************************************************************************************[arena.rs]
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

use crate::lit::Lit;
use fnv::{FnvHashMap, FnvHashSet};
use std::fmt;

/// Packed clause metadata, one word per clause, stored just before the
/// clause body in the arena.
///
/// Layout:
/// learnt    : 1  (bit 31)
/// size      : 5  (bits 26..31, clause size modulo 32, a scan hint)
/// lbd       : 5  (bits 21..26, saturating; learnt clauses only)
/// heat      : 21 (bits 0..21, saturating activity; learnt clauses only)
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ClauseHeader(u32);

const LEARNT_BIT: u32 = 1 << 31;
const SIZE_SHIFT: u32 = 26;
const SIZE_MASK: u32 = 31;
const LBD_SHIFT: u32 = 21;
const LBD_MASK: u32 = 31;
const HEAT_MASK: u32 = (1 << 21) - 1;

impl ClauseHeader {
    pub fn new(learnt: bool, lbd: u32, size: u32) -> Self {
        let lbd = if lbd > LBD_MASK { LBD_MASK } else { lbd };
        ClauseHeader(
            ((learnt as u32) << 31) | ((size & SIZE_MASK) << SIZE_SHIFT) | (lbd << LBD_SHIFT),
        )
    }

    #[inline(always)]
    pub fn learnt(self) -> bool {
        self.0 & LEARNT_BIT != 0
    }

    /// Clause size modulo 32.  A hint only; the body's null terminator is
    /// authoritative.
    #[inline(always)]
    pub fn size_hint(self) -> u32 {
        (self.0 >> SIZE_SHIFT) & SIZE_MASK
    }

    #[inline(always)]
    pub fn lbd(self) -> u32 {
        (self.0 >> LBD_SHIFT) & LBD_MASK
    }

    #[inline(always)]
    pub fn heat(self) -> u32 {
        self.0 & HEAT_MASK
    }

    /// Increase heat, saturating at the field width.
    pub fn bump(self, amount: u32) -> Self {
        let heat = self.heat().saturating_add(amount);
        let heat = if heat > HEAT_MASK { HEAT_MASK } else { heat };
        ClauseHeader((self.0 & !HEAT_MASK) | heat)
    }

    /// Halve heat.
    pub fn decay(self) -> Self {
        ClauseHeader((self.0 & !HEAT_MASK) | (self.heat() >> 1))
    }

    #[inline(always)]
    pub(crate) fn raw(self) -> u32 {
        self.0
    }

    #[inline(always)]
    pub(crate) fn from_raw(raw: u32) -> Self {
        ClauseHeader(raw)
    }
}

impl fmt::Debug for ClauseHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ClauseHeader")
            .field("learnt", &self.learnt())
            .field("size", &self.size_hint())
            .field("lbd", &self.lbd())
            .field("heat", &self.heat())
            .finish()
    }
}

/// A clause handle: the arena offset of the clause's first literal.
///
/// Handles are stable between compactions.  Two values are reserved:
/// `CRef::NONE` (no clause) and `CRef::INF` (a clause that exists but has no
/// stored body, e.g. a unit that became a top-level fact, or an inline
/// binary).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CRef(u32);

impl CRef {
    pub const NONE: CRef = CRef(0);
    pub const INF: CRef = CRef(!0);

    #[inline(always)]
    pub(crate) fn new(off: u32) -> Self {
        CRef(off)
    }

    #[inline(always)]
    pub(crate) fn off(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for CRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if *self == CRef::NONE {
            write!(f, "cNONE")
        } else if *self == CRef::INF {
            write!(f, "cINF")
        } else {
            write!(f, "c{}", self.0)
        }
    }
}

/// Remap from old clause handles to new ones, produced by compaction.
/// Removed clauses map to `CRef::NONE`.
pub type CRemap = FnvHashMap<CRef, CRef>;

/// The clause arena: a single flat buffer of words holding all stored
/// clauses.  Each clause is a header word followed by its literals and a
/// null terminator.  Binary clauses are never stored here; they live
/// entirely in the watch lists.
#[derive(Debug, Clone)]
pub struct Arena {
    d: Vec<u32>,
}

impl Arena {
    pub fn with_capacity(words: usize) -> Self {
        let mut d = Vec::with_capacity(words + 1);
        // offset 0 is padding so that CRef::NONE never addresses a clause
        d.push(0);
        Arena { d }
    }

    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Number of words in use.
    pub fn len(&self) -> usize {
        self.d.len()
    }

    /// Append a clause; returns its handle.
    ///
    /// Must not be called while an iteration over the arena is in progress.
    pub fn add_lits(&mut self, hd: ClauseHeader, lits: &[Lit]) -> CRef {
        self.d.push(hd.raw());
        let c = CRef::new(self.d.len() as u32);
        for &m in lits {
            debug_assert_ne!(m, Lit::NULL);
            self.d.push(m.raw());
        }
        self.d.push(Lit::NULL.raw());
        c
    }

    /// Append the literals of clause `c` to `dst`.
    pub fn load(&self, c: CRef, dst: &mut Vec<Lit>) {
        let mut p = c.off() as usize;
        loop {
            let m = Lit::from_raw(self.d[p]);
            if m == Lit::NULL {
                return;
            }
            dst.push(m);
            p += 1;
        }
    }

    /// The `i`-th literal of clause `c`.
    #[inline(always)]
    pub fn get(&self, c: CRef, i: u32) -> Lit {
        Lit::from_raw(self.d[(c.off() + i) as usize])
    }

    #[inline(always)]
    pub fn set(&mut self, c: CRef, i: u32, m: Lit) {
        self.d[(c.off() + i) as usize] = m.raw();
    }

    #[inline(always)]
    pub fn swap(&mut self, c: CRef, i: u32, j: u32) {
        self.d.swap((c.off() + i) as usize, (c.off() + j) as usize);
    }

    /// Clause size by terminator scan.
    pub fn size(&self, c: CRef) -> u32 {
        let mut p = c.off() as usize;
        while self.d[p] != 0 {
            p += 1;
        }
        p as u32 - c.off()
    }

    #[inline(always)]
    pub fn header(&self, c: CRef) -> ClauseHeader {
        ClauseHeader::from_raw(self.d[c.off() as usize - 1])
    }

    #[inline(always)]
    pub fn set_header(&mut self, c: CRef, hd: ClauseHeader) {
        self.d[c.off() as usize - 1] = hd.raw();
    }

    /// Iterate the handles of all stored clauses, in storage order.
    pub fn iter_refs(&self) -> Refs {
        Refs { arena: self, at: 1 }
    }

    /// Copy all clauses except those in `rm` into a fresh buffer, preserving
    /// relative order, and return the handle remap.  Removed handles map to
    /// `CRef::NONE`.  All outstanding handles are invalidated; observers must
    /// apply the remap to every stored handle.
    pub fn compact(&mut self, rm: &[CRef]) -> CRemap {
        let rm: FnvHashSet<CRef> = rm.iter().cloned().collect();
        let mut nd = Vec::with_capacity(self.d.len());
        nd.push(0);
        let mut map = CRemap::default();
        for c in self.iter_refs() {
            if rm.contains(&c) {
                map.insert(c, CRef::NONE);
                continue;
            }
            nd.push(self.header(c).raw());
            let nc = CRef::new(nd.len() as u32);
            let mut p = c.off() as usize;
            while self.d[p] != 0 {
                nd.push(self.d[p]);
                p += 1;
            }
            nd.push(0);
            map.insert(c, nc);
        }
        self.d = nd;
        map
    }
}

impl Default for Arena {
    fn default() -> Self {
        Arena::new()
    }
}

/// Iterator over the clause handles in an arena.
pub struct Refs<'a> {
    arena: &'a Arena,
    at: usize,
}

impl<'a> Iterator for Refs<'a> {
    type Item = CRef;
    fn next(&mut self) -> Option<CRef> {
        if self.at >= self.arena.d.len() {
            return None;
        }
        // header at `at`, lits follow, terminator ends the clause
        let c = CRef::new(self.at as u32 + 1);
        let mut p = self.at + 1;
        while self.arena.d[p] != 0 {
            p += 1;
        }
        self.at = p + 1;
        Some(c)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lit::Var;

    fn lits(ds: &[i32]) -> Vec<Lit> {
        ds.iter().map(|&i| Lit::from_dimacs(i)).collect()
    }

    #[test]
    fn test_header_fields() {
        let hs = [
            ClauseHeader::new(false, 2, 21),
            ClauseHeader::new(true, 2, 21),
            ClauseHeader::new(false, 6, 55),
        ];
        let ls = [false, true, false];
        let lbds = [2, 2, 6];
        let szs = [21, 21, 55];
        for (i, h) in hs.iter().enumerate() {
            assert_eq!(h.learnt(), ls[i]);
            assert_eq!(h.lbd(), lbds[i]);
            assert_eq!(h.size_hint(), szs[i] & 31);
        }
    }

    #[test]
    fn test_header_heat() {
        for h in [
            ClauseHeader::new(false, 2, 21),
            ClauseHeader::new(true, 4, 5),
        ] {
            let b = h.bump(1);
            assert!(b.heat() > h.heat());
            let d = b.decay();
            assert!(d.heat() < b.heat());
            for hh in [b, d] {
                assert_eq!(hh.learnt(), h.learnt());
                assert_eq!(hh.lbd(), h.lbd());
                assert_eq!(hh.size_hint(), h.size_hint());
            }
        }
    }

    #[test]
    fn test_header_heat_saturates() {
        let mut h = ClauseHeader::new(true, 1, 3);
        h = h.bump(u32::MAX);
        let top = h.heat();
        assert_eq!(h.bump(1).heat(), top);
        assert_eq!(h.lbd(), 1);
        assert!(h.learnt());
    }

    #[test]
    fn test_add_load_compact() {
        let cnf: Vec<Vec<Lit>> = vec![
            lits(&[2, 3, 4, 12]),
            vec![],
            vec![],
            vec![],
            (1..36).map(|i| Var::new(i).pos()).collect(),
            lits(&[17]),
            vec![],
        ];
        let hds: Vec<ClauseHeader> = cnf
            .iter()
            .enumerate()
            .map(|(i, c)| ClauseHeader::new(i % 2 == 1, 0, c.len() as u32))
            .collect();

        let mut arena = Arena::with_capacity(8);
        let locs: Vec<CRef> = cnf
            .iter()
            .zip(&hds)
            .map(|(c, &h)| arena.add_lits(h, c))
            .collect();

        let mut ms = Vec::new();
        for (i, &p) in locs.iter().enumerate() {
            ms.clear();
            arena.load(p, &mut ms);
            assert_eq!(ms, cnf[i], "clause {} load mismatch", i);
        }
        for w in locs.windows(2) {
            assert_ne!(w[0], w[1], "adjacent handles must differ");
        }
        let walked: Vec<CRef> = arena.iter_refs().collect();
        assert_eq!(walked, locs);

        // remove clauses 0, 2, 3, 5; keep 1, 4, 6
        let rmi = [0usize, 2, 3, 5];
        let left = [1usize, 4, 6];
        let rm: Vec<CRef> = rmi.iter().map(|&i| locs[i]).collect();
        let map = arena.compact(&rm);

        for &i in &rmi {
            assert_eq!(map[&locs[i]], CRef::NONE);
        }
        for &i in &left {
            let p = map[&locs[i]];
            assert_ne!(p, CRef::NONE, "kept clause marked removed");
            ms.clear();
            arena.load(p, &mut ms);
            assert_eq!(ms, cnf[i], "clause {} after compact", i);
            assert_eq!(arena.header(p), hds[i]);
        }
    }
}

//! Packed watch words.
//!
//! A watch holds the blocking literal, the clause handle, and one bit that
//! flags an inline binary clause.  For binary clauses the blocker is the
//! whole rest of the clause, so propagation never touches the arena.

use crate::arena::CRef;
use crate::lit::Lit;
use smallvec::SmallVec;
use std::fmt;

/// One watch record: (handle, blocking literal, binary flag) in a word.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Watch(u64);

const LIT_BITS: u32 = 31;
const LIT_MASK: u64 = (1 << LIT_BITS) - 1;
const LOC_MASK: u64 = 0xffff_ffff << LIT_BITS;
const BIN_MASK: u64 = 1 << 63;

impl Watch {
    /// A watch on clause `c` with blocking literal `blocker`.  `is_bin`
    /// marks an inline binary clause; `c` is then conventionally
    /// `CRef::INF`.
    pub fn new(c: CRef, blocker: Lit, is_bin: bool) -> Watch {
        debug_assert!((blocker.raw() as u64) <= LIT_MASK);
        let mut v = (blocker.raw() as u64) | ((c.off() as u64) << LIT_BITS);
        if is_bin {
            v |= BIN_MASK;
        }
        Watch(v)
    }

    /// The blocking literal.  For a binary clause this is the other literal
    /// of the clause.
    #[inline(always)]
    pub fn blocker(self) -> Lit {
        Lit::from_raw((self.0 & LIT_MASK) as u32)
    }

    #[inline(always)]
    pub fn is_binary(self) -> bool {
        self.0 >= BIN_MASK
    }

    #[inline(always)]
    pub fn cref(self) -> CRef {
        CRef::new(((self.0 & !BIN_MASK) >> LIT_BITS) as u32)
    }

    /// The same watch with the handle replaced by `c`.
    pub fn relocate(self, c: CRef) -> Watch {
        Watch((self.0 & !LOC_MASK) | ((c.off() as u64) << LIT_BITS))
    }
}

impl fmt::Debug for Watch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Watch{{cref: {:?}, blocker: {:?}, bin: {}}}",
            self.cref(),
            self.blocker(),
            self.is_binary()
        )
    }
}

/// Per-literal list of watches.
pub type WatchList = SmallVec<[Watch; 4]>;

#[cfg(test)]
mod test {
    use super::*;
    use crate::lit::Var;

    #[test]
    fn test_loc_overflow() {
        let c = CRef::new(3);
        let w = Watch::new(c, Var::new(3).neg(), true);
        assert_eq!(w.cref(), c, "binary flag must not leak into the handle");
    }

    #[test]
    fn test_watch_roundtrip() {
        let c = CRef::new(77);
        let m = Var::new(512).pos();
        let w = Watch::new(c, m, true);
        assert_eq!(w.blocker(), m);
        assert!(w.is_binary());
        assert_eq!(w.cref(), c);

        let c2 = CRef::new(22);
        let w2 = w.relocate(c2);
        assert_eq!(w2.blocker(), m);
        assert!(w2.is_binary());
        assert_eq!(w2.cref(), c2);
    }

    #[test]
    fn test_inf_handle_fits() {
        let w = Watch::new(CRef::INF, Var::new(1).pos(), true);
        assert_eq!(w.cref(), CRef::INF);
    }
}

/*****************************************************************************************[lit.rs]
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

use crate::intmap::{AsIndex, IntMap, IntSet};
use std::fmt;
use std::ops;

/// A propositional variable, numbered from 1.
///
/// `Var::NULL` (0) is reserved and never names a real variable.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Var(u32);

impl Var {
    pub const NULL: Var = Var(0);

    #[inline(always)]
    pub fn new(idx: u32) -> Var {
        debug_assert!(idx < u32::MAX / 2, "Var::new: index too large");
        Var(idx)
    }

    #[inline(always)]
    pub fn idx(self) -> u32 {
        self.0
    }

    /// The positive literal of this variable.
    #[inline(always)]
    pub fn pos(self) -> Lit {
        Lit(self.0 << 1)
    }

    /// The negative literal of this variable.
    #[inline(always)]
    pub fn neg(self) -> Lit {
        Lit(self.0 << 1 | 1)
    }
}

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.0 == 0 {
            write!(f, "NULL")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl AsIndex for Var {
    #[inline(always)]
    fn as_index(self) -> usize {
        self.0 as usize
    }
    #[inline(always)]
    fn from_index(index: usize) -> Self {
        Var(index as u32)
    }
}

/// A literal: a variable together with a sign.
///
/// The encoding packs both in one integer so that the two polarities of a
/// variable occupy adjacent slots and negation is a single bit flip.
/// `Lit::NULL` (0) is reserved; it terminates clauses.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Lit(u32);

impl Lit {
    pub const NULL: Lit = Lit(0);

    #[inline(always)]
    pub fn new(var: Var, pos: bool) -> Self {
        Lit(var.0 << 1 | (!pos) as u32)
    }

    #[inline(always)]
    pub(crate) fn from_raw(raw: u32) -> Self {
        Lit(raw)
    }

    #[inline(always)]
    pub(crate) fn raw(self) -> u32 {
        self.0
    }

    #[inline(always)]
    pub fn var(self) -> Var {
        Var(self.0 >> 1)
    }

    #[inline(always)]
    pub fn is_pos(self) -> bool {
        (self.0 & 1) == 0
    }

    /// Build a literal from a dimacs integer (non-zero; sign is polarity).
    pub fn from_dimacs(i: i32) -> Lit {
        debug_assert!(i != 0, "dimacs literal must be non-zero");
        let v = Var(i.unsigned_abs());
        if i > 0 {
            v.pos()
        } else {
            v.neg()
        }
    }

    /// The dimacs integer of this literal.
    pub fn dimacs(self) -> i32 {
        let v = (self.0 >> 1) as i32;
        if self.is_pos() {
            v
        } else {
            -v
        }
    }
}

impl ops::Not for Lit {
    type Output = Self;
    #[inline(always)]
    fn not(self) -> Self {
        Lit(self.0 ^ 1)
    }
}

impl fmt::Debug for Lit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.0 == 0 {
            write!(f, "NULL")
        } else {
            write!(f, "{}", self.dimacs())
        }
    }
}

impl AsIndex for Lit {
    #[inline(always)]
    fn as_index(self) -> usize {
        self.0 as usize
    }
    #[inline(always)]
    fn from_index(index: usize) -> Self {
        Lit(index as u32)
    }
}

/// Map keyed by variable.
pub type VMap<V> = IntMap<Var, V>;
/// Map keyed by literal.
pub type LMap<V> = IntMap<Lit, V>;
/// Deduplicating set of literals.
pub type LSet = IntSet<Lit>;

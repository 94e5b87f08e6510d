//! The decision heuristic: a max-heap of variables keyed by activity, plus
//! the per-variable phase memory.

use crate::lit::{LMap, Lit, VMap, Var};

const RESCALE_LIM: f64 = 1e100;
const RESCALE: f64 = 1e-100;
const DECAY: f64 = 0.95;

/// Variable ordering and polarity choice.
#[derive(Debug, Clone)]
pub struct Guess {
    heap: Vec<Var>,
    /// Position of each variable in `heap`, -1 if absent.
    pos: VMap<i32>,
    activity: VMap<f64>,
    /// Preferred sign per variable: +1 positive, anything else negative.
    cache: VMap<i8>,
    var_inc: f64,
    guesses: u64,
}

impl Guess {
    pub fn new(cap_hint: u32) -> Guess {
        let mut g = Guess {
            heap: Vec::with_capacity(cap_hint as usize),
            pos: VMap::new(),
            activity: VMap::new(),
            cache: VMap::new(),
            var_inc: 1.0,
            guesses: 0,
        };
        g.grow_to(cap_hint);
        g
    }

    pub fn grow_to(&mut self, top: u32) {
        if top == 0 {
            return;
        }
        let last = Var::new(top - 1);
        self.pos.reserve(last, -1);
        self.activity.reserve(last, 0.0);
        self.cache.reserve(last, -1);
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[inline]
    fn lt(&self, a: Var, b: Var) -> bool {
        // max-heap order
        self.activity[a] > self.activity[b]
    }

    fn percolate_up(&mut self, mut i: usize) {
        let x = self.heap[i];
        while i != 0 {
            let p = (i - 1) >> 1;
            if !self.lt(x, self.heap[p]) {
                break;
            }
            self.heap[i] = self.heap[p];
            self.pos[self.heap[i]] = i as i32;
            i = p;
        }
        self.heap[i] = x;
        self.pos[x] = i as i32;
    }

    fn percolate_down(&mut self, mut i: usize) {
        let x = self.heap[i];
        loop {
            let l = 2 * i + 1;
            if l >= self.heap.len() {
                break;
            }
            let r = l + 1;
            let child = if r < self.heap.len() && self.lt(self.heap[r], self.heap[l]) {
                r
            } else {
                l
            };
            if !self.lt(self.heap[child], x) {
                break;
            }
            self.heap[i] = self.heap[child];
            self.pos[self.heap[i]] = i as i32;
            i = child;
        }
        self.heap[i] = x;
        self.pos[x] = i as i32;
    }

    #[inline]
    pub fn in_heap(&self, v: Var) -> bool {
        self.pos.has(v) && self.pos[v] >= 0
    }

    /// Insert `v`; no-op if already present.
    pub fn push(&mut self, v: Var) {
        self.pos.reserve(v, -1);
        self.activity.reserve(v, 0.0);
        self.cache.reserve(v, -1);
        if self.in_heap(v) {
            return;
        }
        self.pos[v] = self.heap.len() as i32;
        self.heap.push(v);
        self.percolate_up(self.heap.len() - 1);
    }

    /// Remove and return the most active variable.
    pub(crate) fn pop(&mut self) -> Option<Var> {
        let x = *self.heap.first()?;
        let last = self.heap.pop().expect("heap is empty");
        self.pos[x] = -1;
        if !self.heap.is_empty() {
            self.heap[0] = last;
            self.pos[last] = 0;
            self.percolate_down(0);
        }
        Some(x)
    }

    /// Pick the next decision literal: the most active unassigned variable
    /// with its remembered phase, or `Lit::NULL` when every variable in the
    /// order is assigned.
    pub fn guess(&mut self, vals: &LMap<i8>) -> Lit {
        while let Some(v) = self.pop() {
            if vals[v.pos()] != 0 {
                continue;
            }
            self.guesses += 1;
            return if self.cache[v] == 1 { v.pos() } else { v.neg() };
        }
        Lit::NULL
    }

    /// Whether some variable in the order is unassigned.
    pub fn has(&self, vals: &LMap<i8>) -> bool {
        self.heap.iter().any(|&v| vals[v.pos()] == 0)
    }

    /// Increase the activity of `v` by the current bump increment.
    pub fn bump(&mut self, v: Var) {
        self.activity[v] += self.var_inc;
        if self.activity[v] > RESCALE_LIM {
            for (_, a) in self.activity.iter_mut() {
                *a *= RESCALE;
            }
            self.var_inc *= RESCALE;
        }
        if self.in_heap(v) {
            let i = self.pos[v] as usize;
            self.percolate_up(i);
        }
    }

    /// Exponential decay of all activities, by growing the increment.
    pub fn decay(&mut self) {
        self.var_inc *= 1.0 / DECAY;
    }

    #[inline]
    pub fn phase(&self, v: Var) -> i8 {
        self.cache[v]
    }

    #[inline]
    pub fn set_phase(&mut self, v: Var, sign: i8) {
        self.cache[v] = sign;
    }

    /// Remember the sign `m` had when it is unassigned.
    #[inline]
    pub fn save_phase(&mut self, m: Lit) {
        self.cache[m.var()] = if m.is_pos() { 1 } else { -1 };
    }

    pub(crate) fn num_guesses(&self) -> u64 {
        self.guesses
    }

    pub(crate) fn reset_guesses(&mut self) {
        self.guesses = 0;
    }
}

//! End-to-end solver scenarios: incremental solving, assumptions and why,
//! test/untest scopes, activation, background control.

use incsat::{GoSolvable, Lit, Solver, Stats, Var};
use std::time::Duration;

fn add_clause(s: &mut Solver, ds: &[i32]) {
    for &i in ds {
        s.add(Lit::from_dimacs(i));
    }
    s.add(Lit::NULL);
}

struct XorShift(u64);

impl XorShift {
    fn new(seed: u64) -> XorShift {
        XorShift(seed | 1)
    }
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }
    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

/// Pigeonhole principle with `p` pigeons and `h` holes; unsat when p > h.
fn php(s: &mut Solver, p: i32, h: i32) {
    let var = |i: i32, j: i32| i * h + j + 1;
    for i in 0..p {
        for j in 0..h {
            s.add(Lit::from_dimacs(var(i, j)));
        }
        s.add(Lit::NULL);
    }
    for j in 0..h {
        for i in 0..p {
            for k in i + 1..p {
                add_clause(s, &[-var(i, j), -var(k, j)]);
            }
        }
    }
}

/// A satisfiable random 3-CNF: every clause contains at least one literal
/// true under a hidden assignment.  Returns the clauses and the assignment.
fn planted_3cnf(
    s: &mut Solver,
    nv: u64,
    nc: u64,
    rng: &mut XorShift,
) -> (Vec<Vec<i32>>, Vec<bool>) {
    let hidden: Vec<bool> = (0..=nv).map(|_| rng.below(2) == 1).collect();
    let mut clauses = Vec::new();
    for _ in 0..nc {
        let mut vs = [0i64; 3];
        vs[0] = rng.below(nv) as i64 + 1;
        loop {
            vs[1] = rng.below(nv) as i64 + 1;
            if vs[1] != vs[0] {
                break;
            }
        }
        loop {
            vs[2] = rng.below(nv) as i64 + 1;
            if vs[2] != vs[0] && vs[2] != vs[1] {
                break;
            }
        }
        let keep = rng.below(3) as usize;
        let mut clause = Vec::new();
        for (k, &v) in vs.iter().enumerate() {
            let truthy = hidden[v as usize];
            let pos = if k == keep {
                truthy
            } else {
                rng.below(2) == 1
            };
            clause.push(if pos { v as i32 } else { -(v as i32) });
        }
        add_clause(s, &clause);
        clauses.push(clause);
    }
    (clauses, hidden)
}

/// Binary implication chain x(i+1) -> x(i) with a wrap x1 -> xn.
fn bin_chain(s: &mut Solver, n: i32) {
    for i in 1..n {
        add_clause(s, &[i, -(i + 1)]);
    }
    add_clause(s, &[n, -1]);
}

#[test]
fn test_trivial_unsat_why_empty() {
    let mut s = Solver::new();
    add_clause(&mut s, &[1]);
    add_clause(&mut s, &[-1]);
    assert_eq!(s.solve(), -1);
    let mut why = Vec::new();
    s.why(&mut why);
    assert!(why.is_empty());
    // subsequent solves stay unsat
    assert_eq!(s.solve(), -1);
}

#[test]
fn test_trivial_sat_under_assumption() {
    let mut s = Solver::new();
    add_clause(&mut s, &[1, 2]);
    s.assume(Lit::from_dimacs(-1));
    assert_eq!(s.solve(), 1);
    assert!(s.value(Lit::from_dimacs(2)));
    assert!(!s.value(Lit::from_dimacs(1)));
}

#[test]
fn test_pigeonhole_unsat() {
    let mut s = Solver::new();
    php(&mut s, 6, 5);
    assert_eq!(s.solve(), -1);
    let mut why = Vec::new();
    s.why(&mut why);
    assert!(why.is_empty(), "no assumptions were made");
}

#[test]
fn test_binary_chain_assumption() {
    let n = 512;
    let mut s = Solver::new();
    bin_chain(&mut s, n);
    s.assume(Lit::from_dimacs(4));
    assert_eq!(s.solve(), 1);
    for i in 1..=n {
        assert!(s.value(Lit::from_dimacs(i)), "x{} must be true", i);
    }
}

#[test]
fn test_incremental_contradictory_assumptions() {
    let mut rng = XorShift::new(0x9e3779b97f4a7c15);
    let mut s = Solver::new();
    let (clauses, _) = planted_3cnf(&mut s, 50, 80, &mut rng);
    assert_eq!(s.solve(), 1);
    // model round-trip: every added clause is satisfied
    for c in &clauses {
        assert!(
            c.iter().any(|&i| s.value(Lit::from_dimacs(i))),
            "unsatisfied clause {:?}",
            c
        );
    }

    s.assume(Lit::from_dimacs(1));
    s.assume(Lit::from_dimacs(-1));
    assert_eq!(s.solve(), -1);
    let mut why = Vec::new();
    s.why(&mut why);
    why.sort();
    let mut want = vec![Lit::from_dimacs(-1), Lit::from_dimacs(1)];
    want.sort();
    assert_eq!(why, want);

    // the contradiction was only assumed
    assert_eq!(s.solve(), 1);
}

#[test]
fn test_why_is_minimal() {
    let mut s = Solver::new();
    add_clause(&mut s, &[-1, -2]);
    add_clause(&mut s, &[3, 4]);
    s.assume(Lit::from_dimacs(1));
    s.assume(Lit::from_dimacs(2));
    s.assume(Lit::from_dimacs(3));
    assert_eq!(s.solve(), -1);
    let mut why = Vec::new();
    s.why(&mut why);
    why.sort();
    assert_eq!(why, vec![Lit::from_dimacs(1), Lit::from_dimacs(2)]);

    // the why set alone is unsat, every strict subset is sat
    let check = |assumps: &[i32]| {
        let mut t = Solver::new();
        add_clause(&mut t, &[-1, -2]);
        add_clause(&mut t, &[3, 4]);
        for &a in assumps {
            t.assume(Lit::from_dimacs(a));
        }
        t.solve()
    };
    assert_eq!(check(&[1, 2]), -1);
    assert_eq!(check(&[1]), 1);
    assert_eq!(check(&[2]), 1);
}

#[test]
fn test_test_untest_restores_state() {
    let mut rng = XorShift::new(0xdeadbeef);
    let mut s = Solver::new();
    planted_3cnf(&mut s, 40, 60, &mut rng);
    let mut props = Vec::new();

    let max0 = s.max_var();
    let values0: Vec<i8> = (1..=max0.idx())
        .map(|i| {
            let v = Var::new(i);
            s.value(v.pos()) as i8 - s.value(v.neg()) as i8
        })
        .collect();

    for _round in 0..8u32 {
        let a = (rng.below(40) + 1) as i32;
        let b = (rng.below(40) + 1) as i32;
        s.assume(Lit::from_dimacs(a));
        let r1 = s.test(&mut props);
        if r1 == -1 {
            assert!(s.untest() <= 0);
            continue;
        }
        s.assume(Lit::from_dimacs(-b));
        let r2 = s.test(&mut props);
        if r2 != -1 {
            s.solve();
        }
        assert!(s.untest() <= 0);
        assert!(s.untest() <= 0);
    }

    assert_eq!(s.max_var(), max0);
    let values1: Vec<i8> = (1..=max0.idx())
        .map(|i| {
            let v = Var::new(i);
            s.value(v.pos()) as i8 - s.value(v.neg()) as i8
        })
        .collect();
    // untested state: everything above the permanent trail is unwound
    for (i, (a, b)) in values0.iter().zip(values1.iter()).enumerate() {
        assert!(
            b == a || *a == 0,
            "var {} changed from {} to {}",
            i + 1,
            a,
            b
        );
    }
    assert_eq!(s.solve(), 1, "formula is still satisfiable");
}

#[test]
fn test_test_propagations_and_reasons() {
    let mut s = Solver::new();
    add_clause(&mut s, &[-1, 2]);
    add_clause(&mut s, &[-2, -3, 4]);
    add_clause(&mut s, &[3]);
    add_clause(&mut s, &[5, 6]); // keeps the test short of a full model
    let mut props = Vec::new();
    s.assume(Lit::from_dimacs(1));
    let r = s.test(&mut props);
    assert_eq!(r, 0);
    for want in [1, 2, 4] {
        assert!(
            props.contains(&Lit::from_dimacs(want)),
            "missing propagation {}",
            want
        );
    }
    let mut rs = Vec::new();
    s.reasons(&mut rs, Lit::from_dimacs(4));
    rs.sort();
    assert_eq!(rs, vec![Lit::from_dimacs(2), Lit::from_dimacs(3)]);
    assert_eq!(s.untest(), 0);
}

#[test]
fn test_nested_test_scopes_unsat_units() {
    // the documented discipline: solve consumes untested assumptions,
    // tested ones persist until untest
    let mut s = Solver::new();
    add_clause(&mut s, &[-1, 2]);
    add_clause(&mut s, &[-2, 3]);
    add_clause(&mut s, &[4, 5]); // keeps the test short of a full model
    let mut props = Vec::new();

    s.assume(Lit::from_dimacs(1));
    assert_eq!(s.test(&mut props), 0);
    s.assume(Lit::from_dimacs(-3));
    assert_eq!(s.solve(), -1); // 1 -> 2 -> 3 contradicts -3
    let mut why = Vec::new();
    s.why(&mut why);
    assert!(why.contains(&Lit::from_dimacs(-3)));
    // tested assumption 1 persists, untested -3 was consumed
    assert_eq!(s.untest(), 0);
    s.assume(Lit::from_dimacs(-3));
    assert_eq!(s.solve(), 1);
    assert!(!s.value(Lit::from_dimacs(1)));
}

// A conflict reaching across two test scopes unwinds one derivation per
// untest: each untest returns -1 and leaves the next conflict pending.
#[test]
fn test_cascading_untest_conflicts() {
    // vars: a1=1 a2=2 a3=3 p=4 g=5 h=6 i=7 m=8 s=9 t=10
    let mut s = Solver::new();
    add_clause(&mut s, &[-1, 4]); // a1 -> p
    add_clause(&mut s, &[-3, 5]); // a3 -> g
    add_clause(&mut s, &[-5, 6]); // g -> h
    add_clause(&mut s, &[-5, 7]); // g -> i
    add_clause(&mut s, &[-6, -7, -4]); // h & i clash with p
    add_clause(&mut s, &[3, 8]); // !a3 -> m
    add_clause(&mut s, &[3, 10]); // !a3 -> t
    add_clause(&mut s, &[-8, -4, -10]); // m & t clash with p
    add_clause(&mut s, &[4, 9]); // !p -> s
    add_clause(&mut s, &[-9, 4]); // s -> p
    let mut props = Vec::new();

    // scope 1: a1 propagates p quietly
    s.assume(Lit::from_dimacs(1));
    assert_eq!(s.test(&mut props), 0);
    assert!(props.contains(&Lit::from_dimacs(4)));

    // scope 2: a2 touches nothing
    s.assume(Lit::from_dimacs(2));
    assert_eq!(s.test(&mut props), 0);

    // a3 drives g, h, i into the clash with p
    s.assume(Lit::from_dimacs(3));
    assert_eq!(s.solve(), -1);
    let mut why = Vec::new();
    s.why(&mut why);
    why.sort();
    assert_eq!(why, vec![Lit::from_dimacs(1), Lit::from_dimacs(3)]);

    // first untest: the single derivation learns (!g | !p), whose unit !g
    // is re-pinned at the bookmark; propagating it reaches the m & t side
    // of the clash
    assert_eq!(s.untest(), -1);
    // second untest: deriving once more collapses to the unit !p, whose
    // propagation meets s -> p at level 0
    assert_eq!(s.untest(), -1);

    // the cascade bottomed out in the empty clause
    assert_eq!(s.solve(), -1);
    why.clear();
    s.why(&mut why);
    assert!(why.is_empty(), "no assumptions remain");
}

#[test]
fn test_activation_roundtrip() {
    let mut s = Solver::new();
    add_clause(&mut s, &[-1, 2]);
    // gated clause (x1), enabled only when act is assumed
    s.add(Lit::from_dimacs(1));
    let act = s.activate();

    s.assume(act);
    assert_eq!(s.solve(), 1);
    assert!(s.value(Lit::from_dimacs(1)));
    assert!(s.value(Lit::from_dimacs(2)));

    // the gated clause conflicts with -x2 when enabled
    s.assume(act);
    s.assume(Lit::from_dimacs(-2));
    assert_eq!(s.solve(), -1);
    let mut why = Vec::new();
    s.why(&mut why);
    why.sort();
    let mut want = vec![act, Lit::from_dimacs(-2)];
    want.sort();
    assert_eq!(why, want);

    // deactivated, the same assumptions are satisfiable
    s.deactivate(act);
    s.assume(Lit::from_dimacs(-2));
    assert_eq!(s.solve(), 1);
    assert!(!s.value(Lit::from_dimacs(1)));

    // retired activation literals are recycled
    s.add(Lit::from_dimacs(4));
    let act2 = s.activate();
    assert_eq!(act2, act);
    s.assume(act2);
    assert_eq!(s.solve(), 1);
    assert!(s.value(Lit::from_dimacs(4)));
}

#[test]
fn test_activation_many_toggles() {
    let mut rng = XorShift::new(0xc0ffee);
    let n = 24u64;
    let mut s = Solver::new();
    let (_, hidden) = planted_3cnf(&mut s, n, 30, &mut rng);
    assert_eq!(s.solve(), 1);

    // mirror solver encodes activation by hand with plain gate variables
    let mut m = s.copy();
    let mut gated = Vec::new();
    let mut acts_s = Vec::new();
    let mut acts_m = Vec::new();
    for _ in 0..12 {
        let a = (rng.below(n) + 1) as i32;
        let b = loop {
            let b = (rng.below(n) + 1) as i32;
            if b != a {
                break b;
            }
        };
        let c = loop {
            let c = (rng.below(n) + 1) as i32;
            if c != a && c != b {
                break c;
            }
        };
        // first literal agrees with the planted model, so a gated clause
        // can never collapse to a unit at level 0
        let clause = [
            if hidden[a as usize] { a } else { -a },
            if rng.below(2) == 1 { b } else { -b },
            if rng.below(2) == 1 { c } else { -c },
        ];
        gated.push(clause);
        acts_s.push(Lit::NULL);

        let am = m.new_lit();
        acts_m.push(am);
        add_clause(&mut m, &[clause[0], clause[1], clause[2], -am.dimacs()]);
    }

    let mut active = vec![false; gated.len()];
    for round in 0..64 {
        let j = rng.below(gated.len() as u64) as usize;
        if active[j] {
            s.deactivate(acts_s[j]);
        } else {
            for &l in &gated[j] {
                s.add(Lit::from_dimacs(l));
            }
            acts_s[j] = s.activate();
        }
        active[j] = !active[j];
        for (k, &on) in active.iter().enumerate() {
            if on {
                s.assume(acts_s[k]);
                m.assume(acts_m[k]);
            }
        }
        let (rs, rm) = (s.solve(), m.solve());
        assert_eq!(rs, rm, "round {} diverged", round);
    }
}

#[test]
fn test_reduction_safe_on_hard_unsat() {
    let mut s = Solver::new();
    php(&mut s, 7, 6);
    assert_eq!(s.solve(), -1);
    let mut st = Stats::default();
    s.read_stats(&mut st);
    assert!(st.conflicts > 0);
    assert_eq!(st.unsat, 1);
}

#[test]
fn test_stats_accumulate_and_reset() {
    let mut s = Solver::new();
    add_clause(&mut s, &[1, 2]);
    s.assume(Lit::from_dimacs(1));
    assert_eq!(s.solve(), 1);
    let mut st = Stats::default();
    s.read_stats(&mut st);
    assert_eq!(st.sat, 1);
    assert_eq!(st.assumptions, 1);
    let mut st2 = Stats::default();
    s.read_stats(&mut st2);
    assert_eq!(st2.sat, 0, "cumulative counters reset on read");
}

#[test]
fn test_copy_is_independent() {
    let mut s = Solver::new();
    add_clause(&mut s, &[1, 2]);
    let mut t = s.copy();
    add_clause(&mut t, &[-1]);
    add_clause(&mut t, &[-2]);
    assert_eq!(t.solve(), -1);
    assert_eq!(s.solve(), 1, "original untouched by copy's clauses");
}

// ---- background control ----

#[test]
fn test_go_solve_easy() {
    let mut s = Solver::new();
    bin_chain(&mut s, 4096);
    let mut c = s.go_solve();
    let r = c.try_for(Duration::from_secs(5));
    assert_eq!(r, 1);
    let (solver, r2) = c.unwrap();
    assert_eq!(r2, 1);
    // the chain forces every variable to one value
    let first = solver.value(Lit::from_dimacs(1));
    for i in 2..=4096 {
        assert_eq!(solver.value(Lit::from_dimacs(i)), first, "x{}", i);
    }
}

#[test]
fn test_go_solve_cancel_hard() {
    let mut s = Solver::new();
    php(&mut s, 12, 11);
    let mut c = s.go_solve();
    let (r, finished) = c.poll();
    assert!(!finished && r == 0, "php 12/11 cannot finish instantly");
    let r = c.try_for(Duration::from_millis(50));
    assert_eq!(r, 0, "hard problem must be cancelled, not solved");
    let (solver, _) = c.unwrap();
    // cancellation leaves the solver at its outermost level: no variable
    // assigned
    for i in 1..=solver.max_var().idx() {
        let v = Var::new(i);
        assert!(!solver.value(v.pos()) && !solver.value(v.neg()));
    }
}

#[test]
fn test_go_solve_pause_unpause() {
    let mut s = Solver::new();
    php(&mut s, 12, 11);
    let mut c = s.go_solve();
    for _ in 0..4 {
        match c.pause() {
            None => {}
            Some(r) => panic!("php 12/11 solved unbelievably fast: {}", r),
        }
        let snap = c.snapshot().expect("paused solve must be copyable");
        assert!(snap.max_var().idx() >= 132);
        c.unpause();
    }
    let r = c.stop();
    assert_eq!(r, 0);
}

#[test]
fn test_go_solve_stats_poll() {
    let mut s = Solver::new();
    php(&mut s, 12, 11);
    let mut c = s.go_solve();
    let st = c.stats(Duration::from_secs(10));
    let st = st.expect("stats served at a tick");
    assert!(st.props > 0);
    assert_eq!(c.stop(), 0);
}

#[test]
fn test_solve_then_continue_incrementally() {
    let mut s = Solver::new();
    bin_chain(&mut s, 64);
    let mut c = s.go_solve();
    assert_eq!(c.wait(), 1);
    let (mut s, _) = c.unwrap();
    // knowledge is retained across the background solve
    add_clause(&mut s, &[-4]);
    assert_eq!(s.solve(), 1);
    assert!(!s.value(Lit::from_dimacs(1)));
}

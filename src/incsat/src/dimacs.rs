/*****************************************************************************************[dimacs.rs]
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

//! DIMACS CNF and incremental ICNF parsing.
//!
//! CNF: a `p cnf <vars> <clauses>` header followed by zero-terminated
//! clauses; `c` lines are comments.  ICNF (`p inccnf`): unprefixed
//! zero-terminated groups are permanent clauses; `a`-prefixed groups are
//! one-shot assumptions, and the solver is invoked at each group's
//! terminator.

use crate::inter::{Adder, Assumable, Solvable};
use crate::lit::Lit;
use std::io::{self, BufRead};
use thiserror::Error;

/// Parse failure.  Malformed input carries the 1-based line number; the
/// solver state is not touched by a failing parse step.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("parse error at line {line}: {msg}")]
    Syntax { line: usize, msg: String },
    #[error("read failed: {0}")]
    Io(#[from] io::Error),
}

/// Feed `input` to `solver`.
///
/// With `incremental` false, expects plain CNF; with `strict` also checks
/// the header clause count.  With `incremental` true, expects ICNF and
/// calls `on_result` with the outcome of each `a`-group solve.
pub fn parse<R, S, F>(
    input: &mut R,
    solver: &mut S,
    strict: bool,
    incremental: bool,
    mut on_result: F,
) -> Result<(), ParseError>
where
    R: BufRead,
    S: Adder + Assumable + Solvable,
    F: FnMut(i32),
{
    let mut p = Parser { input, line: 1 };
    let mut num_clauses: i32 = 0;
    let mut num_read: i32 = 0;
    loop {
        p.skip_whitespace()?;
        let ch = match p.peek()? {
            Some(ch) => ch,
            None => break,
        };
        if ch == b'p' {
            if incremental {
                p.skip_line()?;
                continue;
            }
            let mut header = [0; 5];
            p.input.read_exact(&mut header)?;
            if &header != b"p cnf" {
                return Err(p.syntax("expected 'p cnf' header"));
            }
            let _num_vars = p.parse_int()?;
            num_clauses = p.parse_int()?;
        } else if ch == b'c' {
            p.skip_line()?;
        } else if incremental && ch == b'a' {
            p.bump(ch);
            loop {
                let i = p.parse_int()?;
                if i == 0 {
                    break;
                }
                solver.assume(Lit::from_dimacs(i));
            }
            on_result(solver.solve());
        } else {
            p.read_clause(solver)?;
            num_read += 1;
        }
    }
    if strict && !incremental && num_clauses != num_read {
        return Err(p.syntax("header clause count mismatch"));
    }
    Ok(())
}

struct Parser<'a, R: BufRead> {
    input: &'a mut R,
    line: usize,
}

impl<'a, R: BufRead> Parser<'a, R> {
    fn syntax(&self, msg: &str) -> ParseError {
        ParseError::Syntax {
            line: self.line,
            msg: msg.to_string(),
        }
    }

    fn peek(&mut self) -> io::Result<Option<u8>> {
        Ok(self.input.fill_buf()?.first().cloned())
    }

    fn bump(&mut self, ch: u8) {
        self.input.consume(1);
        if ch == b'\n' {
            self.line += 1;
        }
    }

    fn skip_whitespace(&mut self) -> io::Result<()> {
        while let Some(ch) = self.peek()? {
            if !(b'\x09' <= ch && ch <= b'\x0d' || ch == b' ') {
                break;
            }
            self.bump(ch);
        }
        Ok(())
    }

    fn skip_line(&mut self) -> io::Result<()> {
        while let Some(ch) = self.peek()? {
            self.bump(ch);
            if ch == b'\n' {
                break;
            }
        }
        Ok(())
    }

    fn parse_int(&mut self) -> Result<i32, ParseError> {
        self.skip_whitespace()?;
        let neg = match self.peek()? {
            Some(b'+') => {
                self.bump(b'+');
                false
            }
            Some(b'-') => {
                self.bump(b'-');
                true
            }
            _ => false,
        };
        match self.peek()? {
            Some(ch) if ch.is_ascii_digit() => {}
            Some(ch) => {
                return Err(self.syntax(&format!("unexpected character {:?}", ch as char)))
            }
            None => return Err(self.syntax("unexpected end of input")),
        }
        let mut val: i32 = 0;
        while let Some(ch) = self.peek()? {
            if !ch.is_ascii_digit() {
                break;
            }
            self.bump(ch);
            val = val
                .checked_mul(10)
                .and_then(|v| v.checked_add((ch - b'0') as i32))
                .ok_or_else(|| self.syntax("literal out of range"))?;
        }
        Ok(if neg { -val } else { val })
    }

    fn read_clause<S: Adder>(&mut self, solver: &mut S) -> Result<(), ParseError> {
        loop {
            let i = self.parse_int()?;
            if i == 0 {
                solver.add(Lit::NULL);
                return Ok(());
            }
            solver.add(Lit::from_dimacs(i));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::solver::Solver;
    use std::io::Cursor;

    #[derive(Default)]
    struct Recorder {
        clauses: Vec<Vec<i32>>,
        groups: Vec<Vec<i32>>,
        open: Vec<i32>,
        pending: Vec<i32>,
        solves: usize,
    }

    impl Adder for Recorder {
        fn add(&mut self, m: Lit) {
            if m == Lit::NULL {
                self.clauses.push(std::mem::take(&mut self.open));
            } else {
                self.open.push(m.dimacs());
            }
        }
    }
    impl Assumable for Recorder {
        fn assume(&mut self, m: Lit) {
            self.pending.push(m.dimacs());
        }
        fn why(&mut self, _dst: &mut Vec<Lit>) {}
    }
    impl Solvable for Recorder {
        fn solve(&mut self) -> i32 {
            self.groups.push(std::mem::take(&mut self.pending));
            self.solves += 1;
            0
        }
    }

    #[test]
    fn test_cnf() {
        let txt = "c a comment\np cnf 4 2\n1 -2 0\n-3 4 0\n";
        let mut rec = Recorder::default();
        parse(&mut Cursor::new(txt), &mut rec, true, false, |_| {}).unwrap();
        assert_eq!(rec.clauses, vec![vec![1, -2], vec![-3, 4]]);
        assert_eq!(rec.solves, 0);
    }

    #[test]
    fn test_cnf_strict_mismatch() {
        let txt = "p cnf 4 3\n1 -2 0\n-3 4 0\n";
        let mut rec = Recorder::default();
        let e = parse(&mut Cursor::new(txt), &mut rec, true, false, |_| {}).unwrap_err();
        assert!(matches!(e, ParseError::Syntax { .. }));
    }

    #[test]
    fn test_cnf_bad_char_position() {
        let txt = "p cnf 2 1\n1 x 0\n";
        let mut rec = Recorder::default();
        match parse(&mut Cursor::new(txt), &mut rec, false, false, |_| {}) {
            Err(ParseError::Syntax { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected syntax error, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_icnf_groups() {
        let txt = "p inccnf\n55 3 0\n11 \n0\n44 13 0 21\n0\na 5 0\na 3 2\n1 0\n33 2 0\n";
        let mut rec = Recorder::default();
        let mut results = Vec::new();
        parse(&mut Cursor::new(txt), &mut rec, false, true, |r| {
            results.push(r)
        })
        .unwrap();
        assert_eq!(
            rec.clauses,
            vec![vec![55, 3], vec![11], vec![44, 13], vec![21], vec![33, 2]]
        );
        // the second a-group continues across the newline to its terminator
        assert_eq!(rec.groups, vec![vec![5], vec![3, 2, 1]]);
        assert_eq!(results, vec![0, 0]);
    }

    #[test]
    fn test_icnf_drives_solver() {
        // (x1 | x2), then solve under a x1, then add (-x1) and solve under a x1
        let txt = "p inccnf\n1 2 0\na 1 0\n-1 0\na 1 0\n";
        let mut s = Solver::new();
        let mut results = Vec::new();
        parse(&mut Cursor::new(txt), &mut s, false, true, |r| {
            results.push(r)
        })
        .unwrap();
        assert_eq!(results, vec![1, -1]);
    }
}

/*****************************************************************************************[ctl.rs]
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

//! Background solving: a control handle over a solve running in its own
//! thread.
//!
//! The solver observes the handle cooperatively at propagation ticks: a stop
//! flag cancels, a pause flag parks the thread outside the run lock (so the
//! solver can be inspected or copied), and statistics requests are serviced
//! in passing.  The result is delivered once over a single-capacity channel.

use crate::solver::{SolveOut, Solver};
use crate::stats::Stats;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Flags and channels shared with the solving thread, checked at ticks.
pub(crate) struct CtlShared {
    stop: AtomicBool,
    pause: AtomicBool,
    stats_req: AtomicBool,
    stats_tx: Mutex<Sender<Stats>>,
}

impl CtlShared {
    pub(crate) fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }
    pub(crate) fn pause_requested(&self) -> bool {
        self.pause.load(Ordering::Relaxed)
    }
    pub(crate) fn stats_requested(&self) -> bool {
        self.stats_req.swap(false, Ordering::Relaxed)
    }
    pub(crate) fn send_stats(&self, st: Stats) {
        let _ = self.stats_tx.lock().unwrap().send(st);
    }
}

enum CtlMsg {
    Paused,
    Done(i32),
}

/// Handle on a solve running in another thread.
///
/// The solver itself sits behind the run lock; while the solve is running
/// the lock is held, while it is paused or finished the lock is free and
/// the solver can be inspected through [`SolveCtl::with`] or duplicated
/// with [`SolveCtl::snapshot`].
pub struct SolveCtl {
    solver: Arc<Mutex<Solver>>,
    shared: Arc<CtlShared>,
    msg_rx: Receiver<CtlMsg>,
    stats_rx: Receiver<Stats>,
    resume_tx: Sender<()>,
    thread: Option<JoinHandle<()>>,
    done: Option<i32>,
    paused: bool,
}

impl SolveCtl {
    /// Start solving `solver` in a background thread.
    pub(crate) fn spawn(solver: Solver) -> SolveCtl {
        let (stats_tx, stats_rx) = mpsc::channel();
        let (msg_tx, msg_rx) = mpsc::channel();
        let (resume_tx, resume_rx) = mpsc::channel();
        let shared = Arc::new(CtlShared {
            stop: AtomicBool::new(false),
            pause: AtomicBool::new(false),
            stats_req: AtomicBool::new(false),
            stats_tx: Mutex::new(stats_tx),
        });
        let solver = Arc::new(Mutex::new(solver));

        let t_solver = Arc::clone(&solver);
        let t_shared = Arc::clone(&shared);
        let thread = thread::spawn(move || {
            let mut resume = false;
            loop {
                // the run lock is held for the whole solve slice
                let out = {
                    let mut s = t_solver.lock().unwrap();
                    s.run_solve(Some(&t_shared), resume)
                };
                match out {
                    SolveOut::Done(r) => {
                        let _ = msg_tx.send(CtlMsg::Done(r));
                        return;
                    }
                    SolveOut::Paused => {
                        // parked outside the run lock until unpause
                        let _ = msg_tx.send(CtlMsg::Paused);
                        if resume_rx.recv().is_err() {
                            return;
                        }
                        resume = true;
                    }
                }
            }
        });

        SolveCtl {
            solver,
            shared,
            msg_rx,
            stats_rx,
            resume_tx,
            thread: Some(thread),
            done: None,
            paused: false,
        }
    }

    fn note(&mut self, msg: CtlMsg) {
        match msg {
            CtlMsg::Paused => self.paused = true,
            CtlMsg::Done(r) => self.done = Some(r),
        }
    }

    /// Non-blocking check of the result: `(code, finished)`.  The code is 0
    /// while the solve is still running.
    pub fn poll(&mut self) -> (i32, bool) {
        if let Some(r) = self.done {
            return (r, true);
        }
        while let Ok(msg) = self.msg_rx.try_recv() {
            self.note(msg);
        }
        match self.done {
            Some(r) => (r, true),
            None => (0, false),
        }
    }

    /// Block until the solve finishes.  A paused solve is resumed first.
    pub fn wait(&mut self) -> i32 {
        if let Some(r) = self.done {
            return r;
        }
        if self.paused {
            self.unpause();
        }
        while self.done.is_none() {
            match self.msg_rx.recv() {
                Ok(msg) => self.note(msg),
                Err(_) => panic!("solver thread vanished"),
            }
        }
        self.done.unwrap()
    }

    /// Wait up to `timeout` for a result; on expiry cancel the solve and
    /// wait for it to wind down.  Returns 1, -1, or 0 for a cancelled or
    /// unfinished solve.
    pub fn try_for(&mut self, timeout: Duration) -> i32 {
        if let Some(r) = self.done {
            return r;
        }
        let deadline = Instant::now() + timeout;
        while self.done.is_none() {
            let now = Instant::now();
            if now >= deadline {
                return self.stop();
            }
            match self.msg_rx.recv_timeout(deadline - now) {
                Ok(msg) => self.note(msg),
                Err(RecvTimeoutError::Timeout) => return self.stop(),
                Err(RecvTimeoutError::Disconnected) => panic!("solver thread vanished"),
            }
        }
        self.done.unwrap()
    }

    /// Cancel the solve and return its final status: the real result if it
    /// finished first, 0 if the cancellation won.
    pub fn stop(&mut self) -> i32 {
        self.shared.stop.store(true, Ordering::Relaxed);
        self.wait()
    }

    /// Pause the solve at its next tick.  Returns `None` once paused, or
    /// `Some(result)` if the solve finished before pausing.
    pub fn pause(&mut self) -> Option<i32> {
        if let Some(r) = self.done {
            return Some(r);
        }
        if self.paused {
            return None;
        }
        self.shared.pause.store(true, Ordering::Relaxed);
        loop {
            match self.msg_rx.recv() {
                Ok(msg) => self.note(msg),
                Err(_) => panic!("solver thread vanished"),
            }
            if self.paused {
                return None;
            }
            if let Some(r) = self.done {
                self.shared.pause.store(false, Ordering::Relaxed);
                return Some(r);
            }
        }
    }

    /// Resume a paused solve.
    pub fn unpause(&mut self) {
        if !self.paused {
            return;
        }
        self.shared.pause.store(false, Ordering::Relaxed);
        self.paused = false;
        let _ = self.resume_tx.send(());
    }

    /// Whether the handle is currently paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Run `f` on the solver.  Blocks until the run lock is free, so this is
    /// meant for a paused or finished solve (queries, `why`, `value`).
    pub fn with<R>(&self, f: impl FnOnce(&mut Solver) -> R) -> R {
        let mut s = self.solver.lock().unwrap();
        f(&mut s)
    }

    /// An independent copy of the solver.  Only available while the solve is
    /// paused or finished.
    pub fn snapshot(&mut self) -> Option<Solver> {
        let _ = self.poll();
        if self.paused || self.done.is_some() {
            Some(self.with(|s| s.copy()))
        } else {
            None
        }
    }

    /// Ask for statistics and wait up to `timeout`.  Served by the solver at
    /// its next tick, or read directly when the solve is paused or finished.
    pub fn stats(&mut self, timeout: Duration) -> Option<Stats> {
        let _ = self.poll();
        if self.paused || self.done.is_some() {
            let mut st = Stats::default();
            self.with(|s| s.read_stats(&mut st));
            return Some(st);
        }
        self.shared.stats_req.store(true, Ordering::Relaxed);
        let deadline = Instant::now() + timeout;
        loop {
            match self.stats_rx.recv_timeout(Duration::from_millis(1)) {
                Ok(st) => return Some(st),
                Err(RecvTimeoutError::Disconnected) => return None,
                Err(RecvTimeoutError::Timeout) => {}
            }
            let _ = self.poll();
            if self.done.is_some() {
                let mut st = Stats::default();
                self.with(|s| s.read_stats(&mut st));
                return Some(st);
            }
            if Instant::now() >= deadline {
                return None;
            }
        }
    }

    /// Wait for the result and take the solver back out of the handle.
    pub fn unwrap(mut self) -> (Solver, i32) {
        let r = self.wait();
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
        let solver = std::mem::replace(&mut self.solver, Arc::new(Mutex::new(Solver::new())));
        let solver = Arc::try_unwrap(solver)
            .ok()
            .expect("solver still shared")
            .into_inner()
            .unwrap();
        (solver, r)
    }
}

impl Drop for SolveCtl {
    fn drop(&mut self) {
        if self.done.is_none() {
            self.shared.stop.store(true, Ordering::Relaxed);
            if self.paused {
                self.unpause();
            }
        }
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
    }
}

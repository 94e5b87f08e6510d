/*****************************************************************************************[main.rs]
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

extern crate clap;
extern crate flate2;
extern crate incsat;

#[cfg(not(feature = "logging"))]
mod env_logger {
    pub fn init() {}
}

#[cfg(feature = "logging")]
extern crate env_logger;

use clap::{App, Arg};
use flate2::bufread::GzDecoder;
use incsat::{dimacs, GoSolvable, Solver, Stats, Var};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::process::exit;
use std::time::{Duration, Instant};

fn main() {
    env_logger::init();
    let exitcode = main2().unwrap_or_else(|err| {
        eprintln!("{}", err);
        exit(1)
    });
    exit(exitcode);
}

fn main2() -> io::Result<i32> {
    let matches = App::new("incsat")
        .version("0.1.0")
        .about("Incremental CDCL SAT solver")
        .arg(Arg::with_name("input-file").help("cnf or icnf file, optionally gzipped"))
        .arg(
            Arg::with_name("verbosity")
                .long("verb")
                .default_value("1")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("is-strict")
                .long("strict")
                .help("Check the cnf header clause count"),
        )
        .arg(
            Arg::with_name("timeout")
                .long("timeout")
                .help("Give up after this many seconds")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("model")
                .long("model")
                .help("Print the model of a satisfiable cnf"),
        )
        .get_matches();

    let verbosity = matches
        .value_of("verbosity")
        .unwrap()
        .parse::<i32>()
        .unwrap_or(0);
    let is_strict = matches.is_present("is-strict");
    let print_model = matches.is_present("model");
    let timeout = matches
        .value_of("timeout")
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|&t| t > 0.0)
        .map(Duration::from_secs_f64);

    let mut solver = Solver::new();
    let initial_time = Instant::now();

    let input_file = matches.value_of("input-file");
    let incremental = input_file.map_or(false, |f| f.trim_end_matches(".gz").ends_with(".icnf"));

    let parsed = if let Some(input_file) = input_file {
        let file = BufReader::new(File::open(input_file)?);
        read_input_autogz(file, &mut solver, is_strict, incremental)
    } else {
        if verbosity > 0 {
            println!("c Reading from standard input... Use '--help' for help.");
        }
        let stdin = io::stdin();
        let lock = stdin.lock();
        read_input_autogz(lock, &mut solver, is_strict, false)
    };
    if let Err(e) = parsed {
        eprintln!("c {}", e);
        exit(1);
    }

    if verbosity > 0 {
        let duration = initial_time.elapsed();
        println!("c variables              : {}", solver.max_var().idx());
        println!(
            "c parse time             : {}.{:02} s",
            duration.as_secs(),
            duration.subsec_nanos() / 10_000_000
        );
    }

    if incremental {
        // every a-group already reported its own result
        return Ok(0);
    }

    let ret = match timeout {
        None => solver.solve(),
        Some(t) => {
            let mut ctl = solver.go_solve();
            let r = ctl.try_for(t);
            let (s, _) = ctl.unwrap();
            solver = s;
            r
        }
    };

    if verbosity > 0 {
        let mut st = Stats::default();
        solver.read_stats(&mut st);
        println!("c {}", st);
        println!(
            "c total time             : {:.3} s",
            initial_time.elapsed().as_secs_f64()
        );
    }

    if ret == 1 {
        println!("s SATISFIABLE");
        if print_model {
            print!("v ");
            for i in 1..=solver.max_var().idx() {
                let v = Var::new(i);
                if solver.value(v.pos()) {
                    print!("{} ", i);
                } else {
                    print!("-{} ", i);
                }
            }
            println!("0");
        }
    } else if ret == -1 {
        println!("s UNSATISFIABLE");
    } else {
        println!("s UNKNOWN");
    }

    Ok(match ret {
        1 => 10,
        -1 => 20,
        _ => 0,
    })
}

fn read_input_autogz<R: BufRead>(
    mut input: R,
    solver: &mut Solver,
    is_strict: bool,
    incremental: bool,
) -> Result<(), dimacs::ParseError> {
    let is_gz = input.fill_buf()?.starts_with(b"\x1F\x8B");
    if is_gz {
        read_input(
            BufReader::new(GzDecoder::new(input)),
            solver,
            is_strict,
            incremental,
        )
    } else {
        read_input(input, solver, is_strict, incremental)
    }
}

fn read_input<R: BufRead>(
    mut input: R,
    solver: &mut Solver,
    is_strict: bool,
    incremental: bool,
) -> Result<(), dimacs::ParseError> {
    dimacs::parse(&mut input, solver, is_strict, incremental, |r| {
        match r {
            1 => println!("s SATISFIABLE"),
            -1 => println!("s UNSATISFIABLE"),
            _ => println!("s UNKNOWN"),
        };
    })
}

//! SAT interface (C10): decides a DIMACS [`Cnf`] either by shelling out to
//! an external solver binary under a wall-clock timeout, or with a small
//! embedded DPLL solver used as the default and in tests.

use std::io::Write as _;
use std::process::{Command, Stdio};
use std::time::Duration;

use wait_timeout::ChildExt;

use crate::core::error::{ProverError, Result};
use crate::core::smt::bitblaster::Cnf;

/// The outcome of a single SAT call: a satisfying assignment (1-indexed
/// DIMACS variable -> bool) or a proof of unsatisfiability.
#[derive(Debug, Clone)]
pub enum SatOutcome {
    Sat(Vec<bool>),
    Unsat,
}

pub trait SatSolver {
    fn solve(&self, cnf: &Cnf) -> Result<SatOutcome>;
}

/// Spawns a configured external DIMACS-reading SAT binary (e.g. MiniSat,
/// PicoSAT) and parses its output, aborting with [`ProverError::SolverTimeout`]
/// if it doesn't finish within `timeout`.
pub struct ExternalSatSolver {
    pub binary: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl ExternalSatSolver {
    pub fn new(binary: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        ExternalSatSolver { binary: binary.into(), args, timeout }
    }
}

impl SatSolver for ExternalSatSolver {
    fn solve(&self, cnf: &Cnf) -> Result<SatOutcome> {
        let mut input = tempfile::NamedTempFile::new()
            .map_err(|e| ProverError::internal(format!("could not create solver input file: {e}")))?;
        input
            .write_all(cnf.to_dimacs().as_bytes())
            .map_err(|e| ProverError::internal(format!("could not write solver input: {e}")))?;

        let mut child = Command::new(&self.binary)
            .args(&self.args)
            .arg(input.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ProverError::internal(format!("could not spawn solver {}: {e}", self.binary)))?;

        let status = child
            .wait_timeout(self.timeout)
            .map_err(|e| ProverError::internal(format!("error waiting for solver: {e}")))?;

        let Some(_status) = status else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ProverError::SolverTimeout);
        };

        let mut stdout = String::new();
        if let Some(mut out) = child.stdout.take() {
            use std::io::Read;
            out.read_to_string(&mut stdout)
                .map_err(|e| ProverError::internal(format!("could not read solver output: {e}")))?;
        }

        parse_dimacs_output(&stdout, cnf.num_vars)
    }
}

/// Parses a standard SAT-competition-style output: a line starting with
/// `s SATISFIABLE`/`s UNSATISFIABLE`, followed for SAT results by one or
/// more `v ...` lines of signed literals terminated by `0`.
fn parse_dimacs_output(output: &str, num_vars: usize) -> Result<SatOutcome> {
    if output.lines().any(|l| l.trim_start().starts_with("s UNSATISFIABLE")) {
        return Ok(SatOutcome::Unsat);
    }
    if !output.lines().any(|l| l.trim_start().starts_with("s SATISFIABLE")) {
        return Err(ProverError::internal("solver output had no recognizable status line".to_string()));
    }
    let mut assignment = vec![false; num_vars + 1];
    for line in output.lines() {
        let line = line.trim_start();
        let Some(rest) = line.strip_prefix("v ") else { continue };
        for tok in rest.split_whitespace() {
            let Ok(lit) = tok.parse::<i64>() else { continue };
            if lit == 0 {
                continue;
            }
            let var = lit.unsigned_abs() as usize;
            if var <= num_vars {
                assignment[var] = lit > 0;
            }
        }
    }
    Ok(SatOutcome::Sat(assignment))
}

/// A small embedded DPLL solver: unit propagation plus chronological
/// backtracking over the first unassigned variable. Not competitive with
/// a production SAT solver, but sufficient for the module-sized problems
/// this crate's own tests and default configuration target.
#[derive(Debug, Default)]
pub struct DpllSatSolver;

impl SatSolver for DpllSatSolver {
    fn solve(&self, cnf: &Cnf) -> Result<SatOutcome> {
        let mut assignment: Vec<Option<bool>> = vec![None; cnf.num_vars + 1];
        if dpll(&cnf.clauses, &mut assignment) {
            let resolved = assignment.into_iter().map(|v| v.unwrap_or(false)).collect();
            Ok(SatOutcome::Sat(resolved))
        } else {
            Ok(SatOutcome::Unsat)
        }
    }
}

fn dpll(clauses: &[Vec<i64>], assignment: &mut Vec<Option<bool>>) -> bool {
    let mut clauses: Vec<Vec<i64>> = clauses.to_vec();
    if !unit_propagate(&mut clauses, assignment) {
        return false;
    }
    if clauses.is_empty() {
        return true;
    }
    let Some(var) = clauses.iter().flatten().map(|l| l.unsigned_abs() as usize).find(|v| assignment[*v].is_none()) else {
        return true;
    };
    for value in [true, false] {
        let mut trial_assignment = assignment.clone();
        trial_assignment[var] = Some(value);
        let trial_clauses = simplify_clauses(&clauses, var, value);
        if let Some(mut trial_clauses) = trial_clauses {
            if dpll(&mut trial_clauses, &mut trial_assignment) {
                *assignment = trial_assignment;
                return true;
            }
        }
    }
    false
}

/// Repeatedly fixes unit clauses until none remain; returns `false` if a
/// conflict (an empty clause) is produced.
fn unit_propagate(clauses: &mut Vec<Vec<i64>>, assignment: &mut [Option<bool>]) -> bool {
    loop {
        let unit = clauses.iter().find(|c| c.len() == 1).map(|c| c[0]);
        let Some(lit) = unit else { return true };
        let var = lit.unsigned_abs() as usize;
        assignment[var] = Some(lit > 0);
        match simplify_clauses(clauses, var, lit > 0) {
            Some(next) => *clauses = next,
            None => return false,
        }
    }
}

/// Removes every clause satisfied by `var = value`, and drops the
/// falsified literal from the rest. Returns `None` on an empty (conflict)
/// clause.
fn simplify_clauses(clauses: &[Vec<i64>], var: usize, value: bool) -> Option<Vec<Vec<i64>>> {
    let satisfying_lit = if value { var as i64 } else { -(var as i64) };
    let mut out = Vec::with_capacity(clauses.len());
    for clause in clauses {
        if clause.contains(&satisfying_lit) {
            continue;
        }
        let reduced: Vec<i64> = clause.iter().copied().filter(|l| l.unsigned_abs() as usize != var).collect();
        if reduced.is_empty() && !clause.is_empty() {
            return None;
        }
        out.push(reduced);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dpll_finds_satisfying_assignment() {
        let cnf = Cnf { num_vars: 2, clauses: vec![vec![1, 2], vec![-1, 2]] };
        let outcome = DpllSatSolver.solve(&cnf).unwrap();
        match outcome {
            SatOutcome::Sat(model) => assert!(model[2]),
            SatOutcome::Unsat => panic!("expected satisfiable"),
        }
    }

    #[test]
    fn dpll_detects_unsatisfiability() {
        let cnf = Cnf { num_vars: 1, clauses: vec![vec![1], vec![-1]] };
        let outcome = DpllSatSolver.solve(&cnf).unwrap();
        assert!(matches!(outcome, SatOutcome::Unsat));
    }
}

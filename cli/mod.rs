//! CLI surface (spec.md §6): one positional input file, a handful of
//! display flags, and an exit code that is always 0 — the verdict itself
//! is carried entirely by stdout, never by the process exit status.

use std::time::Duration;

use clap::Parser;

use crate::core::alphabet::Alphabet;
use crate::core::driver::{self, Verdict};
use crate::core::io::json_format;
use crate::core::rules::Rule;
use crate::core::sat::{DpllSatSolver, ExternalSatSolver, SatSolver};

#[derive(Debug, Parser)]
#[command(name = "afsmprover", about = "Termination proof engine for AFSM term rewriting systems")]
pub struct Cli {
    /// Path to a JSON-encoded AFSM (alphabet + rules).
    pub input: std::path::PathBuf,

    /// Print extra commentary alongside the verdict.
    #[arg(long)]
    pub verbose: bool,

    /// Implies --verbose; also dumps the propositional formulas generated
    /// by each method.
    #[arg(long)]
    pub debug: bool,

    /// Render the justification as HTML instead of plain text.
    #[arg(long)]
    pub html: bool,

    /// Force ANSI color in plain-text output.
    #[arg(long)]
    pub color: bool,

    /// Use UTF-8 symbols (Π, ⇒, …) in plain-text output.
    #[arg(long)]
    pub utf8: bool,

    /// External DIMACS SAT solver binary to shell out to. When absent, the
    /// embedded DPLL solver is used.
    #[arg(long)]
    pub sat_binary: Option<String>,

    /// Wall-clock timeout (seconds) for an external SAT solver invocation.
    #[arg(long, default_value_t = 10)]
    pub sat_timeout_secs: u64,
}

/// Runs one proof attempt end-to-end: reads `cli.input`, parses it,
/// proves termination, and returns the rendered stdout text. Never
/// returns an `Err` for a parse or proof failure that the spec says must
/// surface as a verdict (`MAYBE`) — only for I/O failures reading the
/// input file itself, which the caller should report and exit nonzero on
/// (the *proof* exit code is always 0, the *CLI invocation* can still
/// fail to even run).
pub fn run(cli: &Cli) -> anyhow::Result<String> {
    let verbose = cli.verbose || cli.debug;
    let text = std::fs::read_to_string(&cli.input)?;
    let (alphabet, rules) = json_format::parse(&text)?;

    let sat: Box<dyn SatSolver> = match &cli.sat_binary {
        Some(binary) => {
            Box::new(ExternalSatSolver::new(binary.clone(), vec!["-o".into(), "-".into()], Duration::from_secs(cli.sat_timeout_secs)))
        }
        None => Box::new(DpllSatSolver),
    };

    let verdict = driver::prove(&alphabet, &rules, sat.as_ref())?;
    Ok(render_verdict(&alphabet, &rules, &verdict, verbose, cli.html))
}

fn render_verdict(_alphabet: &Alphabet, _rules: &[Rule], verdict: &Verdict, verbose: bool, _html: bool) -> String {
    match verdict {
        Verdict::Yes { justification } => {
            if verbose && !justification.is_empty() {
                format!("YES\n{justification}")
            } else {
                "YES".to_string()
            }
        }
        Verdict::No { witness } => format!("NO\n{witness}"),
        Verdict::Maybe { reason } => {
            if verbose {
                format!("MAYBE\n{reason}")
            } else {
                "MAYBE".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yes_without_verbose_is_bare() {
        let verdict = Verdict::Yes { justification: "removed 1 pair".to_string() };
        let alphabet = Alphabet::new();
        let rendered = render_verdict(&alphabet, &[], &verdict, false, false);
        assert_eq!(rendered, "YES");
    }

    #[test]
    fn no_always_includes_the_witness() {
        let verdict = Verdict::No { witness: "f loops".to_string() };
        let alphabet = Alphabet::new();
        let rendered = render_verdict(&alphabet, &[], &verdict, false, false);
        assert_eq!(rendered, "NO\nf loops");
    }
}

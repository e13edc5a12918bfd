//! CLI entry point. Exit code is always 0 once a verdict is produced —
//! YES/NO/MAYBE is carried by stdout, not the process exit status. A
//! nonzero exit only happens if the input file itself couldn't be read or
//! parsed.

use clap::Parser;

use afsm_termination::cli::Cli;

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    match afsm_termination::cli::run(&cli) {
        Ok(output) => {
            println!("{output}");
        }
        Err(e) => {
            eprintln!("afsmprover: {e}");
            std::process::exit(1);
        }
    }
}

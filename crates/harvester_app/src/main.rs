mod cli;
mod config;
mod run;

use clap::Parser;

use crate::cli::Cli;

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run::run(cli) {
        eprintln!("harvester error: {:#}", err);
        std::process::exit(1);
    }
}

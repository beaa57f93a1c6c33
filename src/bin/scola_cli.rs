use std::{env, process};

use scola_ledger::{
    cli::{self, output, CliError},
    init,
    scola_config::ConfigManager,
    SchoolLedgerManager,
};

fn main() {
    init();

    if let Err(err) = run() {
        output::error(&err);
        if matches!(err, CliError::Usage(_)) {
            eprintln!("{}", cli::USAGE);
        }
        process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    let config = ConfigManager::from_env()
        .load()
        .map_err(scola_ledger::SchoolError::from)?;
    let manager = SchoolLedgerManager::from_config(&config)?;
    cli::run(env::args().skip(1), &manager, &config)
}

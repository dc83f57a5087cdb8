use std::fs::File;

use anyhow::{Context, Result};
use flado_ledger::bin_utils::{Service, ServiceError};
use tracing::warn;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let filename = std::env::args()
        .nth(1)
        .context("Expected a command script as the first argument")?;
    let file = File::open(&filename).with_context(|| format!("Failed to open `{filename}`"))?;

    let service = Service {
        input: file,
        output: &mut std::io::stdout(),
        error_printer: Box::new(|line, err| match err {
            // the script was valid, the bank refused the operation
            ServiceError::Bank(err) => warn!(line, %err, "Operation rejected"),
            err => eprintln!("Error at line {line}: {err}"),
        }),
    };
    service.run()
}

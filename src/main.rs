use std::io::{self, BufRead, Write};

use anyhow::Context;
use stateful_service::{dispatch_line, logging, EnvConfig, Outcome, StateService};
use tracing::info;

fn main() -> anyhow::Result<()> {
    let config = EnvConfig::from_env();
    logging::init(&config.log_filter)?;

    let service = StateService::boot(&config)
        .with_context(|| format!("booting on {}", config.data_dir.display()))?;
    info!(
        container = %service.instance(),
        data_dir = %config.data_dir.display(),
        "accepting requests on stdin"
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line.context("reading request line")?;
        if line.trim().is_empty() {
            continue;
        }

        match dispatch_line(&service, &line) {
            Outcome::Reply(response) => {
                writeln!(stdout, "{response}").context("writing response")?;
                stdout.flush().context("flushing response")?;
            }
            Outcome::Terminate {
                response,
                exit_code,
            } => {
                let _ = writeln!(stdout, "{response}");
                let _ = stdout.flush();
                // No destructors, no shutdown: only what is already on the volume survives.
                std::process::exit(exit_code);
            }
        }
    }

    info!(
        requests = service.requests_this_instance(),
        "stdin closed; shutting down"
    );
    Ok(())
}

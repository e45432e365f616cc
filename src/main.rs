/*!
 * HoneyProc Monitor - Main Entry Point
 *
 * Watches a decoy process for code injection:
 * - Takes a baseline snapshot of its address space
 * - Re-snapshots every scan interval
 * - Raises an alert on the first difference
 */

use anyhow::{Context, Result};
use tracing::{error, info};

use honeyproc::core::types::Pid;
use honeyproc::{
    init_tracing, JsonAlertSink, Monitor, MonitorConfig, MonitorOutcome, ProcMapsSource,
    TracingAlertSink,
};

fn print_usage() {
    eprintln!("usage: honeyproc-monitor <pid_of_decoy_to_monitor>");
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let Some(arg) = std::env::args().nth(1) else {
        print_usage();
        std::process::exit(2);
    };
    let pid: Pid = arg
        .parse()
        .with_context(|| format!("invalid pid '{}'", arg))?;

    let config = MonitorConfig::from_env(pid)?;
    info!(pid, "HoneyProc monitor starting");

    let source = ProcMapsSource::for_pid(pid);
    let outcome = if config.json_alerts {
        Monitor::new(source, config, JsonAlertSink::stdout())?
            .run()
            .await?
    } else {
        Monitor::new(source, config, TracingAlertSink)?
            .run()
            .await?
    };

    match outcome {
        MonitorOutcome::Detected { cycle, diff } => {
            error!(pid, cycle, diff = %diff, "Injection detected, monitor stopping");
            std::process::exit(1);
        }
        MonitorOutcome::CycleLimit { cycles } => {
            info!(pid, cycles, "No injection detected");
        }
        MonitorOutcome::ProcessExited { cycles } => {
            info!(pid, cycles, "Decoy process exited");
        }
        MonitorOutcome::Interrupted { cycles } => {
            info!(pid, cycles, "Monitor interrupted");
        }
    }

    Ok(())
}

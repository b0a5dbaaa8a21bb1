//! ssm-replay — command-line driver for the SSM alignment kernel.
//!
//! Loads an envelope file, replays it deterministically, and prints
//! the trace, scoreboard and hash chain. Also verifies envelopes
//! against a saved report and compares two envelope files.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use ssm_runtime::audit::{compare_replays, verify_determinism, verify_recorded_chain};
use ssm_runtime::config::RuntimeConfig;
use ssm_runtime::loader::load_envelopes;
use ssm_runtime::replay::replay_file;
use ssm_runtime::report::{load_report, save_report, ReplayReport};
use ssm_runtime::{logging, scoreboard};

#[derive(Parser)]
#[command(name = "ssm-replay", version, about = "Deterministic alignment + Quero replay")]
struct Cli {
    /// Override the log level (EnvFilter directive).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay an envelope file and print trace, scoreboard and chain.
    Replay {
        envelopes: PathBuf,
        /// Write a JSON replay report for later verification.
        #[arg(long)]
        export: Option<PathBuf>,
        /// Skip the per-envelope global trace.
        #[arg(long)]
        no_trace: bool,
        /// Print per-thread traces.
        #[arg(long)]
        threads: bool,
        /// Skip the hash chain listing.
        #[arg(long)]
        no_chain: bool,
    },
    /// Verify an envelope file against the chain in a saved report.
    Verify { envelopes: PathBuf, report: PathBuf },
    /// Replay twice and require identical chains.
    Determinism { envelopes: PathBuf },
    /// Compare the replays of two envelope files.
    Compare { a: PathBuf, b: PathBuf },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match RuntimeConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ssm-replay: {e}");
            return ExitCode::from(2);
        }
    };
    if let Some(level) = &cli.log_level {
        config.log.level = level.clone();
    }
    logging::init_cli(&config.log);

    match run(cli.command, &config) {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            eprintln!("ssm-replay: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(command: Command, config: &RuntimeConfig) -> Result<ExitCode> {
    match command {
        Command::Replay {
            envelopes,
            export,
            no_trace,
            threads,
            no_chain,
        } => {
            let run = replay_file(&envelopes)
                .with_context(|| format!("replay of {} failed", envelopes.display()))?;

            if !run.stream.arrived_in_order {
                println!("*** WARNING: Replay inconsistency detected ***");
                println!("Envelopes arrived out of order; engine sorted deterministically.\n");
            } else {
                println!("Replay integrity: OK (strictly ordered)\n");
            }

            if config.output.show_trace && !no_trace {
                println!("{}", scoreboard::render_trace(&run.output.global_trace));
            }
            if config.output.show_threads || threads {
                println!("{}", scoreboard::render_threads(&run.output));
            }
            println!("{}", scoreboard::render_summary(&run.output));
            if config.output.show_chain && !no_chain {
                println!("{}", scoreboard::render_chain(&run.output.hash_chain));
            }

            if let Some(path) = export {
                let report = ReplayReport::new(run.output, run.stream.arrived_in_order)?;
                save_report(&path, &report)
                    .with_context(|| format!("failed to export report to {}", path.display()))?;
                println!("Report written to {}", path.display());
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Verify { envelopes, report } => {
            let stream = load_envelopes(&envelopes)?;
            let report = load_report(&report)
                .with_context(|| format!("cannot use report {}", report.display()))?;
            match verify_recorded_chain(&stream.envelopes, &report.output.hash_chain) {
                Ok(v) => {
                    println!("Chain verified: {} links match (head {})", v.checked, report.chain_head);
                    Ok(ExitCode::SUCCESS)
                }
                Err(violation) => {
                    println!("{violation}");
                    Ok(ExitCode::from(1))
                }
            }
        }

        Command::Determinism { envelopes } => {
            let stream = load_envelopes(&envelopes)?;
            let head = verify_determinism(&stream.envelopes)?;
            println!("Deterministic: two replays agree (head {head})");
            Ok(ExitCode::SUCCESS)
        }

        Command::Compare { a, b } => {
            let run_a = replay_file(&a).with_context(|| format!("replay of {} failed", a.display()))?;
            let run_b = replay_file(&b).with_context(|| format!("replay of {} failed", b.display()))?;
            let report = compare_replays(&run_a.output, &run_b.output);
            info!(identical = report.is_identical(), "comparison complete");

            println!("Envelopes        : {} vs {}", report.envelope_count_a, report.envelope_count_b);
            println!("Threads          : {} vs {}", report.thread_count_a, report.thread_count_b);
            println!(
                "Final GLOBAL a_out: {:+.6} vs {:+.6} (delta {:+.6})",
                report.final_a_out_a, report.final_a_out_b, report.final_a_out_delta
            );
            println!(
                "Final GLOBAL q_out: {:+.6} vs {:+.6} (delta {:+.6})",
                report.final_q_out_a, report.final_q_out_b, report.final_q_out_delta
            );
            if !report.added_threads.is_empty() {
                println!("Threads only in B: {}", report.added_threads.join(", "));
            }
            if !report.removed_threads.is_empty() {
                println!("Threads only in A: {}", report.removed_threads.join(", "));
            }
            if !report.shifted_threads.is_empty() {
                println!("Threads shifted  : {}", report.shifted_threads.join(", "));
            }
            match report.first_chain_divergence {
                Some(pos) => println!("Chains diverge at link {pos}"),
                None => println!("Chains identical"),
            }
            Ok(if report.is_identical() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            })
        }
    }
}

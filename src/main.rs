//! fleetkey - declarative SSH access generator
//!
//! Reads a YAML inventory and writes the SSH client config plus one
//! authorized_keys file per enabled server, then reports the server list to
//! the CI pipeline.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use fleetkey::{
    cli::{Cli, Command},
    config::Config,
    output::OutputPlan,
    setup_tracing,
    summary::{self, StdoutSink, StepOutputSink, SummarySink},
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup tracing
    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    match cli.command {
        Some(Command::Check) => run_check(&cli.config),
        Some(Command::Generate { output }) => run_generate(&cli.config, output),
        None => run_generate(&cli.config, None),
    }
}

/// Generate all outputs and report the server summary
fn run_generate(config_path: &Path, output_override: Option<PathBuf>) -> ExitCode {
    let config = match Config::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Render everything before the first write so a bad key reference
    // cannot leave a half-updated output directory
    let plan = match OutputPlan::build(&config) {
        Ok(plan) => plan,
        Err(e) => {
            error!("Generation failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    let out_dir = output_override.unwrap_or_else(|| PathBuf::from(&config.output.directory));
    let written = match plan.write(&out_dir) {
        Ok(written) => written,
        Err(e) => {
            error!("Failed to write outputs: {e}");
            return ExitCode::FAILURE;
        }
    };

    for path in &written {
        println!("✓ Generated {}", path.display());
    }

    emit_summary(&config)
}

/// Emit the `servers=<json>` line to stdout and the CI step-output file
fn emit_summary(config: &Config) -> ExitCode {
    let records = summary::server_records(config);
    let line = match summary::summary_line(&records) {
        Ok(line) => line,
        Err(e) => {
            error!("Failed to serialize summary: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut sinks: Vec<Box<dyn SummarySink>> = vec![Box::new(StdoutSink)];
    if let Some(step_output) = StepOutputSink::from_env() {
        sinks.push(Box::new(step_output));
    }

    for sink in &mut sinks {
        if let Err(e) = sink.emit(&line) {
            error!("Failed to emit summary: {e}");
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}

/// Strict-validate the inventory without writing anything
fn run_check(config_path: &Path) -> ExitCode {
    let config = match Config::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut failed = false;

    // Unknown access targets degrade silently during generation; here a
    // typo is a finding
    for finding in fleetkey::access::unknown_targets(&config) {
        eprintln!("❌ {finding}");
        failed = true;
    }

    // Every key reference must resolve, including for disabled people
    for (name, person) in &config.people {
        if let Err(e) = person.keys.resolve() {
            eprintln!("❌ person {name}: {e}");
            failed = true;
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        println!(
            "✓ {} people, {} groups, {} servers - inventory is consistent",
            config.people.len(),
            config.groups.len(),
            config.servers.len()
        );
        ExitCode::SUCCESS
    }
}

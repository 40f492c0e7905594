//! mabos CLI: validate and run multi-agent scenarios.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use mabos::event::{JsonSink, LogSink};
use mabos::scenario::Scenario;

#[derive(Parser)]
#[command(name = "mabos", version, about = "BDI deliberation kernel for multi-agent systems")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a scenario file and print what it declares.
    Validate {
        /// Path to the scenario TOML.
        file: PathBuf,
    },

    /// Run a scenario for a number of ticks.
    Run {
        /// Path to the scenario TOML.
        file: PathBuf,

        /// Number of ticks to run.
        #[arg(long, default_value = "10")]
        ticks: u64,

        /// Emit events as NDJSON on stdout and finish with the world as JSON.
        #[arg(long)]
        json: bool,

        /// Deliberate agents in parallel, overriding the scenario setting.
        #[arg(long)]
        parallel: bool,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { file } => {
            let scenario = Scenario::load(&file)?;
            let scheduler = scenario.build()?;
            println!("{}: ok", file.display());
            println!("  agents: {}", scheduler.len());
            println!("  plans:  {}", scheduler.plan_library().len());
            println!("  rules:  {}", scheduler.reasoning().len());
            println!(
                "  world:  {} variables, {} relations",
                scheduler.world().variables().len(),
                scheduler.world().relations().len()
            );
            for agent in scheduler.agents() {
                println!(
                    "  - {} ({} desires, {} goals)",
                    agent.id(),
                    agent.desires().len(),
                    agent.goals().len()
                );
            }
        }

        Commands::Run {
            file,
            ticks,
            json,
            parallel,
        } => {
            let mut scenario = Scenario::load(&file)?;
            if parallel {
                scenario.scheduler.parallel = true;
            }
            let scheduler = scenario.build()?;
            let mut scheduler = if json {
                scheduler.with_sink(Arc::new(JsonSink))
            } else {
                scheduler.with_sink(Arc::new(LogSink))
            };

            for report in scheduler.run(ticks) {
                if !json {
                    println!(
                        "tick {}: {} mutations, {} messages, {} events",
                        report.tick,
                        report.applied.len(),
                        report.messages.len(),
                        report.events.len()
                    );
                }
            }

            if json {
                let world = serde_json::to_string(scheduler.world()).into_diagnostic()?;
                println!("{world}");
            } else {
                for agent in scheduler.agents() {
                    let goals: Vec<&str> = agent.goals().iter().map(|g| g.id.as_str()).collect();
                    println!("{}: pending goals [{}]", agent.id(), goals.join(", "));
                }
            }
        }
    }

    Ok(())
}

use anyhow::Context;
use clap::{Parser, Subcommand};
use dataflow_planner::config::{ForwardingDestination, ForwardingPolicy, SelfMatchPolicy};
use dataflow_planner::graph::{compute_dangling_outputs, verify_workflow};
use dataflow_planner::render::{self, Format};
use dataflow_planner::spec::Workflow;
use dataflow_planner::{PlannerConfig, plan_workflow};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "dataflow-planner")]
#[command(about = "Plan and validate data-flow workflows", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the full connection graph and write it out.
    Plan {
        #[arg(long)]
        workflow: String,

        /// Planner configuration (JSON). Environment variables are layered on top.
        #[arg(long)]
        config: Option<String>,

        #[arg(short = 'o', long)]
        out: Option<String>,

        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,

        #[arg(long)]
        forwarding_policy: Option<ForwardingPolicy>,

        #[arg(long)]
        forwarding_destination: Option<ForwardingDestination>,

        /// Refuse to connect a node's inputs to its own outputs.
        #[arg(long)]
        forbid_self_match: bool,
    },
    /// Structural checks only (names, options, input specs).
    Validate {
        #[arg(long)]
        workflow: String,
    },
    /// List outputs no other node consumes.
    Dangling {
        #[arg(long)]
        workflow: String,
    },
}

fn read_workflow(path: &str) -> Result<Workflow> {
    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read workflow {path}"))?;
    Workflow::from_json(&text).with_context(|| format!("failed to parse workflow {path}"))
}

fn load_config(path: Option<&str>) -> Result<PlannerConfig> {
    let base = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("failed to read config {path}"))?;
            PlannerConfig::from_json(&text).with_context(|| format!("failed to parse config {path}"))?
        }
        None => PlannerConfig::default(),
    };
    Ok(base.with_process_env()?)
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Plan {
            workflow,
            config,
            out,
            format,
            forwarding_policy,
            forwarding_destination,
            forbid_self_match,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(policy) = forwarding_policy {
                config.forwarding_policy = policy;
            }
            if let Some(destination) = forwarding_destination {
                config.forwarding_destination = destination;
            }
            if forbid_self_match {
                config.self_match = SelfMatchPolicy::Forbid;
            }

            let plan = plan_workflow(read_workflow(&workflow)?, &config)?;
            let rendered = render::render(&plan, format)?;
            match out {
                Some(out) => {
                    std::fs::write(&out, rendered).with_context(|| format!("failed to write {out}"))?;
                    println!("Wrote {}", out);
                }
                None => print!("{rendered}"),
            }
        }
        Commands::Validate { workflow } => {
            let workflow = read_workflow(&workflow)?;
            verify_workflow(&workflow.nodes)?;
            println!("{} nodes OK", workflow.nodes.len());
        }
        Commands::Dangling { workflow } => {
            let workflow = read_workflow(&workflow)?;
            for input in compute_dangling_outputs(&workflow.nodes) {
                println!("{}\t{}", input.binding, input.describe());
            }
        }
    }

    Ok(())
}

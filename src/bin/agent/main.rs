mod replay;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use phone_pilot::config::OracleConfig;
use phone_pilot::types::MAX_STEPS_PER_TASK;
use phone_pilot::{
    Agent, AgentConfig, AgentState, AppDirectory, Brain, DecisionOracle, PlanBuilder,
    SerializerConfig, TreeSerializer,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "agent", about = "Drive a phone UI towards a goal with an LLM")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the compressed form of a recorded window tree.
    Serialize {
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long, default_value_t = 80)]
        max_text: usize,
    },
    /// Print the step list for a command.
    Plan {
        command: String,
        /// Skip the model and use the built-in templates.
        #[arg(long)]
        offline: bool,
    },
    /// Run the decision loop against a recorded window tree.
    Run {
        goal: String,
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long, default_value_t = MAX_STEPS_PER_TASK)]
        max_steps: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Serialize { snapshot, max_text } => {
            let host = replay::ReplayHost::load(&snapshot)?;
            let serializer = TreeSerializer::new(SerializerConfig {
                max_text_len: max_text,
                ..Default::default()
            });
            println!("{}", serializer.serialize(host.snapshot()));
        }
        Command::Plan { command, offline } => {
            let oracle = if offline { None } else { oracle() };
            let planner = PlanBuilder::new(oracle, AppDirectory::default());
            let plan = planner.build_plan(&command).await;
            if plan.is_empty() {
                anyhow::bail!("no plan for '{}'", command);
            }
            for step in &plan {
                println!("{}", step.to_line());
            }
        }
        Command::Run {
            goal,
            snapshot,
            max_steps,
        } => {
            let host = Arc::new(replay::ReplayHost::load(&snapshot)?);
            let brain: Arc<dyn DecisionOracle> = Arc::new(Brain::new(OracleConfig::from_env()?)?);
            let mut agent = Agent::new(
                host,
                brain,
                AgentConfig {
                    max_steps,
                    ..Default::default()
                },
            );

            let cancel = agent.cancellation_token();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("[agent] Ctrl-C, stopping after the current step");
                    cancel.cancel();
                }
            });

            let mut states = agent.subscribe();
            tokio::spawn(async move {
                while states.changed().await.is_ok() {
                    let state = states.borrow_and_update().clone();
                    if let AgentState::Executing {
                        step,
                        total,
                        description,
                    } = state
                    {
                        info!("[agent] step {}/{}: {}", step, total, description);
                    }
                }
            });

            let outcome = agent.run(&goal).await;
            for done in agent.executed_steps() {
                println!("{} => {:?}", done.step.to_line(), done.result);
            }
            match outcome {
                AgentState::Success => println!("Task complete."),
                AgentState::Error(message) => anyhow::bail!("task failed: {}", message),
                other => anyhow::bail!("run ended in unexpected state {:?}", other),
            }
        }
    }

    Ok(())
}

fn oracle() -> Option<Arc<dyn DecisionOracle>> {
    match OracleConfig::from_env().map_err(anyhow::Error::from).and_then(|c| Ok(Brain::new(c)?)) {
        Ok(brain) => Some(Arc::new(brain)),
        Err(e) => {
            warn!("[agent] no model available ({}), using templates", e);
            None
        }
    }
}

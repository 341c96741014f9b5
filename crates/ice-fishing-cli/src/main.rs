use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use ice_fishing_core::config::{PolicyKind, SimConfig};
use ice_fishing_core::world::{run_replicates, RunSummary, World};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyArg {
    Random,
    Imitator,
    GreedyBayes,
    BeliefSoftmax,
}

impl From<PolicyArg> for PolicyKind {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Random => PolicyKind::Random,
            PolicyArg::Imitator => PolicyKind::Imitator,
            PolicyArg::GreedyBayes => PolicyKind::GreedyBayes,
            PolicyArg::BeliefSoftmax => PolicyKind::BeliefSoftmax,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Run the ice-fishing forager simulation")]
struct Args {
    /// JSON config file; missing fields take their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = 1000)]
    steps: usize,

    #[arg(long, default_value_t = 100)]
    sample_every: usize,

    /// Overrides the config seed.
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,

    #[arg(long)]
    agents: Option<usize>,

    /// Independent runs with seeds derived from the base seed.
    #[arg(long, default_value_t = 1)]
    replicates: usize,

    /// Write the run summary (or list of summaries) as JSON.
    #[arg(long)]
    output: Option<PathBuf>,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn load_config(args: &Args) -> Result<SimConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => SimConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(policy) = args.policy {
        config.policy = policy.into();
    }
    if let Some(agents) = args.agents {
        config.num_agents = agents;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn replicate_seeds(base: u64, count: usize) -> Vec<u64> {
    let mut rng = ChaCha12Rng::seed_from_u64(base);
    (0..count).map(|_| rng.random::<u64>()).collect()
}

fn print_summary(summary: &RunSummary) {
    println!(
        "seed={} policy={:?} steps={} total_catch={} resource_remaining={}",
        summary.seed,
        summary.policy,
        summary.steps,
        summary.final_total_catch,
        summary.resource_remaining
    );
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let config = load_config(&args)?;
    anyhow::ensure!(args.replicates > 0, "--replicates must be positive");

    let json = if args.replicates == 1 {
        let mut world = World::try_new(config)?;
        let summary = world.try_run_experiment(args.steps, args.sample_every)?;
        print_summary(&summary);
        serde_json::to_string_pretty(&summary)?
    } else {
        let seeds = replicate_seeds(config.seed, args.replicates);
        info!(replicates = seeds.len(), "running replicates");
        let summaries = run_replicates(&config, &seeds, args.steps, args.sample_every)?;
        for summary in &summaries {
            print_summary(summary);
        }
        serde_json::to_string_pretty(&summaries)?
    };

    if let Some(path) = &args.output {
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "summary written");
    }
    Ok(())
}

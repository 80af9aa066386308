use anyhow::Result;
use clap::Parser;

use dcsbm_community::community::assignment::build_communities;
use dcsbm_community::config::{InferenceConfig, BP_MAX_SWEEPS, EM_MAX_STEPS};
use dcsbm_community::data::{self, metadata::CategoryIndex};
use dcsbm_community::error::InferenceError;
use dcsbm_community::{inference, storage};

#[derive(Parser, Debug)]
#[clap(
    name = "dcsbm-community",
    about = "EM/BP community detection with the degree-corrected SBM and categorical metadata"
)]
struct Cli {
    /// Path to the network: a GML file or a Parquet edge table
    #[clap(long)]
    input: String,

    /// Parquet table with `Id` and `Label` columns (Parquet input only)
    #[clap(long)]
    labels: Option<String>,

    /// Number of groups
    #[clap(long, short = 'k', default_value = "2")]
    groups: usize,

    /// Seed for the initial values (random if omitted)
    #[clap(long)]
    seed: Option<u64>,

    /// BP convergence tolerance
    #[clap(long, default_value = "1e-4")]
    bp_tolerance: f64,

    /// Maximum BP sweeps per EM step
    #[clap(long, default_value_t = BP_MAX_SWEEPS)]
    bp_max_sweeps: usize,

    /// EM convergence tolerance
    #[clap(long, default_value = "1e-4")]
    em_tolerance: f64,

    /// Maximum EM steps
    #[clap(long, default_value_t = EM_MAX_STEPS)]
    em_max_steps: usize,

    /// Fail when BP or EM does not converge
    #[clap(long)]
    strict: bool,

    /// Output file for the marginals (stdout if omitted)
    #[clap(long)]
    output: Option<String>,

    /// Output path for a JSON summary of the run
    #[clap(long)]
    summary: Option<String>,

    /// Number of worker threads (0 = use all available cores)
    #[clap(long, default_value = "0")]
    threads: usize,

    /// Verbose logging
    #[clap(long, short)]
    verbose: bool,
}

fn run(args: Cli) -> Result<()> {
    let num_threads = if args.threads > 0 {
        args.threads
    } else {
        num_cpus::get()
    };

    log::info!("Using {} worker threads", num_threads);
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()?;

    let graph = data::load_network(&args.input, args.labels.as_deref())?;
    let categories = CategoryIndex::from_graph(&graph);

    let config = InferenceConfig {
        groups: args.groups,
        bp_tolerance: args.bp_tolerance,
        bp_max_sweeps: args.bp_max_sweeps,
        em_tolerance: args.em_tolerance,
        em_max_steps: args.em_max_steps,
        seed: args.seed,
        strict_convergence: args.strict,
    };

    let result = inference::infer(&graph, &categories, &config)?;

    storage::save_marginals(args.output.as_deref(), &categories, &result)?;

    if let Some(summary) = args.summary.as_deref() {
        let communities = build_communities(&graph, &categories, &result);
        storage::save_summary(summary, &graph, &categories, &result, &communities)?;
    }

    Ok(())
}

fn main() {
    let args = Cli::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();

    if let Err(err) = run(args) {
        log::error!("{:#}", err);
        let code = err
            .downcast_ref::<InferenceError>()
            .map_or(1, InferenceError::exit_code);
        std::process::exit(code);
    }
}

use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use log::{error, info};

use u_shm_anneal::launch::{PeerGroup, PeerLauncher};
use u_shm_anneal::objective::ObjectiveKind;
use u_shm_anneal::parallel::{ParallelConfig, ParallelRunner};
use u_shm_anneal::report::{Comparison, RunReport};
use u_shm_anneal::sa::{SaConfig, SequentialRunner};
use u_shm_anneal::{AnnealError, AnnealResult};

/// Simulated annealing on one machine, single-process vs. shared-memory peers.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Rank of this process; rank 0 creates the regions and coordinates
    #[arg(long, default_value_t = 0)]
    rank: usize,

    /// Number of participating processes
    #[arg(long, default_value_t = 4)]
    size: usize,

    /// Base seed shared by every rank; drawn at random on rank 0 when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Problem dimension
    #[arg(short = 'n', long, default_value_t = 800_000)]
    dimension: usize,

    /// Objectives to run, comma separated: quadratic, woods, powell (default: all)
    #[arg(short, long, value_delimiter = ',')]
    objective: Vec<ObjectiveKind>,

    /// Base name of the shared regions; one region `<region>-<objective>` per objective
    #[arg(long)]
    region: Option<String>,

    /// How long a peer waits for a region to appear
    #[arg(long, default_value_t = 300)]
    attach_timeout_secs: u64,

    /// Skip the single-process baseline on rank 0
    #[arg(long)]
    skip_sequential: bool,

    /// Do not launch peers from rank 0; they are started externally
    #[arg(long)]
    no_launch: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("rank {}: {err}", args.rank);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> AnnealResult<()> {
    if args.rank != 0 && (args.seed.is_none() || args.region.is_none()) {
        return Err(AnnealError::InvalidConfig(
            "peer ranks need --seed and --region from rank 0".into(),
        ));
    }
    let seed = args.seed.unwrap_or_else(rand::random);
    let region = args
        .region
        .clone()
        .unwrap_or_else(|| format!("shm-anneal-{}", std::process::id()));
    let objectives = if args.objective.is_empty() {
        ObjectiveKind::all().to_vec()
    } else {
        args.objective.clone()
    };
    info!(
        "rank {}/{}: seed={seed}, n={}, region={region}",
        args.rank, args.size, args.dimension
    );

    let peers = if args.rank == 0 && args.size > 1 && !args.no_launch {
        let launcher = PeerLauncher::current_exe()?;
        Some(launcher.launch_all(args.size, seed, peer_args(args, &region, &objectives))?)
    } else {
        None
    };

    let result = objectives
        .iter()
        .try_for_each(|&kind| run_objective(args, kind, seed, &region));

    match peers {
        Some(peers) => reap(peers, result),
        None => result,
    }
}

/// Arguments forwarded to every launched peer, after its rank, size and seed.
fn peer_args(args: &Args, region: &str, objectives: &[ObjectiveKind]) -> Vec<String> {
    let objectives = objectives
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    vec![
        "--dimension".into(),
        args.dimension.to_string(),
        "--region".into(),
        region.to_string(),
        "--objective".into(),
        objectives,
        "--attach-timeout-secs".into(),
        args.attach_timeout_secs.to_string(),
    ]
}

fn reap(mut peers: PeerGroup, result: AnnealResult<()>) -> AnnealResult<()> {
    if result.is_err() {
        peers.kill_all();
    }
    let reaped = peers.wait_all();
    result.and(reaped)
}

fn run_objective(args: &Args, kind: ObjectiveKind, seed: u64, region: &str) -> AnnealResult<()> {
    let objective = kind.objective();
    let (lower, upper) = kind.bounds();
    let config = SaConfig::default().with_bounds(lower, upper).with_seed(seed);
    let initial = objective.starting_point(args.dimension);

    let sequential = if args.rank == 0 && !args.skip_sequential {
        let started = Instant::now();
        let outcome = SequentialRunner::run(objective, initial.clone(), &config)?;
        Some(RunReport::new("sequential", kind, 1, started.elapsed(), outcome))
    } else {
        None
    };

    let parallel = ParallelConfig::new(format!("{region}-{kind}"), args.rank, args.size)
        .with_block_alignment(kind.block_alignment())
        .with_attach_timeout(Duration::from_secs(args.attach_timeout_secs));
    let started = Instant::now();
    let outcome = ParallelRunner::run(objective, &initial, &config, &parallel)?;
    let elapsed = started.elapsed();

    if let Some(outcome) = outcome {
        let parallel = RunReport::new("parallel", kind, args.size, elapsed, outcome);
        print!("{}", Comparison::new(sequential, parallel));
    }
    Ok(())
}

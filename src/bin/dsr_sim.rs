use clap::Parser;
use dsrsim_rs::app::install_experiment;
use dsrsim_rs::net::NetWorld;
use dsrsim_rs::sim::{ExperimentSpec, SimTime, Simulator};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "dsr-sim",
    about = "Run a deadline-aware multipath forwarding experiment"
)]
struct Args {
    /// Path to experiment.json; defaults to the built-in 3x3 grid experiment
    #[arg(long)]
    experiment: Option<PathBuf>,

    /// Run until this time (ms); overrides `until_ms` in the experiment
    #[arg(long)]
    until_ms: Option<u64>,

    /// Override fast sub-queue capacity (packets) on every interface
    #[arg(long)]
    fast_queue_pkts: Option<u32>,

    /// Override slow sub-queue capacity (packets) on every interface
    #[arg(long)]
    slow_queue_pkts: Option<u32>,

    /// Rebuild all routing tables on interface up/down and address changes
    #[arg(long)]
    respond_to_interface_events: bool,

    /// Print every node's routing table before and after the run
    #[arg(long)]
    print_routes: bool,

    /// Write final statistics as JSON
    #[arg(long)]
    stats_json: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();

    let mut spec = match &args.experiment {
        Some(path) => match ExperimentSpec::load(path) {
            Ok(spec) => spec,
            Err(e) => {
                eprintln!("failed to load {}: {e}", path.display());
                return ExitCode::from(2);
            }
        },
        None => ExperimentSpec::default_grid(),
    };
    spec.override_queue_capacities(args.fast_queue_pkts, args.slow_queue_pkts);
    if args.respond_to_interface_events {
        spec.respond_to_interface_events = true;
    }

    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    let installed = match install_experiment(&spec, &mut world, &mut sim) {
        Ok(i) => i,
        Err(e) => {
            eprintln!("invalid experiment: {e}");
            return ExitCode::from(2);
        }
    };

    if args.print_routes {
        print!("{}", world.net.format_routing_tables(sim.now()));
    }

    match args.until_ms.map(SimTime::from_millis).or(installed.until) {
        Some(until) => sim.run_until(until, &mut world),
        None => sim.run(&mut world),
    }

    if args.print_routes {
        print!("{}", world.net.format_routing_tables(sim.now()));
    }

    let stats = &world.net.stats;
    println!(
        "done @ {:?}, sent_pkts={}, delivered_pkts={}, delivered_bytes={}, deadline_met={}, deadline_missed={}, dropped_pkts={}",
        sim.now(),
        stats.sent_pkts,
        stats.delivered_pkts,
        stats.delivered_bytes,
        stats.deadline_met_pkts,
        stats.deadline_missed_pkts,
        stats.dropped_pkts
    );
    println!(
        "drops deadline={} no_route={} congestion={} queue_full={} forwarding_disabled={} interface_down={} route_rebuilds={}",
        stats.dropped_deadline,
        stats.dropped_no_route,
        stats.dropped_congestion,
        stats.dropped_queue_full,
        stats.dropped_forwarding_disabled,
        stats.dropped_interface_down,
        stats.route_rebuilds
    );

    if let Some(path) = args.stats_json {
        let json = match serde_json::to_string_pretty(stats) {
            Ok(j) => j,
            Err(e) => {
                eprintln!("failed to serialize stats: {e}");
                return ExitCode::FAILURE;
            }
        };
        if let Err(e) = fs::write(&path, json) {
            eprintln!("failed to write {}: {e}", path.display());
            return ExitCode::FAILURE;
        }
        eprintln!("wrote stats to {}", path.display());
    }
    ExitCode::SUCCESS
}

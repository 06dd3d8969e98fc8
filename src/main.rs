//! Headless demo: one bot-driven game scored against the optimal reference.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use beer_game::io::benchmark_file::JsonFileBenchmarkStore;
use beer_game::io::demand;
use beer_game::io::reporting;
use beer_game::io::settings::EngineSettings;
use beer_game::simulation::results::RoleResult;
use beer_game::{
    BenchmarkStore, GameConfig, GameMode, GameService, GameStatus, MemoryBenchmarkStore,
    TracingSink,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    settings: Option<PathBuf>,
    preset: Option<String>,
    rounds: Option<u32>,
    seed: Option<u64>,
    csv: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--settings" => args.settings = it.next().map(PathBuf::from),
            "--preset" => args.preset = it.next(),
            "--rounds" => {
                let value = it.next().context("--rounds needs a value")?;
                args.rounds = Some(value.parse().with_context(|| format!("invalid --rounds {value}"))?);
            }
            "--seed" => {
                let value = it.next().context("--seed needs a value")?;
                args.seed = Some(value.parse().with_context(|| format!("invalid --seed {value}"))?);
            }
            "--csv" => args.csv = it.next().map(PathBuf::from),
            other => bail!("unknown argument {other}"),
        }
    }
    Ok(args)
}

fn main() -> Result<()> {
    let args = parse_args()?;
    let settings = match &args.settings {
        Some(path) => EngineSettings::load(path)?,
        None => EngineSettings::default(),
    };

    // Logging setup
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // 1. SETUP CONFIGURATION
    let mut config: GameConfig = settings.defaults.clone();
    if let Some(name) = &args.preset {
        config.demand = demand::preset(name).with_context(|| {
            format!("unknown preset {name}, expected one of {:?}", demand::PRESET_NAMES)
        })?;
    }
    if let Some(rounds) = args.rounds {
        config.total_rounds = rounds;
    }
    if let Some(seed) = args.seed {
        // Noisy demand around the post-step level of the classic game.
        config.demand = demand::generate_normal_demand(config.total_rounds as usize, 8.0, 2.0, seed)?;
    }
    info!(rounds = config.total_rounds, preset = ?args.preset, "starting demo game");

    // 2. WIRE THE SERVICE
    let benchmarks: Arc<dyn BenchmarkStore> = match &settings.benchmark_path {
        Some(path) => Arc::new(JsonFileBenchmarkStore::open(path)?),
        None => Arc::new(MemoryBenchmarkStore::new()),
    };
    let service = GameService::new(benchmarks, Arc::new(TracingSink));

    // 3. PLAY: the bot policy fills every seat
    let id = service.create_game(config, GameMode::Test)?;
    println!("=== Beer Distribution Game {id} ===");
    loop {
        let receipt = service.play_bot_round(&id)?;
        if receipt.status == GameStatus::Completed {
            break;
        }
    }

    // 4. EXPORT RESULTS
    let view = service.full_view(&id)?;
    if let Some(path) = &args.csv {
        let rows = service.with_snapshots(&id, |game, snapshots| {
            reporting::write_round_history(path, game, snapshots)
        })??;
        println!("Success! {rows} rows written to {}", path.display());
    }

    // 5. PRINT COST ANALYSIS
    let results = service.results(&id)?;
    println!("\n=== Cost Analysis ({} rounds) ===", results.rounds_played);
    for (_, role) in results.per_role.iter() {
        print_role(role);
    }
    println!("Total Supply Chain Cost: ${:.2}", results.total_chain_cost);
    if let Some(optimal) = results.optimal_chain_cost {
        println!("Optimal Supply Chain Cost: ${optimal:.2}");
    }
    if let Some(pct) = results.chain_pct_over_optimal {
        println!("Chain over optimal: {pct:.1}%");
    }
    if let Some(benchmark) = &results.benchmark {
        println!("Best known chain cost: ${:.2} ({})", benchmark.total_chain_cost, benchmark.game);
    }
    println!("Units in transit at the end: {}", view.pipeline.iter().map(|p| p.quantity).sum::<u32>());

    println!("\nSimulation Complete.");
    Ok(())
}

fn print_role(role: &RoleResult) {
    let over = role
        .pct_over_optimal
        .map_or_else(|| "n/a".to_string(), |pct| format!("{pct:+.1}%"));
    println!(
        "{}: ${:.2} | over optimal: {} | bullwhip: {:.2} | peak backlog: {}",
        role.role, role.total_cost, over, role.bullwhip_index, role.peak_backlog
    );
}

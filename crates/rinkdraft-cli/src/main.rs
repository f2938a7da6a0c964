// Rink draft command-line driver.
//
// Startup sequence:
// 1. Initialize tracing (log to file, stdout carries command output)
// 2. Load config (copying defaults on first run)
// 3. Run the requested subcommand over the configured player CSVs

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::info;

use rinkdraft_core::analysis::loadings::{
    generate_loadings, load_or_generate_loadings, write_loadings, Loadings,
};
use rinkdraft_core::analysis::recommend::Neighbor;
use rinkdraft_core::config::{self, Config};
use rinkdraft_core::draft::drafter::DraftOutcome;
use rinkdraft_core::game::{simulate_game_from_files, write_results_table, MatchResult};
use rinkdraft_core::players::csv_io::{
    load_players, load_reference_population, write_roster_snapshot,
};
use rinkdraft_core::players::position::Position;
use rinkdraft_core::players::record::{players_within_salary, PlayerTable};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Group {
    Forward,
    Defense,
    Goalie,
}

impl From<Group> for Position {
    fn from(group: Group) -> Self {
        match group {
            Group::Forward => Position::Forward,
            Group::Defense => Position::Defense,
            Group::Goalie => Position::Goalie,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "rinkdraft", version)]
#[command(about = "Fantasy hockey team builder: loadings, recommendations, AI drafts and match simulation")]
struct Args {
    /// Directory holding config/ (and defaults/ for first-run copies)
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate the loadings file from the forward and defense reference CSVs
    Loadings {
        /// Regenerate even if the loadings file already exists
        #[arg(long)]
        force: bool,
    },
    /// List players similar to a target within one position group
    Recommend {
        #[arg(long)]
        target: String,
        #[arg(long, value_enum)]
        group: Group,
        /// Number of players to return (defaults to the configured count)
        #[arg(short, long)]
        n: Option<usize>,
    },
    /// List every player at or under a salary
    Filter {
        #[arg(long)]
        max_salary: u64,
    },
    /// Draft an AI team around a seed player
    Draft {
        #[arg(long)]
        seed_player: String,
        /// Seed for the position-order shuffle; random when omitted
        #[arg(long)]
        rng_seed: Option<u64>,
        /// Write the drafted roster to this CSV
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Score two roster snapshots against each other
    Simulate {
        #[arg(long)]
        user: PathBuf,
        #[arg(long)]
        ai: PathBuf,
    },
}

fn main() -> Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    let args = Args::parse();

    // 2. Load config
    let config = match &args.base_dir {
        Some(dir) => {
            config::ensure_config_files(dir).context("failed to initialize config")?;
            config::load_config_from(dir)
        }
        None => config::load_config(),
    }
    .context("failed to load configuration")?;
    info!(
        "Config loaded: league={}, ${} salary cap",
        config.league.name, config.league.salary_cap
    );

    // 3. Dispatch
    match args.command {
        Command::Loadings { force } => run_loadings(&config, force, args.json),
        Command::Recommend { target, group, n } => {
            run_recommend(&config, &target, group.into(), n, args.json)
        }
        Command::Filter { max_salary } => run_filter(&config, max_salary, args.json),
        Command::Draft {
            seed_player,
            rng_seed,
            out,
        } => run_draft(&config, &seed_player, rng_seed, out.as_deref(), args.json),
        Command::Simulate { user, ai } => run_simulate(&config, &user, &ai, args.json),
    }
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

fn run_loadings(config: &Config, force: bool, json: bool) -> Result<()> {
    let path = PathBuf::from(&config.data_paths.loadings);
    let spec = config.loadings_spec();
    let loadings = if force {
        let population = reference_population(config)?;
        let loadings = generate_loadings(population.players(), spec.metrics, spec.weights)
            .context("failed to generate loadings")?;
        write_loadings(&path, &loadings, spec.column)
            .with_context(|| format!("failed to write {}", path.display()))?;
        loadings
    } else {
        ensure_loadings(config)?
    };

    if json {
        return print_json(&loadings);
    }
    println!("Loadings ({}):", path.display());
    for (metric, loading) in loadings.iter() {
        println!("  {metric:<28} {loading:>10.6}");
    }
    Ok(())
}

fn run_recommend(
    config: &Config,
    target: &str,
    group: Position,
    n: Option<usize>,
    json: bool,
) -> Result<()> {
    let pool = player_pool(config)?;
    let n = n.unwrap_or(config.strategy.similarity.neighbors);
    let neighbors = config
        .recommender(group)
        .recommend(target, &pool, n)
        .with_context(|| format!("no recommendations for {target}"))?;

    if json {
        return print_json(&neighbors);
    }
    if neighbors.is_empty() {
        println!("No similar players found for {target}.");
        return Ok(());
    }
    println!("Because you like {target}, you might also enjoy these similar players:");
    print_neighbors(&neighbors);
    Ok(())
}

fn run_filter(config: &Config, max_salary: u64, json: bool) -> Result<()> {
    let pool = player_pool(config)?;
    let Some(players) = players_within_salary(&pool, max_salary) else {
        bail!("please enter a valid salary limit");
    };

    if json {
        return print_json(&players);
    }
    if players.is_empty() {
        println!("No players found with salary under ${max_salary}.");
        return Ok(());
    }
    println!("{:<28} {:<4} {:<6} {:>12}", "name", "pos", "team", "salary");
    for p in players {
        println!(
            "{:<28} {:<4} {:<6} {:>12}",
            p.name,
            p.position.display_str(),
            p.team,
            p.salary
        );
    }
    Ok(())
}

fn run_draft(
    config: &Config,
    seed_player: &str,
    rng_seed: Option<u64>,
    out: Option<&Path>,
    json: bool,
) -> Result<()> {
    let pool = player_pool(config)?;
    let seed = pool
        .require(seed_player)
        .context("seed player must be in the player pool")?
        .clone();
    let mut rng = match rng_seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    };

    let outcome = config
        .drafter()
        .draft(&seed, &pool, &mut rng)
        .context("AI draft failed")?;

    if let (Some(path), true) = (out, outcome.is_complete()) {
        write_roster_snapshot(path, &outcome.roster)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("AI roster written to {}", path.display());
    }

    if json {
        return print_json(&outcome);
    }
    print_outcome(&outcome);
    Ok(())
}

fn run_simulate(config: &Config, user: &Path, ai: &Path, json: bool) -> Result<()> {
    ensure_loadings(config)?;
    let result = simulate_game_from_files(
        user,
        ai,
        Path::new(&config.data_paths.loadings),
        &config.strategy.scoring.metrics,
        config.league.scaling_factor,
        config.league.tie_policy,
    )
    .context("simulation failed")?;

    if json {
        return print_json(&result);
    }
    print_match(&result)
}

// ---------------------------------------------------------------------------
// Data helpers
// ---------------------------------------------------------------------------

fn reference_population(config: &Config) -> Result<PlayerTable> {
    let files = config.data_paths.reference_files();
    let paths: Vec<&Path> = files.iter().map(PathBuf::as_path).collect();
    load_reference_population(&paths).context("failed to load reference population")
}

fn player_pool(config: &Config) -> Result<PlayerTable> {
    let mut tables = Vec::new();
    for path in config.data_paths.player_files() {
        let table =
            load_players(&path).with_context(|| format!("failed to load {}", path.display()))?;
        info!("Loaded {} players from {}", table.len(), path.display());
        tables.push(table);
    }
    let refs: Vec<&PlayerTable> = tables.iter().collect();
    Ok(PlayerTable::concat(&refs))
}

/// Read the loadings file, generating it from the reference CSVs on first use.
fn ensure_loadings(config: &Config) -> Result<Loadings> {
    let path = PathBuf::from(&config.data_paths.loadings);
    load_or_generate_loadings(&path, &config.loadings_spec(), || {
        let files = config.data_paths.reference_files();
        let paths: Vec<&Path> = files.iter().map(PathBuf::as_path).collect();
        load_reference_population(&paths)
    })
    .with_context(|| format!("failed to load or generate {}", path.display()))
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_neighbors(neighbors: &[Neighbor]) {
    println!(
        "{:<28} {:<4} {:<6} {:>12} {:>10}",
        "name", "pos", "team", "salary", "distance"
    );
    for n in neighbors {
        println!(
            "{:<28} {:<4} {:<6} {:>12} {:>10.4}",
            n.name,
            n.position.display_str(),
            n.team,
            n.salary,
            n.distance
        );
    }
}

fn print_outcome(outcome: &DraftOutcome) {
    for s in &outcome.shortfalls {
        println!("Skipped: {}", s.as_error());
    }
    match outcome.failure() {
        Some(reason) => println!("Failed to meet the team composition requirements: {reason}"),
        None => {
            println!("AI-Generated Team (Remaining Cap: ${}):", outcome.remaining_cap);
            for p in &outcome.roster {
                println!(
                    "  {} ({}) - ${}",
                    p.name,
                    p.position.display_str(),
                    p.salary
                );
            }
        }
    }
}

fn print_match(result: &MatchResult) -> Result<()> {
    println!("Team User: {}", result.score.user);
    println!("Team AI: {}", result.score.ai);
    println!("Team {} wins!", result.winner().label());
    println!();
    write_results_table(std::io::stdout(), &result.table)?;
    Ok(())
}

/// Initialize tracing to log to a file so stdout stays clean for results.
fn init_tracing() -> Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("rinkdraft.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rinkdraft=info,rinkdraft_core=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}

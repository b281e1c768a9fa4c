use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use benched::config::AppConfig;
use benched::engine::filter::parse_slot_tokens;
use benched::engine::{self, RoleSlot, RoleSlotSelection, SearchQuery, SortKey, StatColumn};
use benched::explore::{self, ExploreSession};
use benched::models::{RoleCatalog, Season};
use benched::refresh::{load_store, StoreHandle, StoreRefresher};
use benched::render;
use benched::storage::{self, ExportFormat, JsonlReader, ParquetWriter};
use benched::CompositionRow;

#[derive(Parser)]
#[command(name = "benched")]
#[command(about = "Mythic+ composition search: filter, rank and browse team compositions")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Data directory path (overrides the config file)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search a season's compositions and print one page
    Search {
        /// Season id (default: config default_season)
        #[arg(long)]
        season: Option<String>,

        /// Tank slot tokens, comma separated
        #[arg(long)]
        tank: Option<String>,

        /// Healer slot tokens
        #[arg(long)]
        healer: Option<String>,

        /// First dps slot tokens
        #[arg(long)]
        dps1: Option<String>,

        /// Second dps slot tokens
        #[arg(long)]
        dps2: Option<String>,

        /// Third dps slot tokens
        #[arg(long)]
        dps3: Option<String>,

        /// Sort key: total, avg, max_avg_total, max_total_avg
        #[arg(long)]
        sort: Option<String>,

        /// Page number (clamped to the valid range)
        #[arg(long, default_value = "1", allow_hyphen_values = true)]
        page: i64,

        /// Third stat column: max or std
        #[arg(long)]
        stat: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Disable colours
        #[arg(long)]
        no_color: bool,
    },

    /// List the spec catalog
    Catalog {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load exports and report excluded rosters
    Validate {
        /// Season to validate (default: every season with an export)
        #[arg(long)]
        season: Option<String>,
    },

    /// Write a season's Parquet export from its JSONL export
    Convert {
        #[arg(long)]
        season: Option<String>,
    },

    /// Interactive search session
    Explore {
        #[arg(long)]
        season: Option<String>,

        /// Disable colours
        #[arg(long)]
        no_color: bool,
    },
}

fn init_tracing(level: &str, json_logs: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let json_layer = json_logs.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json_logs).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

fn resolve_season<'c>(config: &'c AppConfig, season: Option<&str>) -> Result<&'c Season> {
    let id = season.unwrap_or(&config.default_season);
    config.season(id).ok_or_else(|| {
        let known: Vec<&str> = config.seasons.iter().map(|s| s.id.as_str()).collect();
        anyhow!("Unknown season {} (configured: {})", id, known.join(", "))
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config {:?}", cli.config))?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    init_tracing(level, cli.json_logs);

    tracing::info!("Starting benched v{}", env!("CARGO_PKG_VERSION"));

    let catalog = RoleCatalog::global();
    catalog.check_invariants()?;
    let storage = config.storage();

    match cli.command {
        Commands::Search {
            season,
            tank,
            healer,
            dps1,
            dps2,
            dps3,
            sort,
            page,
            stat,
            json,
            no_color,
        } => {
            let season = resolve_season(&config, season.as_deref())?;

            let mut slots = RoleSlotSelection::new();
            for (slot, input) in [
                (RoleSlot::Tank, tank),
                (RoleSlot::Healer, healer),
                (RoleSlot::Dps1, dps1),
                (RoleSlot::Dps2, dps2),
                (RoleSlot::Dps3, dps3),
            ] {
                if let Some(input) = input {
                    slots.set(slot, parse_slot_tokens(&input, catalog)?);
                }
            }

            let query = SearchQuery {
                slots,
                sort: match sort {
                    Some(s) => s.parse::<SortKey>()?,
                    None => config.search.default_sort,
                },
                page,
                stat: match stat {
                    Some(s) => s.parse::<StatColumn>().map_err(|e| anyhow!(e))?,
                    None => config.search.stat_column,
                },
            };

            let store = load_store(&storage, season, catalog)?;
            let response = engine::search(&store, &query, catalog)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                let colored = !no_color && std::io::stdout().is_terminal();
                println!("{}", render::render_response(&response, colored));
            }
        }

        Commands::Catalog { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(catalog.specs())?);
            } else {
                println!(
                    "{:<3} {:<26} {:<7} {:>5} {:>7}  name",
                    "sh", "token", "role", "class", "spec"
                );
                for spec in catalog.specs() {
                    println!(
                        "{:<3} {:<26} {:<7} {:>5} {:>7}  {}",
                        spec.shorthand,
                        spec.token,
                        spec.role.as_str(),
                        spec.class_id,
                        spec.spec_id,
                        spec.display_name()
                    );
                }
            }
        }

        Commands::Validate { season } => {
            let seasons: Vec<&Season> = match season {
                Some(id) => vec![resolve_season(&config, Some(id.as_str()))?],
                None => {
                    let mut found = Vec::new();
                    for id in storage::list_seasons(&storage)? {
                        match config.season(&id) {
                            Some(season) => found.push(season),
                            None => tracing::warn!("Export directory {} is not a configured season", id),
                        }
                    }
                    found
                }
            };

            if seasons.is_empty() {
                bail!("No exports found under {:?}", storage.exports_dir());
            }

            let mut failed = 0;
            for season in seasons {
                match load_store(&storage, season, catalog) {
                    Ok(store) => {
                        let report = store.report();
                        println!("\n=== {} ===", season.window());
                        println!("Rows read:        {}", report.rows_read);
                        println!("Accepted:         {}", report.accepted);
                        println!("Wrong length:     {}", report.wrong_length);
                        println!("Bad tank count:   {}", report.bad_tank_count);
                        println!("Bad healer count: {}", report.bad_healer_count);
                        println!("Total runs:       {}", store.total_runs());
                        println!("Fingerprint:      {}", store.fingerprint().unwrap_or("-"));
                    }
                    Err(e) => {
                        failed += 1;
                        tracing::error!("Season {} failed to load: {}", season.id, e);
                    }
                }
            }

            if failed > 0 {
                bail!("{} season(s) failed validation", failed);
            }
        }

        Commands::Convert { season } => {
            let season = resolve_season(&config, season.as_deref())?;
            let source = storage.export_path(&season.id, ExportFormat::Jsonl);
            let reader: JsonlReader<CompositionRow> = JsonlReader::new(source.clone());
            if !reader.exists() {
                bail!("No JSONL export at {:?}", source);
            }

            let read = reader.read_counted()?;
            if read.skipped > 0 {
                tracing::warn!("Skipped {} unparseable lines in {:?}", read.skipped, source);
            }

            let path = ParquetWriter::new(storage.clone()).write_compositions(&season.id, &read.items)?;
            println!("Wrote {} rows to {:?}", read.items.len(), path);
        }

        Commands::Explore { season, no_color } => {
            let season = resolve_season(&config, season.as_deref())?.clone();
            let store = load_store(&storage, &season, catalog)?;
            let interval = config
                .refresh
                .interval_duration()
                .ok_or_else(|| anyhow!("Invalid refresh interval {:?}", config.refresh.interval))?;

            let refresher = Arc::new(StoreRefresher::new(
                storage.clone(),
                season,
                catalog,
                StoreHandle::new(store),
                interval,
            ));
            let background = config
                .refresh
                .enabled
                .then(|| tokio::spawn(refresher.clone().run_periodic()));

            let mut session = ExploreSession::new(config.search.default_sort, config.search.stat_column);
            let colored = !no_color && std::io::stdout().is_terminal();
            println!("{}", explore::HELP);

            explore::run(
                tokio::io::BufReader::new(tokio::io::stdin()),
                std::io::stdout(),
                &mut session,
                &refresher,
                catalog,
                colored,
            )
            .await?;

            refresher.stop().await;
            if let Some(task) = background {
                task.abort();
            }
        }
    }

    Ok(())
}

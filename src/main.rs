use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{ArgGroup, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use herdbook_pedigree::config::AnalysisConfig;
use herdbook_pedigree::db::{self, PgStore};
use herdbook_pedigree::{analytics, diversity, inbreeding, pedigree, recommend, report};

#[derive(Parser)]
#[command(name = "herdbook")]
#[command(
    about = "Pedigree, inbreeding and breeding analytics for a livestock herd",
    long_about = None
)]
struct Cli {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    database_url: Option<String>,

    /// Analysis settings file
    #[arg(long, env = "HERDBOOK_CONFIG", default_value = "herdbook.toml", global = true)]
    config: PathBuf,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "HERDBOOK_LOG", default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a small sample herd
    Seed,
    /// Import or update animals from a CSV file
    ImportAnimals {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Import breeding records from a CSV file
    ImportBreedings {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Print the ancestor tree of an animal
    Pedigree {
        #[arg(long)]
        animal: Uuid,
        #[arg(long)]
        depth: Option<u8>,
        #[arg(long)]
        json: bool,
    },
    /// Inbreeding of an animal, or of a prospective pairing
    #[command(group(
        ArgGroup::new("subject")
            .args(["animal", "male"])
            .required(true)
            .multiple(false)
    ))]
    Inbreeding {
        #[arg(long)]
        animal: Option<Uuid>,
        #[arg(long, requires = "female")]
        male: Option<Uuid>,
        #[arg(long, requires = "male")]
        female: Option<Uuid>,
        #[arg(long)]
        json: bool,
    },
    /// Genetic diversity score of an animal's pedigree
    Diversity {
        #[arg(long)]
        animal: Uuid,
        #[arg(long)]
        json: bool,
    },
    /// Rank candidate breeding pairs
    Recommend {
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long, env = "HERDBOOK_TIMEOUT_SECS")]
        timeout_secs: Option<u64>,
        #[arg(long, env = "HERDBOOK_MAX_POPULATION")]
        max_population: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Aggregate the breeding log
    Analytics {
        #[arg(long)]
        json: bool,
    },
    /// Write a markdown breeding report
    Report {
        #[arg(long)]
        herd: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long, default_value = "breeding-report.md")]
        out: PathBuf,
    },
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let mut config = AnalysisConfig::load(&cli.config)?;
    let database_url = cli
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set to the herd's Postgres instance")?;
    let store = PgStore::connect(database_url, config.max_connections).await?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(store.pool()).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(store.pool()).await?;
            println!("Seed data inserted.");
        }
        Commands::ImportAnimals { csv } => {
            let stored = db::import_animals_csv(store.pool(), &csv).await?;
            println!("Stored {stored} animals from {}.", csv.display());
        }
        Commands::ImportBreedings { csv } => {
            let inserted = db::import_breedings_csv(store.pool(), &csv).await?;
            println!("Inserted {inserted} breeding records from {}.", csv.display());
        }
        Commands::Pedigree { animal, depth, json } => {
            let depth = depth.unwrap_or(config.max_depth);
            let Some(tree) = pedigree::build_pedigree_with_depth(&store, animal, depth).await else {
                println!("No pedigree data for {animal}.");
                return Ok(());
            };
            if json {
                print_json(&tree)?;
            } else {
                print!("{}", pedigree::render_tree(&tree));
            }
        }
        Commands::Inbreeding {
            animal,
            male,
            female,
            json,
        } => {
            let analysis = match (animal, male, female) {
                (Some(animal), _, _) => {
                    let Some(tree) =
                        pedigree::build_pedigree_with_depth(&store, animal, config.max_depth).await
                    else {
                        println!("Insufficient pedigree data for {animal}.");
                        return Ok(());
                    };
                    inbreeding::calculate_inbreeding_coefficient(&tree)
                }
                (None, Some(male), Some(female)) => {
                    let male_tree =
                        pedigree::build_pedigree_with_depth(&store, male, config.max_depth).await;
                    let female_tree =
                        pedigree::build_pedigree_with_depth(&store, female, config.max_depth).await;
                    let (Some(male_tree), Some(female_tree)) = (male_tree, female_tree) else {
                        println!("Insufficient pedigree data for this pairing.");
                        return Ok(());
                    };
                    inbreeding::calculate_potential_inbreeding(&male_tree, &female_tree)
                }
                _ => anyhow::bail!("pass --animal, or both --male and --female"),
            };

            if json {
                print_json(&analysis)?;
            } else {
                print!("{}", report::inbreeding_summary(&analysis));
            }
        }
        Commands::Diversity { animal, json } => {
            let Some(tree) =
                pedigree::build_pedigree_with_depth(&store, animal, config.max_depth).await
            else {
                println!("Insufficient pedigree data for {animal}.");
                return Ok(());
            };
            let score = diversity::calculate_genetic_diversity(&tree);
            if json {
                print_json(&score)?;
            } else {
                print!("{}", report::diversity_summary(&score));
            }
        }
        Commands::Recommend {
            limit,
            timeout_secs,
            max_population,
            json,
        } => {
            if let Some(secs) = timeout_secs {
                config.timeout_secs = Some(secs);
            }
            if let Some(cap) = max_population {
                config.max_population_per_sex = cap;
            }
            config.validate()?;

            let cancel = config.cancellation_token();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupt received, stopping recommendation run");
                    on_interrupt.cancel();
                }
            });

            let run = recommend::run_recommendations(
                &store,
                &config.recommend_options(Some(limit)),
                &cancel,
            )
            .await?;

            if json {
                print_json(&run)?;
                return Ok(());
            }
            if run.recommendations.is_empty() {
                println!("No breeding pairs could be evaluated.");
                return Ok(());
            }

            println!("Top breeding pairs by compatibility:");
            for pair in &run.recommendations {
                println!("{}", report::pairing_line(pair));
            }
            if run.pairs_skipped > 0 {
                println!(
                    "{} of {} pairs skipped for missing pedigree data.",
                    run.pairs_skipped, run.pairs_considered
                );
            }
        }
        Commands::Analytics { json } => {
            let today = Utc::now().date_naive();
            let summary = analytics::get_analytics(&store, today).await;
            if json {
                print_json(&summary)?;
            } else {
                print!("{}", report::analytics_sections(&summary));
            }
        }
        Commands::Report { herd, limit, out } => {
            let today = Utc::now().date_naive();
            let summary = analytics::get_analytics(&store, today).await;
            let pairs = recommend::generate_breeding_recommendations(
                &store,
                &config.recommend_options(Some(limit)),
                &config.cancellation_token(),
            )
            .await?;

            let document = report::build_report(herd.as_deref(), today, &summary, &pairs);
            std::fs::write(&out, document)
                .with_context(|| format!("failed to write {}", out.display()))?;
            info!(path = %out.display(), "report written");
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

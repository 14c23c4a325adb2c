//! CLI commands implementation.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{load_settings, Settings};
use crate::models::{District, DistrictCategory, Election, PageKey, Precinct};
use crate::repository::{BallotRepository, PageRepository};
use crate::scrapers::HttpClient;
use crate::services::{Crawler, Fetcher, Scheduler};

#[derive(Parser)]
#[command(name = "ballots")]
#[command(about = "Sample ballot acquisition and parsing")]
#[command(version)]
pub struct Cli {
    /// Data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database and load reference data
    Init,

    /// Manage elections
    Election {
        #[command(subcommand)]
        command: ElectionCommands,
    },

    /// Manage precincts
    Precinct {
        #[command(subcommand)]
        command: PrecinctCommands,
    },

    /// Track ballot pages for an election
    Track {
        /// Upstream election id
        election: u32,
        /// Upstream precinct ids (default: every known precinct)
        precincts: Vec<u32>,
    },

    /// Fetch and classify a single ballot page
    Fetch { election: u32, precinct: u32 },

    /// Parse a fetched ballot page and store its ballot items
    Parse { election: u32, precinct: u32 },

    /// Run scheduling passes over all tracked pages
    Crawl {
        /// Number of passes to run
        #[arg(short, long, default_value = "1")]
        passes: usize,
        /// Number of concurrent workers (default: from config)
        #[arg(short, long)]
        workers: Option<usize>,
        /// Limit number of pages per pass (0 = unlimited)
        #[arg(short, long, default_value = "0")]
        limit: usize,
        /// Seed for reproducible staleness draws
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show system status
    Status,
}

#[derive(Subcommand)]
enum ElectionCommands {
    /// Add or update an election
    Add {
        /// Upstream election id
        sos_id: u32,
        /// Election name, e.g. "State Primary"
        name: String,
        /// Election date (YYYY-MM-DD)
        date: String,
        /// Mark the election as not active
        #[arg(long)]
        inactive: bool,
        /// Reference URL
        #[arg(long)]
        url: Option<String>,
    },
    /// List elections
    List,
}

#[derive(Subcommand)]
enum PrecinctCommands {
    /// Add a precinct
    Add {
        /// Upstream precinct id
        sos_id: u32,
        /// County name, e.g. "Kent"
        county: String,
        /// Jurisdiction name, e.g. "City of Grand Rapids"
        jurisdiction: String,
        /// Ward
        #[arg(short, long, default_value = "")]
        ward: String,
        /// Precinct number
        #[arg(short, long, default_value = "")]
        number: String,
    },
    /// List precincts
    List,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(cli.data_dir).await;

    match cli.command {
        Commands::Init => cmd_init(&settings).await,
        Commands::Election { command } => match command {
            ElectionCommands::Add {
                sos_id,
                name,
                date,
                inactive,
                url,
            } => cmd_election_add(&settings, sos_id, name, &date, !inactive, url).await,
            ElectionCommands::List => cmd_election_list(&settings).await,
        },
        Commands::Precinct { command } => match command {
            PrecinctCommands::Add {
                sos_id,
                county,
                jurisdiction,
                ward,
                number,
            } => cmd_precinct_add(&settings, sos_id, &county, &jurisdiction, &ward, &number).await,
            PrecinctCommands::List => cmd_precinct_list(&settings).await,
        },
        Commands::Track {
            election,
            precincts,
        } => cmd_track(&settings, election, precincts).await,
        Commands::Fetch { election, precinct } => cmd_fetch(&settings, election, precinct).await,
        Commands::Parse { election, precinct } => cmd_parse(&settings, election, precinct).await,
        Commands::Crawl {
            passes,
            workers,
            limit,
            seed,
        } => cmd_crawl(&settings, passes, workers, limit, seed).await,
        Commands::Status => cmd_status(&settings).await,
    }
}

fn repositories(settings: &Settings) -> anyhow::Result<(PageRepository, BallotRepository)> {
    let db_path = settings.database_path();
    Ok((PageRepository::new(&db_path)?, BallotRepository::new(&db_path)?))
}

fn crawler(settings: &Settings, workers: usize) -> anyhow::Result<Crawler<HttpClient>> {
    let (pages, ballots) = repositories(settings)?;
    let client = HttpClient::from_settings(settings)?;
    let fetcher = Fetcher::new(client, settings.ballot_url_template.clone());
    Ok(Crawler::new(
        fetcher,
        pages,
        ballots,
        settings.parser.clone(),
        workers,
    ))
}

async fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    settings.ensure_directories()?;

    let (_pages, ballots) = repositories(settings)?;
    let report = ballots.seed_reference_data(&settings.parser.statewide_district)?;

    println!(
        "  {} Added {} parties, {} district categories, {} districts",
        style("✓").green(),
        report.parties,
        report.categories,
        report.districts
    );
    println!(
        "{} Initialized ballotcrawl in {}",
        style("✓").green(),
        settings.database_path().display()
    );

    Ok(())
}

async fn cmd_election_add(
    settings: &Settings,
    sos_id: u32,
    name: String,
    date: &str,
    active: bool,
    reference_url: Option<String>,
) -> anyhow::Result<()> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| anyhow::anyhow!("Invalid date {:?}: {}", date, e))?;
    let election = Election {
        sos_id,
        name,
        date,
        active,
        reference_url,
    };

    let (_pages, ballots) = repositories(settings)?;
    ballots.save_election(&election)?;
    println!("{} Saved election: {}", style("✓").green(), election);
    Ok(())
}

async fn cmd_election_list(settings: &Settings) -> anyhow::Result<()> {
    let (_pages, ballots) = repositories(settings)?;
    let elections = ballots.list_elections()?;

    if elections.is_empty() {
        println!(
            "{} No elections. Add one with 'ballots election add'.",
            style("!").yellow()
        );
        return Ok(());
    }

    println!("\n{}", style("Elections").bold());
    println!("{}", "-".repeat(60));
    for election in elections {
        let marker = if election.active {
            style("●").green()
        } else {
            style("○").dim()
        };
        println!("{} {:<6} {}", marker, election.sos_id, election);
    }
    Ok(())
}

async fn cmd_precinct_add(
    settings: &Settings,
    sos_id: u32,
    county: &str,
    jurisdiction: &str,
    ward: &str,
    number: &str,
) -> anyhow::Result<()> {
    let precinct = Precinct::new(
        sos_id,
        District::new(DistrictCategory::new("County"), county),
        District::new(DistrictCategory::new("Jurisdiction"), jurisdiction),
        ward,
        number,
    )?;

    let (_pages, ballots) = repositories(settings)?;
    if ballots.add_precinct(&precinct)? {
        println!("{} Added precinct: {}", style("✓").green(), precinct);
    } else {
        println!(
            "{} Precinct {} already exists",
            style("!").yellow(),
            precinct.sos_id
        );
    }
    Ok(())
}

async fn cmd_precinct_list(settings: &Settings) -> anyhow::Result<()> {
    let (_pages, ballots) = repositories(settings)?;
    let precincts = ballots.list_precincts()?;

    if precincts.is_empty() {
        println!(
            "{} No precincts. Add one with 'ballots precinct add'.",
            style("!").yellow()
        );
        return Ok(());
    }

    println!("\n{}", style("Precincts").bold());
    println!("{}", "-".repeat(60));
    for precinct in precincts {
        println!("{:<8} {}", precinct.sos_id, precinct);
    }
    Ok(())
}

async fn cmd_track(settings: &Settings, election: u32, precincts: Vec<u32>) -> anyhow::Result<()> {
    let (pages, ballots) = repositories(settings)?;
    if ballots.get_election(election)?.is_none() {
        anyhow::bail!("Unknown election: {}", election);
    }

    let precincts = if precincts.is_empty() {
        ballots.precinct_ids()?
    } else {
        precincts
    };

    let mut added = 0;
    for precinct in &precincts {
        if pages.track(PageKey::new(election, *precinct))? {
            added += 1;
        }
    }

    println!(
        "{} Tracking {} pages for election {} ({} new)",
        style("✓").green(),
        precincts.len(),
        election,
        added
    );
    Ok(())
}

async fn cmd_fetch(settings: &Settings, election: u32, precinct: u32) -> anyhow::Result<()> {
    let key = PageKey::new(election, precinct);
    let (pages, _ballots) = repositories(settings)?;
    pages.track(key)?;

    let page = crawler(settings, 1)?.fetch_page(key).await?;

    let status = match page.valid {
        Some(true) if page.table_count > 0 => style("ballot").green(),
        Some(true) => style("no ballot yet").yellow(),
        _ => style("no precinct information").yellow(),
    };
    println!(
        "{} {}: {} ({} tables, weight {:.3})",
        style("✓").green(),
        key,
        status,
        page.table_count,
        page.refetch_weight
    );
    Ok(())
}

async fn cmd_parse(settings: &Settings, election: u32, precinct: u32) -> anyhow::Result<()> {
    let key = PageKey::new(election, precinct);
    let summary = crawler(settings, 1)?.parse_page(key)?;

    println!(
        "{} Parsed {} items from {}",
        style("✓").green(),
        summary.items,
        key
    );
    println!(
        "  {} positions, {} proposals, {} candidates",
        summary.report.positions, summary.report.proposals, summary.report.candidates
    );
    for district in &summary.report.created_districts {
        println!(
            "  {} Added missing district: {} ({})",
            style("!").yellow(),
            district,
            district.category
        );
    }
    for mismatch in &summary.report.seat_mismatches {
        println!(
            "  {} Seats for {} differ: {} stored vs. {} parsed",
            style("!").yellow(),
            mismatch.position,
            mismatch.stored,
            mismatch.parsed
        );
    }
    Ok(())
}

async fn cmd_crawl(
    settings: &Settings,
    passes: usize,
    workers: Option<usize>,
    limit: usize,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    let workers = workers.unwrap_or(settings.workers);

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}) {msg}")?
            .progress_chars("#>-"),
    );
    let crawler = crawler(settings, workers)?.with_progress(pb.clone());

    let mut scheduler = match seed {
        Some(seed) => Scheduler::with_seed(seed),
        None => Scheduler::new(),
    };
    let limit = (limit > 0).then_some(limit);

    for pass in 1..=passes.max(1) {
        pb.set_message(format!("pass {}", pass));
        let summary = crawler.run_pass(&mut scheduler, limit).await?;
        pb.println(format!(
            "{} Pass {}: {} due of {}, {} fetched, {} parsed, {} failed",
            if summary.failed == 0 {
                style("✓").green()
            } else {
                style("!").yellow()
            },
            pass,
            summary.due,
            summary.tracked,
            summary.fetched,
            summary.parsed,
            summary.failed
        ));
    }
    pb.finish_and_clear();

    Ok(())
}

async fn cmd_status(settings: &Settings) -> anyhow::Result<()> {
    let db_path = settings.database_path();
    if !db_path.exists() {
        println!(
            "{} System not initialized. Run 'ballots init' first.",
            style("!").yellow()
        );
        return Ok(());
    }

    let (pages, ballots) = repositories(settings)?;
    let stats = pages.stats()?;
    let counts = ballots.counts()?;

    println!("\n{}", style("ballotcrawl Status").bold());
    println!("{}", "-".repeat(40));
    println!("{:<20} {}", "Database:", db_path.display());
    println!("{:<20} {}", "Elections:", counts.elections);
    println!("{:<20} {}", "Precincts:", counts.precincts);
    println!("{:<20} {}", "Districts:", counts.districts);
    println!("{:<20} {}", "Tracked Pages:", stats.total);
    println!("{:<20} {}", "  fetched:", stats.fetched);
    println!("{:<20} {}", "  valid:", stats.valid);
    println!("{:<20} {}", "  with ballot:", stats.with_ballot);
    println!("{:<20} {}", "  parsed:", stats.parsed);
    println!("{:<20} {:.3}", "Mean Weight:", stats.mean_weight);
    println!("{:<20} {}", "Positions:", counts.positions);
    println!("{:<20} {}", "Proposals:", counts.proposals);
    println!("{:<20} {}", "Candidates:", counts.candidates);

    Ok(())
}

//! CLI tool for generating sprint review slides from a JIRA rapid board.

use anyhow::{Context, Result};
use clap::Parser;
use sprint_core::{group_issues, rank_epics, DeckBuilder, SprintConfig};
use sprint_pptx::DeckWriter;
use sprint_tracker::TrackerClient;
use std::path::PathBuf;
use std::process::ExitCode;

/// Generate a sprint review deck from the current sprint of a rapid board.
#[derive(Parser, Debug)]
#[command(name = "sprint-deck")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file with a [CONFIG] table
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Template presentation whose first slide is a placeholder
    #[arg(short, long, default_value = "template.pptx")]
    template: PathBuf,

    /// Output presentation
    #[arg(short, long, default_value = "Sprint.pptx")]
    output: PathBuf,

    /// Greenhopper REST root (overrides BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Project key sent with the request (overrides PROJECT_KEY)
    #[arg(long)]
    project_key: Option<String>,

    /// Slide layout slot in the template (overrides LAYOUT_INDEX)
    #[arg(short = 'l', long)]
    layout_index: Option<usize>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let (config, client) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) if e.is_config() => {
            log::debug!("{}", e);
            eprintln!("Invalid config file ({}).", e);
            eprintln!("Please check your config file and try again.");
            return Ok(ExitCode::from(1));
        }
        Err(e) => return Err(e.into()),
    };

    run(&args, &config, &client)?;
    Ok(ExitCode::SUCCESS)
}

/// Load the config file, apply command-line overrides, and set up the client.
///
/// The session token and base URL are checked while building the client, so
/// they fail here as config errors.
fn load_config(args: &Args) -> sprint_core::Result<(SprintConfig, TrackerClient)> {
    let mut config = SprintConfig::load(&args.config)?;

    if let Some(ref base_url) = args.base_url {
        config.base_url = base_url.trim_end_matches('/').to_string();
    }
    if let Some(ref project_key) = args.project_key {
        config.project_key = project_key.clone();
    }
    if let Some(layout_index) = args.layout_index {
        config.layout_index = layout_index;
    }

    let client = TrackerClient::from_config(&config)?;
    Ok((config, client))
}

/// Fetch, group, paginate, and write the deck.
fn run(args: &Args, config: &SprintConfig, client: &TrackerClient) -> Result<()> {
    println!("Generating presentation for {}", config.team_name);

    println!("Getting JIRA Data...");
    let board = client
        .fetch_board(&config.rapid_view_id)
        .context("Failed to fetch board data")?;

    println!("Parsing JIRA Data...");
    let mut grouping = group_issues(&board).context("Failed to group sprint issues")?;
    rank_epics(&mut grouping.epics);

    println!(
        "Generating Presentation for {} Epics, {} Bugs.",
        grouping.epics.len(),
        grouping.bugs.len()
    );
    let deck = DeckBuilder::new(config.team_name.as_str())
        .with_exclude_backlog(config.exclude_backlog)
        .with_backlog_status(config.backlog_status.as_str())
        .with_done_status(config.done_status.as_str())
        .build(&grouping.epics, &grouping.bugs);

    if args.verbose {
        eprintln!("  Built {} slides", deck.slides.len());
    }

    DeckWriter::new()
        .with_layout_index(config.layout_index)
        .write_file(&args.template, &deck, &args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    println!("Success! \nSaved to {}", args.output.display());
    Ok(())
}

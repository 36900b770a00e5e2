use profile_scraper_lib::{input, logger};
use profile_scraper_lib::{ChromeFactory, ConnectivityMonitor, CsvStore, Pipeline, ScraperConfig};

use std::error::Error;
use std::io;
use std::path::PathBuf;
use std::process;
use clap::Parser;
use log::{error, info};

/// Crawls a paginated search listing and extracts every profile it links to.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Search listing url (absolute, or a path on the base host). Prompted for when absent.
    #[arg(long)]
    url: Option<String>,

    /// JSON configuration file (defaults to ./scraper.json when present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stop after this many result pages.
    #[arg(long)]
    max_pages: Option<usize>,

    /// Run the browser without a window.
    #[arg(long)]
    headless: bool,

    #[arg(long)]
    links_out: Option<PathBuf>,

    #[arg(long)]
    details_out: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config_source = ScraperConfig::source(cli.config.as_deref());
    let mut config = ScraperConfig::load(cli.config.as_deref())?;
    if let Some(max_pages) = cli.max_pages {
        config.crawl.max_pages = max_pages;
    }
    if cli.headless {
        config.browser.headless = true;
    }
    if let Some(path) = cli.links_out {
        config.links_csv = path;
    }
    if let Some(path) = cli.details_out {
        config.details_csv = path;
    }

    logger::init(&config.log_file);
    info!("Starting profile scraper...");
    match &config_source {
        Some(path) => info!("Loaded configuration from {:?}", path),
        None => info!("No config file found. Using defaults."),
    }

    let raw_url = match cli.url {
        Some(url) => url,
        None => input::prompt_search_url(&mut io::stdin().lock(), &mut io::stdout())?.unwrap_or_default(),
    };
    let Some(search_url) = input::normalize_search_url(&raw_url, &config.base_url) else {
        error!("No URL provided. Exiting.");
        process::exit(1);
    };

    let store = CsvStore::new(&config.links_csv, &config.details_csv);
    let mut pipeline = Pipeline::from_config(
        &config,
        ChromeFactory::new(config.browser.clone()),
        ConnectivityMonitor::from_config(&config.connectivity),
        store,
    )?;

    match pipeline.run(&search_url) {
        Ok(summary) => {
            info!(
                "Done! {} profiles scraped ({} failed).",
                summary.records, summary.failures
            );
            info!("Links:   {:?}", pipeline.store().links_path());
            info!("Details: {:?}", pipeline.store().details_path());
            Ok(())
        }
        Err(e) => {
            error!("Run aborted: {}", e);
            Err(e.into())
        }
    }
}

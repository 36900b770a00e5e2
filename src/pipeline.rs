//! Two-phase run: collect links, then extract every profile with periodic
//! checkpoints.

use log::{error, info, warn};
use crate::config::{CrawlConfig, ScraperConfig};
use crate::connectivity::ConnectivityMonitor;
use crate::delay_manager;
use crate::driver::DriverFactory;
use crate::error::ScrapeError;
use crate::link_collector::LinkCollector;
use crate::profile::ProfileScraper;
use crate::record::{DetailReference, ProfileRecord};
use crate::session::{PageSession, SessionSettings};
use crate::store::RecordStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub links: usize,
    pub records: usize,
    pub failures: usize,
}

pub struct Pipeline<F: DriverFactory, S: RecordStore> {
    session: PageSession<F>,
    store: S,
    collector: LinkCollector,
    scraper: ProfileScraper,
    crawl: CrawlConfig,
}

impl<F: DriverFactory, S: RecordStore> Pipeline<F, S> {
    pub fn new(
        session: PageSession<F>,
        store: S,
        collector: LinkCollector,
        scraper: ProfileScraper,
        crawl: CrawlConfig,
    ) -> Self {
        Pipeline { session, store, collector, scraper, crawl }
    }

    pub fn from_config(
        config: &ScraperConfig,
        factory: F,
        monitor: ConnectivityMonitor,
        store: S,
    ) -> Result<Self, ScrapeError> {
        let session = PageSession::new(factory, monitor, SessionSettings::from(&config.browser));
        Ok(Self::new(
            session,
            store,
            LinkCollector::new(&config.site, &config.crawl)?,
            ProfileScraper::new(&config.base_url, &config.site)?,
            config.crawl.clone(),
        ))
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn run(&mut self, search_url: &str) -> Result<RunSummary, ScrapeError> {
        let links = self.collect_links(search_url)?;
        self.store.save_links(&links)?;

        if links.is_empty() {
            warn!("No profile links found. Exiting.");
            return Ok(RunSummary::default());
        }

        let records = self.scrape_profiles(&links)?;
        Ok(RunSummary {
            links: links.len(),
            records: records.len(),
            failures: records.iter().filter(|r| r.is_error()).count(),
        })
    }

    fn collect_links(&mut self, search_url: &str) -> Result<Vec<DetailReference>, ScrapeError> {
        self.session.start()?;
        let links = self.collector.collect(&mut self.session, search_url);
        self.session.close();
        links
    }

    /// One record per link, in link order. Only fatal errors stop the loop.
    pub fn scrape_profiles(&mut self, links: &[DetailReference]) -> Result<Vec<ProfileRecord>, ScrapeError> {
        info!("Phase 2: Scraping {} profiles...", links.len());

        let total = links.len();
        let interval = self.crawl.checkpoint_interval.max(1);
        let mut records = Vec::with_capacity(total);
        self.session.start()?;

        for (i, link) in links.iter().enumerate() {
            let idx = i + 1;
            if i > 0 {
                delay_manager::random_profile_delay(self.crawl.profile_delay_secs);
            }
            info!("[{}/{}] Scraping: {}", idx, total, link);

            match self.scraper.scrape_profile(&mut self.session, link) {
                Ok(record) => {
                    info!("  -> {}", record.name);
                    records.push(record);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    error!("  -> Failed to scrape {}: {}", link, e);
                    records.push(ProfileRecord::failed(link, &e));
                    self.session.recreate()?;
                }
            }

            if idx % interval == 0 || idx == total {
                self.store.save_profiles(&records)?;
                info!("  -> Progress saved ({}/{}).", idx, total);
            }
        }

        self.session.close();
        info!("Phase 2 complete: {} profiles scraped.", records.len());
        Ok(records)
    }
}

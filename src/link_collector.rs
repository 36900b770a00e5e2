use scraper::{Html, Selector};
use url::Url;
use log::{info, warn};
use crate::config::{CrawlConfig, SiteConfig};
use crate::driver::DriverFactory;
use crate::error::ScrapeError;
use crate::extractor::compile;
use crate::record::{dedup_preserving_order, DetailReference};
use crate::retry::{ExhaustionPolicy, RetryOutcome};
use crate::session::PageSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The page never showed the search bar, even after recovery.
    SearchBarMissing,
    /// The page loaded but has no results container.
    NoResultsContainer,
    /// The results container is there but holds no profile links.
    NoLinks,
    /// The configured page cap was reached.
    PageLimit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStep {
    Links(Vec<DetailReference>),
    Stop(StopReason),
}

pub struct LinkCollector {
    results_marker: String,
    search_bar_marker: String,
    page_param: String,
    results_container: Selector,
    result_link: Selector,
    max_pages: usize,
}

impl LinkCollector {
    pub fn new(site: &SiteConfig, crawl: &CrawlConfig) -> Result<Self, ScrapeError> {
        Ok(LinkCollector {
            results_marker: site.results_marker.clone(),
            search_bar_marker: site.search_bar_marker.clone(),
            page_param: site.page_param.clone(),
            results_container: compile(&site.results_marker)?,
            result_link: compile(&site.result_link)?,
            max_pages: crawl.max_pages.max(1),
        })
    }

    /// Collects the deduplicated profile links of every result page, in
    /// discovery order.
    pub fn collect<F: DriverFactory>(
        &self,
        session: &mut PageSession<F>,
        search_url: &str,
    ) -> Result<Vec<DetailReference>, ScrapeError> {
        info!("Phase 1: Collecting profile links from search results...");

        let mut all_links = self.first_page(session, search_url)?;
        info!("Page 1: found {} links.", all_links.len());

        let mut page = 2;
        loop {
            if page > self.max_pages {
                warn!("Reached the page limit ({}). Stopping.", self.max_pages);
                break;
            }

            let page_url = self.page_url(search_url, page)?;
            match self.next_page(session, &page_url)? {
                PageStep::Links(links) => {
                    all_links.extend(links.iter().cloned());
                    info!(
                        "Page {}: found {} links (total: {}).",
                        page,
                        links.len(),
                        all_links.len()
                    );
                }
                PageStep::Stop(reason) => {
                    info!("End of search results at page {} ({:?}).", page, reason);
                    break;
                }
            }
            page += 1;
        }

        let unique = dedup_preserving_order(all_links);
        info!("Phase 1 complete: {} unique profile links collected.", unique.len());
        Ok(unique)
    }

    fn first_page<F: DriverFactory>(
        &self,
        session: &mut PageSession<F>,
        search_url: &str,
    ) -> Result<Vec<DetailReference>, ScrapeError> {
        session.navigate_and_wait(search_url, &self.results_marker, ExhaustionPolicy::Degrade)?;
        Ok(self.scroll_and_extract(session))
    }

    /// Loads one result page after the first and decides whether to go on.
    pub fn next_page<F: DriverFactory>(
        &self,
        session: &mut PageSession<F>,
        page_url: &str,
    ) -> Result<PageStep, ScrapeError> {
        if let Err(e) = session.navigate(page_url, &self.search_bar_marker) {
            warn!("Search bar not found on {} ({}). Reconnecting...", page_url, e);
            session.recreate()?;
            let outcome =
                session.navigate_and_wait(page_url, &self.results_marker, ExhaustionPolicy::Terminate)?;
            if outcome == RetryOutcome::Terminated {
                return Ok(PageStep::Stop(StopReason::SearchBarMissing));
            }
        }

        let has_results = match session.document() {
            Ok(document) => document.select(&self.results_container).next().is_some(),
            Err(e) => {
                warn!("Could not read {}: {}", page_url, e);
                false
            }
        };
        if !has_results {
            return Ok(PageStep::Stop(StopReason::NoResultsContainer));
        }

        let links = self.scroll_and_extract(session);
        if links.is_empty() {
            return Ok(PageStep::Stop(StopReason::NoLinks));
        }
        Ok(PageStep::Links(links))
    }

    /// A page that cannot be scrolled or read counts as a page without links.
    fn scroll_and_extract<F: DriverFactory>(&self, session: &mut PageSession<F>) -> Vec<DetailReference> {
        if let Err(e) = session.scroll_to_bottom() {
            warn!("Scrolling failed: {}", e);
        }
        match session.document() {
            Ok(document) => self.links_on_page(&document),
            Err(e) => {
                warn!("Could not read search results: {}", e);
                Vec::new()
            }
        }
    }

    pub fn links_on_page(&self, document: &Html) -> Vec<DetailReference> {
        document
            .select(&self.result_link)
            .filter_map(|a| a.value().attr("href"))
            .map(DetailReference::new)
            .collect()
    }

    pub fn page_url(&self, search_url: &str, page: usize) -> Result<String, ScrapeError> {
        let mut url = Url::parse(search_url).map_err(|source| ScrapeError::Url {
            url: search_url.to_string(),
            source,
        })?;

        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != self.page_param.as_str())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .append_pair(&self.page_param, &page.to_string());
        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use crate::connectivity::ConnectivityMonitor;
    use crate::session::SessionSettings;
    use crate::testing::{CountingReconnector, FakeFactory, FakeSite, ScriptedProbe};

    const SEARCH: &str = "https://site.test/dentiste/paris";

    fn results_page(links: &[&str]) -> String {
        let anchors: String = links
            .iter()
            .map(|l| format!(r#"<a class="dl-search-result-name js-search-result-path" href="{l}">x</a>"#))
            .collect();
        format!(r#"<html><body><input id="doctor_search_bar"><div class="results">{anchors}</div></body></html>"#)
    }

    fn collector(max_pages: usize) -> LinkCollector {
        let crawl = CrawlConfig { max_pages, ..CrawlConfig::default() };
        LinkCollector::new(&SiteConfig::default(), &crawl).unwrap()
    }

    fn page(n: usize) -> String {
        collector(10).page_url(SEARCH, n).unwrap()
    }

    fn session(site: &FakeSite) -> PageSession<FakeFactory> {
        let monitor = ConnectivityMonitor::new(
            Box::new(ScriptedProbe::up_after(0)),
            Box::new(CountingReconnector::default()),
            5,
            Duration::ZERO,
        );
        let settings = SessionSettings {
            page_load_wait: Duration::ZERO,
            scroll_pause: Duration::ZERO,
            max_attempts: 3,
        };
        let mut session = PageSession::new(site.factory(), monitor, settings);
        session.start().unwrap();
        session
    }

    fn refs(items: &[&str]) -> Vec<DetailReference> {
        items.iter().map(|s| DetailReference::new(*s)).collect()
    }

    #[test]
    fn page_url_sets_the_page_parameter() {
        let c = collector(10);
        assert_eq!(c.page_url(SEARCH, 2).unwrap(), "https://site.test/dentiste/paris?page=2");
        assert_eq!(
            c.page_url("https://site.test/dentiste/paris?availabilities=3&page=2", 3).unwrap(),
            "https://site.test/dentiste/paris?availabilities=3&page=3"
        );
        assert!(matches!(c.page_url("not a url", 2), Err(ScrapeError::Url { .. })));
    }

    #[test]
    fn stops_when_the_search_bar_never_appears() {
        let site = FakeSite::new()
            .page(SEARCH, &results_page(&["/a", "/b"]))
            .page(&page(2), "<html><body>captcha</body></html>");
        let mut s = session(&site);

        let links = collector(10).collect(&mut s, SEARCH).unwrap();
        assert_eq!(links, refs(&["/a", "/b"]));
        // One raw attempt, then three attempts through the retry wrapper.
        assert_eq!(site.visit_count(&page(2)), 4);
    }

    #[test]
    fn stops_when_the_results_container_is_missing() {
        let site = FakeSite::new()
            .page(SEARCH, &results_page(&["/a"]))
            .page(&page(2), r#"<html><body><input id="doctor_search_bar"><p>Aucun résultat</p></body></html>"#);
        let mut s = session(&site);

        let c = collector(10);
        assert_eq!(
            c.next_page(&mut s, &page(2)).unwrap(),
            PageStep::Stop(StopReason::NoResultsContainer)
        );
        assert_eq!(c.collect(&mut s, SEARCH).unwrap(), refs(&["/a"]));
    }

    #[test]
    fn stops_when_a_page_has_no_links() {
        let site = FakeSite::new()
            .page(SEARCH, &results_page(&["/a"]))
            .page(&page(2), &results_page(&[]));
        let mut s = session(&site);

        let c = collector(10);
        assert_eq!(c.next_page(&mut s, &page(2)).unwrap(), PageStep::Stop(StopReason::NoLinks));
        assert_eq!(c.collect(&mut s, SEARCH).unwrap(), refs(&["/a"]));
    }

    #[test]
    fn walks_pages_and_deduplicates_in_discovery_order() {
        let site = FakeSite::new()
            .page(SEARCH, &results_page(&["/a", "/b"]))
            .page(&page(2), &results_page(&["/a", "/c"]))
            .page(&page(3), &results_page(&["/b", "/d"]))
            .page(&page(4), &results_page(&[]));
        let mut s = session(&site);

        let links = collector(10).collect(&mut s, SEARCH).unwrap();
        assert_eq!(links, refs(&["/a", "/b", "/c", "/d"]));
    }

    #[test]
    fn recovers_a_transient_page_failure() {
        let site = FakeSite::new()
            .page(SEARCH, &results_page(&["/a"]))
            .page(&page(2), &results_page(&["/b"]))
            .flaky(&page(2), 1)
            .page(&page(3), &results_page(&[]));
        let mut s = session(&site);

        let links = collector(10).collect(&mut s, SEARCH).unwrap();
        assert_eq!(links, refs(&["/a", "/b"]));
        assert_eq!(site.visit_count(&page(2)), 2);
    }

    #[test]
    fn page_cap_bounds_an_endless_listing() {
        let mut site = FakeSite::new().page(SEARCH, &results_page(&["/p1"]));
        for n in 2..=6 {
            let link = format!("/p{n}");
            site = site.page(&page(n), &results_page(&[link.as_str()]));
        }
        let mut s = session(&site);

        let links = collector(3).collect(&mut s, SEARCH).unwrap();
        assert_eq!(links, refs(&["/p1", "/p2", "/p3"]));
        assert_eq!(site.visit_count(&page(4)), 0);
    }

    #[test]
    fn unreachable_first_page_yields_no_links() {
        let site = FakeSite::new();
        let mut s = session(&site);

        let links = collector(10).collect(&mut s, SEARCH).unwrap();
        assert!(links.is_empty());
    }
}

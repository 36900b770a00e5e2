use std::time::Duration;
use profile_scraper_lib::testing::{CountingReconnector, FakeFactory, FakeSite, ScriptedProbe};
use profile_scraper_lib::{
    ConnectivityMonitor, CsvStore, DetailReference, Pipeline, ProfileRecord, RecordStore, ScrapeError,
    ScraperConfig,
};

const BASE: &str = "https://site.test";
const SEARCH: &str = "https://site.test/dentiste/paris";
const PAGE_2: &str = "https://site.test/dentiste/paris?page=2";

#[derive(Default)]
struct RecordingStore {
    links: Option<Vec<DetailReference>>,
    snapshots: Vec<Vec<ProfileRecord>>,
}

impl RecordStore for RecordingStore {
    fn save_links(&mut self, links: &[DetailReference]) -> Result<(), ScrapeError> {
        self.links = Some(links.to_vec());
        Ok(())
    }

    fn save_profiles(&mut self, records: &[ProfileRecord]) -> Result<(), ScrapeError> {
        self.snapshots.push(records.to_vec());
        Ok(())
    }
}

fn config() -> ScraperConfig {
    let mut config = ScraperConfig::default();
    config.base_url = BASE.to_string();
    config.browser.page_load_wait_secs = 0;
    config.browser.scroll_pause_secs = 0;
    config.connectivity.reconnect_delay_secs = 0;
    config.connectivity.max_reconnect_attempts = 2;
    config.crawl.profile_delay_secs = None;
    config
}

fn monitor(probe: ScriptedProbe) -> ConnectivityMonitor {
    ConnectivityMonitor::new(
        Box::new(probe),
        Box::new(CountingReconnector::default()),
        2,
        Duration::ZERO,
    )
}

fn pipeline<S: RecordStore>(site: &FakeSite, probe: ScriptedProbe, store: S) -> Pipeline<FakeFactory, S> {
    Pipeline::from_config(&config(), site.factory(), monitor(probe), store).unwrap()
}

fn results_page(links: &[String]) -> String {
    let anchors: String = links
        .iter()
        .map(|l| format!(r#"<a class="dl-search-result-name js-search-result-path" href="{l}">x</a>"#))
        .collect();
    format!(r#"<html><body><input id="doctor_search_bar"><div class="results">{anchors}</div></body></html>"#)
}

const LAST_PAGE: &str = r#"<html><body><input id="doctor_search_bar"><p>Aucun résultat</p></body></html>"#;

fn profile_page(name: &str) -> String {
    format!(
        r#"<html><body>
             <h1 class="dl-profile-header-name">{name}</h1>
             <div class="dl-profile-address-picker-address-text"><div>Cabinet 1 Rue A</div><div>Cabinet</div></div>
           </body></html>"#
    )
}

/// One result page with `paths`, followed by an empty last page, with each
/// profile served under `BASE`.
fn site_with_profiles(paths: &[String]) -> FakeSite {
    let mut site = FakeSite::new()
        .page(SEARCH, &results_page(paths))
        .page(PAGE_2, LAST_PAGE);
    for (i, path) in paths.iter().enumerate() {
        site = site.page(&format!("{BASE}{path}"), &profile_page(&format!("Dr {i}")));
    }
    site
}

fn paths(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("/dentiste/paris/p{i}")).collect()
}

#[test]
fn every_link_gets_exactly_one_record_in_order() {
    let links = paths(3);
    let site = site_with_profiles(&links).broken(&format!("{BASE}{}", links[1]));
    let mut pipeline = pipeline(&site, ScriptedProbe::up_after(0), RecordingStore::default());

    let summary = pipeline.run(SEARCH).unwrap();
    assert_eq!(summary.links, 3);
    assert_eq!(summary.records, 3);
    assert_eq!(summary.failures, 1);

    let last = pipeline.store().snapshots.last().unwrap();
    let names: Vec<&str> = last.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Dr 0", ProfileRecord::ERROR_NAME, "Dr 2"]);
    assert_eq!(last[0].addresses, vec!["Cabinet -> 1 Rue A"]);
    assert_eq!(last[1].addresses, vec![links[1].clone()]);
    assert_eq!(last[1].contacts.len(), 1);
}

#[test]
fn progress_is_checkpointed_every_interval_and_at_the_end() {
    let site = site_with_profiles(&paths(7));
    let mut pipeline = pipeline(&site, ScriptedProbe::up_after(0), RecordingStore::default());

    pipeline.run(SEARCH).unwrap();

    let sizes: Vec<usize> = pipeline.store().snapshots.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![5, 7]);
    assert_eq!(pipeline.store().links.as_ref().map(Vec::len), Some(7));
}

#[test]
fn no_links_saves_an_empty_list_and_skips_extraction() {
    let site = FakeSite::new().page(SEARCH, &results_page(&[]));
    let mut pipeline = pipeline(&site, ScriptedProbe::up_after(0), RecordingStore::default());

    let summary = pipeline.run(SEARCH).unwrap();
    assert_eq!(summary.records, 0);
    assert_eq!(pipeline.store().links, Some(Vec::new()));
    assert!(pipeline.store().snapshots.is_empty());
}

#[test]
fn lost_connectivity_stops_the_run() {
    let links = paths(2);
    let site = site_with_profiles(&links).broken(&format!("{BASE}{}", links[0]));
    let mut pipeline = pipeline(&site, ScriptedProbe::never_up(), RecordingStore::default());

    let err = pipeline.run(SEARCH).unwrap_err();
    assert!(matches!(err, ScrapeError::ConnectivityLost { reconnects: 2 }));
    assert!(err.is_fatal());
    assert_eq!(site.visit_count(&format!("{BASE}{}", links[1])), 0);
}

#[test]
fn csv_store_receives_both_phases() {
    let dir = tempfile::tempdir().unwrap();
    let store = CsvStore::new(dir.path().join("links.csv"), dir.path().join("details.csv"));
    let site = site_with_profiles(&paths(2));
    let mut pipeline = pipeline(&site, ScriptedProbe::up_after(0), store);

    pipeline.run(SEARCH).unwrap();

    let mut links = csv::Reader::from_path(pipeline.store().links_path()).unwrap();
    assert_eq!(links.records().count(), 2);
    let mut details = csv::Reader::from_path(pipeline.store().details_path()).unwrap();
    let names: Vec<String> = details.records().map(|r| r.unwrap()[0].to_string()).collect();
    assert_eq!(names, vec!["Dr 0", "Dr 1"]);
}

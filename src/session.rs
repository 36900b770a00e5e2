use std::time::Duration;
use scraper::Html;
use log::{debug, info, warn};
use crate::config::BrowserConfig;
use crate::connectivity::ConnectivityMonitor;
use crate::delay_manager;
use crate::driver::{DriverFactory, PageDriver};
use crate::error::{DriverError, ScrapeError};
use crate::retry::{ExhaustionPolicy, RetryOutcome, RetryPolicy};

#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub page_load_wait: Duration,
    pub scroll_pause: Duration,
    pub max_attempts: usize,
}

impl From<&BrowserConfig> for SessionSettings {
    fn from(config: &BrowserConfig) -> Self {
        SessionSettings {
            page_load_wait: config.page_load_wait(),
            scroll_pause: config.scroll_pause(),
            max_attempts: config.max_navigation_attempts,
        }
    }
}

/// Owns at most one live driver. The old driver is always closed before a
/// new one is created.
pub struct PageSession<F: DriverFactory> {
    factory: F,
    monitor: ConnectivityMonitor,
    settings: SessionSettings,
    driver: Option<F::Driver>,
}

impl<F: DriverFactory> PageSession<F> {
    pub fn new(factory: F, monitor: ConnectivityMonitor, settings: SessionSettings) -> Self {
        PageSession { factory, monitor, settings, driver: None }
    }

    pub fn is_open(&self) -> bool {
        self.driver.is_some()
    }

    pub fn start(&mut self) -> Result<(), ScrapeError> {
        if self.driver.is_none() {
            self.driver = Some(self.factory.create()?);
        }
        Ok(())
    }

    pub fn close(&mut self) {
        if let Some(mut driver) = self.driver.take() {
            if let Err(e) = driver.close() {
                debug!("Ignoring error while closing browser: {}", e);
            }
        }
    }

    /// Close, wait for the network, open a fresh driver.
    ///
    /// Only connectivity exhaustion is an error. A failed launch leaves the
    /// session detached and the next navigation fails on its own.
    pub fn recreate(&mut self) -> Result<(), ScrapeError> {
        self.close();
        self.monitor.ensure_connectivity()?;
        match self.factory.create() {
            Ok(driver) => self.driver = Some(driver),
            Err(e) => warn!("Could not recreate browser session: {}", e),
        }
        Ok(())
    }

    /// One navigation plus marker wait, no recovery.
    pub fn navigate(&mut self, url: &str, marker: &str) -> Result<(), DriverError> {
        let wait = self.settings.page_load_wait;
        let driver = self.driver.as_mut().ok_or(DriverError::NoSession)?;
        driver.navigate(url)?;
        driver.wait_for_element(marker, wait)
    }

    /// Navigates and waits for `marker`, recreating the session between
    /// failed attempts. Under [`ExhaustionPolicy::Degrade`] the caller gets
    /// the last session back and must treat missing elements as absent data.
    pub fn navigate_and_wait(
        &mut self,
        url: &str,
        marker: &str,
        on_exhaustion: ExhaustionPolicy,
    ) -> Result<RetryOutcome<()>, ScrapeError> {
        let policy = RetryPolicy::new(self.settings.max_attempts, on_exhaustion);
        let operation = format!("Page load for {url}");
        policy.run(
            &operation,
            self,
            |session| session.navigate(url, marker),
            |session| session.recreate(),
        )
    }

    pub fn scroll_to_bottom(&mut self) -> Result<(), ScrapeError> {
        self.driver
            .as_mut()
            .ok_or(DriverError::NoSession)?
            .scroll_to_bottom()?;
        delay_manager::pause(self.settings.scroll_pause);
        Ok(())
    }

    pub fn markup(&mut self) -> Result<String, ScrapeError> {
        let driver = self.driver.as_mut().ok_or(DriverError::NoSession)?;
        Ok(driver.current_markup()?)
    }

    pub fn document(&mut self) -> Result<Html, ScrapeError> {
        Ok(Html::parse_document(&self.markup()?))
    }
}

impl<F: DriverFactory> Drop for PageSession<F> {
    fn drop(&mut self) {
        if self.driver.is_some() {
            info!("Closing browser session.");
        }
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CountingReconnector, FakeFactory, FakeSite, ScriptedProbe};

    const PAGE: &str = "https://site.test/profile";
    const HTML: &str = r#"<html><body><h1 class="dl-profile-header-name">Dr Jane</h1></body></html>"#;
    const MARKER: &str = ".dl-profile-header-name";

    fn settings() -> SessionSettings {
        SessionSettings {
            page_load_wait: Duration::ZERO,
            scroll_pause: Duration::ZERO,
            max_attempts: 3,
        }
    }

    fn session_with(site: &FakeSite, probe: ScriptedProbe) -> PageSession<FakeFactory> {
        let monitor = ConnectivityMonitor::new(
            Box::new(probe),
            Box::new(CountingReconnector::default()),
            5,
            Duration::ZERO,
        );
        PageSession::new(site.factory(), monitor, settings())
    }

    #[test]
    fn loads_page_on_first_attempt() {
        let site = FakeSite::new().page(PAGE, HTML);
        let mut session = session_with(&site, ScriptedProbe::up_after(0));
        session.start().unwrap();

        let outcome = session.navigate_and_wait(PAGE, MARKER, ExhaustionPolicy::Degrade).unwrap();
        assert!(outcome.is_success());
        assert_eq!(site.drivers_created(), 1);
        assert!(session.markup().unwrap().contains("Dr Jane"));
    }

    #[test]
    fn recreates_the_driver_after_a_failed_attempt() {
        let site = FakeSite::new().page(PAGE, HTML).flaky(PAGE, 2);
        let mut session = session_with(&site, ScriptedProbe::up_after(0));
        session.start().unwrap();

        let outcome = session.navigate_and_wait(PAGE, MARKER, ExhaustionPolicy::Degrade).unwrap();
        assert!(outcome.is_success());
        assert_eq!(site.visit_count(PAGE), 3);
        assert_eq!(site.drivers_created(), 3);
        assert_eq!(site.drivers_closed(), 2);
    }

    #[test]
    fn exhaustion_degrades_to_the_last_session() {
        let site = FakeSite::new().page(PAGE, "<html><body>blocked</body></html>");
        let mut session = session_with(&site, ScriptedProbe::up_after(0));
        session.start().unwrap();

        let outcome = session.navigate_and_wait(PAGE, MARKER, ExhaustionPolicy::Degrade).unwrap();
        assert_eq!(outcome, RetryOutcome::Degraded);
        assert_eq!(site.visit_count(PAGE), 3);
        assert!(session.is_open());
        assert!(session.markup().unwrap().contains("blocked"));
    }

    #[test]
    fn close_failures_do_not_block_recreation() {
        let site = FakeSite::new().page(PAGE, HTML).failing_closes();
        let mut session = session_with(&site, ScriptedProbe::up_after(0));
        session.start().unwrap();

        session.recreate().unwrap();
        assert!(session.is_open());
        assert_eq!(site.drivers_closed(), 1);
        assert_eq!(site.drivers_created(), 2);

        session.close();
        assert!(!session.is_open());
    }

    #[test]
    fn connectivity_loss_during_recovery_is_fatal() {
        let site = FakeSite::new();
        let mut session = session_with(&site, ScriptedProbe::never_up());
        session.start().unwrap();

        let err = session
            .navigate_and_wait(PAGE, MARKER, ExhaustionPolicy::Degrade)
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(site.visits(), vec![PAGE.to_string()]);
    }

    #[test]
    fn failed_relaunch_leaves_a_detached_session_that_retries() {
        let site = FakeSite::new().page(PAGE, HTML).flaky(PAGE, 1);
        let mut session = session_with(&site, ScriptedProbe::up_after(0));
        session.start().unwrap();

        // The relaunch after the first failure fails, so attempt two has no
        // driver; the relaunch after that succeeds.
        let site = site.failing_creates(1);
        let outcome = session.navigate_and_wait(PAGE, MARKER, ExhaustionPolicy::Degrade).unwrap();
        assert!(outcome.is_success());
        assert_eq!(site.visit_count(PAGE), 2);
    }

    #[test]
    fn close_is_idempotent_and_markup_needs_a_session() {
        let site = FakeSite::new();
        let mut session = session_with(&site, ScriptedProbe::up_after(0));
        session.start().unwrap();
        session.close();
        session.close();

        assert_eq!(site.drivers_closed(), 1);
        assert!(matches!(
            session.markup(),
            Err(ScrapeError::Driver(DriverError::NoSession))
        ));
    }
}

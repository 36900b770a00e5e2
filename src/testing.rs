//! In-memory fakes for the browser and network collaborators.
//!
//! `FakeDriver::wait_for_element` evaluates the selector against the stored
//! page markup, so tests describe a site purely as `url -> html`.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use scraper::{Html, Selector};
use crate::connectivity::{Probe, Reconnector};
use crate::driver::{DriverFactory, PageDriver};
use crate::error::DriverError;

#[derive(Default)]
struct SiteState {
    pages: HashMap<String, String>,
    broken_markup: HashSet<String>,
    flaky: HashMap<String, usize>,
    failing_creates: usize,
    failing_closes: bool,
    visits: Vec<String>,
    drivers_created: usize,
    drivers_closed: usize,
}

#[derive(Clone, Default)]
pub struct FakeSite {
    state: Arc<Mutex<SiteState>>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SiteState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Serves `html` at `url`. Unknown urls fail to navigate.
    pub fn page(self, url: &str, html: &str) -> Self {
        self.lock().pages.insert(url.to_string(), html.to_string());
        self
    }

    /// Navigation to `url` succeeds but reading its markup fails.
    pub fn broken(self, url: &str) -> Self {
        self.lock().broken_markup.insert(url.to_string());
        self
    }

    /// The first `failures` navigations to `url` fail.
    pub fn flaky(self, url: &str, failures: usize) -> Self {
        self.lock().flaky.insert(url.to_string(), failures);
        self
    }

    /// The next `count` driver creations fail.
    pub fn failing_creates(self, count: usize) -> Self {
        self.lock().failing_creates = count;
        self
    }

    /// Every driver close reports an error (after being counted).
    pub fn failing_closes(self) -> Self {
        self.lock().failing_closes = true;
        self
    }

    pub fn factory(&self) -> FakeFactory {
        FakeFactory { site: self.clone() }
    }

    /// Every navigation attempt, in order, successful or not.
    pub fn visits(&self) -> Vec<String> {
        self.lock().visits.clone()
    }

    pub fn visit_count(&self, url: &str) -> usize {
        self.lock().visits.iter().filter(|v| v.as_str() == url).count()
    }

    pub fn drivers_created(&self) -> usize {
        self.lock().drivers_created
    }

    pub fn drivers_closed(&self) -> usize {
        self.lock().drivers_closed
    }
}

pub struct FakeFactory {
    site: FakeSite,
}

impl DriverFactory for FakeFactory {
    type Driver = FakeDriver;

    fn create(&self) -> Result<FakeDriver, DriverError> {
        let mut state = self.site.lock();
        if state.failing_creates > 0 {
            state.failing_creates -= 1;
            return Err(DriverError::Launch("fake launch failure".to_string()));
        }
        state.drivers_created += 1;
        Ok(FakeDriver { site: self.site.clone(), current: None })
    }
}

pub struct FakeDriver {
    site: FakeSite,
    current: Option<String>,
}

impl FakeDriver {
    fn current_html(&self) -> Option<String> {
        let url = self.current.as_ref()?;
        self.site.lock().pages.get(url).cloned()
    }
}

impl PageDriver for FakeDriver {
    fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        let mut state = self.site.lock();
        state.visits.push(url.to_string());
        self.current = None;

        if let Some(remaining) = state.flaky.get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(DriverError::Navigation {
                    url: url.to_string(),
                    reason: "flaky".to_string(),
                });
            }
        }

        if !state.pages.contains_key(url) {
            return Err(DriverError::Navigation {
                url: url.to_string(),
                reason: "not found".to_string(),
            });
        }
        self.current = Some(url.to_string());
        Ok(())
    }

    fn wait_for_element(&mut self, selector: &str, timeout: Duration) -> Result<(), DriverError> {
        let timed_out = || DriverError::ElementTimeout {
            selector: selector.to_string(),
            timeout,
        };
        let html = self.current_html().ok_or_else(timed_out)?;
        let parsed = Selector::parse(selector).map_err(|_| timed_out())?;
        if Html::parse_document(&html).select(&parsed).next().is_some() {
            Ok(())
        } else {
            Err(timed_out())
        }
    }

    fn current_markup(&mut self) -> Result<String, DriverError> {
        if let Some(url) = &self.current {
            if self.site.lock().broken_markup.contains(url) {
                return Err(DriverError::Markup(format!("renderer crashed on {url}")));
            }
        }
        Ok(self
            .current_html()
            .unwrap_or_else(|| "<html><body></body></html>".to_string()))
    }

    fn scroll_to_bottom(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), DriverError> {
        let mut state = self.site.lock();
        state.drivers_closed += 1;
        if state.failing_closes {
            return Err(DriverError::Close("fake close failure".to_string()));
        }
        Ok(())
    }
}

/// Reports "offline" for the first `down_for` checks, then "online".
#[derive(Clone)]
pub struct ScriptedProbe {
    down_for: usize,
    checks: Arc<AtomicUsize>,
}

impl ScriptedProbe {
    pub fn up_after(down_for: usize) -> Self {
        ScriptedProbe { down_for, checks: Arc::new(AtomicUsize::new(0)) }
    }

    pub fn never_up() -> Self {
        Self::up_after(usize::MAX)
    }

    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

impl Probe for ScriptedProbe {
    fn is_connected(&self) -> bool {
        let previous = self.checks.fetch_add(1, Ordering::SeqCst);
        previous >= self.down_for
    }
}

#[derive(Clone, Default)]
pub struct CountingReconnector {
    calls: Arc<AtomicUsize>,
}

impl CountingReconnector {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Reconnector for CountingReconnector {
    fn reconnect(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

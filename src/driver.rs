use std::ffi::OsStr;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use headless_chrome::{Browser, LaunchOptions, Tab};
use log::debug;
use crate::config::BrowserConfig;
use crate::error::DriverError;

const SCROLL_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight);";

// Alternate formatting prints the whole error chain.
fn describe(e: impl Display) -> String {
    format!("{e:#}")
}

/// One live browser page. Selectors are CSS selectors.
pub trait PageDriver {
    fn navigate(&mut self, url: &str) -> Result<(), DriverError>;
    fn wait_for_element(&mut self, selector: &str, timeout: Duration) -> Result<(), DriverError>;
    fn current_markup(&mut self) -> Result<String, DriverError>;
    fn scroll_to_bottom(&mut self) -> Result<(), DriverError>;
    fn close(&mut self) -> Result<(), DriverError>;
}

pub trait DriverFactory {
    type Driver: PageDriver;

    fn create(&self) -> Result<Self::Driver, DriverError>;
}

pub struct ChromeDriver {
    // Dropping the browser kills the Chrome process, so it lives as long as the tab.
    _browser: Browser,
    tab: Arc<Tab>,
}

impl PageDriver for ChromeDriver {
    fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        let nav_err = |reason: String| DriverError::Navigation {
            url: url.to_string(),
            reason,
        };
        self.tab.navigate_to(url).map_err(|e| nav_err(describe(e)))?;
        self.tab.wait_until_navigated().map_err(|e| nav_err(describe(e)))?;
        Ok(())
    }

    fn wait_for_element(&mut self, selector: &str, timeout: Duration) -> Result<(), DriverError> {
        self.tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .map(|_| ())
            .map_err(|e| {
                debug!("Waiting for {} failed: {:#}", selector, e);
                DriverError::ElementTimeout {
                    selector: selector.to_string(),
                    timeout,
                }
            })
    }

    fn current_markup(&mut self) -> Result<String, DriverError> {
        self.tab
            .get_content()
            .map_err(|e| DriverError::Markup(describe(e)))
    }

    fn scroll_to_bottom(&mut self) -> Result<(), DriverError> {
        self.tab
            .evaluate(SCROLL_SCRIPT, false)
            .map(|_| ())
            .map_err(|e| DriverError::Close(describe(e)))
    }

    fn close(&mut self) -> Result<(), DriverError> {
        self.tab
            .close(false)
            .map(|_| ())
            .map_err(|e| DriverError::Script(describe(e)))
    }
}

pub struct ChromeFactory {
    config: BrowserConfig,
}

impl ChromeFactory {
    pub fn new(config: BrowserConfig) -> Self {
        ChromeFactory { config }
    }
}

impl DriverFactory for ChromeFactory {
    type Driver = ChromeDriver;

    fn create(&self) -> Result<ChromeDriver, DriverError> {
        let args = vec![
            OsStr::new("--disable-blink-features=AutomationControlled"),
            OsStr::new("--disable-dev-shm-usage"),
        ];

        let browser = Browser::new(LaunchOptions {
            headless: self.config.headless,
            sandbox: false,
            window_size: Some(self.config.window_size),
            idle_browser_timeout: self.config.idle_timeout(),
            args,
            ..Default::default()
        })
        .map_err(|e| DriverError::Launch(describe(e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| DriverError::Launch(describe(e)))?;

        debug!("Browser session created.");
        Ok(ChromeDriver { _browser: browser, tab })
    }
}

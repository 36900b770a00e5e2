use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::error::ScrapeError;

const DEFAULT_CONFIG_FILE: &str = "scraper.json";

/// Top-level settings. Every field has a default so a config file only needs
/// the values it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub base_url: String,
    pub links_csv: PathBuf,
    pub details_csv: PathBuf,
    pub log_file: PathBuf,
    pub connectivity: ConnectivityConfig,
    pub browser: BrowserConfig,
    pub crawl: CrawlConfig,
    pub site: SiteConfig,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        ScraperConfig {
            base_url: "https://www.doctolib.fr".to_string(),
            links_csv: PathBuf::from("doctolib_profile_link.csv"),
            details_csv: PathBuf::from("doctolib_profile_details.csv"),
            log_file: PathBuf::from("scraper.log"),
            connectivity: ConnectivityConfig::default(),
            browser: BrowserConfig::default(),
            crawl: CrawlConfig::default(),
            site: SiteConfig::default(),
        }
    }
}

impl ScraperConfig {
    /// The file `load` reads: `path` if given, else `./scraper.json` when it
    /// exists. `None` means built-in defaults.
    pub fn source(path: Option<&Path>) -> Option<PathBuf> {
        match path {
            Some(p) => Some(p.to_path_buf()),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                fallback.exists().then_some(fallback)
            }
        }
    }

    pub fn load(path: Option<&Path>) -> Result<Self, ScrapeError> {
        match Self::source(path) {
            Some(path) => Self::from_json(&fs::read_to_string(path)?),
            None => Ok(ScraperConfig::default()),
        }
    }

    pub fn from_json(content: &str) -> Result<Self, ScrapeError> {
        Ok(serde_json::from_str(content)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    pub host: String,
    pub port: u16,
    pub timeout_secs: u64,
    pub max_reconnect_attempts: usize,
    pub reconnect_delay_secs: u64,
    /// Program and arguments run to re-establish the VPN. Empty disables it.
    pub vpn_command: Vec<String>,
    pub vpn_timeout_secs: u64,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        let vpn_command = if cfg!(windows) {
            vec!["nordvpn".to_string(), "-c".to_string()]
        } else {
            vec!["nordvpn".to_string(), "connect".to_string()]
        };

        ConnectivityConfig {
            host: "one.one.one.one".to_string(),
            port: 80,
            timeout_secs: 3,
            max_reconnect_attempts: 5,
            reconnect_delay_secs: 10,
            vpn_command,
            vpn_timeout_secs: 30,
        }
    }
}

impl ConnectivityConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn vpn_timeout(&self) -> Duration {
        Duration::from_secs(self.vpn_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    pub window_size: (u32, u32),
    pub page_load_wait_secs: u64,
    pub scroll_pause_secs: u64,
    pub max_navigation_attempts: usize,
    /// How long the browser may sit idle (e.g. during reconnect sleeps) before
    /// the CDP connection is dropped.
    pub idle_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        BrowserConfig {
            headless: false,
            window_size: (1920, 1080),
            page_load_wait_secs: 8,
            scroll_pause_secs: 2,
            max_navigation_attempts: 3,
            idle_timeout_secs: 300,
        }
    }
}

impl BrowserConfig {
    pub fn page_load_wait(&self) -> Duration {
        Duration::from_secs(self.page_load_wait_secs)
    }

    pub fn scroll_pause(&self) -> Duration {
        Duration::from_secs(self.scroll_pause_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Upper bound on result pages visited, page 1 included.
    pub max_pages: usize,
    pub checkpoint_interval: usize,
    /// Optional random pause (min, max seconds) between two profiles.
    pub profile_delay_secs: Option<(u64, u64)>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        CrawlConfig {
            max_pages: 500,
            checkpoint_interval: 5,
            profile_delay_secs: None,
        }
    }
}

/// CSS selectors and literals describing the target site's markup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub page_param: String,
    pub results_marker: String,
    pub search_bar_marker: String,
    pub result_link: String,
    pub profile_name_marker: String,
    pub profile_name: String,
    pub address_container: String,
    pub skills_section: String,
    pub skill_chip: String,
    pub history_section: String,
    pub history_title: String,
    pub history_entry: String,
    pub entry_time: String,
    pub entry_label: String,
    pub contact_section: String,
    pub contact_box: String,
    pub contact_subtitle: String,
    pub alternate_link: String,
    pub opening_hours_marker: String,
    pub degree_separator: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        SiteConfig {
            page_param: "page".to_string(),
            results_marker: ".results".to_string(),
            search_bar_marker: "#doctor_search_bar".to_string(),
            result_link: "a.dl-search-result-name.js-search-result-path[href]".to_string(),
            profile_name_marker: ".dl-profile-header-name".to_string(),
            profile_name: "h1.dl-profile-header-name".to_string(),
            address_container: "div.dl-profile-address-picker-address-text".to_string(),
            skills_section: "div#skills".to_string(),
            skill_chip: "div.dl-profile-skill-chip".to_string(),
            history_section: "div.dl-profile-card-section.dl-profile-history".to_string(),
            history_title: "h4.dl-profile-card-title".to_string(),
            history_entry: "div.dl-profile-text.dl-profile-entry".to_string(),
            entry_time: "div.dl-profile-entry-time".to_string(),
            entry_label: "div.dl-profile-entry-label".to_string(),
            contact_section: "div#openings_and_contact".to_string(),
            contact_box: "div.dl-profile-box".to_string(),
            contact_subtitle: "h4.dl-profile-card-subtitle".to_string(),
            alternate_link: "a.dl-text[href]".to_string(),
            opening_hours_marker: "Horaires d'ouverture".to_string(),
            degree_separator: "---".to_string(),
        }
    }
}

pub mod config;
pub mod connectivity;
pub mod delay_manager;
pub mod driver;
pub mod error;
pub mod extractor;
pub mod input;
pub mod link_collector;
pub mod logger;
pub mod pipeline;
pub mod profile;
pub mod record;
pub mod retry;
pub mod session;
pub mod store;
pub mod testing;

// Exporting types for convenience
pub use config::ScraperConfig;
pub use connectivity::ConnectivityMonitor;
pub use driver::{ChromeFactory, DriverFactory, PageDriver};
pub use error::{DriverError, ScrapeError};
pub use pipeline::{Pipeline, RunSummary};
pub use record::{DetailReference, ProfileRecord};
pub use store::{CsvStore, RecordStore};

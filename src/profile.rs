use url::Url;
use log::{debug, info};
use crate::config::SiteConfig;
use crate::driver::DriverFactory;
use crate::error::ScrapeError;
use crate::extractor::Extractor;
use crate::record::{DetailReference, ProfileRecord};
use crate::retry::ExhaustionPolicy;
use crate::session::PageSession;

/// Visits one profile, plus each of its alternate practice locations, and
/// assembles a single record.
pub struct ProfileScraper {
    base_url: Url,
    name_marker: String,
    extractor: Extractor,
}

impl ProfileScraper {
    pub fn new(base_url: &str, site: &SiteConfig) -> Result<Self, ScrapeError> {
        let base_url = Url::parse(base_url).map_err(|source| ScrapeError::Url {
            url: base_url.to_string(),
            source,
        })?;

        Ok(ProfileScraper {
            base_url,
            name_marker: site.profile_name_marker.clone(),
            extractor: Extractor::new(site)?,
        })
    }

    /// Absolute url of a reference; absolute references pass through.
    pub fn absolute_url(&self, reference: &DetailReference) -> Result<String, ScrapeError> {
        self.base_url
            .join(reference.as_str())
            .map(String::from)
            .map_err(|source| ScrapeError::Url {
                url: reference.to_string(),
                source,
            })
    }

    /// Errors are left to the caller, which decides how a failed profile is
    /// recorded.
    pub fn scrape_profile<F: DriverFactory>(
        &self,
        session: &mut PageSession<F>,
        reference: &DetailReference,
    ) -> Result<ProfileRecord, ScrapeError> {
        let url = self.absolute_url(reference)?;
        session.navigate_and_wait(&url, &self.name_marker, ExhaustionPolicy::Degrade)?;
        session.scroll_to_bottom()?;
        let document = session.document()?;

        let name = self.extractor.extract_name(&document);
        let mut record = ProfileRecord::from_primary(name, self.extractor.extract_location(&document));

        let alternates = self.extractor.alternate_links(&document, reference);
        if !alternates.is_empty() {
            info!("  -> {} additional location(s)", alternates.len());
        }

        for alternate in alternates {
            let alt_url = self.absolute_url(&alternate)?;
            debug!("Visiting alternate location {}", alt_url);
            session.navigate_and_wait(&alt_url, &self.name_marker, ExhaustionPolicy::Degrade)?;
            session.scroll_to_bottom()?;
            let alt_document = session.document()?;
            record.merge_location(self.extractor.extract_location(&alt_document));
        }

        Ok(record)
    }
}

use scraper::{ElementRef, Html, Selector};
use log::debug;
use crate::config::SiteConfig;
use crate::error::ScrapeError;
use crate::record::{DetailReference, LocationDetails};

const UNKNOWN_NAME: &str = "Unknown";

pub(crate) fn compile(selector: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(selector).map_err(|e| ScrapeError::Selector {
        selector: selector.to_string(),
        reason: format!("{e:?}"),
    })
}

pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Joins the practice name and the address it is embedded in.
///
/// The practice name is removed from the address by plain substring
/// replacement, so every occurrence of it goes.
pub fn format_address(full_address: &str, practice_name: &str) -> String {
    let full_address = full_address.trim();
    let practice_name = practice_name.trim();
    if practice_name.is_empty() {
        return full_address.to_string();
    }
    let address = full_address.replace(practice_name, "");
    format!("{} -> {}", practice_name, address.trim())
}

/// Profile-page field extraction. Every method tolerates missing markup and
/// returns an empty value instead of failing.
pub struct Extractor {
    profile_name: Selector,
    address_container: Selector,
    div: Selector,
    skills_section: Selector,
    skill_chip: Selector,
    history_section: Selector,
    history_title: Selector,
    history_entry: Selector,
    entry_time: Selector,
    entry_label: Selector,
    contact_section: Selector,
    contact_box: Selector,
    contact_subtitle: Selector,
    alternate_link: Selector,
    opening_hours_marker: String,
    degree_separator: String,
}

impl Extractor {
    pub fn new(site: &SiteConfig) -> Result<Self, ScrapeError> {
        Ok(Extractor {
            profile_name: compile(&site.profile_name)?,
            address_container: compile(&site.address_container)?,
            div: compile("div")?,
            skills_section: compile(&site.skills_section)?,
            skill_chip: compile(&site.skill_chip)?,
            history_section: compile(&site.history_section)?,
            history_title: compile(&site.history_title)?,
            history_entry: compile(&site.history_entry)?,
            entry_time: compile(&site.entry_time)?,
            entry_label: compile(&site.entry_label)?,
            contact_section: compile(&site.contact_section)?,
            contact_box: compile(&site.contact_box)?,
            contact_subtitle: compile(&site.contact_subtitle)?,
            alternate_link: compile(&site.alternate_link)?,
            opening_hours_marker: site.opening_hours_marker.clone(),
            degree_separator: site.degree_separator.clone(),
        })
    }

    pub fn extract_name(&self, document: &Html) -> String {
        document
            .select(&self.profile_name)
            .next()
            .map(element_text)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| UNKNOWN_NAME.to_string())
    }

    pub fn extract_address(&self, document: &Html) -> String {
        let Some(container) = document.select(&self.address_container).next() else {
            debug!("No address block on page.");
            return String::new();
        };

        let mut blocks = container.select(&self.div);
        let full_address = blocks.next().map(element_text).unwrap_or_default();
        let practice_name = blocks.next().map(element_text).unwrap_or_default();
        format_address(&full_address, &practice_name)
    }

    pub fn extract_skills(&self, document: &Html) -> Vec<String> {
        let Some(section) = document.select(&self.skills_section).next() else {
            debug!("No skills section on page.");
            return Vec::new();
        };

        section.select(&self.skill_chip).map(element_text).collect()
    }

    pub fn extract_degrees(&self, document: &Html) -> Vec<String> {
        let mut degrees = Vec::new();

        for section in document.select(&self.history_section) {
            if let Some(header) = section.select(&self.history_title).next() {
                degrees.push(element_text(header));
                degrees.push(self.degree_separator.clone());
            }

            for entry in section.select(&self.history_entry) {
                let year = entry.select(&self.entry_time).next().map(element_text).unwrap_or_default();
                let label = entry.select(&self.entry_label).next().map(element_text).unwrap_or_default();

                if year.is_empty() && label.is_empty() {
                    continue;
                }
                if year.is_empty() {
                    degrees.push(label);
                } else {
                    degrees.push(format!("{} - {}", year, label));
                }
            }
        }
        degrees
    }

    pub fn extract_contacts(&self, document: &Html) -> Vec<String> {
        let Some(section) = document.select(&self.contact_section).next() else {
            debug!("No contact section on page.");
            return Vec::new();
        };

        let mut contacts = Vec::new();
        for contact_box in section.select(&self.contact_box) {
            let Some(subtitle) = contact_box.select(&self.contact_subtitle).next() else {
                continue;
            };
            let header = element_text(subtitle);
            if header.contains(&self.opening_hours_marker) {
                continue;
            }
            let content = contact_box.select(&self.div).next().map(element_text).unwrap_or_default();
            contacts.push(format!("{}: {}", header, content));
        }
        contacts
    }

    /// Every field that can differ between two locations of a profile.
    pub fn extract_location(&self, document: &Html) -> LocationDetails {
        LocationDetails {
            address: self.extract_address(document),
            skills: self.extract_skills(document),
            degrees: self.extract_degrees(document),
            contacts: self.extract_contacts(document),
        }
    }

    /// Links to the other practice locations of the profile at `reference`.
    pub fn alternate_links(&self, document: &Html, reference: &DetailReference) -> Vec<DetailReference> {
        let base_path = reference.base_path();
        let mut links: Vec<DetailReference> = Vec::new();

        for anchor in document.select(&self.alternate_link) {
            if let Some(href) = anchor.value().attr("href") {
                if href.contains(base_path) && href != reference.as_str() {
                    let link = DetailReference::new(href);
                    if !links.contains(&link) {
                        links.push(link);
                    }
                }
            }
        }
        links
    }
}

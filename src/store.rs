use std::path::{Path, PathBuf};
use serde::Serialize;
use log::info;
use crate::error::ScrapeError;
use crate::record::{DetailReference, ProfileRecord};

// Each save replaces the previous file with the full snapshot.
pub trait RecordStore {
    fn save_links(&mut self, links: &[DetailReference]) -> Result<(), ScrapeError>;
    fn save_profiles(&mut self, records: &[ProfileRecord]) -> Result<(), ScrapeError>;
}

#[derive(Serialize)]
struct LinkRow<'a> {
    profile_link: &'a str,
}

#[derive(Serialize)]
struct ProfileRow {
    name: String,
    addresses: String,
    skills: String,
    degrees: String,
    contacts: String,
}

impl From<&ProfileRecord> for ProfileRow {
    fn from(record: &ProfileRecord) -> Self {
        ProfileRow {
            name: record.name.clone(),
            addresses: record.addresses.join("\n"),
            skills: record.skills.join(", "),
            degrees: record.degrees.join("\n"),
            contacts: record.contacts.join("\n"),
        }
    }
}

pub struct CsvStore {
    links_path: PathBuf,
    details_path: PathBuf,
}

impl CsvStore {
    pub fn new(links_path: impl Into<PathBuf>, details_path: impl Into<PathBuf>) -> Self {
        CsvStore {
            links_path: links_path.into(),
            details_path: details_path.into(),
        }
    }

    pub fn links_path(&self) -> &Path {
        &self.links_path
    }

    pub fn details_path(&self) -> &Path {
        &self.details_path
    }
}

impl RecordStore for CsvStore {
    fn save_links(&mut self, links: &[DetailReference]) -> Result<(), ScrapeError> {
        let mut writer = headerless_writer(&self.links_path)?;
        writer.write_record(["profile_link"])?;
        for link in links {
            writer.serialize(LinkRow { profile_link: link.as_str() })?;
        }
        writer.flush()?;
        info!("Links saved to {:?}.", self.links_path);
        Ok(())
    }

    fn save_profiles(&mut self, records: &[ProfileRecord]) -> Result<(), ScrapeError> {
        let mut writer = headerless_writer(&self.details_path)?;
        writer.write_record(["name", "addresses", "skills", "degrees", "contacts"])?;
        for record in records {
            writer.serialize(ProfileRow::from(record))?;
        }
        writer.flush()?;
        Ok(())
    }
}

// Headers are written by hand so that an empty snapshot still gets one.
fn headerless_writer(path: &Path) -> Result<csv::Writer<std::fs::File>, ScrapeError> {
    Ok(csv::WriterBuilder::new().has_headers(false).from_path(path)?)
}

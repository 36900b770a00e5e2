use std::fmt;
use serde::Serialize;

/// Relative path (or absolute url) of one profile's primary page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DetailReference(String);

impl DetailReference {
    pub fn new(href: impl Into<String>) -> Self {
        DetailReference(href.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The reference without its query string; shared by every location tab
    /// of the same profile.
    pub fn base_path(&self) -> &str {
        self.0.split('?').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for DetailReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn dedup_preserving_order(links: Vec<DetailReference>) -> Vec<DetailReference> {
    let mut seen = std::collections::HashSet::new();
    links
        .into_iter()
        .filter(|link| seen.insert(link.clone()))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationDetails {
    pub address: String,
    pub skills: Vec<String>,
    pub degrees: Vec<String>,
    pub contacts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRecord {
    pub name: String,
    pub addresses: Vec<String>,
    pub skills: Vec<String>,
    pub degrees: Vec<String>,
    pub contacts: Vec<String>,
}

impl ProfileRecord {
    pub const ERROR_NAME: &'static str = "ERROR";

    /// Starts a record from the primary location. Degrees and contacts are
    /// kept verbatim: the degree separator legitimately repeats per section.
    pub fn from_primary(name: String, primary: LocationDetails) -> Self {
        let mut skills = Vec::new();
        extend_unique(&mut skills, primary.skills);

        ProfileRecord {
            name,
            addresses: if primary.address.is_empty() {
                Vec::new()
            } else {
                vec![primary.address]
            },
            skills,
            degrees: primary.degrees,
            contacts: primary.contacts,
        }
    }

    /// Placeholder row keeping the output aligned with the link list.
    pub fn failed(reference: &DetailReference, error: impl fmt::Display) -> Self {
        ProfileRecord {
            name: Self::ERROR_NAME.to_string(),
            addresses: vec![reference.to_string()],
            skills: Vec::new(),
            degrees: Vec::new(),
            contacts: vec![error.to_string()],
        }
    }

    pub fn is_error(&self) -> bool {
        self.name == Self::ERROR_NAME
    }

    /// Appends the entries of another location that are not present yet.
    pub fn merge_location(&mut self, location: LocationDetails) {
        if !location.address.is_empty() {
            push_unique(&mut self.addresses, location.address);
        }
        extend_unique(&mut self.skills, location.skills);
        extend_unique(&mut self.degrees, location.degrees);
        extend_unique(&mut self.contacts, location.contacts);
    }
}

fn push_unique(target: &mut Vec<String>, entry: String) {
    if !target.contains(&entry) {
        target.push(entry);
    }
}

fn extend_unique(target: &mut Vec<String>, entries: Vec<String>) {
    for entry in entries {
        push_unique(target, entry);
    }
}

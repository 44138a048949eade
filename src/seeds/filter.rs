//! Seed filter predicate, conjoining whichever fields are present.

use std::collections::HashSet;

/// Predicate over columnar index rows. Every present field is conjoined;
/// absent fields are unconstrained.
#[derive(Debug, Clone, Default)]
pub struct SeedFilter {
    pub statuses: Option<HashSet<i32>>,
    pub mimes: Option<HashSet<String>>,
    pub languages: Option<HashSet<String>>,
    pub domains: Option<HashSet<String>>,
    pub tlds: Option<HashSet<String>>,
    pub limit: Option<usize>,
}

impl SeedFilter {
    pub fn matches(&self, status: i32, mime: &str, languages: &str, domain: &str) -> bool {
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&status) {
                return false;
            }
        }
        if let Some(mimes) = &self.mimes {
            if !mimes.contains(mime) {
                return false;
            }
        }
        if let Some(wanted) = &self.languages {
            let present = languages.split(',').map(str::trim);
            if !present.clone().any(|lang| wanted.contains(lang)) {
                return false;
            }
        }
        if let Some(domains) = &self.domains {
            if !domains.contains(domain) {
                return false;
            }
        }
        if let Some(tlds) = &self.tlds {
            let tld = domain.rsplit('.').next().unwrap_or("");
            if !tlds.contains(tld) {
                return false;
            }
        }
        true
    }
}

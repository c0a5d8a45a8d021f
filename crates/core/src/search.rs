//! Search and specialty filtering over the in-memory active list.

use crate::model::ActiveRecord;
use serde::Deserialize;

/// Free-text search plus an optional specialty.
///
/// A record passes when its patient name contains the term (ignoring case) or its MRN contains
/// the term (exact case), and, if a specialty is set, its specialty equals it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SearchFilter {
    #[serde(default)]
    pub term: String,
    #[serde(default)]
    pub specialty: Option<String>,
}

impl SearchFilter {
    pub fn new(term: impl Into<String>, specialty: Option<String>) -> Self {
        Self {
            term: term.into(),
            specialty: specialty.filter(|s| !s.is_empty()),
        }
    }

    pub fn matches(&self, record: &ActiveRecord) -> bool {
        self.matches_term(record) && self.matches_specialty(record)
    }

    /// Records passing the filter, in list order.
    pub fn apply<'a>(&self, records: &'a [ActiveRecord]) -> Vec<&'a ActiveRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }

    fn matches_term(&self, record: &ActiveRecord) -> bool {
        let name = record.patient_name().to_lowercase();
        name.contains(&self.term.to_lowercase()) || record.mrn().as_str().contains(&self.term)
    }

    fn matches_specialty(&self, record: &ActiveRecord) -> bool {
        match self.specialty.as_deref() {
            None | Some("") => true,
            Some(specialty) => record.specialty() == specialty,
        }
    }
}

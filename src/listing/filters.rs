use std::collections::BTreeSet;

use crate::catalog::Record;

pub const FILTER_MISSING_IMAGES: &str = "missing-images";
pub const FILTER_BLANK_DESCRIPTION: &str = "blank-description";
pub const FILTER_MISSING_ALT_TEXT: &str = "missing-alt-text";

pub const KNOWN_FILTERS: &[&str] = &[
    FILTER_MISSING_IMAGES,
    FILTER_BLANK_DESCRIPTION,
    FILTER_MISSING_ALT_TEXT,
];

// a set of named disqualifying predicates. each identifier names an attribute
// the caller wants records to LACK, so a record possessing the attribute is
// dropped. order-insensitive, deduplicated; the empty set means no filtering.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterSet {
    identifiers: BTreeSet<String>,
}

impl FilterSet {
    pub fn from_values(values: &[String]) -> Self {
        let identifiers = values
            .iter()
            .flat_map(|v| v.split(','))
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();
        Self { identifiers }
    }

    pub fn from_csv(input: &str) -> Self {
        Self::from_values(std::slice::from_ref(&input.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.identifiers.iter().map(|s| s.as_str())
    }

    pub fn unknown_identifiers(&self) -> Vec<&str> {
        self.identifiers()
            .filter(|id| !KNOWN_FILTERS.contains(id))
            .collect()
    }

    // true when any active predicate's disqualifying condition holds.
    // unknown identifiers never disqualify.
    pub fn disqualifies(&self, record: &Record) -> bool {
        self.identifiers.iter().any(|id| match id.as_str() {
            FILTER_MISSING_IMAGES => record.has_image(),
            FILTER_BLANK_DESCRIPTION => record.has_description(),
            FILTER_MISSING_ALT_TEXT => record.has_alt_text(),
            _ => false,
        })
    }

    pub fn keeps(&self, record: &Record) -> bool {
        !self.disqualifies(record)
    }
}

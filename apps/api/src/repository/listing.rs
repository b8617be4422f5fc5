//! Back-office listing metadata: which columns of each section are
//! searchable and which accept equality filters.

use std::collections::BTreeMap;

use crate::models::choices::{ComputerProficiency, LanguageProficiency, MembershipType};
use crate::models::sections::SectionKind;

#[derive(Debug, Clone, Copy)]
pub enum FilterKind {
    Year,
    Choice(fn(&str) -> bool),
}

/// Listing metadata for one section.
#[derive(Debug, Clone, Copy)]
pub struct ListingSpec {
    /// Text columns matched by free-text search, in addition to the parent
    /// submission's name.
    pub search: &'static [&'static str],
    pub filters: &'static [(&'static str, FilterKind)],
}

fn language_proficiency(v: &str) -> bool {
    LanguageProficiency::parse(v).is_some()
}

fn computer_proficiency(v: &str) -> bool {
    ComputerProficiency::parse(v).is_some()
}

fn membership_type(v: &str) -> bool {
    MembershipType::parse(v).is_some()
}

const LANGUAGE_FILTERS: &[(&str, FilterKind)] =
    &[("proficiency", FilterKind::Choice(language_proficiency))];
const COMPUTER_FILTERS: &[(&str, FilterKind)] =
    &[("proficiency", FilterKind::Choice(computer_proficiency))];
const MEMBERSHIP_FILTERS: &[(&str, FilterKind)] = &[
    ("membership_type", FilterKind::Choice(membership_type)),
    ("year_joined", FilterKind::Year),
];

pub fn listing_spec(kind: SectionKind) -> ListingSpec {
    match kind {
        SectionKind::Language => ListingSpec {
            search: &["language"],
            filters: LANGUAGE_FILTERS,
        },
        SectionKind::Computer => ListingSpec {
            search: &["skill"],
            filters: COMPUTER_FILTERS,
        },
        SectionKind::Education => ListingSpec {
            search: &["degree", "institution"],
            filters: &[("year", FilterKind::Year)],
        },
        SectionKind::Membership => ListingSpec {
            search: &["organization"],
            filters: MEMBERSHIP_FILTERS,
        },
        SectionKind::Research => ListingSpec {
            search: &["area"],
            filters: &[],
        },
        SectionKind::Training => ListingSpec {
            search: &["title", "institution"],
            filters: &[("year", FilterKind::Year)],
        },
        SectionKind::Project => ListingSpec {
            search: &["title"],
            filters: &[
                ("start_year", FilterKind::Year),
                ("end_year", FilterKind::Year),
            ],
        },
        SectionKind::Award => ListingSpec {
            search: &["name", "organization"],
            filters: &[("year", FilterKind::Year)],
        },
        SectionKind::Patent => ListingSpec {
            search: &["title", "patent_number"],
            filters: &[("year", FilterKind::Year)],
        },
        SectionKind::Grant => ListingSpec {
            search: &["title", "amount"],
            filters: &[("year", FilterKind::Year)],
        },
        SectionKind::Institution => ListingSpec {
            search: &["name", "purpose"],
            filters: &[],
        },
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Int(i32),
    Text(String),
}

/// A parsed section listing request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionQuery {
    pub search: Option<String>,
    pub filters: Vec<(&'static str, FilterValue)>,
}

impl SectionQuery {
    /// Parses query-string parameters against the section's listing spec.
    /// Unknown parameters and malformed values are rejected; blank values
    /// are ignored.
    pub fn from_params(kind: SectionKind, params: &BTreeMap<String, String>) -> Result<Self, String> {
        let spec = listing_spec(kind);
        let mut query = SectionQuery::default();

        for (key, value) in params {
            if key == "search" {
                query.search = Some(value.clone());
                continue;
            }
            let (column, filter) = spec
                .filters
                .iter()
                .find(|(column, _)| *column == key.as_str())
                .ok_or_else(|| format!("Unknown filter '{key}' for section '{}'", kind.key()))?;
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let parsed = match filter {
                FilterKind::Year => value
                    .parse::<i32>()
                    .map(FilterValue::Int)
                    .map_err(|_| format!("Filter '{key}' must be a whole number"))?,
                FilterKind::Choice(is_valid) => {
                    if !is_valid(value) {
                        return Err(format!("Filter '{key}' has unknown value '{value}'"));
                    }
                    FilterValue::Text(value.to_string())
                }
            };
            query.filters.push((*column, parsed));
        }

        Ok(query)
    }
}

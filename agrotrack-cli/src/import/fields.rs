//! Canonical fields and the column-label pattern tables for each record kind

use anyhow::{Result, bail};
use std::collections::BTreeMap;

use crate::types::RecordKind;

/// Application-level field a spreadsheet column can map onto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CanonicalField {
    Name,
    BusinessName,
    RefCode,
    Address,
    Contact,
    District,
    Commodities,
    Quantities,
    Email,
    DateOfVisit,
    Status,
    Remarks,
    Latitude,
    Longitude,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 14] = [
        CanonicalField::Name,
        CanonicalField::BusinessName,
        CanonicalField::RefCode,
        CanonicalField::Address,
        CanonicalField::Contact,
        CanonicalField::District,
        CanonicalField::Commodities,
        CanonicalField::Quantities,
        CanonicalField::Email,
        CanonicalField::DateOfVisit,
        CanonicalField::Status,
        CanonicalField::Remarks,
        CanonicalField::Latitude,
        CanonicalField::Longitude,
    ];

    /// Key used in configuration files and export headers
    pub fn key(&self) -> &'static str {
        match self {
            CanonicalField::Name => "name",
            CanonicalField::BusinessName => "business_name",
            CanonicalField::RefCode => "ref_code",
            CanonicalField::Address => "address",
            CanonicalField::Contact => "contact",
            CanonicalField::District => "district",
            CanonicalField::Commodities => "commodities",
            CanonicalField::Quantities => "quantities",
            CanonicalField::Email => "email",
            CanonicalField::DateOfVisit => "date_of_visit",
            CanonicalField::Status => "status",
            CanonicalField::Remarks => "remarks",
            CanonicalField::Latitude => "latitude",
            CanonicalField::Longitude => "longitude",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }

    pub fn is_date(&self) -> bool {
        matches!(self, CanonicalField::DateOfVisit)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, CanonicalField::Latitude | CanonicalField::Longitude)
    }
}

impl std::fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Ordered canonical-field → label-pattern table.
///
/// Patterns are lower-case. Order matters twice: fields are resolved in
/// table order, and within a field the first matching pattern wins.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldTable {
    kind: RecordKind,
    entries: Vec<(CanonicalField, Vec<String>)>,
}

impl FieldTable {
    /// Empty table for a kind, to be filled with `with_patterns`
    pub fn empty(kind: RecordKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
        }
    }

    /// Built-in table for a record kind
    pub fn for_kind(kind: RecordKind) -> Self {
        let table = Self::empty(kind);
        let table = match kind {
            RecordKind::Farmer => table
                .with_patterns(CanonicalField::Name, ["name", "farmer", "farmer name", "full name"]),
            RecordKind::AgroProcessor => table
                .with_patterns(
                    CanonicalField::Name,
                    ["name", "farmer", "business name", "businessname", "company", "entity"],
                )
                .with_patterns(
                    CanonicalField::BusinessName,
                    ["business name", "businessname", "company", "entity", "business"],
                ),
        };

        table
            .with_patterns(CanonicalField::RefCode, ["ref", "ref no", "ref. no", "reference"])
            .with_patterns(CanonicalField::Address, ["address", "location", "village"])
            .with_patterns(CanonicalField::Contact, ["contact", "phone", "mobile", "telephone"])
            .with_patterns(CanonicalField::District, ["district", "region"])
            .with_patterns(
                CanonicalField::Commodities,
                ["commodities", "commodity", "crops", "crop", "products", "value chain"],
            )
            .with_patterns(CanonicalField::Quantities, ["quantities", "quantity", "volume", "qty"])
            .with_patterns(CanonicalField::Email, ["email", "e-mail", "mail"])
            .with_patterns(
                CanonicalField::DateOfVisit,
                ["date of visit", "visit date", "date"],
            )
            .with_patterns(CanonicalField::Status, ["status"])
            .with_patterns(CanonicalField::Remarks, ["remarks", "remark", "comments", "notes"])
            .with_patterns(CanonicalField::Latitude, ["latitude", "lat"])
            .with_patterns(CanonicalField::Longitude, ["longitude", "lng", "lon"])
    }

    /// Set the pattern list of a field, replacing any existing list in place
    pub fn with_patterns<I, S>(mut self, field: CanonicalField, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns: Vec<String> = patterns
            .into_iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();

        match self.entries.iter_mut().find(|(f, _)| *f == field) {
            Some((_, existing)) => *existing = patterns,
            None => self.entries.push((field, patterns)),
        }
        self
    }

    /// Replace pattern lists from configuration (keys are canonical field keys)
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, Vec<String>>) -> Result<Self> {
        for (key, patterns) in overrides {
            let Some(field) = CanonicalField::from_key(key) else {
                bail!(
                    "Unknown field '{}' in import pattern overrides (expected one of: {})",
                    key,
                    CanonicalField::ALL.map(|f| f.key()).join(", ")
                );
            };
            if field == CanonicalField::BusinessName && self.kind == RecordKind::Farmer {
                bail!("Farmers have no business_name field");
            }
            self = self.with_patterns(field, patterns);
        }
        Ok(self)
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn entries(&self) -> &[(CanonicalField, Vec<String>)] {
        &self.entries
    }

    pub fn patterns(&self, field: CanonicalField) -> &[String] {
        self.entries
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, p)| p.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_field(&self, field: CanonicalField) -> bool {
        self.entries.iter().any(|(f, _)| *f == field)
    }
}

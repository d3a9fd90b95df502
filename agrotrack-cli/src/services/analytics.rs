//! Aggregates for the dashboard-style `stats` command

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::types::{Record, RecordKind, Visit};

/// Bucket for blank district/status values and unparseable visit dates
pub const UNSPECIFIED: &str = "(unspecified)";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub kind: RecordKind,
    pub total: usize,
    pub with_visit_date: usize,
    pub with_coordinates: usize,
    pub by_district: BTreeMap<String, usize>,
    /// A record counts once for every commodity it lists
    pub by_commodity: BTreeMap<String, usize>,
    pub by_status: BTreeMap<String, usize>,
    /// `YYYY-MM` → visits to records of this kind
    pub visits_per_month: BTreeMap<String, usize>,
}

impl Summary {
    /// Entries of a breakdown sorted by descending count, then name
    pub fn ranked(counts: &BTreeMap<String, usize>) -> Vec<(&str, usize)> {
        let mut ranked: Vec<(&str, usize)> =
            counts.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        ranked
    }
}

fn bucket(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        UNSPECIFIED.to_string()
    } else {
        value.to_string()
    }
}

/// Commodity keys are case-folded so "Maize" and "maize" count together
fn commodity_key(value: &str) -> String {
    value.trim().to_lowercase()
}

fn month_of(date: &str) -> String {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map(|d| d.format("%Y-%m").to_string())
        .unwrap_or_else(|_| UNSPECIFIED.to_string())
}

/// Aggregate records of one kind and their visits
pub fn summarize(kind: RecordKind, records: &[Record], visits: &[Visit]) -> Summary {
    let mut summary = Summary {
        kind,
        total: 0,
        with_visit_date: 0,
        with_coordinates: 0,
        by_district: BTreeMap::new(),
        by_commodity: BTreeMap::new(),
        by_status: BTreeMap::new(),
        visits_per_month: BTreeMap::new(),
    };

    for record in records.iter().filter(|r| r.kind == kind) {
        let fields = &record.fields;
        summary.total += 1;
        if fields.has_visit() {
            summary.with_visit_date += 1;
        }
        if fields.latitude.is_some() && fields.longitude.is_some() {
            summary.with_coordinates += 1;
        }
        *summary.by_district.entry(bucket(&fields.district)).or_default() += 1;
        *summary.by_status.entry(bucket(&fields.status)).or_default() += 1;
        for commodity in &fields.commodities {
            *summary.by_commodity.entry(commodity_key(commodity)).or_default() += 1;
        }
    }

    for visit in visits.iter().filter(|v| v.kind == kind) {
        *summary.visits_per_month.entry(month_of(&visit.date)).or_default() += 1;
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RecordDraft, RecordId};
    use chrono::Utc;

    fn record(kind: RecordKind, name: &str, district: &str, commodities: &[&str]) -> Record {
        let mut fields = RecordDraft::new(name);
        fields.district = district.to_string();
        fields.commodities = commodities.iter().map(|c| c.to_string()).collect();
        Record {
            id: RecordId::new(name),
            kind,
            fields,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn visit(kind: RecordKind, date: &str) -> Visit {
        Visit {
            id: date.to_string(),
            related_id: RecordId::new("x"),
            kind,
            date: date.to_string(),
            remarks: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_summarize_counts() {
        let records = vec![
            record(RecordKind::Farmer, "Alice", "Kilosa", &["Maize", "beans"]),
            record(RecordKind::Farmer, "Bob", "Kilosa", &["maize"]),
            record(RecordKind::Farmer, "Cara", " ", &[]),
            record(RecordKind::AgroProcessor, "Mill", "Kilosa", &["maize"]),
        ];
        let visits = vec![
            visit(RecordKind::Farmer, "2024-03-01"),
            visit(RecordKind::Farmer, "2024-03-20"),
            visit(RecordKind::Farmer, "March"),
            visit(RecordKind::AgroProcessor, "2024-04-01"),
        ];

        let summary = summarize(RecordKind::Farmer, &records, &visits);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.by_district["Kilosa"], 2);
        assert_eq!(summary.by_district[UNSPECIFIED], 1);
        assert_eq!(summary.by_commodity["maize"], 2);
        assert_eq!(summary.by_commodity["beans"], 1);
        assert_eq!(summary.by_status[UNSPECIFIED], 3);
        assert_eq!(summary.visits_per_month["2024-03"], 2);
        assert_eq!(summary.visits_per_month[UNSPECIFIED], 1);
        assert!(!summary.visits_per_month.contains_key("2024-04"));
    }

    #[test]
    fn test_ranked_orders_by_count() {
        let mut counts = BTreeMap::new();
        counts.insert("rice".to_string(), 2);
        counts.insert("beans".to_string(), 5);
        counts.insert("maize".to_string(), 2);
        assert_eq!(
            Summary::ranked(&counts),
            vec![("beans", 5), ("maize", 2), ("rice", 2)]
        );
    }

    #[test]
    fn test_empty_summary() {
        let summary = summarize(RecordKind::AgroProcessor, &[], &[]);
        assert_eq!(summary.total, 0);
        assert!(summary.by_district.is_empty());
    }
}

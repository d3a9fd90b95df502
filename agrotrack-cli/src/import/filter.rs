//! Accept/skip decision for normalized rows
//!
//! Every row passes through `assess` exactly once, and every skip is counted
//! through `SkipCounts`.

use serde::Serialize;

use crate::types::RecordDraft;

/// Names that are really a repeated header row
pub const HEADER_ECHOES: &[&str] = &["name", "no.", "business name", "farmer name"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    EmptyName,
    NameTooShort,
    HeaderEcho,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::EmptyName => write!(f, "empty name"),
            SkipReason::NameTooShort => write!(f, "name too short"),
            SkipReason::HeaderEcho => write!(f, "repeated header row"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Skip(SkipReason),
}

/// Decide whether a normalized record is imported
pub fn assess(draft: &RecordDraft) -> Decision {
    let name = draft.name.trim();
    if name.is_empty() {
        return Decision::Skip(SkipReason::EmptyName);
    }
    if name.chars().count() <= 1 {
        return Decision::Skip(SkipReason::NameTooShort);
    }
    let lowered = name.to_lowercase();
    if HEADER_ECHOES.contains(&lowered.as_str()) {
        return Decision::Skip(SkipReason::HeaderEcho);
    }
    Decision::Accept
}

/// Skipped-row tally by reason
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SkipCounts {
    pub empty_name: usize,
    pub name_too_short: usize,
    pub header_echo: usize,
}

impl SkipCounts {
    pub fn record(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::EmptyName => self.empty_name += 1,
            SkipReason::NameTooShort => self.name_too_short += 1,
            SkipReason::HeaderEcho => self.header_echo += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.empty_name + self.name_too_short + self.header_echo
    }

    pub fn merge(&mut self, other: &SkipCounts) {
        self.empty_name += other.empty_name;
        self.name_too_short += other.name_too_short;
        self.header_echo += other.header_echo;
    }

    /// Non-zero counts with their reason
    pub fn breakdown(&self) -> Vec<(SkipReason, usize)> {
        [
            (SkipReason::EmptyName, self.empty_name),
            (SkipReason::NameTooShort, self.name_too_short),
            (SkipReason::HeaderEcho, self.header_echo),
        ]
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> RecordDraft {
        RecordDraft::new(name)
    }

    #[test]
    fn test_header_echo_any_case() {
        assert_eq!(assess(&named("Name")), Decision::Skip(SkipReason::HeaderEcho));
        assert_eq!(assess(&named(" NAME ")), Decision::Skip(SkipReason::HeaderEcho));
        assert_eq!(assess(&named("No.")), Decision::Skip(SkipReason::HeaderEcho));
        assert_eq!(assess(&named("Business Name")), Decision::Skip(SkipReason::HeaderEcho));
        assert_eq!(assess(&named("farmer NAME")), Decision::Skip(SkipReason::HeaderEcho));
    }

    #[test]
    fn test_short_and_empty() {
        assert_eq!(assess(&named("A")), Decision::Skip(SkipReason::NameTooShort));
        assert_eq!(assess(&named("  ")), Decision::Skip(SkipReason::EmptyName));
        assert_eq!(assess(&named("")), Decision::Skip(SkipReason::EmptyName));
    }

    #[test]
    fn test_accepts_real_names() {
        assert_eq!(assess(&named("Alice")), Decision::Accept);
        assert_eq!(assess(&named("Jo")), Decision::Accept);
        assert_eq!(assess(&named("Names Ltd")), Decision::Accept);
    }

    #[test]
    fn test_skip_counts() {
        let mut counts = SkipCounts::default();
        counts.record(SkipReason::EmptyName);
        counts.record(SkipReason::EmptyName);
        counts.record(SkipReason::HeaderEcho);
        assert_eq!(counts.total(), 3);
        assert_eq!(
            counts.breakdown(),
            vec![(SkipReason::EmptyName, 2), (SkipReason::HeaderEcho, 1)]
        );

        let mut other = SkipCounts::default();
        other.record(SkipReason::NameTooShort);
        counts.merge(&other);
        assert_eq!(counts.total(), 4);
        assert_eq!(counts.name_too_short, 1);
    }
}

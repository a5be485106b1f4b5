//! # Snapshot Diff
//!
//! The core of the job: a full outer join of the persisted snapshot and the
//! freshly fetched batch, keyed by handle.
//!
//! - Handle only in the snapshot: the record is kept as-is and nothing is
//!   reported. A user missing from one week's roster is never deleted.
//! - Handle only in the batch: the batch record lands in the merge and the
//!   handle is reported as a new user.
//! - Handle in both: the batch record always wins in the merge (fresher data,
//!   even when equal), and every tracked field whose value differs is
//!   reported with its old/new pair.
//!
//! Pure and synchronous: both inputs are fully materialized maps, so the
//! engine itself needs no I/O and no locking.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::models::{MergedSnapshot, Snapshot, UpdateBatch, UserRecord};

/// The fields the diff tracks. Everything else on a record (name fields)
/// is carried through the merge but never reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Field {
    Email,
    Country,
    MaxRank,
    MaxRating,
    Contribution,
    Languages,
}

impl Field {
    pub const TRACKED: [Field; 6] = [
        Field::Email,
        Field::Country,
        Field::MaxRank,
        Field::MaxRating,
        Field::Contribution,
        Field::Languages,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::Email => "email",
            Field::Country => "country",
            Field::MaxRank => "maxRank",
            Field::MaxRating => "maxRating",
            Field::Contribution => "contribution",
            Field::Languages => "languages",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    NewUser,
    Changed {
        /// Tracked field -> (old value, new value).
        deltas: BTreeMap<Field, (Value, Value)>,
    },
}

impl Change {
    pub fn changed_fields(&self) -> Vec<Field> {
        match self {
            Change::NewUser => Vec::new(),
            Change::Changed { deltas } => deltas.keys().copied().collect(),
        }
    }
}

/// Handles with something to report; unchanged handles never materialize.
pub type ChangeReport = BTreeMap<String, Change>;

/// A record's tracked field as a comparable value. Numerics are plain i64
/// (absent upstream values were already coerced to 0 at deserialization),
/// and `languages` serializes from a set, so equality here is set equality
/// regardless of upstream ordering or duplicates.
fn field_value(record: &UserRecord, field: Field) -> Value {
    match field {
        Field::Email => json!(record.email),
        Field::Country => json!(record.country),
        Field::MaxRank => json!(record.max_rank),
        Field::MaxRating => json!(record.max_rating),
        Field::Contribution => json!(record.contribution),
        Field::Languages => json!(record.languages),
    }
}

pub fn diff(current: &Snapshot, updates: &UpdateBatch) -> (MergedSnapshot, ChangeReport) {
    let mut merged = MergedSnapshot::new();
    let mut report = ChangeReport::new();

    // Left side first: everything known survives unless overwritten below.
    for (handle, record) in current {
        if handle.is_empty() {
            continue;
        }
        merged.insert(handle.clone(), record.clone());
    }

    for (handle, update) in updates {
        if handle.is_empty() {
            continue;
        }

        match current.get(handle) {
            None => {
                merged.insert(handle.clone(), update.clone());
                report.insert(handle.clone(), Change::NewUser);
            }
            Some(prior) => {
                let mut deltas = BTreeMap::new();
                for field in Field::TRACKED {
                    let old_value = field_value(prior, field);
                    let new_value = field_value(update, field);
                    if old_value != new_value {
                        deltas.insert(field, (old_value, new_value));
                    }
                }

                merged.insert(handle.clone(), update.clone());
                if !deltas.is_empty() {
                    report.insert(handle.clone(), Change::Changed { deltas });
                }
            }
        }
    }

    (merged, report)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn record(handle: &str, email: Option<&str>, rating: i64, languages: &[&str]) -> UserRecord {
        UserRecord {
            handle: handle.to_string(),
            first_name: None,
            last_name: None,
            email: email.map(str::to_string),
            country: None,
            max_rank: None,
            max_rating: rating,
            contribution: 0,
            languages: languages.iter().map(|l| l.to_string()).collect(),
        }
    }

    fn keyed(records: Vec<UserRecord>) -> BTreeMap<String, UserRecord> {
        records
            .into_iter()
            .map(|r| (r.handle.clone(), r))
            .collect()
    }

    #[test]
    fn disjoint_inputs_report_only_new_users() {
        let current = keyed(vec![record("alice", None, 2100, &["C++"])]);
        let updates = keyed(vec![
            record("bob", None, 2500, &["Python"]),
            record("carol", None, 1500, &[]),
        ]);

        let (merged, report) = diff(&current, &updates);

        assert_eq!(report.len(), 2);
        assert_eq!(report.get("bob"), Some(&Change::NewUser));
        assert_eq!(report.get("carol"), Some(&Change::NewUser));
        assert!(!report.contains_key("alice"));
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn identical_inputs_report_nothing() {
        let current = keyed(vec![
            record("alice", Some("a@x.io"), 2100, &["C++", "Java"]),
            record("bob", Some("b@x.io"), 1800, &["Python"]),
        ]);

        let (merged, report) = diff(&current, &current.clone());

        assert!(report.is_empty());
        assert_eq!(merged, current);
    }

    #[test]
    fn email_change_yields_single_delta() {
        let current = keyed(vec![record("alice", Some("old@x.io"), 2100, &["C++"])]);
        let updates = keyed(vec![record("alice", Some("new@x.io"), 2100, &["C++"])]);

        let (merged, report) = diff(&current, &updates);

        let Some(Change::Changed { deltas }) = report.get("alice") else {
            panic!("expected a Changed entry for alice");
        };
        assert_eq!(deltas.len(), 1);
        assert_eq!(
            deltas.get(&Field::Email),
            Some(&(json!("old@x.io"), json!("new@x.io")))
        );
        assert_eq!(merged["alice"].email.as_deref(), Some("new@x.io"));
    }

    #[test]
    fn language_comparison_ignores_order() {
        let current = keyed(vec![record("alice", None, 2100, &["C++", "Java"])]);
        let updates = keyed(vec![record("alice", None, 2100, &["Java", "C++"])]);

        let (_, report) = diff(&current, &updates);
        assert!(report.is_empty());
    }

    #[test]
    fn disappeared_handle_is_kept_and_unreported() {
        let current = keyed(vec![
            record("alice", None, 2100, &["C++"]),
            record("gone", Some("g@x.io"), 2400, &["Java"]),
        ]);
        let updates = keyed(vec![record("alice", None, 2100, &["C++"])]);

        let (merged, report) = diff(&current, &updates);

        assert!(report.is_empty());
        assert_eq!(merged.get("gone"), current.get("gone"));
    }

    #[test]
    fn fresher_record_wins_even_for_untracked_fields() {
        let mut old = record("alice", None, 2100, &["C++"]);
        old.first_name = Some("Alicia".to_string());
        let mut new = record("alice", None, 2100, &["C++"]);
        new.first_name = Some("Alice".to_string());

        let (merged, report) = diff(&keyed(vec![old]), &keyed(vec![new]));

        // Name fields are not tracked, so nothing is reported, but the
        // merge still carries the fresher value.
        assert!(report.is_empty());
        assert_eq!(merged["alice"].first_name.as_deref(), Some("Alice"));
    }

    #[test]
    fn empty_handles_never_reach_the_join() {
        let current = keyed(vec![record("", Some("ghost@x.io"), 3000, &[])]);
        let updates = keyed(vec![record("", Some("ghost@x.io"), 3100, &[])]);

        let (merged, report) = diff(&current, &updates);
        assert!(merged.is_empty());
        assert!(report.is_empty());
    }

    #[test]
    fn rating_and_language_growth_scenario() {
        let current = keyed(vec![record("alice", None, 2200, &["C++"])]);
        let updates = keyed(vec![
            record("alice", None, 2300, &["C++", "Java"]),
            record("bob", None, 2500, &["Python"]),
        ]);

        let (merged, report) = diff(&current, &updates);

        assert_eq!(report.get("bob"), Some(&Change::NewUser));
        let Some(Change::Changed { deltas }) = report.get("alice") else {
            panic!("expected a Changed entry for alice");
        };
        let fields: Vec<Field> = deltas.keys().copied().collect();
        assert_eq!(fields, vec![Field::MaxRating, Field::Languages]);
        assert_eq!(
            deltas.get(&Field::MaxRating),
            Some(&(json!(2200), json!(2300)))
        );

        assert_eq!(merged["alice"].max_rating, 2300);
        assert_eq!(
            merged["alice"].languages,
            BTreeSet::from(["C++".to_string(), "Java".to_string()])
        );
        assert_eq!(merged["bob"].max_rating, 2500);
    }
}

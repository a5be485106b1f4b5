use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

pub const API_BASE: &str = "https://codeforces.com/api";

/// Every Codeforces API response wraps its payload in this envelope.
/// `result` is absent when `status` is "FAILED".
#[derive(Deserialize)]
pub struct ApiEnvelope<T> {
    pub status: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub result: Option<T>,
}

/// One entry of `user.ratedList`. Numeric fields default to 0 so a profile
/// that never entered a rated contest still deserializes cleanly.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatedUser {
    #[serde(default)]
    pub handle: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub max_rank: Option<String>,
    #[serde(default)]
    pub max_rating: i64,
    #[serde(default)]
    pub contribution: i64,
}

/// One entry of `user.status`. Submissions still in the judging queue have
/// no verdict yet.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    #[serde(default)]
    pub verdict: Option<String>,
    #[serde(default)]
    pub programming_language: String,
}

/// One tracked user as held in the snapshot. `languages` is a set in memory
/// and an ordered list at the storage boundary; `BTreeSet` gives both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub handle: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
    pub max_rank: Option<String>,
    pub max_rating: i64,
    pub contribution: i64,
    pub languages: BTreeSet<String>,
}

impl UserRecord {
    pub fn from_profile(profile: RatedUser, languages: BTreeSet<String>) -> Self {
        Self {
            handle: profile.handle,
            first_name: profile.first_name,
            last_name: profile.last_name,
            email: profile.email,
            country: profile.country,
            max_rank: profile.max_rank,
            max_rating: profile.max_rating,
            contribution: profile.contribution,
            languages,
        }
    }
}

/// Last persisted state, keyed by handle.
pub type Snapshot = BTreeMap<String, UserRecord>;

/// Freshly fetched state, keyed by handle.
pub type UpdateBatch = BTreeMap<String, UserRecord>;

/// Union of snapshot and update batch with the freshest value per field.
pub type MergedSnapshot = BTreeMap<String, UserRecord>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rated_user_deserializes_camel_case() {
        let json = r#"{
            "handle": "tourist",
            "email": "t@example.com",
            "firstName": "Gennady",
            "country": "Belarus",
            "maxRank": "legendary grandmaster",
            "maxRating": 3979,
            "contribution": 128
        }"#;

        let user: RatedUser = serde_json::from_str(json).unwrap();
        assert_eq!(user.handle, "tourist");
        assert_eq!(user.max_rank.as_deref(), Some("legendary grandmaster"));
        assert_eq!(user.max_rating, 3979);
        assert_eq!(user.last_name, None);
    }

    #[test]
    fn missing_numerics_default_to_zero() {
        let user: RatedUser = serde_json::from_str(r#"{"handle": "newbie"}"#).unwrap();
        assert_eq!(user.max_rating, 0);
        assert_eq!(user.contribution, 0);
    }

    #[test]
    fn envelope_carries_failure_comment() {
        let json = r#"{"status": "FAILED", "comment": "handle: not found"}"#;
        let envelope: ApiEnvelope<Vec<RatedUser>> = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.status, "FAILED");
        assert_eq!(envelope.comment.as_deref(), Some("handle: not found"));
        assert!(envelope.result.is_none());
    }

    #[test]
    fn envelope_carries_result_list() {
        let json = r#"{"status": "OK", "result": [{"verdict": "OK", "programmingLanguage": "GNU C++17"}]}"#;
        let envelope: ApiEnvelope<Vec<Submission>> = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.status, "OK");
        assert_eq!(envelope.result.unwrap().len(), 1);
    }
}

//! # Codeforces API
//!
//! Read-only client for the two methods the job needs:
//! - `user.ratedList` for the active rated roster
//! - `user.status` for one user's submission history
//!
//! Calls are signed when API credentials are configured (apiKey + unix time +
//! 6-digit nonce + SHA-512 over the sorted query string), unsigned otherwise.
//! A malformed response body counts as an empty result so one bad payload
//! does not abort the whole run; a `FAILED` status is fatal for the call
//! since it signals a systemic API problem.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use futures_util::{stream, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use reqwest::Client;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha512};
use tracing::warn;

use crate::{
    config::Config,
    error::AppError,
    models::{ApiEnvelope, RatedUser, Submission, UpdateBatch, UserRecord, API_BASE},
};

struct ApiAuth {
    key: String,
    secret: String,
}

pub struct CodeforcesClient {
    http: Client,
    auth: Option<ApiAuth>,
}

impl CodeforcesClient {
    pub fn new(config: &Config) -> Self {
        let auth = match (&config.api_key, &config.api_secret) {
            (Some(key), Some(secret)) => Some(ApiAuth {
                key: key.clone(),
                secret: secret.clone(),
            }),
            _ => None,
        };

        Self {
            http: Client::new(),
            auth,
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        mut params: BTreeMap<String, String>,
    ) -> Result<Vec<T>, AppError> {
        if let Some(auth) = &self.auth {
            params.insert("apiKey".to_string(), auth.key.clone());
            params.insert("time".to_string(), Utc::now().timestamp().to_string());

            let nonce = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000));
            let signature = sign_request(method, &params, &auth.secret, &nonce);
            params.insert("apiSig".to_string(), signature);
        }

        let url = format!("{API_BASE}/{method}");
        let response = self.http.get(&url).query(&params).send().await?;
        let body = response.text().await?;

        let envelope: ApiEnvelope<Vec<T>> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("{method}: malformed response, treating as empty: {e}");
                return Ok(Vec::new());
            }
        };

        if envelope.status == "FAILED" {
            return Err(AppError::ApiFailed {
                method: method.to_string(),
                comment: envelope.comment.unwrap_or_default(),
            });
        }

        Ok(envelope.result.unwrap_or_default())
    }

    pub async fn fetch_roster(&self) -> Result<Vec<RatedUser>, AppError> {
        let mut params = BTreeMap::new();
        params.insert("activeOnly".to_string(), "true".to_string());

        self.call("user.ratedList", params).await
    }

    pub async fn fetch_submissions(&self, handle: &str) -> Result<Vec<Submission>, AppError> {
        let mut params = BTreeMap::new();
        params.insert("handle".to_string(), handle.to_string());

        self.call("user.status", params).await
    }

    /// Fetches the roster, keeps only reachable users (non-empty handle and
    /// email), and resolves each one's accepted-submission languages with a
    /// bounded pool of concurrent requests.
    pub async fn fetch_updates(&self, concurrency: usize) -> Result<UpdateBatch, AppError> {
        let roster = self.fetch_roster().await?;

        let reachable: Vec<RatedUser> = roster
            .into_iter()
            .filter(|user| {
                !user.handle.is_empty() && user.email.as_deref().is_some_and(|e| !e.is_empty())
            })
            .collect();

        let pb = ProgressBar::new(reachable.len() as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            )
            .unwrap()
            .progress_chars("=> "),
        );

        let mut fetches = stream::iter(reachable.into_iter().map(|user| {
            let pb = pb.clone();
            async move {
                pb.set_message(format!("Fetching {}", user.handle));
                let submissions = self.fetch_submissions(&user.handle).await?;
                pb.inc(1);
                Ok::<_, AppError>((user, accepted_languages(&submissions)))
            }
        }))
        .buffer_unordered(concurrency.max(1));

        let mut updates = UpdateBatch::new();
        while let Some(fetched) = fetches.next().await {
            let (user, languages) = fetched?;
            updates.insert(
                user.handle.clone(),
                UserRecord::from_profile(user, languages),
            );
        }

        pb.finish_with_message("Done");
        Ok(updates)
    }
}

/// `apiSig = rand + sha512("{rand}/{method}?{sorted k=v params}#{secret}")`,
/// hex-encoded. `params` must already contain apiKey and time; the BTreeMap
/// gives the required sorted parameter order.
pub fn sign_request(
    method: &str,
    params: &BTreeMap<String, String>,
    secret: &str,
    nonce: &str,
) -> String {
    let sorted_params = params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let code = format!("{nonce}/{method}?{sorted_params}#{secret}");
    let digest = Sha512::digest(code.as_bytes());

    format!("{nonce}{}", hex::encode(digest))
}

/// Distinct normalized languages across accepted submissions. First match
/// wins in the order C++, Python/PyPy, Java; anything else passes through.
pub fn normalize_language(raw: &str) -> String {
    if raw.contains("C++") {
        "C++".to_string()
    } else if raw.contains("Python") || raw.contains("PyPy") {
        "Python".to_string()
    } else if raw.contains("Java") {
        "Java".to_string()
    } else {
        raw.to_string()
    }
}

pub fn accepted_languages(submissions: &[Submission]) -> BTreeSet<String> {
    let mut languages = BTreeSet::new();

    for submission in submissions {
        if submission.verdict.as_deref() == Some("OK") && !submission.programming_language.is_empty()
        {
            languages.insert(normalize_language(&submission.programming_language));
        }
    }

    languages
}

//! Client for the external feeding-log API.
//!
//! The timer subsystem treats the feeding log as a collaborator: one
//! `POST /api/feedings` per reconciled side, plus a recent-records query for
//! the last-feeding readout. The [`FeedingLog`] trait keeps the state
//! machine testable without a network.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::segment::FeedingSide;

/// Request body for creating a feeding record.
///
/// Timed entries carry a timestamp and whole-minute duration; bottle
/// quick-log entries carry an amount in ounces instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedingCreate {
    /// When the feeding started. Omitted entries default to "now" on the
    /// server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// The feeding modality.
    pub feeding_type: FeedingSide,
    /// Duration in whole minutes, at least 1 for timed entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    /// Bottle amount in ounces.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_oz: Option<f64>,
    /// Free-form notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl FeedingCreate {
    /// Build a timed entry as produced by reconciliation.
    #[must_use]
    pub fn timed(side: FeedingSide, timestamp: DateTime<Utc>, duration_minutes: u32) -> Self {
        Self {
            timestamp: Some(timestamp),
            feeding_type: side,
            duration_minutes: Some(duration_minutes),
            amount_oz: None,
            notes: None,
        }
    }

    /// Build a non-timed bottle quick-log entry.
    #[must_use]
    pub fn bottle(amount_oz: f64) -> Self {
        Self {
            timestamp: None,
            feeding_type: FeedingSide::Bottle,
            duration_minutes: None,
            amount_oz: Some(amount_oz),
            notes: None,
        }
    }
}

/// A feeding record as returned by the API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeedingRecord {
    /// Server-assigned identifier.
    pub id: i64,
    /// When the feeding started.
    pub timestamp: DateTime<Utc>,
    /// The feeding modality.
    pub feeding_type: FeedingSide,
    /// Duration in whole minutes, for timed entries.
    pub duration_minutes: Option<u32>,
    /// Bottle amount in ounces, for bottle entries.
    pub amount_oz: Option<f64>,
    /// Free-form notes.
    pub notes: Option<String>,
}

/// Port to the feeding log.
#[async_trait]
pub trait FeedingLog: Send + Sync {
    /// Create one feeding record.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server rejects it.
    async fn create_feeding(&self, entry: &FeedingCreate) -> Result<FeedingRecord>;

    /// Fetch the most recent feeding records.
    ///
    /// The server does not guarantee an ordering; callers pick what they
    /// need client-side.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server rejects it.
    async fn recent_feedings(&self, limit: usize) -> Result<Vec<FeedingRecord>>;
}

/// HTTP implementation of [`FeedingLog`].
#[derive(Debug, Clone)]
pub struct HttpFeedingLog {
    base_url: String,
    client: reqwest::Client,
}

impl HttpFeedingLog {
    /// Create a client for the feeding log at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url: String = base_url.into();
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn feedings_url(&self) -> String {
        format!("{}/api/feedings", self.base_url)
    }

    /// Extract the server's human-readable message from an error response.
    ///
    /// The log reports failures as `{"detail": "..."}`; anything else falls
    /// back to the raw body.
    async fn status_error(response: reqwest::Response) -> Error {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|value| {
                value
                    .get("detail")
                    .and_then(|detail| detail.as_str())
                    .map(ToString::to_string)
            })
            .unwrap_or(body);
        Error::api_status(status, message)
    }
}

#[async_trait]
impl FeedingLog for HttpFeedingLog {
    async fn create_feeding(&self, entry: &FeedingCreate) -> Result<FeedingRecord> {
        debug!("Posting {} feeding entry", entry.feeding_type);
        let response = self
            .client
            .post(self.feedings_url())
            .json(entry)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }
        Ok(response.json().await?)
    }

    async fn recent_feedings(&self, limit: usize) -> Result<Vec<FeedingRecord>> {
        let response = self
            .client
            .get(self.feedings_url())
            .query(&[("limit", limit)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }
        Ok(response.json().await?)
    }
}

/// The most recent feeding per switchable side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LastFeedings {
    /// Most recent left-breast feeding, if any.
    pub left: Option<FeedingRecord>,
    /// Most recent right-breast feeding, if any.
    pub right: Option<FeedingRecord>,
}

/// Pick the most recent feeding per switchable side.
///
/// Response ordering is unspecified, so records are ranked here; entries
/// dated in the future (seed data) are skipped.
#[must_use]
pub fn last_per_side(records: &[FeedingRecord], now: DateTime<Utc>) -> LastFeedings {
    let mut sorted: Vec<&FeedingRecord> = records
        .iter()
        .filter(|record| record.timestamp <= now)
        .collect();
    sorted.sort_by_key(|record| std::cmp::Reverse(record.timestamp));

    let mut last = LastFeedings::default();
    for record in sorted {
        match record.feeding_type {
            FeedingSide::BreastLeft if last.left.is_none() => last.left = Some(record.clone()),
            FeedingSide::BreastRight if last.right.is_none() => last.right = Some(record.clone()),
            _ => {}
        }
        if last.left.is_some() && last.right.is_some() {
            break;
        }
    }
    last
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn record(id: i64, side: FeedingSide, secs: i64) -> FeedingRecord {
        FeedingRecord {
            id,
            timestamp: at(secs),
            feeding_type: side,
            duration_minutes: Some(10),
            amount_oz: None,
            notes: None,
        }
    }

    #[test]
    fn test_timed_entry_serialization() {
        let entry = FeedingCreate::timed(FeedingSide::BreastLeft, at(0), 12);
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["feeding_type"], "breast_left");
        assert_eq!(json["duration_minutes"], 12);
        assert!(json.get("amount_oz").is_none());
        assert!(json.get("notes").is_none());
    }

    #[test]
    fn test_bottle_entry_serialization() {
        let entry = FeedingCreate::bottle(3.5);
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["feeding_type"], "bottle");
        assert_eq!(json["amount_oz"], 3.5);
        assert!(json.get("timestamp").is_none());
        assert!(json.get("duration_minutes").is_none());
    }

    #[test]
    fn test_last_per_side_ignores_ordering_and_future_entries() {
        let records = vec![
            record(1, FeedingSide::BreastLeft, 100),
            record(2, FeedingSide::BreastLeft, 900),
            record(3, FeedingSide::BreastRight, 500),
            record(4, FeedingSide::Bottle, 950),
            // Future-dated seed entry must be skipped
            record(5, FeedingSide::BreastRight, 10_000),
        ];

        let last = last_per_side(&records, at(1_000));
        assert_eq!(last.left.as_ref().map(|r| r.id), Some(2));
        assert_eq!(last.right.as_ref().map(|r| r.id), Some(3));
    }

    #[test]
    fn test_last_per_side_empty() {
        assert_eq!(last_per_side(&[], at(0)), LastFeedings::default());
    }

    #[tokio::test]
    async fn test_create_feeding_success() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"{
            "id": 7,
            "timestamp": "2026-08-05T09:00:00Z",
            "feeding_type": "breast_left",
            "duration_minutes": 12,
            "amount_oz": null,
            "notes": null
        }"#;
        let mock = server
            .mock("POST", "/api/feedings")
            .match_header("content-type", "application/json")
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let log = HttpFeedingLog::new(server.url(), Duration::from_secs(5)).unwrap();
        let entry = FeedingCreate::timed(FeedingSide::BreastLeft, at(0), 12);
        let created = log.create_feeding(&entry).await.unwrap();

        mock.assert_async().await;
        assert_eq!(created.id, 7);
        assert_eq!(created.feeding_type, FeedingSide::BreastLeft);
        assert_eq!(created.duration_minutes, Some(12));
    }

    #[tokio::test]
    async fn test_create_feeding_surfaces_detail_message() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/feedings")
            .with_status(422)
            .with_header("content-type", "application/json")
            .with_body(r#"{"detail":"duration_minutes must be >= 1"}"#)
            .create_async()
            .await;

        let log = HttpFeedingLog::new(server.url(), Duration::from_secs(5)).unwrap();
        let entry = FeedingCreate::timed(FeedingSide::BreastRight, at(0), 1);
        let err = log.create_feeding(&entry).await.unwrap_err();

        assert!(err.is_api_failure());
        let msg = err.to_string();
        assert!(msg.contains("422"));
        assert!(msg.contains("duration_minutes must be >= 1"));
    }

    #[tokio::test]
    async fn test_recent_feedings_success() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"[
            {"id": 1, "timestamp": "2026-08-05T08:00:00Z", "feeding_type": "breast_left",
             "duration_minutes": 10, "amount_oz": null, "notes": null},
            {"id": 2, "timestamp": "2026-08-05T09:00:00Z", "feeding_type": "bottle",
             "duration_minutes": null, "amount_oz": 4.0, "notes": "expressed"}
        ]"#;
        let mock = server
            .mock("GET", "/api/feedings?limit=20")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let log = HttpFeedingLog::new(server.url(), Duration::from_secs(5)).unwrap();
        let records = log.recent_feedings(20).await.unwrap();

        mock.assert_async().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].amount_oz, Some(4.0));
    }

    #[tokio::test]
    async fn test_base_url_trailing_slash_is_normalized() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/feedings?limit=5")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;

        let url = format!("{}/", server.url());
        let log = HttpFeedingLog::new(url, Duration::from_secs(5)).unwrap();
        let records = log.recent_feedings(5).await.unwrap();

        mock.assert_async().await;
        assert!(records.is_empty());
    }
}

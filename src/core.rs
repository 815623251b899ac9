//! Core domain types and service traits for AlertRelay
//!
//! This module defines the Alertmanager webhook data model and the trait
//! contract that delivery handlers implement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// The Alertmanager webhook protocol version this service accepts.
pub const WEBHOOK_VERSION: &str = "4";

/// Aggregate or per-alert state as reported by Alertmanager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Firing,
    Resolved,
}

/// One firing or resolved alert inside a notification batch.
///
/// Immutable once deserialized. Label and annotation values are arbitrary
/// JSON scalars or structures, keyed by unique strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub status: AlertStatus,
    pub labels: HashMap<String, serde_json::Value>,
    pub annotations: HashMap<String, serde_json::Value>,
    pub starts_at: DateTime<Utc>,
    /// The zero value while the alert is still firing.
    pub ends_at: DateTime<Utc>,
    #[serde(rename = "generatorURL")]
    pub generator_url: String,
    /// Opaque stable identifier for the alert across updates.
    pub fingerprint: String,
}

/// One grouped delivery of alert state from Alertmanager.
///
/// Field names on the wire are camelCase (`groupKey`, `commonLabels`, ...);
/// templates reference the same names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationBatch {
    #[serde(deserialize_with = "webhook_version")]
    pub version: String,
    pub group_key: String,
    /// Number of alerts the sender omitted from `alerts`, if any.
    #[serde(default)]
    pub truncated_alerts: Option<u64>,
    pub status: AlertStatus,
    /// Informational only. Routing is keyed by the webhook URL path
    /// parameter, not by what Alertmanager believes it sent to.
    pub receiver: String,
    pub group_labels: HashMap<String, serde_json::Value>,
    pub common_labels: HashMap<String, serde_json::Value>,
    pub common_annotations: HashMap<String, serde_json::Value>,
    #[serde(rename = "externalURL")]
    pub external_url: String,
    /// Ordered as received; may be empty.
    pub alerts: Vec<Alert>,
}

/// Rejects any payload that does not speak protocol version "4".
fn webhook_version<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let version = String::deserialize(deserializer)?;
    if version != WEBHOOK_VERSION {
        return Err(serde::de::Error::custom(format!(
            "unsupported webhook version '{}', expected '{}'",
            version, WEBHOOK_VERSION
        )));
    }
    Ok(version)
}

// =============================================================================
// Service Traits
// =============================================================================

/// Delivers notification batches to one receiver's destination.
///
/// Delivery is fire-and-forget from the caller's perspective: implementations
/// log failures internally and never propagate them.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Delivers one notification batch.
    async fn handle(&self, batch: &NotificationBatch);
}

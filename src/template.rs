//! Request-body template rendering and validation.
//!
//! Wraps the MiniJinja engine behind a compiled-template type. The engine's
//! default undefined behavior is what makes configuration-time validation
//! meaningful: a plain lookup that misses resolves to an undefined value and
//! prints as empty, but any access *through* an undefined value (a sub-field,
//! an element of a missing list) fails the render loudly.

use crate::core::{Alert, AlertStatus, NotificationBatch};
use chrono::{DateTime, Utc};
use minijinja::{Environment, UndefinedBehavior};
use std::collections::HashMap;
use thiserror::Error;

const TEMPLATE_NAME: &str = "body";

#[derive(Debug, Error)]
pub enum TemplateError {
    /// The template source failed to parse.
    #[error("template syntax error: {0}")]
    Syntax(String),

    /// The template failed to render against a validation fixture, usually
    /// because it reaches through a field the fixture does not carry.
    #[error("template failed against the {fixture} fixture: {reason}")]
    Invalid {
        fixture: &'static str,
        reason: String,
    },

    /// The template failed to render against a real notification batch.
    #[error("template render failed: {0}")]
    Render(String),
}

/// A compiled, render-ready request-body template.
pub struct BodyTemplate {
    env: Environment<'static>,
}

impl std::fmt::Debug for BodyTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyTemplate").finish_non_exhaustive()
    }
}

impl BodyTemplate {
    /// Compiles a template source. Syntax errors surface here; undefined
    /// field references only surface when rendering, which is why
    /// [`BodyTemplate::validate`] exists.
    pub fn compile(source: &str) -> Result<Self, TemplateError> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Lenient);
        env.set_debug(true);
        env.add_template_owned(TEMPLATE_NAME.to_string(), source.to_string())
            .map_err(|e| TemplateError::Syntax(error_detail(&e)))?;
        Ok(Self { env })
    }

    /// Renders the template against a notification batch. Fields are
    /// addressed by their wire names (`groupKey`, `commonAnnotations`, ...).
    pub fn render(&self, batch: &NotificationBatch) -> Result<String, TemplateError> {
        self.render_with(batch)
            .map_err(|e| TemplateError::Render(error_detail(&e)))
    }

    /// Renders the template against two canned fixture batches: a minimal one
    /// with no alerts and empty label maps, and a populated one with a
    /// representative label and annotation set.
    ///
    /// This is deliberately conservative: a template reaching through a label
    /// that exists in production but not in the fixtures is rejected. The
    /// flip side is that a template which unconditionally indexes into
    /// `alerts` is caught at configuration time instead of losing a real
    /// alert.
    pub fn validate(&self) -> Result<(), TemplateError> {
        self.render_with(&minimal_fixture())
            .map_err(|e| TemplateError::Invalid {
                fixture: "minimal",
                reason: error_detail(&e),
            })?;
        self.render_with(&populated_fixture())
            .map_err(|e| TemplateError::Invalid {
                fixture: "populated",
                reason: error_detail(&e),
            })?;
        Ok(())
    }

    fn render_with(&self, batch: &NotificationBatch) -> Result<String, minijinja::Error> {
        self.env.get_template(TEMPLATE_NAME)?.render(batch)
    }
}

/// Flattens an engine error into one message. The alternate form carries the
/// template source span, so the undefined reference the render tripped over
/// is named in the surfaced message.
fn error_detail(err: &minijinja::Error) -> String {
    let mut detail = format!("{err:#}");
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        detail.push_str(": ");
        detail.push_str(&cause.to_string());
        source = cause.source();
    }
    detail
}

fn value_map(pairs: &[(&str, &str)]) -> HashMap<String, serde_json::Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
        .collect()
}

/// Minimal batch: empty alerts, empty maps, empty group key. Catches
/// templates that assume at least one alert is present.
fn minimal_fixture() -> NotificationBatch {
    NotificationBatch {
        version: "4".to_string(),
        group_key: String::new(),
        truncated_alerts: None,
        status: AlertStatus::Firing,
        receiver: String::new(),
        group_labels: HashMap::new(),
        common_labels: HashMap::new(),
        common_annotations: HashMap::new(),
        external_url: "https://example.com/".to_string(),
        alerts: Vec::new(),
    }
}

/// Populated batch: one alert with a representative label and annotation
/// set. Exercises nested label and annotation access.
fn populated_fixture() -> NotificationBatch {
    let epoch: DateTime<Utc> = DateTime::UNIX_EPOCH;
    NotificationBatch {
        version: "4".to_string(),
        group_key: "{}".to_string(),
        truncated_alerts: None,
        status: AlertStatus::Firing,
        receiver: "test".to_string(),
        group_labels: value_map(&[("alertname", "test")]),
        common_labels: value_map(&[
            ("alertname", "test"),
            ("job", "test"),
            ("severity", "critical"),
        ]),
        common_annotations: value_map(&[("summary", "test")]),
        external_url: "https://example.com/".to_string(),
        alerts: vec![Alert {
            status: AlertStatus::Firing,
            labels: value_map(&[
                ("alertname", "test"),
                ("job", "test"),
                ("severity", "critical"),
                ("env", "production"),
                ("instance", "node1.summit"),
                ("notify_room", "test"),
                ("type", "nodeexporter"),
            ]),
            annotations: value_map(&[("summary", "test")]),
            starts_at: epoch,
            ends_at: epoch,
            generator_url: "https://example.com/".to_string(),
            fingerprint: "e4ad109767ee663f".to_string(),
        }],
    }
}

// src/services/moderation.rs

//! Toxicity gate applied to comment text before it is persisted.
//!
//! The gate forwards text to an external scorer and returns its verdict. When the
//! scorer cannot be reached, or answers with something unparseable, the gate
//! applies its failure policy instead of surfacing an error. The default policy
//! is fail-open: moderation degrades to disabled rather than blocking all
//! comment creation.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use crate::config::ModerationConfig;

/// Per-category scores as returned by the scorer, e.g. `{"toxicity": 0.92}`.
pub type ToxicityScores = HashMap<String, f64>;

/// Result of a moderation check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationVerdict {
    pub allowed: bool,
    #[serde(default)]
    pub scores: Option<ToxicityScores>,
}

impl ModerationVerdict {
    fn unscored(allowed: bool) -> Self {
        Self {
            allowed,
            scores: None,
        }
    }
}

/// Why a scorer call failed. Never leaves the gate.
#[derive(Debug)]
pub enum ScorerError {
    /// Timeout, refused connection, DNS failure.
    Transport(String),
    /// Non-2xx status or a body that is not a verdict.
    Protocol(String),
}

impl fmt::Display for ScorerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScorerError::Transport(msg) => write!(f, "transport error: {}", msg),
            ScorerError::Protocol(msg) => write!(f, "protocol error: {}", msg),
        }
    }
}

impl std::error::Error for ScorerError {}

/// An external service that scores text for toxicity.
#[async_trait]
pub trait ToxicityScorer: Send + Sync {
    async fn score(&self, text: &str) -> Result<ModerationVerdict, ScorerError>;
}

/// Scorer speaking the `POST {endpoint}` / `{ text }` → `{ allowed, scores }` protocol.
pub struct HttpToxicityScorer {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpToxicityScorer {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, ScorerError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScorerError::Transport(e.to_string()))?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl ToxicityScorer for HttpToxicityScorer {
    async fn score(&self, text: &str) -> Result<ModerationVerdict, ScorerError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&json!({ "text": text }))
            .send()
            .await
            .map_err(|e| ScorerError::Transport(e.to_string()))?;

        let response = response
            .error_for_status()
            .map_err(|e| ScorerError::Protocol(e.to_string()))?;

        response
            .json::<ModerationVerdict>()
            .await
            .map_err(|e| ScorerError::Protocol(e.to_string()))
    }
}

/// The moderation gate shared by all comment-writing handlers.
#[derive(Clone)]
pub struct ModerationGate {
    scorer: Arc<dyn ToxicityScorer>,
    timeout: Duration,
    threshold: Option<f64>,
    fail_open: bool,
}

impl ModerationGate {
    pub fn new(
        scorer: Arc<dyn ToxicityScorer>,
        timeout: Duration,
        threshold: Option<f64>,
        fail_open: bool,
    ) -> Self {
        Self {
            scorer,
            timeout,
            threshold,
            fail_open,
        }
    }

    /// Builds a gate backed by the HTTP scorer described in `config`.
    pub fn from_config(config: &ModerationConfig) -> Result<Self, ScorerError> {
        let scorer = HttpToxicityScorer::new(config.endpoint.clone(), config.timeout)?;
        Ok(Self::new(
            Arc::new(scorer),
            config.timeout,
            config.threshold,
            config.fail_open,
        ))
    }

    pub fn fails_open(&self) -> bool {
        self.fail_open
    }

    /// Scores `text` and decides whether it may be stored.
    ///
    /// Single attempt, bounded by the configured timeout. Scorer failures are
    /// logged and resolved by the failure policy; they are never returned.
    pub async fn check_toxicity(&self, text: &str) -> ModerationVerdict {
        let outcome = match tokio::time::timeout(self.timeout, self.scorer.score(text)).await {
            Ok(result) => result,
            Err(_) => Err(ScorerError::Transport(format!(
                "no answer within {}ms",
                self.timeout.as_millis()
            ))),
        };

        match outcome {
            Ok(verdict) => self.apply_threshold(verdict),
            Err(e) => {
                tracing::warn!(
                    fail_open = self.fail_open,
                    "Toxicity service unavailable: {}",
                    e
                );
                ModerationVerdict::unscored(self.fail_open)
            }
        }
    }

    fn apply_threshold(&self, verdict: ModerationVerdict) -> ModerationVerdict {
        let Some(threshold) = self.threshold else {
            return verdict;
        };
        let exceeded = verdict
            .scores
            .as_ref()
            .is_some_and(|scores| scores.values().any(|&s| s > threshold));

        ModerationVerdict {
            allowed: verdict.allowed && !exceeded,
            scores: verdict.scores,
        }
    }
}

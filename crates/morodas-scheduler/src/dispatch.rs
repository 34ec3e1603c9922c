//! Workflow dispatch — forwards fired triggers to the external
//! workflow-execution server over plain HTTP. The server does the actual
//! work (LLM calls, scraping, document generation); we only hand it the
//! firing context and keep its reply for the audit trail.

use chrono::{DateTime, Utc};

use morodas_core::{MorodasError, Result};

use crate::store::DueTrigger;

/// HTTP client for the external workflow-execution server.
#[derive(Debug, Clone)]
pub struct WorkflowDispatcher {
    client: reqwest::Client,
    base_url: String,
    timeout: std::time::Duration,
}

impl WorkflowDispatcher {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: std::time::Duration::from_secs(timeout_secs),
        }
    }

    /// POST one fired trigger to the workflow server and return its JSON
    /// reply (stored in the run record's output payload).
    pub async fn dispatch(&self, item: &DueTrigger, fired_at: DateTime<Utc>) -> Result<serde_json::Value> {
        let url = format!("{}/api/workflows/run", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "agent_id": item.agent_id,
                "agent_name": item.agent_name,
                "trigger_id": item.trigger.id,
                "trigger_name": item.trigger.name,
                "fired_at": fired_at.to_rfc3339(),
            }))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| MorodasError::Dispatch(format!("Workflow send failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(MorodasError::Dispatch(format!("Workflow server error {status}: {body}")));
        }

        // non-JSON replies are tolerated; the firing already happened
        Ok(resp.json().await.unwrap_or(serde_json::Value::Null))
    }
}

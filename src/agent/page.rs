use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::debug;

use super::classify::Candidate;
use super::injector;
use super::script::{self, presence_check};
use super::strategy::CompletionRule;
use crate::cdp::{CdpChannel, CdpError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Working,
    Done,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabStatus {
    pub name: String,
    pub status: ConversationStatus,
}

/// What the overlay shows: every tab's status and the one in focus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    pub tabs: Vec<TabStatus>,
    pub active: usize,
}

#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn scan_candidates(&self, selectors: &[&str]) -> Result<Vec<Candidate>, CdpError>;

    /// Click by stamped id; false when the element is gone
    async fn click(&self, id: &str) -> Result<bool, CdpError>;

    async fn is_visible(&self, id: &str) -> Result<bool, CdpError>;

    async fn list_tabs(&self, selector: &str) -> Result<Vec<String>, CdpError>;

    async fn focus_tab(&self, selector: &str, index: usize) -> Result<bool, CdpError>;

    async fn is_complete(&self, rule: &CompletionRule) -> Result<bool, CdpError>;

    async fn render_overlay(&self, overlay: &Overlay) -> Result<(), CdpError>;

    async fn remove_overlay(&self) -> Result<(), CdpError>;

    async fn has_focus(&self) -> Result<bool, CdpError>;
}

/// [`PageDriver`] backed by the injected helper
pub struct CdpPage {
    channel: Arc<CdpChannel>,
}

impl CdpPage {
    pub fn new(channel: Arc<CdpChannel>) -> Self {
        Self { channel }
    }

    /// Evaluate a helper call, reinstalling the helper once if a reload wiped it
    async fn eval(&self, expression: &str) -> Result<Value, CdpError> {
        match self.channel.evaluate(expression).await {
            Err(CdpError::ScriptException(message)) => {
                if self.channel.evaluate(&presence_check()).await?.as_bool() == Some(true) {
                    return Err(CdpError::ScriptException(message));
                }
                debug!(
                    "Helper missing on {}, reinstalling",
                    self.channel.target_id()
                );
                injector::inject(&self.channel).await?;
                self.channel.evaluate(expression).await
            }
            other => other,
        }
    }

    async fn eval_json<T: serde::de::DeserializeOwned>(
        &self,
        expression: &str,
    ) -> Result<T, CdpError> {
        match self.eval(expression).await? {
            Value::String(payload) => Ok(serde_json::from_str(&payload)?),
            other => Err(CdpError::InvalidResponse(format!(
                "expected a JSON string payload, got {}",
                other
            ))),
        }
    }

    async fn eval_bool(&self, expression: &str) -> Result<bool, CdpError> {
        Ok(self.eval(expression).await?.as_bool().unwrap_or(false))
    }
}

#[async_trait]
impl PageDriver for CdpPage {
    async fn scan_candidates(&self, selectors: &[&str]) -> Result<Vec<Candidate>, CdpError> {
        self.eval_json(&script::call("scan", &[json!(selectors)]))
            .await
    }

    async fn click(&self, id: &str) -> Result<bool, CdpError> {
        self.eval_bool(&script::call("click", &[json!(id)])).await
    }

    async fn is_visible(&self, id: &str) -> Result<bool, CdpError> {
        self.eval_bool(&script::call("isVisible", &[json!(id)]))
            .await
    }

    async fn list_tabs(&self, selector: &str) -> Result<Vec<String>, CdpError> {
        self.eval_json(&script::call("tabs", &[json!(selector)]))
            .await
    }

    async fn focus_tab(&self, selector: &str, index: usize) -> Result<bool, CdpError> {
        self.eval_bool(&script::call("focusTab", &[json!(selector), json!(index)]))
            .await
    }

    async fn is_complete(&self, rule: &CompletionRule) -> Result<bool, CdpError> {
        self.eval_bool(&script::call(
            "isComplete",
            &[script::completion_arg(rule)],
        ))
        .await
    }

    // Overlay updates are pushed without waiting; a page that lost the helper
    // gets it back on the next scan
    async fn render_overlay(&self, overlay: &Overlay) -> Result<(), CdpError> {
        let arg = serde_json::to_value(overlay)?;
        self.channel
            .evaluate_detached(&script::call("renderOverlay", &[arg]))
    }

    async fn remove_overlay(&self) -> Result<(), CdpError> {
        self.channel
            .evaluate_detached(&script::call("removeOverlay", &[]))
    }

    async fn has_focus(&self) -> Result<bool, CdpError> {
        self.eval_bool(&script::call("hasFocus", &[])).await
    }
}

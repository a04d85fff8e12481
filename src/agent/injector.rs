use tracing::debug;

use super::script::{helper_source, presence_check};
use crate::cdp::{CdpChannel, CdpError};

/// Evaluate the helper and confirm it is reachable. Safe to repeat: the
/// helper returns early when the same version is already installed.
pub async fn inject(channel: &CdpChannel) -> Result<(), CdpError> {
    let outcome = channel.evaluate(&helper_source()).await?;
    debug!(
        "Helper evaluation on {} returned {}",
        channel.target_id(),
        outcome
    );

    match channel.evaluate(&presence_check()).await? {
        serde_json::Value::Bool(true) => Ok(()),
        other => Err(CdpError::ScriptException(format!(
            "helper not present after injection (check returned {})",
            other
        ))),
    }
}

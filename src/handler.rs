//! Event forwarding
//!
//! One event in, one POST out. No retries: any failure ends the invocation.

use ureq::Agent;

use crate::config::Config;
use crate::error::{HandlerError, Result, redact_url};
use crate::event::Event;
use crate::payload::SquadcastEvent;

/// Validate the event and config, then build the payload for it
pub fn prepare(event: &Event, config: &Config) -> Result<SquadcastEvent> {
    event.validate()?;

    let config = config.with_event_overrides(event);
    config.validate()?;

    let payload = SquadcastEvent::build(event, &config)?;
    log::debug!(
        "Built {} payload for {}/{} (entity_id={})",
        payload.message_type,
        event.entity.name(),
        event.check.name(),
        payload.entity_id
    );
    Ok(payload)
}

/// POST `payload` as JSON to `api_url`
///
/// Succeeds only on a 2xx response.
pub fn deliver(payload: &SquadcastEvent, api_url: &str) -> Result<()> {
    let body = serde_json::to_vec(payload).map_err(HandlerError::Serialize)?;
    let target = redact_url(api_url);

    // Status codes are checked below rather than surfaced as transport errors
    let agent: Agent = Agent::config_builder().http_status_as_error(false).build().into();

    log::debug!("POST {} ({} bytes)", target, body.len());
    let response = agent
        .post(api_url)
        .header("Content-Type", "application/json")
        .send(&body[..])
        .map_err(|e| HandlerError::Transport {
            url: target.clone(),
            source: Box::new(e),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(HandlerError::Status {
            url: target,
            status: status.to_string(),
        });
    }

    log::info!("Squadcast accepted {} event ({})", payload.message_type, status);
    Ok(())
}

/// Forward one event to the configured Squadcast webhook
pub fn handle(event: &Event, config: &Config) -> Result<()> {
    let payload = prepare(event, config)?;
    deliver(&payload, &config.api_url)
}

//! Topic to control event mapping

use crate::IngressError;
use oledd_config::TopicConfig;
use oledd_display::{ControlEvent, Status};

/// Map an incoming publish to a control event
///
/// Text payloads keep their whitespace; every other payload is trimmed.
pub fn parse_message(
    topics: &TopicConfig,
    topic: &str,
    payload: &[u8],
) -> Result<ControlEvent, IngressError> {
    let payload = std::str::from_utf8(payload).map_err(|e| IngressError::InvalidPayload {
        topic: topic.to_string(),
        source: e,
    })?;
    let value = payload.trim().to_string();

    let event = if topic == topics.text {
        ControlEvent::Text(payload.to_string())
    } else if topic == topics.command {
        ControlEvent::Power(value)
    } else if topic == topics.mode {
        ControlEvent::Mode(value)
    } else if topic == topics.brightness {
        ControlEvent::Brightness(value)
    } else if topic == topics.refresh {
        ControlEvent::RefreshInterval(value)
    } else if let Some(key) = topic.strip_prefix(topics.data_prefix.as_str()) {
        ControlEvent::CustomDatum {
            key: key.to_string(),
            value,
        }
    } else {
        return Err(IngressError::UnknownTopic(topic.to_string()));
    };

    Ok(event)
}

/// Retained status document
pub fn status_payload(status: &Status) -> Result<Vec<u8>, IngressError> {
    Ok(serde_json::to_vec(status)?)
}

//! MQTT control ingress for oledd
//!
//! Subscribes to the control topics, turns each publish into a
//! [`oledd_display::ControlEvent`] for the shared scheduler, and publishes
//! the retained status document and availability.
//!
//! # Topics
//!
//! | Topic | Event |
//! |---|---|
//! | `text` | operator message |
//! | `command` | `on`, `off`, `clear` |
//! | `mode` | mode name or alias |
//! | `brightness` | 0-255 |
//! | `refresh` | rotation interval in seconds |
//! | `<data prefix><key>` | custom datum, empty payload removes it |

mod ingress;
mod supervisor;
mod topics;

use thiserror::Error;

pub use ingress::{MqttIngress, mqtt_options};
pub use supervisor::{IngressHealth, Supervisor};
pub use topics::{parse_message, status_payload};

/// Availability payloads
pub const ONLINE: &str = "online";
pub const OFFLINE: &str = "offline";

#[derive(Debug, Error)]
pub enum IngressError {
    #[error("Not a control topic: {0}")]
    UnknownTopic(String),

    #[error("Payload on {topic} is not UTF-8: {source}")]
    InvalidPayload {
        topic: String,
        source: std::str::Utf8Error,
    },

    #[error("MQTT client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, IngressError>;

//! Adapter descriptors: identity, protocol type, direction, configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Protocol family an adapter speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterType {
    /// SFTP endpoint.
    Sftp,
    /// Local or mounted filesystem.
    File,
    /// Mail server (SMTP/IMAP).
    Email,
}

impl AdapterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterType::Sftp => "sftp",
            AdapterType::File => "file",
            AdapterType::Email => "email",
        }
    }
}

impl std::fmt::Display for AdapterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AdapterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sftp" => Ok(AdapterType::Sftp),
            "file" => Ok(AdapterType::File),
            "email" | "mail" => Ok(AdapterType::Email),
            _ => Err(format!("Unknown adapter type: {}", s)),
        }
    }
}

/// Direction of data movement from the flow's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Sends data out to the endpoint.
    Sender,
    /// Accepts data in from the endpoint.
    Receiver,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Sender => "sender",
            Direction::Receiver => "receiver",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sender" => Ok(Direction::Sender),
            "receiver" => Ok(Direction::Receiver),
            _ => Err(format!("Unknown direction: {}", s)),
        }
    }
}

/// A configured adapter endpoint.
///
/// The `config` payload is opaque to the dispatch layer; each executor
/// deserializes the shape it expects and validates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterDescriptor {
    pub id: Uuid,
    pub name: String,
    pub adapter_type: AdapterType,
    pub direction: Direction,
    pub active: bool,
    #[serde(default)]
    pub config: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AdapterDescriptor {
    /// Create an active descriptor with an empty configuration.
    pub fn new(name: impl Into<String>, adapter_type: AdapterType, direction: Direction) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            adapter_type,
            direction,
            active: true,
            config: serde_json::Value::Null,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the configuration payload.
    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = config;
        self.updated_at = Utc::now();
        self
    }

    /// Mark the descriptor inactive.
    pub fn deactivated(mut self) -> Self {
        self.active = false;
        self.updated_at = Utc::now();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_adapter_type_roundtrip() {
        assert_eq!(AdapterType::from_str("sftp").unwrap(), AdapterType::Sftp);
        assert_eq!(AdapterType::from_str("MAIL").unwrap(), AdapterType::Email);
        assert_eq!(AdapterType::Sftp.to_string(), "sftp");
        assert!(AdapterType::from_str("ftp").is_err());
    }

    #[test]
    fn test_direction_roundtrip() {
        assert_eq!(Direction::from_str("sender").unwrap(), Direction::Sender);
        assert_eq!(Direction::Receiver.to_string(), "receiver");
        assert!(Direction::from_str("both").is_err());
    }

    #[test]
    fn test_descriptor_defaults_active() {
        let descriptor =
            AdapterDescriptor::new("inbox", AdapterType::File, Direction::Receiver);
        assert!(descriptor.active);
        assert!(descriptor.config.is_null());

        let inactive = descriptor.deactivated();
        assert!(!inactive.active);
    }

    #[test]
    fn test_descriptor_serialization() {
        let descriptor = AdapterDescriptor::new("out", AdapterType::Sftp, Direction::Sender)
            .with_config(serde_json::json!({"host": "example.com"}));
        let json = serde_json::to_string(&descriptor).unwrap();
        assert!(json.contains("\"adapter_type\":\"sftp\""));
        assert!(json.contains("\"direction\":\"sender\""));
    }
}

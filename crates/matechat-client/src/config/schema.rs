use std::time::Duration;

use serde::Deserialize;
use matechat_core::error::{MateChatError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub version: u32,

    #[serde(default)]
    pub connection: ConnectionSection,

    #[serde(default)]
    pub liveness: LivenessSection,

    #[serde(default)]
    pub session: SessionSection,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            version: 1,
            connection: ConnectionSection::default(),
            liveness: LivenessSection::default(),
            session: SessionSection::default(),
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(MateChatError::UnsupportedVersion);
        }
        self.connection.validate()?;
        self.liveness.validate()?;
        self.session.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionSection {
    /// Path appended to a bare `ip:port` endpoint.
    #[serde(default = "default_path")]
    pub path: String,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for ConnectionSection {
    fn default() -> Self {
        Self {
            path: default_path(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl ConnectionSection {
    pub fn validate(&self) -> Result<()> {
        if !self.path.starts_with('/') {
            return Err(MateChatError::Config(
                "connection.path must start with '/'".into(),
            ));
        }
        if !(1000..=60000).contains(&self.connect_timeout_ms) {
            return Err(MateChatError::Config(
                "connection.connect_timeout_ms must be between 1000 and 60000".into(),
            ));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LivenessSection {
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

impl Default for LivenessSection {
    fn default() -> Self {
        Self {
            ping_interval_ms: default_ping_interval_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl LivenessSection {
    pub fn validate(&self) -> Result<()> {
        if !(5000..=600000).contains(&self.ping_interval_ms) {
            return Err(MateChatError::Config(
                "liveness.ping_interval_ms must be between 5000 and 600000".into(),
            ));
        }
        if !(500..=30000).contains(&self.probe_timeout_ms) {
            return Err(MateChatError::Config(
                "liveness.probe_timeout_ms must be between 500 and 30000".into(),
            ));
        }
        if self.probe_timeout_ms >= self.ping_interval_ms {
            return Err(MateChatError::Config(
                "liveness.probe_timeout_ms must be less than ping_interval_ms".into(),
            ));
        }
        Ok(())
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionSection {
    #[serde(default = "default_auth_timeout_ms")]
    pub auth_timeout_ms: u64,

    #[serde(default = "default_delivery_queue_capacity")]
    pub delivery_queue_capacity: usize,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            auth_timeout_ms: default_auth_timeout_ms(),
            delivery_queue_capacity: default_delivery_queue_capacity(),
        }
    }
}

impl SessionSection {
    pub fn validate(&self) -> Result<()> {
        if !(1000..=120000).contains(&self.auth_timeout_ms) {
            return Err(MateChatError::Config(
                "session.auth_timeout_ms must be between 1000 and 120000".into(),
            ));
        }
        if !(1..=1024).contains(&self.delivery_queue_capacity) {
            return Err(MateChatError::Config(
                "session.delivery_queue_capacity must be between 1 and 1024".into(),
            ));
        }
        Ok(())
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_millis(self.auth_timeout_ms)
    }
}

fn default_path() -> String {
    "/ws".into()
}
fn default_connect_timeout_ms() -> u64 {
    10000
}
fn default_ping_interval_ms() -> u64 {
    180000
}
fn default_probe_timeout_ms() -> u64 {
    5000
}
fn default_auth_timeout_ms() -> u64 {
    10000
}
fn default_delivery_queue_capacity() -> usize {
    16
}

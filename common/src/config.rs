use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::types::{ChannelId, ResponseMode};

pub const MIN_READ_BUFFER_BYTES: usize = 1024;
pub const MAX_READ_BUFFER_BYTES: usize = 2048;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub read_buffer_bytes: usize,
    /// `None` keeps the historical behavior: a client that never finishes
    /// its request stalls the accept loop.
    pub read_timeout_ms: Option<u64>,
    pub response_mode: ResponseMode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            read_buffer_bytes: MAX_READ_BUFFER_BYTES,
            read_timeout_ms: None,
            response_mode: ResponseMode::FullPage,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelConfig {
    pub id: ChannelId,
    pub pin: u8,
    #[serde(default = "default_pwm_frequency_hz")]
    pub pwm_frequency_hz: u32,
}

fn default_pwm_frequency_hz() -> u32 {
    1_000
}

impl ChannelConfig {
    pub fn new(id: impl Into<ChannelId>, pin: u8) -> Self {
        Self {
            id: id.into(),
            pin,
            pwm_frequency_hz: default_pwm_frequency_hz(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PanelConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default = "default_channels")]
    pub channels: Vec<ChannelConfig>,
}

fn default_channels() -> Vec<ChannelConfig> {
    vec![
        ChannelConfig::new("1", 2),
        ChannelConfig::new("2", 3),
        ChannelConfig::new("3", 4),
    ]
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            channels: default_channels(),
        }
    }
}

/// Ids travel unencoded in `led=<id>` form bodies, so they must not contain
/// the form delimiters.
fn is_form_safe_id(id: &str) -> bool {
    !id.trim().is_empty() && !id.contains(['&', '='])
}

impl ServerConfig {
    pub fn sanitize(&mut self) {
        if self.host.trim().is_empty() {
            self.host = "0.0.0.0".to_string();
        }
        self.read_buffer_bytes = self
            .read_buffer_bytes
            .clamp(MIN_READ_BUFFER_BYTES, MAX_READ_BUFFER_BYTES);
        if self.read_timeout_ms == Some(0) {
            self.read_timeout_ms = None;
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl PanelConfig {
    pub fn sanitize(&mut self) {
        self.server.sanitize();

        let mut seen = HashSet::new();
        self.channels.retain(|channel| {
            is_form_safe_id(channel.id.as_str()) && seen.insert(channel.id.clone())
        });
        for channel in &mut self.channels {
            if channel.pwm_frequency_hz == 0 {
                channel.pwm_frequency_hz = default_pwm_frequency_hz();
            }
        }

        if self.channels.is_empty() {
            self.channels = default_channels();
        }
    }

    pub fn channel_ids(&self) -> Vec<ChannelId> {
        self.channels.iter().map(|channel| channel.id.clone()).collect()
    }
}

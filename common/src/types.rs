use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_BRIGHTNESS: i64 = 0;
pub const MAX_BRIGHTNESS: i64 = 100;

/// Identifier of one output channel, fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Duty-cycle percentage. Always within 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "u8")]
pub struct Brightness(u8);

impl Brightness {
    pub const OFF: Self = Self(0);
    pub const FULL: Self = Self(100);

    pub fn clamped(value: i64) -> Self {
        let value = value.clamp(MIN_BRIGHTNESS, MAX_BRIGHTNESS);
        Self(value as u8)
    }

    pub fn percent(self) -> u8 {
        self.0
    }
}

impl From<i64> for Brightness {
    fn from(value: i64) -> Self {
        Self::clamped(value)
    }
}

impl From<Brightness> for u8 {
    fn from(value: Brightness) -> Self {
        value.0
    }
}

impl fmt::Display for Brightness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseMode {
    /// Re-render the whole page after every request.
    #[default]
    FullPage,
    /// Answer POST with 204 and leave display updates to the client.
    NoContent,
}

impl ResponseMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FullPage => "full-page",
            Self::NoContent => "no-content",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown response mode `{0}` (expected `full-page` or `no-content`)")]
pub struct UnknownResponseMode(pub String);

impl FromStr for ResponseMode {
    type Err = UnknownResponseMode;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "full-page" | "fullpage" | "full" => Ok(Self::FullPage),
            "no-content" | "nocontent" | "live" => Ok(Self::NoContent),
            other => Err(UnknownResponseMode(other.to_string())),
        }
    }
}

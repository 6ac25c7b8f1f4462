//! Client configuration
//!
//! Every field has a default, so a config file only needs the keys it wants
//! to change.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::serializer::DEFAULT_MAX_DEPTH;

pub const DEFAULT_URL: &str = "127.0.0.1:8001";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Address of the remote service, `host:port`. A leading `scheme://` is
    /// accepted and ignored.
    pub url: String,

    /// How long to wait for the connection to open
    pub connect_timeout_ms: u64,

    /// How long to wait for each response; `None` waits forever
    pub request_timeout_ms: Option<u64>,

    /// Deepest nesting the encoder accepts in outbound values
    pub max_depth: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            connect_timeout_ms: 5_000,
            request_timeout_ms: Some(30_000),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Reads a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// The `host:port` part of `url`.
    pub fn address(&self) -> &str {
        let url = self.url.trim_end_matches('/');
        url.split_once("://").map_or(url, |(_, rest)| rest)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

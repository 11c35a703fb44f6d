// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::error::{Result, SolrError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

const DEFAULT_PORT: u16 = 8983;
const DEFAULT_PATH: &str = "/solr";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Options used to build a Solr client handle. Passed through verbatim to the
/// transport every time the handle is rebuilt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientOptions {
    pub hostname: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Core path, e.g. `/solr/products`
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_path() -> String {
    DEFAULT_PATH.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl ClientOptions {
    pub fn new(hostname: impl Into<String>, port: u16, path: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            port,
            path: path.into(),
            secure: false,
            login: None,
            password: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Load options from `{prefix}_HOSTNAME`, `{prefix}_PORT`, `{prefix}_PATH`,
    /// `{prefix}_SECURE`, `{prefix}_LOGIN`, `{prefix}_PASSWORD` and
    /// `{prefix}_TIMEOUT_SECS`. Only the hostname is required.
    pub fn from_env(prefix: &str) -> Result<Self> {
        Self::from_lookup(prefix, |key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(prefix: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let key = |name: &str| format!("{}_{}", prefix, name);

        let hostname = lookup(&key("HOSTNAME")).ok_or_else(|| {
            SolrError::config(format!("{} environment variable not set", key("HOSTNAME")))
        })?;

        let port = match lookup(&key("PORT")) {
            Some(raw) => raw.parse().map_err(|_| {
                SolrError::config(format!("{} must be a valid port, got: {}", key("PORT"), raw))
            })?,
            None => DEFAULT_PORT,
        };
        let path = lookup(&key("PATH")).unwrap_or_else(default_path);
        let secure = lookup(&key("SECURE"))
            .map(|v| v.parse().unwrap_or(false))
            .unwrap_or(false);
        let timeout_secs = lookup(&key("TIMEOUT_SECS"))
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Ok(Self {
            hostname,
            port,
            path,
            secure,
            login: lookup(&key("LOGIN")),
            password: lookup(&key("PASSWORD")),
            timeout_secs,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Base URL of the core, without a trailing slash.
    pub fn base_url(&self) -> Result<Url> {
        let scheme = if self.secure { "https" } else { "http" };
        let path = self.path.trim_end_matches('/');
        let path = if path.starts_with('/') || path.is_empty() {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        let raw = format!("{}://{}:{}{}", scheme, self.hostname, self.port, path);
        Url::parse(&raw).map_err(|e| SolrError::config(format!("Invalid Solr URL {}: {}", raw, e)))
    }
}

/// Configuration for a single [`Connection`](crate::services::connection::Connection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub client_options: ClientOptions,
    /// Trace every raw search in its own span with elapsed time
    #[serde(default = "default_enable_profiling")]
    pub enable_profiling: bool,
}

fn default_enable_profiling() -> bool {
    true
}

impl ConnectionConfig {
    pub fn new(client_options: ClientOptions) -> Self {
        Self {
            client_options,
            enable_profiling: true,
        }
    }

    pub fn from_env(prefix: &str) -> Result<Self> {
        Self::from_lookup(prefix, |key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(prefix: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let enable_profiling = lookup(&format!("{}_ENABLE_PROFILING", prefix))
            .map(|v| v.parse().unwrap_or(true))
            .unwrap_or(true);
        Ok(Self {
            client_options: ClientOptions::from_lookup(prefix, lookup)?,
            enable_profiling,
        })
    }
}

/// Read/write split configuration. A missing write connection means writes
/// go to the read backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerConfig {
    #[serde(default)]
    pub read_connection: Option<ConnectionConfig>,
    #[serde(default)]
    pub write_connection: Option<ConnectionConfig>,
}

impl LoadBalancerConfig {
    /// Reads `SOLR_READ_*` and `SOLR_WRITE_*`; when no read host is set, the
    /// plain `SOLR_*` variables configure a single backend.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read_connection = if lookup("SOLR_READ_HOSTNAME").is_some() {
            Some(ConnectionConfig::from_lookup("SOLR_READ", &lookup)?)
        } else if lookup("SOLR_HOSTNAME").is_some() {
            Some(ConnectionConfig::from_lookup("SOLR", &lookup)?)
        } else {
            None
        };

        let write_connection = if lookup("SOLR_WRITE_HOSTNAME").is_some() {
            Some(ConnectionConfig::from_lookup("SOLR_WRITE", &lookup)?)
        } else {
            None
        };

        if read_connection.is_none() {
            return Err(SolrError::config(
                "No Solr backend configured: set SOLR_HOSTNAME or SOLR_READ_HOSTNAME",
            ));
        }

        Ok(Self {
            read_connection,
            write_connection,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

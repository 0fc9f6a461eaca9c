//! Runtime configuration
//!
//! - `ServerConfig` - listen port and drain deadline, read once from env
//! - `ProbeDelays` - mutable probe delay store, seeded from env and
//!   updated through `POST /config`

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::warn;

/// Default port for all endpoints
pub const DEFAULT_PORT: u16 = 8080;

/// Default drain deadline once shutdown begins
///
/// Must exceed the longest interruptible delay step plus margin.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(260);

/// Upper bound for a probe delay (values are 8-bit signed on the wire)
pub const MAX_PROBE_DELAY_SECS: u64 = i8::MAX as u64;

/// Listener settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub drain_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }
}

impl ServerConfig {
    /// Load from `PROBER_PORT` and `PROBER_DRAIN_TIMEOUT_SECS`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let port = match lookup("PROBER_PORT") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!(value = %raw, default = defaults.port, "Invalid PROBER_PORT, using default");
                defaults.port
            }),
            None => defaults.port,
        };

        let drain_timeout = match lookup("PROBER_DRAIN_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse() {
                Ok(secs) => Duration::from_secs(secs),
                Err(_) => {
                    warn!(
                        value = %raw,
                        default_secs = defaults.drain_timeout.as_secs(),
                        "Invalid PROBER_DRAIN_TIMEOUT_SECS, using default"
                    );
                    defaults.drain_timeout
                }
            },
            None => defaults.drain_timeout,
        };

        Self {
            port,
            drain_timeout,
        }
    }

    /// Address to bind (all interfaces)
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

/// The three orchestrator probe kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    Startup,
    Readiness,
    Liveness,
}

impl ProbeKind {
    pub const ALL: [ProbeKind; 3] = [
        ProbeKind::Startup,
        ProbeKind::Readiness,
        ProbeKind::Liveness,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeKind::Startup => "startup",
            ProbeKind::Readiness => "readiness",
            ProbeKind::Liveness => "liveness",
        }
    }

    /// Env var holding the initial delay for this probe
    pub fn env_var(&self) -> &'static str {
        match self {
            ProbeKind::Startup => "STARTUP_PROBE_DELAY",
            ProbeKind::Readiness => "READINESS_PROBE_DELAY",
            ProbeKind::Liveness => "LIVENESS_PROBE_DELAY",
        }
    }
}

/// Parse a probe delay in whole seconds
///
/// Accepts `0..=127`. Anything else is `None`.
pub fn parse_probe_delay(raw: &str) -> Option<u64> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs <= MAX_PROBE_DELAY_SECS)
}

/// Snapshot of the configured probe delays, in seconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeDelayValues {
    pub startup: u64,
    pub readiness: u64,
    pub liveness: u64,
}

impl ProbeDelayValues {
    pub fn get(&self, kind: ProbeKind) -> u64 {
        match kind {
            ProbeKind::Startup => self.startup,
            ProbeKind::Readiness => self.readiness,
            ProbeKind::Liveness => self.liveness,
        }
    }

    fn slot(&mut self, kind: ProbeKind) -> &mut u64 {
        match kind {
            ProbeKind::Startup => &mut self.startup,
            ProbeKind::Readiness => &mut self.readiness,
            ProbeKind::Liveness => &mut self.liveness,
        }
    }
}

/// JSON body of `POST /config`, and its response
///
/// Values are strings holding whole seconds. Missing fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeDelaysBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startup: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readiness: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liveness: Option<String>,
}

impl ProbeDelaysBody {
    fn field(&self, kind: ProbeKind) -> Option<&str> {
        match kind {
            ProbeKind::Startup => self.startup.as_deref(),
            ProbeKind::Readiness => self.readiness.as_deref(),
            ProbeKind::Liveness => self.liveness.as_deref(),
        }
    }
}

impl From<ProbeDelayValues> for ProbeDelaysBody {
    fn from(values: ProbeDelayValues) -> Self {
        Self {
            startup: Some(values.startup.to_string()),
            readiness: Some(values.readiness.to_string()),
            liveness: Some(values.liveness.to_string()),
        }
    }
}

/// Shared probe delay store
///
/// Cloning shares the underlying values. Readers always see the latest write.
#[derive(Debug, Clone, Default)]
pub struct ProbeDelays {
    values: Arc<RwLock<ProbeDelayValues>>,
}

impl ProbeDelays {
    pub fn new(values: ProbeDelayValues) -> Self {
        Self {
            values: Arc::new(RwLock::new(values)),
        }
    }

    /// Seed from `STARTUP_PROBE_DELAY`, `READINESS_PROBE_DELAY`, `LIVENESS_PROBE_DELAY`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut values = ProbeDelayValues::default();
        for kind in ProbeKind::ALL {
            if let Some(raw) = lookup(kind.env_var()) {
                match parse_probe_delay(&raw) {
                    Some(secs) => *values.slot(kind) = secs,
                    None => warn!(
                        probe = kind.as_str(),
                        env = kind.env_var(),
                        value = %raw,
                        "Invalid probe delay, using 0"
                    ),
                }
            }
        }
        Self::new(values)
    }

    pub fn snapshot(&self) -> ProbeDelayValues {
        *self.values.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn delay(&self, kind: ProbeKind) -> Duration {
        Duration::from_secs(self.snapshot().get(kind))
    }

    /// Apply an update, returning the resulting values
    ///
    /// Fields that are absent or malformed keep their previous value.
    pub fn apply(&self, update: &ProbeDelaysBody) -> ProbeDelayValues {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        for kind in ProbeKind::ALL {
            let Some(raw) = update.field(kind) else {
                continue;
            };
            match parse_probe_delay(raw) {
                Some(secs) => *values.slot(kind) = secs,
                None => warn!(
                    probe = kind.as_str(),
                    value = %raw,
                    kept = values.get(kind),
                    "Invalid probe delay, keeping previous value"
                ),
            }
        }
        *values
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

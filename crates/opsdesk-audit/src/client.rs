//! Client fingerprint: IP address and device class.
//!
//! The IP comes from an external lookup service and is cached until sign-out.
//! Lookup is best effort; any failure yields [`UNKNOWN_IP`] and is not
//! cached, so the next entry tries again. Concurrent misses share one
//! lookup in flight.

use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AuditError, AuditResult};

/// Sentinel recorded when the client IP could not be determined.
pub const UNKNOWN_IP: &str = "unknown";

/// Coarse device classification derived from the user agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DeviceClass {
    /// Phone.
    Mobile,
    /// Tablet.
    Tablet,
    /// Desktop or laptop browser.
    Desktop,
    /// No or unrecognized user agent.
    #[default]
    Unknown,
}

impl DeviceClass {
    /// Classify a user agent string.
    ///
    /// Tablets are checked before phones because most tablet agents also
    /// carry phone markers.
    #[must_use]
    pub fn from_user_agent(user_agent: Option<&str>) -> Self {
        let Some(ua) = user_agent.map(str::to_ascii_lowercase) else {
            return Self::Unknown;
        };
        if ua.trim().is_empty() {
            return Self::Unknown;
        }

        let android = ua.contains("android");
        if ua.contains("ipad") || ua.contains("tablet") || (android && !ua.contains("mobile")) {
            Self::Tablet
        } else if android
            || ua.contains("iphone")
            || ua.contains("ipod")
            || ua.contains("mobi")
            || ua.contains("windows phone")
        {
            Self::Mobile
        } else if ["windows", "macintosh", "mac os x", "linux", "x11", "cros"]
            .iter()
            .any(|marker| ua.contains(marker))
        {
            Self::Desktop
        } else {
            Self::Unknown
        }
    }

    /// Display name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mobile => "Mobile",
            Self::Tablet => "Tablet",
            Self::Desktop => "Desktop",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client details captured for one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    /// Resolved IP or [`UNKNOWN_IP`].
    pub ip_address: String,
    /// Device class.
    pub device: DeviceClass,
    /// Raw user agent.
    pub user_agent: Option<String>,
}

impl ClientInfo {
    /// Client info for a caller with no known IP or agent.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            ip_address: UNKNOWN_IP.to_owned(),
            device: DeviceClass::Unknown,
            user_agent: None,
        }
    }
}

/// External service reporting the caller's public IP.
#[async_trait]
pub trait IpLookup: Send + Sync {
    /// Look up the current client IP.
    async fn lookup(&self) -> AuditResult<String>;
}

/// IP lookup against a JSON endpoint returning `{"ip": "..."}`.
#[derive(Debug, Clone)]
pub struct HttpIpLookup {
    client: reqwest::Client,
    url: String,
}

#[derive(Deserialize)]
struct IpResponse {
    ip: String,
}

impl HttpIpLookup {
    /// Create a lookup client with a request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::IpLookup`] if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> AuditResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuditError::IpLookup(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl IpLookup for HttpIpLookup {
    async fn lookup(&self) -> AuditResult<String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| AuditError::IpLookup(e.to_string()))?;
        let body: IpResponse = response
            .json()
            .await
            .map_err(|e| AuditError::IpLookup(e.to_string()))?;
        Ok(body.ip)
    }
}

/// Lookup that always returns the same address.
#[derive(Debug, Clone)]
pub struct StaticIpLookup {
    ip: String,
}

impl StaticIpLookup {
    /// Create a lookup returning `ip`.
    #[must_use]
    pub fn new(ip: impl Into<String>) -> Self {
        Self { ip: ip.into() }
    }
}

#[async_trait]
impl IpLookup for StaticIpLookup {
    async fn lookup(&self) -> AuditResult<String> {
        Ok(self.ip.clone())
    }
}

/// Cached client IP, scoped to a signed-in session.
#[derive(Debug, Default)]
pub struct IpCache {
    ip: RwLock<Option<String>>,
}

impl IpCache {
    /// Empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached IP, if any.
    #[must_use]
    pub fn get(&self) -> Option<String> {
        self.ip
            .read()
            .unwrap_or_else(|e| {
                tracing::warn!("ip cache lock poisoned, recovering");
                e.into_inner()
            })
            .clone()
    }

    /// Store an IP.
    pub fn set(&self, ip: impl Into<String>) {
        *self.ip.write().unwrap_or_else(|e| {
            tracing::warn!("ip cache lock poisoned, recovering");
            e.into_inner()
        }) = Some(ip.into());
    }

    /// Forget the cached IP.
    pub fn clear(&self) {
        *self.ip.write().unwrap_or_else(|e| {
            tracing::warn!("ip cache lock poisoned, recovering");
            e.into_inner()
        }) = None;
    }
}

/// Resolves the client IP through a lookup and a cache.
pub struct IpResolver {
    lookup: Option<Arc<dyn IpLookup>>,
    cache: IpCache,
    unknown: String,
    in_flight: tokio::sync::Mutex<()>,
}

impl fmt::Debug for IpResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IpResolver")
            .field("enabled", &self.lookup.is_some())
            .field("cached", &self.cache.get())
            .finish_non_exhaustive()
    }
}

impl IpResolver {
    /// Resolver backed by `lookup`.
    #[must_use]
    pub fn new(lookup: Arc<dyn IpLookup>) -> Self {
        Self {
            lookup: Some(lookup),
            cache: IpCache::new(),
            unknown: UNKNOWN_IP.to_owned(),
            in_flight: tokio::sync::Mutex::new(()),
        }
    }

    /// Resolver that never looks anything up.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            lookup: None,
            cache: IpCache::new(),
            unknown: UNKNOWN_IP.to_owned(),
            in_flight: tokio::sync::Mutex::new(()),
        }
    }

    /// Override the sentinel recorded on failure.
    #[must_use]
    pub fn with_unknown(mut self, unknown: impl Into<String>) -> Self {
        self.unknown = unknown.into();
        self
    }

    /// The IP to record: cached, else looked up, else the sentinel.
    pub async fn resolve(&self) -> String {
        if let Some(ip) = self.cache.get() {
            return ip;
        }
        let Some(lookup) = &self.lookup else {
            return self.unknown.clone();
        };

        // Callers that queued behind a successful lookup take its result.
        let _in_flight = self.in_flight.lock().await;
        if let Some(ip) = self.cache.get() {
            return ip;
        }

        match lookup.lookup().await {
            Ok(ip) if !ip.trim().is_empty() => {
                let ip = ip.trim().to_owned();
                self.cache.set(ip.clone());
                ip
            },
            Ok(_) => {
                tracing::debug!("ip lookup returned an empty address");
                self.unknown.clone()
            },
            Err(e) => {
                tracing::debug!(error = %e, "ip lookup failed");
                self.unknown.clone()
            },
        }
    }

    /// Drop the cached IP.
    pub fn invalidate(&self) {
        self.cache.clear();
    }

    /// The cache, for inspection.
    #[must_use]
    pub fn cache(&self) -> &IpCache {
        &self.cache
    }
}

use std::env;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontendConfig {
    pub api_url: String,
    /// `None` leaves requests without a deadline.
    pub request_timeout: Option<Duration>,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        }
    }
}

impl FrontendConfig {
    pub fn from_env() -> Self {
        let api_url = env::var("WASTEDETECT_API_URL")
            .ok()
            .filter(|raw| !raw.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let request_timeout = parse_timeout(env::var("WASTEDETECT_TIMEOUT_SECS").ok().as_deref());
        Self {
            api_url,
            request_timeout,
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout = timeout_from_secs(secs);
        self
    }
}

/// Unset or unparsable values fall back to the default; `0` disables the
/// timeout.
pub(crate) fn parse_timeout(raw: Option<&str>) -> Option<Duration> {
    let secs = raw
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    timeout_from_secs(secs)
}

fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

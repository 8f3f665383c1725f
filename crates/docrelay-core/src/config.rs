use std::time::Duration;

pub const DEFAULT_ALLOWED_ORIGINS: [&str; 2] = ["http://localhost:8080", "http://127.0.0.1:8080"];
pub const DEFAULT_ENVIRONMENT: &str = "development";
pub const DEFAULT_RATE_LIMIT_MAX: u32 = 50;
pub const DEFAULT_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_BODY_LIMIT: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max: DEFAULT_RATE_LIMIT_MAX,
            window: DEFAULT_RATE_LIMIT_WINDOW,
        }
    }
}

impl RateLimitConfig {
    /// Whole minutes in the window, rounded up, for user-facing messages.
    pub fn window_minutes(&self) -> u64 {
        self.window.as_secs().div_ceil(60)
    }
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub allowed_origins: Vec<String>,
    pub environment: String,
    pub rate_limit: RateLimitConfig,
    pub body_limit: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            allowed_origins: parse_allowed_origins(None),
            environment: DEFAULT_ENVIRONMENT.to_string(),
            rate_limit: RateLimitConfig::default(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl RelayConfig {
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|allowed| allowed == origin)
    }
}

/// Splits a comma-separated origin list. Absent or blank input yields the
/// local development origins.
pub fn parse_allowed_origins(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
        return DEFAULT_ALLOWED_ORIGINS
            .iter()
            .map(|origin| origin.to_string())
            .collect();
    };

    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

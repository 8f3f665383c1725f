pub mod access;
pub mod config;
pub mod core;
pub mod error;
pub mod handler;
pub mod rate_limit;

pub use access::ClientAddr;
pub use config::{RateLimitConfig, RelayConfig};
pub use core::{Core, CoreState};
pub use error::RelayError;
pub use rate_limit::{Decision, FixedWindowLimiter};

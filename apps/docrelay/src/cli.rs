use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use docrelay_core::config::{
    DEFAULT_BODY_LIMIT, DEFAULT_ENVIRONMENT, DEFAULT_RATE_LIMIT_MAX, parse_allowed_origins,
};
use docrelay_core::{RateLimitConfig, RelayConfig};
use docrelay_provider::GeminiConfig;
use docrelay_provider::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};

#[derive(Debug, Parser)]
#[command(
    name = "docrelay",
    version,
    about = "Relay legal-document drafting prompts to the Gemini API"
)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Emit logs as JSON lines.
    #[arg(long, env = "LOG_JSON", global = true)]
    pub log_json: bool,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Run the relay server (default).
    Serve(ServeArgs),
    /// Build a document prompt and send it to a running relay.
    Draft(DraftArgs),
}

#[derive(Debug, Clone, Parser)]
pub(crate) struct ServeArgs {
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Comma-separated list of browser origins allowed to call the relay.
    #[arg(long, env = "FRONTEND_URL")]
    pub allowed_origins: Option<String>,

    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    #[arg(long, env = "APP_ENV", default_value = DEFAULT_ENVIRONMENT)]
    pub environment: String,

    #[arg(long, env = "GEMINI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Outbound proxy for upstream calls.
    #[arg(long, env = "UPSTREAM_PROXY")]
    pub proxy: Option<String>,

    #[arg(
        long,
        env = "RATE_LIMIT_MAX",
        default_value_t = DEFAULT_RATE_LIMIT_MAX,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub rate_limit_max: u32,

    #[arg(
        long,
        env = "RATE_LIMIT_WINDOW_SECS",
        default_value_t = 900,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub rate_limit_window_secs: u64,
}

impl ServeArgs {
    /// Serve arguments taken from the environment alone.
    pub fn from_env() -> Self {
        Self::parse_from(["docrelay"])
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            allowed_origins: parse_allowed_origins(self.allowed_origins.as_deref()),
            environment: self.environment.clone(),
            rate_limit: RateLimitConfig {
                max: self.rate_limit_max,
                window: Duration::from_secs(self.rate_limit_window_secs),
            },
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn gemini_config(&self) -> GeminiConfig {
        GeminiConfig {
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            proxy: self.proxy.clone(),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub(crate) struct DraftArgs {
    #[arg(long, env = "BACKEND_URL", default_value = "http://localhost:3000")]
    pub backend_url: String,

    /// Print the assembled prompt instead of sending it.
    #[arg(long)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub document: DraftDocument,
}

#[derive(Debug, Clone, Subcommand)]
pub(crate) enum DraftDocument {
    /// Sworn witness statement for an adverse-possession claim.
    Witness {
        #[arg(long)]
        possessor_name: String,
        #[arg(long)]
        neighbor_name: String,
        #[arg(long)]
        years: String,
    },
    /// Right-of-petition letter to the public-instruments registry office.
    Petition {
        #[arg(long)]
        applicant_name: String,
        #[arg(long)]
        applicant_id: String,
        #[arg(long)]
        address: String,
    },
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Url;

use crate::error::AuthError;

const DEFAULT_AUTHENTICATION_ENDPOINT: &str = "/oauth/token";
const DEFAULT_CURRENT_USER_URI: &str = "/me";
const DEFAULT_DESTROY_SESSION_ENDPOINT: &str = "/logout";

/// Session authentication client
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Base URL of the auth backend
    #[arg(short = 'b', long, env = "AUTH_BASE_URL", default_value = "http://localhost:3000")]
    pub base_url: String,

    /// Prefix prepended to every endpoint path
    #[arg(long, env = "AUTH_ENDPOINT_PREFIX", default_value = "")]
    pub endpoint_prefix: String,

    /// Path (or absolute URL) of the token endpoint
    #[arg(long, env = "AUTHENTICATION_ENDPOINT", default_value = DEFAULT_AUTHENTICATION_ENDPOINT)]
    pub authentication_endpoint: String,

    /// Path (or absolute URL) returning the current user
    #[arg(long, env = "CURRENT_USER_URI", default_value = DEFAULT_CURRENT_USER_URI)]
    pub current_user_uri: String,

    /// Path (or absolute URL) destroying the session
    #[arg(long, env = "DESTROY_SESSION_ENDPOINT", default_value = DEFAULT_DESTROY_SESSION_ENDPOINT)]
    pub destroy_session_endpoint: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "60")]
    pub http_timeout: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Authenticate and print the current user
    Login {
        /// Username or email
        #[arg(short, long, env = "AUTH_USERNAME")]
        username: Option<String>,

        /// Password (prompted for when omitted)
        #[arg(short, long, env = "AUTH_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Social provider id (e.g. google, facebook); use with --token.
        /// Takes precedence over --username/--password
        #[arg(long, requires = "token")]
        provider: Option<String>,

        /// Provider access token
        #[arg(long, requires = "provider")]
        token: Option<String>,

        /// End the session again once logged in
        #[arg(long)]
        logout: bool,
    },

    /// End the current session
    Logout,
}

/// Endpoints the client talks to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    Authentication,
    CurrentUser,
    DestroySession,
}

/// Names stamped on broadcast events
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventNames {
    pub authentication_success: String,
    pub authentication_failure: String,
    pub session_end: String,
    pub current_user: String,
}

impl Default for EventNames {
    fn default() -> Self {
        Self {
            authentication_success: "$authenticated".to_string(),
            authentication_failure: "$authenticationFailure".to_string(),
            session_end: "$sessionEnd".to_string(),
            current_user: "$currentUser".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    // Backend location
    pub base_url: Url,
    pub endpoint_prefix: String,

    // Endpoints
    pub authentication_endpoint: String,
    pub current_user_uri: String,
    pub destroy_session_endpoint: String,

    // Events
    pub events: EventNames,

    // HTTP client
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,
    pub user_agent: String,

    // Logging
    pub log_level: String,
}

impl Config {
    /// Defaults pointed at the given backend
    pub fn for_base_url(base_url: Url) -> Self {
        Self {
            base_url,
            endpoint_prefix: String::new(),
            authentication_endpoint: DEFAULT_AUTHENTICATION_ENDPOINT.to_string(),
            current_user_uri: DEFAULT_CURRENT_USER_URI.to_string(),
            destroy_session_endpoint: DEFAULT_DESTROY_SESSION_ENDPOINT.to_string(),
            events: EventNames::default(),
            http_connect_timeout: 30,
            http_request_timeout: 60,
            user_agent: default_user_agent(),
            log_level: "info".to_string(),
        }
    }

    /// Load configuration from all sources with priority: CLI > ENV > defaults
    pub fn load() -> Result<(Self, Command)> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let args = CliArgs::parse();
        let config = Self::from_args(&args)?;

        Ok((config, args.command))
    }

    /// Build config from parsed CLI arguments
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let base_url = Url::parse(&args.base_url)
            .with_context(|| format!("AUTH_BASE_URL is not a valid URL: {}", args.base_url))?;

        let config = Config {
            endpoint_prefix: args.endpoint_prefix.clone(),
            authentication_endpoint: args.authentication_endpoint.clone(),
            current_user_uri: args.current_user_uri.clone(),
            destroy_session_endpoint: args.destroy_session_endpoint.clone(),

            events: EventNames {
                authentication_success: env_or("AUTHENTICATION_SUCCESS_EVENT_NAME", "$authenticated"),
                authentication_failure: env_or(
                    "AUTHENTICATION_FAILURE_EVENT_NAME",
                    "$authenticationFailure",
                ),
                session_end: env_or("SESSION_END_EVENT", "$sessionEnd"),
                current_user: env_or("GET_USER_EVENT", "$currentUser"),
            },

            http_connect_timeout: std::env::var("HTTP_CONNECT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),

            http_request_timeout: args.http_timeout,

            log_level: args.log_level.clone(),

            ..Self::for_base_url(base_url)
        };

        Ok(config)
    }

    /// Resolve an endpoint to a full URL
    ///
    /// Absolute endpoint URLs are used as-is; paths are appended to the base
    /// URL after the endpoint prefix.
    pub fn get_url(&self, endpoint: Endpoint) -> crate::error::Result<Url> {
        let path = match endpoint {
            Endpoint::Authentication => &self.authentication_endpoint,
            Endpoint::CurrentUser => &self.current_user_uri,
            Endpoint::DestroySession => &self.destroy_session_endpoint,
        };

        if path.starts_with("http://") || path.starts_with("https://") {
            return Url::parse(path)
                .map_err(|e| AuthError::Config(format!("invalid endpoint URL {path}: {e}")));
        }

        check_base_url(&self.base_url).map_err(AuthError::Config)?;

        let mut url = self.base_url.clone();
        let joined = format!(
            "{}{}{}",
            self.base_url.path().trim_end_matches('/'),
            normalize_path(&self.endpoint_prefix),
            normalize_path(path)
        );
        url.set_path(&joined);

        Ok(url)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        check_base_url(&self.base_url).map_err(anyhow::Error::msg)?;

        for (name, value) in [
            ("AUTHENTICATION_ENDPOINT", &self.authentication_endpoint),
            ("CURRENT_USER_URI", &self.current_user_uri),
            ("DESTROY_SESSION_ENDPOINT", &self.destroy_session_endpoint),
        ] {
            if value.trim().is_empty() {
                anyhow::bail!("{} cannot be empty", name);
            }
        }

        let names = [
            &self.events.authentication_success,
            &self.events.authentication_failure,
            &self.events.session_end,
            &self.events.current_user,
        ];
        if names.iter().any(|n| n.trim().is_empty()) {
            anyhow::bail!("Event names cannot be empty");
        }
        for (i, a) in names.iter().enumerate() {
            if names[i + 1..].contains(a) {
                anyhow::bail!("Event name {} is used for more than one event", a);
            }
        }

        if self.http_connect_timeout == 0 || self.http_request_timeout == 0 {
            anyhow::bail!("HTTP timeouts must be greater than zero");
        }

        Ok(())
    }
}

/// Endpoint paths are appended to the base URL, so it must be a plain
/// scheme/host/path URL
fn check_base_url(base_url: &Url) -> std::result::Result<(), String> {
    if base_url.cannot_be_a_base() {
        return Err(format!("AUTH_BASE_URL cannot be used as a base: {}", base_url));
    }
    if base_url.query().is_some() || base_url.fragment().is_some() {
        return Err(format!(
            "AUTH_BASE_URL must not carry a query or fragment: {}",
            base_url
        ));
    }
    Ok(())
}

fn default_user_agent() -> String {
    format!("session-auth/{}", env!("CARGO_PKG_VERSION"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Make a path segment start with exactly one slash and end with none
fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

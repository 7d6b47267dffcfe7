// Session authentication client - library root

pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod form;
pub mod http_client;
pub mod user;

pub use auth::{AuthService, CredentialData, TokenResponse};
pub use config::{Config, Endpoint, EventNames};
pub use error::{AuthError, Result};
pub use events::{AuthEvent, BroadcastEvent, EventBus, FailurePayload};
pub use http_client::{HttpClient, HttpResponse};
pub use user::{User, UserService};
